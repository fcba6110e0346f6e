use crate::{
    config::BedrockConfig,
    error::{CaricatureError, Result},
    models::{
        GenerationRequest, ProviderImage, TitanImageResponse, TitanVariationRequest,
        TITAN_MAX_TEXT_CHARS,
    },
    providers::ImageProvider,
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_bedrockruntime::{
    config::{Credentials, Region},
    error::{ProvideErrorMetadata, SdkError},
    primitives::Blob,
    Client,
};
use std::time::Duration;

/// Titan Image Generator always answers with PNG.
const TITAN_MEDIA_TYPE: &str = "image/png";

/// Upper bound for resolving the default credential chain at startup.
const CREDENTIALS_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct BedrockImageClient {
    client: Client,
    model_id: String,
    has_credentials: bool,
}

impl BedrockImageClient {
    pub async fn new(bedrock_config: BedrockConfig) -> Self {
        let model_id = bedrock_config.model_id().to_string();
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let (Some(access_key), Some(secret_key)) =
            (&bedrock_config.access_key, &bedrock_config.secret_key)
        {
            loader = loader
                .credentials_provider(Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "caricatura",
                ))
                .region(Region::new(
                    bedrock_config
                        .region
                        .clone()
                        .unwrap_or_else(|| "us-east-1".to_string()),
                ));
        } else {
            log::info!("No explicit AWS keys, using the default credential chain");
            if let Some(region) = bedrock_config.region.clone() {
                loader = loader.region(Region::new(region));
            }
        }
        let aws_config = loader.load().await;

        // The loader always installs a chain; only a resolved identity counts.
        let has_region = aws_config.region().is_some();
        let has_identity = match aws_config.credentials_provider() {
            Some(provider) => matches!(
                tokio::time::timeout(CREDENTIALS_PROBE_TIMEOUT, provider.provide_credentials())
                    .await,
                Ok(Ok(_))
            ),
            None => false,
        };
        if !has_region {
            log::warn!("⚠️  No AWS region configured for Bedrock");
        }
        if !has_identity {
            log::warn!("⚠️  AWS credential chain resolved no credentials");
        }

        Self {
            client: Client::new(&aws_config),
            has_credentials: has_region && has_identity,
            model_id,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Service rejections keep the AWS error code. Failures to reach the
/// endpoint are transport errors.
pub(crate) fn sdk_error_to_caricature<E, R>(error: SdkError<E, R>) -> CaricatureError
where
    E: ProvideErrorMetadata,
{
    if let Some(service_error) = error.as_service_error() {
        return CaricatureError::AwsServiceError(format!(
            "{} - {}",
            service_error.code().unwrap_or("unknown"),
            service_error.message().unwrap_or("no message")
        ));
    }
    match &error {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            CaricatureError::TransportError(format!("Bedrock: {}", error))
        }
        _ => CaricatureError::AwsError(error.to_string()),
    }
}

pub(crate) fn parse_titan_response(bytes: &[u8]) -> Result<Option<ProviderImage>> {
    let titan_response: TitanImageResponse = serde_json::from_slice(bytes)
        .map_err(|e| CaricatureError::ResponseError(e.to_string()))?;

    if let Some(error) = titan_response.error.filter(|e| !e.is_empty()) {
        return Err(CaricatureError::ResponseError(format!("Titan error: {}", error)));
    }

    Ok(titan_response
        .images
        .into_iter()
        .find(|image| !image.is_empty())
        .map(|image| ProviderImage::new(TITAN_MEDIA_TYPE, image)))
}

#[async_trait]
impl ImageProvider for BedrockImageClient {
    fn name(&self) -> &str {
        "bedrock"
    }

    fn is_configured(&self) -> bool {
        self.has_credentials
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Option<ProviderImage>> {
        let prompt = request.prompt_within(TITAN_MAX_TEXT_CHARS);
        let payload = TitanVariationRequest::new(&prompt, &request.image.data);
        let request_json = serde_json::to_vec(&payload)?;

        log::debug!(
            "Bedrock request for style {} with model {}",
            request.style.id,
            self.model_id
        );

        let response = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(request_json))
            .send()
            .await
            .map_err(sdk_error_to_caricature)?;

        parse_titan_response(response.body.as_ref())
    }
}
