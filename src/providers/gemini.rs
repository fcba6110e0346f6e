use crate::{
    config::GeminiConfig,
    error::{CaricatureError, Result},
    models::{
        gemini::{ApiErrorEnvelope, GenerateContentRequest, GenerateContentResponse},
        GenerationRequest, ProviderImage,
    },
    providers::ImageProvider,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct GeminiImageClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiImageClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CaricatureError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            model: config.model().to_string(),
            base_url: config.base_url().to_string(),
            api_key: config.api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl ImageProvider for GeminiImageClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Option<ProviderImage>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CaricatureError::MissingCredentials(self.name().to_string()))?;

        let payload = GenerateContentRequest::image_edit(
            &request.image.media_type,
            &request.image.data,
            &request.prompt,
        );

        log::debug!(
            "Gemini request for style {} with model {}",
            request.style.id,
            self.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
                Ok(envelope) => match envelope.error.status {
                    Some(code) => format!("{}: {}", code, envelope.error.message),
                    None => envelope.error.message,
                },
                Err(_) => body,
            };
            return Err(CaricatureError::ProviderError {
                status: status.as_u16(),
                message,
            });
        }

        // Undecodable bodies become ResponseError, stalled reads TransportError.
        let body: GenerateContentResponse = response.json().await?;

        match body.first_inline_image() {
            Some(image) => Ok(Some(image)),
            None => {
                log::debug!(
                    "Gemini returned no image for style {}: {}",
                    request.style.id,
                    body.explain_missing_image()
                );
                Ok(None)
            }
        }
    }
}
