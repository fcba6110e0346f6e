pub mod bedrock;
pub mod gemini;

use crate::{
    config::{BedrockConfig, Config, GeminiConfig},
    error::Result,
    models::{GenerationRequest, ProviderImage, ProviderKind},
};
use async_trait::async_trait;
use std::sync::Arc;

pub use bedrock::BedrockImageClient;
pub use gemini::GeminiImageClient;

/// A hosted model that restyles one image from a text instruction.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    /// False when the provider cannot authenticate, so no request would succeed.
    fn is_configured(&self) -> bool;

    /// `Ok(None)` means the provider answered but sent no image back.
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<ProviderImage>>;
}

pub async fn build_provider(config: &Config) -> Result<Arc<dyn ImageProvider>> {
    let provider: Arc<dyn ImageProvider> = match config.provider {
        ProviderKind::Gemini => {
            let gemini_config = config.gemini.clone().unwrap_or_else(GeminiConfig::from_env);
            Arc::new(GeminiImageClient::new(gemini_config)?)
        }
        ProviderKind::Bedrock => {
            let bedrock_config = config
                .bedrock
                .clone()
                .unwrap_or_else(BedrockConfig::from_env);
            Arc::new(BedrockImageClient::new(bedrock_config).await)
        }
    };

    if provider.is_configured() {
        log::info!("Image provider ready: {}", provider.name());
    } else {
        log::warn!(
            "Image provider {} has no credentials, generation requests will be rejected",
            provider.name()
        );
    }

    Ok(provider)
}
