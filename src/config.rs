use crate::models::ProviderKind;
use std::env;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_BEDROCK_IMAGE_MODEL: &str = "amazon.titan-image-generator-v1";

/// Variables checked, in order, for the Gemini API key.
const GEMINI_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub model_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: Option<u16>,
    pub provider: ProviderKind,
    pub gemini: Option<GeminiConfig>,
    pub bedrock: Option<BedrockConfig>,
    pub styles_path: Option<String>,
    pub timeout: Option<Duration>,
    pub max_upload_bytes: usize,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model: None,
            base_url: None,
            request_timeout: None,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = GEMINI_KEY_VARS
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|value| !value.trim().is_empty());
        let model = env::var("GEMINI_MODEL").ok();
        let base_url = env::var("GEMINI_BASE_URL").ok();
        let request_timeout = env::var("GEMINI_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse().ok())
            .map(Duration::from_secs);

        GeminiConfig {
            api_key,
            model,
            base_url,
            request_timeout,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL)
    }

    /// Whole-request bound, so a stalled connection cannot hold a batch open.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout.unwrap_or(DEFAULT_GEMINI_REQUEST_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_GEMINI_BASE_URL)
            .trim_end_matches('/')
    }
}

impl Default for BedrockConfig {
    fn default() -> Self {
        BedrockConfig {
            region: None,
            access_key: None,
            secret_key: None,
            model_id: None,
        }
    }
}

impl BedrockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let region = env::var("AWS_REGION")
            .or_else(|_| env::var("AWS_DEFAULT_REGION"))
            .ok();
        let access_key = env::var("AWS_ACCESS_KEY_ID").ok();
        let secret_key = env::var("AWS_SECRET_ACCESS_KEY").ok();
        let model_id = env::var("BEDROCK_IMAGE_MODEL").ok();

        BedrockConfig {
            region,
            access_key,
            secret_key,
            model_id,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn model_id(&self) -> &str {
        self.model_id
            .as_deref()
            .unwrap_or(DEFAULT_BEDROCK_IMAGE_MODEL)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            provider: ProviderKind::Gemini,
            gemini: None,
            bedrock: None,
            styles_path: None,
            timeout: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the service settings and the config of the selected provider.
    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let provider = env::var("CARICATURE_PROVIDER")
            .ok()
            .and_then(|value| match value.parse() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    log::warn!("{}, falling back to gemini", e);
                    None
                }
            })
            .unwrap_or_default();
        let styles_path = env::var("CARICATURE_STYLES_PATH")
            .ok()
            .filter(|path| !path.trim().is_empty());
        let timeout = env::var("CARICATURE_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let max_upload_bytes = env::var("CARICATURE_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|bytes| bytes.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let mut config = Config {
            port,
            provider,
            gemini: None,
            bedrock: None,
            styles_path,
            timeout,
            max_upload_bytes,
        };
        match provider {
            ProviderKind::Gemini => config.gemini = Some(GeminiConfig::from_env()),
            ProviderKind::Bedrock => config.bedrock = Some(BedrockConfig::from_env()),
        }
        config
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = Some(config);
        self.provider = ProviderKind::Gemini;
        self
    }

    pub fn with_bedrock(mut self, config: BedrockConfig) -> Self {
        self.bedrock = Some(config);
        self.provider = ProviderKind::Bedrock;
        self
    }

    pub fn with_styles_path(mut self, path: impl Into<String>) -> Self {
        self.styles_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_select_provider() {
        let config = Config::new().with_bedrock(BedrockConfig::new().with_region("eu-west-1"));
        assert_eq!(config.provider, ProviderKind::Bedrock);
        assert_eq!(config.bedrock.unwrap().region.as_deref(), Some("eu-west-1"));

        let config = Config::new()
            .with_port(9000)
            .with_gemini(GeminiConfig::new().with_api_key("k"));
        assert_eq!(config.provider, ProviderKind::Gemini);
        assert_eq!(config.port(), 9000);
    }

    #[test]
    fn provider_defaults() {
        let gemini = GeminiConfig::new().with_base_url("http://localhost:9999/");
        assert_eq!(gemini.model(), DEFAULT_GEMINI_MODEL);
        assert_eq!(gemini.base_url(), "http://localhost:9999");
        assert_eq!(gemini.request_timeout(), DEFAULT_GEMINI_REQUEST_TIMEOUT);
        assert_eq!(
            gemini
                .with_request_timeout(Duration::from_secs(30))
                .request_timeout(),
            Duration::from_secs(30)
        );

        let bedrock = BedrockConfig::new();
        assert_eq!(bedrock.model_id(), DEFAULT_BEDROCK_IMAGE_MODEL);
        assert_eq!(
            bedrock.with_model("amazon.nova-canvas-v1:0").model_id(),
            "amazon.nova-canvas-v1:0"
        );
    }

    #[test]
    fn service_defaults() {
        let config = Config::default();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.timeout.is_none());
        assert!(config.styles_path.is_none());
    }
}
