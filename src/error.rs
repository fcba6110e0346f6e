use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaricatureError {
    #[error("No image provided")]
    NoImageProvided,
    #[error("Image exceeds the upload limit of {limit} bytes")]
    ImageTooLarge { limit: usize },
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("No styles could be generated ({failed} failed), try again with a different image")]
    AllStylesFailed { failed: usize },
    #[error("Image provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("Provider error ({status}): {message}")]
    ProviderError { status: u16, message: String },
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deadline exceeded before the provider answered")]
    DeadlineExceeded,
    #[error("AWS error: {0}")]
    AwsError(String),
    #[error("AWS service error: {0}")]
    AwsServiceError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl CaricatureError {
    /// True for the errors that mean a whole batch produced nothing.
    pub fn is_total_failure(&self) -> bool {
        matches!(
            self,
            CaricatureError::AllStylesFailed { .. } | CaricatureError::ProviderUnavailable(_)
        )
    }

    /// Connectivity-level failures (DNS, refused connections, socket timeouts).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CaricatureError::TransportError(_) | CaricatureError::AwsError(_)
        )
    }
}

impl From<reqwest::Error> for CaricatureError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            CaricatureError::TransportError(e.to_string())
        } else if e.is_decode() {
            CaricatureError::ResponseError(e.to_string())
        } else {
            CaricatureError::RequestError(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CaricatureError {
    fn from(e: serde_json::Error) -> Self {
        CaricatureError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CaricatureError>;
