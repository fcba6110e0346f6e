//! Caricatura turns one photo into a set of AI-stylized caricatures.
//!
//! A [`StyleCatalog`] lists the presets. The [`GenerationOrchestrator`] sends
//! the photo to an [`ImageProvider`] once per style, concurrently, and returns
//! whichever styles came back with an image.

pub mod catalog;
pub mod config;
pub mod encoding;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;

pub use catalog::StyleCatalog;
pub use config::{BedrockConfig, Config, GeminiConfig};
pub use encoding::{Base64Encoder, ImageEncoder};
pub use error::{CaricatureError, Result};
pub use models::*;
pub use orchestrator::GenerationOrchestrator;
pub use providers::{build_provider, BedrockImageClient, GeminiImageClient, ImageProvider};
