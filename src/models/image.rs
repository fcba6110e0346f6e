use crate::error::{CaricatureError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MEDIA_TYPE: &str = "image/png";

/// The uploaded image in the provider's transport encoding. Built once per
/// batch and shared read-only by every branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub media_type: String,
    pub data: String, // Base64 encoded
    pub byte_len: usize,
}

/// Image payload as returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderImage {
    pub media_type: String,
    pub data: String, // Base64 encoded
}

impl ProviderImage {
    pub fn new(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Self-contained reference a browser can display directly.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.data)
            .map_err(|e| CaricatureError::ResponseError(format!("Invalid base64 image: {}", e)))
    }
}

/// One successfully stylized image handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub style_id: String,
    pub display_name: String,
    pub image_data: String, // data URI
}

impl GeneratedImage {
    /// Splits the data URI back into media type and raw bytes.
    pub fn decode(&self) -> Result<(String, Vec<u8>)> {
        let rest = self
            .image_data
            .strip_prefix("data:")
            .ok_or_else(|| CaricatureError::ResponseError("Image data is not a data URI".into()))?;
        let (media_type, data) = rest.split_once(";base64,").ok_or_else(|| {
            CaricatureError::ResponseError("Image data URI is not base64 encoded".into())
        })?;
        let bytes = ProviderImage::new(media_type, data).decode_bytes()?;
        Ok((media_type.to_string(), bytes))
    }
}

/// File extension for a known image media type.
pub fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        _ => "png",
    }
}

/// Media type guessed from a file extension, for uploads read from disk.
pub fn media_type_for_extension(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        _ => DEFAULT_MEDIA_TYPE,
    }
}

/// Titan text limit for `imageVariationParams.text`.
pub const TITAN_MAX_TEXT_CHARS: usize = 512;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitanVariationRequest<'a> {
    pub task_type: &'static str,
    pub image_variation_params: TitanVariationParams<'a>,
    pub image_generation_config: TitanGenerationConfig,
}

#[derive(Serialize)]
pub struct TitanVariationParams<'a> {
    pub text: &'a str,
    pub images: [&'a str; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitanGenerationConfig {
    pub number_of_images: u32,
    pub quality: &'static str,
    pub cfg_scale: f32,
}

impl<'a> TitanVariationRequest<'a> {
    /// `text` must already fit in [`TITAN_MAX_TEXT_CHARS`].
    pub fn new(text: &'a str, image: &'a str) -> Self {
        Self {
            task_type: "IMAGE_VARIATION",
            image_variation_params: TitanVariationParams {
                text,
                images: [image],
            },
            image_generation_config: TitanGenerationConfig {
                number_of_images: 1,
                quality: "standard",
                cfg_scale: 8.0,
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct TitanImageResponse {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}
