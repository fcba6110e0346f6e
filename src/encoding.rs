use crate::models::EncodedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Turns the uploaded bytes into the encoding providers expect on the wire.
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, bytes: &[u8], media_type: &str) -> EncodedImage;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Encoder;

impl ImageEncoder for Base64Encoder {
    fn encode(&self, bytes: &[u8], media_type: &str) -> EncodedImage {
        EncodedImage {
            media_type: media_type.to_string(),
            data: STANDARD.encode(bytes),
            byte_len: bytes.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_standard_base64() {
        let encoded = Base64Encoder.encode(b"hello", "image/png");
        assert_eq!(encoded.data, "aGVsbG8=");
        assert_eq!(encoded.media_type, "image/png");
        assert_eq!(encoded.byte_len, 5);
    }
}
