//! Label photo normalization
//!
//! Vision APIs take base64 payloads with a declared MIME type, so every
//! intake path (raw bytes, base64 string, data URL) funnels into one
//! validated representation before any network call happens.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::ImageFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unrecognized image format")]
    UnknownFormat,
    #[error("image data is empty")]
    Empty,
}

/// A nutrition label photo ready for API transport
#[derive(Debug, Clone)]
pub struct LabelImage {
    base64: String,
    mime_type: &'static str,
}

impl LabelImage {
    /// Build from raw image bytes, sniffing the format from magic bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        let format = image::guess_format(bytes).map_err(|_| ImageError::UnknownFormat)?;
        Ok(Self {
            base64: BASE64.encode(bytes),
            mime_type: format.to_mime_type(),
        })
    }

    /// Build from a base64 string. A `data:<mime>;base64,` prefix is
    /// accepted and stripped; the MIME type is re-sniffed from the decoded
    /// bytes rather than trusted from the prefix.
    pub fn from_base64(data: &str) -> Result<Self, ImageError> {
        let payload = strip_data_url_prefix(data.trim());
        let bytes = BASE64.decode(payload)?;
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        let format = image::guess_format(&bytes).map_err(|_| ImageError::UnknownFormat)?;
        Ok(Self {
            base64: payload.to_string(),
            mime_type: format.to_mime_type(),
        })
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// Render as a data URL for chat-completions style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Strip a `data:<mime>;base64,` prefix if present.
fn strip_data_url_prefix(data: &str) -> &str {
    if !data.starts_with("data:") {
        return data;
    }
    match data.find(";base64,") {
        Some(idx) => &data[idx + ";base64,".len()..],
        None => data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid headers the sniffer recognizes
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];

    #[test]
    fn test_from_bytes_sniffs_mime() {
        let png = LabelImage::from_bytes(PNG_MAGIC).unwrap();
        assert_eq!(png.mime_type(), "image/png");

        let jpeg = LabelImage::from_bytes(JPEG_MAGIC).unwrap();
        assert_eq!(jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_from_base64_strips_data_url_prefix() {
        let encoded = BASE64.encode(JPEG_MAGIC);
        let with_prefix = format!("data:image/jpeg;base64,{}", encoded);

        let img = LabelImage::from_base64(&with_prefix).unwrap();
        assert_eq!(img.base64(), encoded);
        assert_eq!(img.mime_type(), "image/jpeg");
        assert_eq!(img.data_url(), with_prefix);
    }

    #[test]
    fn test_from_base64_accepts_bare_payload() {
        let encoded = BASE64.encode(PNG_MAGIC);
        let img = LabelImage::from_base64(&encoded).unwrap();
        assert_eq!(img.mime_type(), "image/png");
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(matches!(
            LabelImage::from_base64("not//valid!!base64@@"),
            Err(ImageError::Base64(_))
        ));
    }

    #[test]
    fn test_non_image_bytes_rejected() {
        let encoded = BASE64.encode(b"just some text");
        assert!(matches!(
            LabelImage::from_base64(&encoded),
            Err(ImageError::UnknownFormat)
        ));
        assert!(matches!(
            LabelImage::from_bytes(b"just some text"),
            Err(ImageError::UnknownFormat)
        ));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(LabelImage::from_bytes(&[]), Err(ImageError::Empty)));
        assert!(matches!(
            LabelImage::from_base64(""),
            Err(ImageError::Empty)
        ));
    }
}
