//! Image uploads attached to products and the store banner.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use thiserror::Error;

/// Largest accepted image, in bytes (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// A new image supplied with a mutation.
///
/// Over JSON an image is a data URL string; the CLI reads files from disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ImageUpload {
    /// Inline `data:image/<type>;base64,<payload>` string.
    DataUrl(String),
    /// Raw file contents.
    File {
        /// Original file name; its extension names the stored asset.
        file_name: String,
        /// MIME type of the file.
        content_type: String,
        /// File contents.
        bytes: Vec<u8>,
    },
}

/// Why an image was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("image data URL is malformed")]
    MalformedDataUrl,
    #[error("image payload is not valid base64: {0}")]
    InvalidBase64(String),
    #[error("'{0}' is not an image type")]
    NotAnImage(String),
    #[error("image is empty")]
    Empty,
    #[error("image is {size} bytes, the limit is {max} bytes")]
    TooLarge {
        /// Size of the refused image.
        size: usize,
        /// Limit.
        max: usize,
    },
    #[error("cannot determine a file extension for the image")]
    MissingExtension,
}

/// A checked image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// File contents.
    pub bytes: Vec<u8>,
    /// MIME type, always `image/*`.
    pub content_type: String,
    /// Lowercase extension used in the asset name.
    pub extension: String,
}

impl ImageUpload {
    /// Decode and check the image.
    ///
    /// # Errors
    ///
    /// Returns an [`ImageError`] when the payload is malformed, not an image,
    /// empty or larger than [`MAX_IMAGE_BYTES`].
    pub fn decode(&self) -> Result<DecodedImage, ImageError> {
        let (bytes, content_type, extension) = match self {
            Self::DataUrl(data_url) => {
                let (content_type, bytes) = parse_data_url(data_url)?;
                let extension = extension_from_mime(&content_type);
                (bytes, content_type, extension)
            }
            Self::File {
                file_name,
                content_type,
                bytes,
            } => {
                let extension = file_name
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_ascii_lowercase())
                    .filter(|ext| is_clean_extension(ext))
                    .or_else(|| extension_from_mime(content_type));
                (bytes.clone(), content_type.trim().to_ascii_lowercase(), extension)
            }
        };

        if !content_type.starts_with("image/") {
            return Err(ImageError::NotAnImage(content_type));
        }
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge {
                size: bytes.len(),
                max: MAX_IMAGE_BYTES,
            });
        }

        Ok(DecodedImage {
            bytes,
            content_type,
            extension: extension.ok_or(ImageError::MissingExtension)?,
        })
    }
}

/// Split `data:<mime>;base64,<payload>` into MIME type and bytes.
fn parse_data_url(data_url: &str) -> Result<(String, Vec<u8>), ImageError> {
    let rest = data_url
        .trim()
        .strip_prefix("data:")
        .ok_or(ImageError::MalformedDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(ImageError::MalformedDataUrl)?;
    let content_type = meta
        .strip_suffix(";base64")
        .ok_or(ImageError::MalformedDataUrl)?
        .trim()
        .to_ascii_lowercase();

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ImageError::InvalidBase64(e.to_string()))?;

    Ok((content_type, bytes))
}

/// `image/svg+xml` -> `svg`, `image/png` -> `png`.
fn extension_from_mime(content_type: &str) -> Option<String> {
    let subtype = content_type.split_once('/')?.1;
    let subtype = subtype.split(['+', ';']).next()?.trim().to_ascii_lowercase();
    is_clean_extension(&subtype).then_some(subtype)
}

fn is_clean_extension(ext: &str) -> bool {
    !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric())
}
