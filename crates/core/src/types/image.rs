//! Locally selected photos for the try-on flow.

use core::fmt;

/// Largest photo a user may pick for a try-on (5 MiB).
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Reasons a picked file is refused before any network call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhotoRejected {
    /// The file is larger than [`MAX_PHOTO_BYTES`].
    #[error("File size must be less than 5MB")]
    TooLarge {
        /// Size of the rejected file in bytes.
        size: usize,
    },
    /// The MIME type does not start with `image/`.
    #[error("Please choose an image file (got {mime_type})")]
    NotAnImage {
        /// MIME type of the rejected file.
        mime_type: String,
    },
    /// The file has no content.
    #[error("The selected file is empty")]
    Empty,
}

/// A photo picked from the local device, validated for size and type.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalImage {
    file_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl LocalImage {
    /// Validate a picked file.
    ///
    /// # Errors
    ///
    /// Returns [`PhotoRejected`] if the file is empty, larger than
    /// [`MAX_PHOTO_BYTES`], or its MIME type is not `image/*`.
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, PhotoRejected> {
        let mime_type = mime_type.into();

        if !mime_type.to_ascii_lowercase().starts_with("image/") {
            return Err(PhotoRejected::NotAnImage { mime_type });
        }
        if bytes.is_empty() {
            return Err(PhotoRejected::Empty);
        }
        if bytes.len() > MAX_PHOTO_BYTES {
            return Err(PhotoRejected::TooLarge { size: bytes.len() });
        }

        Ok(Self {
            file_name: file_name.into(),
            mime_type,
            bytes,
        })
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// File extension to use when storing the photo, derived from the MIME subtype.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }
}

/// File extension for an image MIME type; `img` for anything unrecognised.
#[must_use]
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let subtype = mime_type
        .split_once('/')
        .map(|(_, sub)| sub.split(';').next().unwrap_or(sub).trim().to_ascii_lowercase());

    match subtype.as_deref() {
        Some("jpeg" | "jpg" | "pjpeg") => "jpg",
        Some("png") => "png",
        Some("webp") => "webp",
        Some("gif") => "gif",
        Some("avif") => "avif",
        Some("bmp") => "bmp",
        Some("tiff") => "tiff",
        Some("svg+xml") => "svg",
        Some("x-icon" | "vnd.microsoft.icon") => "ico",
        _ => "img",
    }
}

impl fmt::Debug for LocalImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalImage")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}
