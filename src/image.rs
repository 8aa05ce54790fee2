//! Image data URL validation
//!
//! An image enters the system only as a data URL of the form
//! `data:image/<subtype>;base64,<payload>`. Values failing the shape check
//! are rejected, never coerced.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Whole-string data URL shape: alphabetic image subtype, non-empty base64 payload
static DATA_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:image/[a-zA-Z]+;base64,[A-Za-z0-9+/=]+$").unwrap()
});

/// Check whether a string is an acceptable image data URL
pub fn is_valid_image(s: &str) -> bool {
    DATA_URL_REGEX.is_match(s)
}

/// A string known to satisfy the image data URL shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageDataUrl(String);

impl ImageDataUrl {
    /// Validate and wrap a data URL
    pub fn parse(s: impl Into<String>) -> Option<Self> {
        let s = s.into();
        if is_valid_image(&s) {
            Some(Self(s))
        } else {
            None
        }
    }

    /// Wrap a bare base64 payload as a PNG data URL
    pub fn from_png_base64(payload: &str) -> Option<Self> {
        Self::parse(format!("data:image/png;base64,{}", payload))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ImageDataUrl {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if is_valid_image(&s) {
            Ok(Self(s))
        } else {
            Err("value is not an image data URL".to_string())
        }
    }
}

impl From<ImageDataUrl> for String {
    fn from(url: ImageDataUrl) -> Self {
        url.0
    }
}

impl AsRef<str> for ImageDataUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageDataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An extracted image: either an embedded data URL or an opaque URL
///
/// URL references come from image-API responses and are passed through
/// verbatim; they are not re-validated as data URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ImageRef {
    Data(ImageDataUrl),
    Url(String),
}

impl ImageRef {
    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::Data(d) => d.as_str(),
            ImageRef::Url(u) => u,
        }
    }
}
