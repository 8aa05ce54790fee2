//! Image extraction from upstream responses
//!
//! Backends answer in several shapes. The body is first classified into
//! [`UpstreamShape`]s, then each recognized shape is tried in priority
//! order:
//!
//! 1. Top-level `error` member: fail with the upstream's detail
//! 2. Chat completion (`choices[].message.content` strings): Markdown image
//!    first, then a bare data URL anywhere in the text
//! 3. Image API (`data[]`): inline `b64_json` wrapped as PNG, else `url`
//!
//! Anything else is an extraction miss carrying the capped body for logs.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::GatewayError;
use crate::image::{is_valid_image, ImageDataUrl, ImageRef};

/// `![alt](data:image/...;base64,...)`
static MARKDOWN_IMAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[.*?\]\((data:image/[a-zA-Z]+;base64,[A-Za-z0-9+/=]+)\)").unwrap()
});

/// Bare data URL anywhere in text
static INLINE_DATA_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"data:image/[a-zA-Z]+;base64,[A-Za-z0-9+/=]+").unwrap());

/// A recognized response shape, borrowed from the response body
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamShape<'a> {
    /// Explicit error payload with its detail
    Error(String),
    /// Message contents of every choice carrying string content
    ChatCompletion(Vec<&'a str>),
    /// Entries of the `data` list
    ImageData(&'a [Value]),
    /// Nothing recognizable
    Unknown,
}

impl<'a> UpstreamShape<'a> {
    /// Classify a response body into its shapes, highest priority first.
    ///
    /// An error payload is exclusive: when present it is the only shape
    /// returned. Otherwise chat and image-data shapes may both be present.
    pub fn detect(body: &'a Value) -> Vec<UpstreamShape<'a>> {
        if let Some(err) = body.get("error").filter(|e| signals_error(e)) {
            return vec![UpstreamShape::Error(error_detail(err))];
        }

        let mut shapes = Vec::new();

        if let Some(choices) = body.get("choices").and_then(Value::as_array) {
            let contents: Vec<&str> = choices
                .iter()
                .filter_map(|c| c.get("message")?.get("content")?.as_str())
                .collect();
            if !contents.is_empty() {
                shapes.push(UpstreamShape::ChatCompletion(contents));
            }
        }

        if let Some(data) = body.get("data").and_then(Value::as_array) {
            if !data.is_empty() {
                shapes.push(UpstreamShape::ImageData(data.as_slice()));
            }
        }

        if shapes.is_empty() {
            shapes.push(UpstreamShape::Unknown);
        }
        shapes
    }
}

/// Placeholder `error` members (`null`, `false`, `""`, `{}`, `[]`) mean no error
fn signals_error(err: &Value) -> bool {
    match err {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

fn error_detail(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        Value::Object(obj) => match obj.get("message").and_then(Value::as_str) {
            Some(msg) => msg.to_string(),
            None => err.to_string(),
        },
        other => other.to_string(),
    }
}

/// Find an embedded image in chat message text
pub fn find_embedded_image(content: &str) -> Option<ImageDataUrl> {
    let candidate = MARKDOWN_IMAGE_REGEX
        .captures(content)
        .and_then(|caps| caps.get(1))
        .or_else(|| INLINE_DATA_URL_REGEX.find(content))?
        .as_str();

    // A matched candidate must still pass the standalone shape check
    if is_valid_image(candidate) {
        ImageDataUrl::parse(candidate)
    } else {
        None
    }
}

fn image_from_data_entries(entries: &[Value]) -> Option<ImageRef> {
    let inline = entries
        .iter()
        .filter_map(|e| e.get("b64_json").and_then(Value::as_str))
        .filter(|b64| !b64.is_empty())
        .find_map(ImageDataUrl::from_png_base64);
    if let Some(url) = inline {
        return Some(ImageRef::Data(url));
    }

    entries
        .iter()
        .filter_map(|e| e.get("url").and_then(Value::as_str))
        .find(|url| !url.is_empty())
        .map(|url| ImageRef::Url(url.to_string()))
}

/// Recover a single image from an upstream response body.
///
/// `diagnostic_limit` caps the size of the body kept on an extraction miss.
pub fn extract_image(body: &Value, diagnostic_limit: usize) -> Result<ImageRef, GatewayError> {
    for shape in UpstreamShape::detect(body) {
        match shape {
            UpstreamShape::Error(detail) => return Err(GatewayError::Upstream(detail)),
            UpstreamShape::ChatCompletion(contents) => {
                if let Some(url) = contents.iter().find_map(|c| find_embedded_image(c)) {
                    return Ok(ImageRef::Data(url));
                }
            }
            UpstreamShape::ImageData(entries) => {
                if let Some(image) = image_from_data_entries(entries) {
                    return Ok(image);
                }
            }
            UpstreamShape::Unknown => {}
        }
    }

    Err(GatewayError::Extraction {
        body: cap_for_log(&body.to_string(), diagnostic_limit),
    })
}

/// Truncate text for logging at a char boundary, noting what was dropped
pub fn cap_for_log(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(truncated {} bytes)", &text[..end], text.len() - end)
}
