//! Multimodal chat message construction

use serde::{Deserialize, Serialize};

use crate::image::is_valid_image;

/// Chat message sent upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

/// Message content: plain text, or an ordered list of parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of a multimodal message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ChatMessage {
    pub fn user(content: MessageContent) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

/// Build the upstream message list for a prompt and reference images.
///
/// Without images the single user message carries the bare prompt. With
/// images, every valid image becomes an `image_url` part in input order,
/// followed by one `text` part. Images failing the data URL shape are
/// dropped.
pub fn build_messages<S: AsRef<str>>(prompt: &str, images: &[S]) -> Vec<ChatMessage> {
    if images.is_empty() {
        return vec![ChatMessage::user(MessageContent::Text(prompt.to_string()))];
    }

    let mut parts: Vec<ContentPart> = images
        .iter()
        .map(|img| img.as_ref())
        .filter(|img| is_valid_image(img))
        .map(|img| ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: img.to_string(),
            },
        })
        .collect();

    parts.push(ContentPart::Text {
        text: prompt.to_string(),
    });

    vec![ChatMessage::user(MessageContent::Parts(parts))]
}
