//! Image generation pipeline
//!
//! Validate the request, build the multimodal message, make exactly one
//! upstream call, then extract the image. Stateless across calls.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::GatewayError;
use crate::image::{is_valid_image, ImageDataUrl, ImageRef};
use crate::upstream::{build_messages, extract_image, ChatRequest, UpstreamClient};

/// A validated generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    prompt: String,
    reference_images: Vec<ImageDataUrl>,
}

impl GenerationRequest {
    /// Validate a raw prompt and images against the configured bounds.
    ///
    /// The prompt is trimmed first; its length is counted in characters.
    pub fn new<S: AsRef<str>>(
        prompt: &str,
        images: &[S],
        max_prompt_chars: usize,
        max_images: usize,
    ) -> Result<Self, GatewayError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GatewayError::validation("prompt must not be empty"));
        }
        if prompt.chars().count() > max_prompt_chars {
            return Err(GatewayError::validation(format!(
                "prompt is too long, limit is {} characters",
                max_prompt_chars
            )));
        }
        if images.len() > max_images {
            return Err(GatewayError::validation(format!(
                "at most {} images may be uploaded",
                max_images
            )));
        }

        let mut reference_images = Vec::with_capacity(images.len());
        for (i, img) in images.iter().enumerate() {
            let img = img.as_ref();
            if !is_valid_image(img) {
                return Err(GatewayError::validation(format!(
                    "image {} is not a valid data URL",
                    i + 1
                )));
            }
            reference_images.extend(ImageDataUrl::parse(img));
        }

        Ok(Self {
            prompt: prompt.to_string(),
            reference_images,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn reference_images(&self) -> &[ImageDataUrl] {
        &self.reference_images
    }
}

/// Successful generation
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub image: ImageRef,
    pub prompt: String,
    pub input_images: Vec<ImageDataUrl>,
}

/// Composes message building, the upstream call and extraction
pub struct Generator {
    upstream: Arc<dyn UpstreamClient>,
    model_name: String,
    max_images: usize,
    max_prompt_chars: usize,
    diagnostic_limit: usize,
}

impl Generator {
    pub fn new(upstream: Arc<dyn UpstreamClient>, config: &Config) -> Self {
        Self {
            upstream,
            model_name: config.model_name.clone(),
            max_images: config.max_images,
            max_prompt_chars: config.max_prompt_chars,
            diagnostic_limit: config.diagnostic_body_limit,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Generate one image from a prompt and optional reference images
    pub async fn generate<S: AsRef<str>>(
        &self,
        prompt: &str,
        images: &[S],
    ) -> Result<GenerationOutput, GatewayError> {
        let request =
            GenerationRequest::new(prompt, images, self.max_prompt_chars, self.max_images)?;

        info!(
            "Generating with model {}: prompt '{}', {} reference images",
            self.model_name,
            prompt_preview(request.prompt()),
            request.reference_images().len()
        );

        let chat = ChatRequest {
            model: self.model_name.clone(),
            messages: build_messages(request.prompt(), request.reference_images()),
        };

        let body = self.upstream.complete(&chat).await.inspect_err(|e| {
            warn!("Upstream call failed: {}", e);
        })?;

        let image = match extract_image(&body, self.diagnostic_limit) {
            Ok(image) => image,
            Err(GatewayError::Extraction { body }) => {
                warn!("No image in upstream response: {}", body);
                return Err(GatewayError::Extraction { body });
            }
            Err(e) => {
                warn!("Upstream reported an error: {}", e);
                return Err(e);
            }
        };

        debug!("Extracted image ({} bytes)", image.as_str().len());
        info!("Image generated for prompt '{}'", prompt_preview(request.prompt()));

        let GenerationRequest {
            prompt,
            reference_images,
        } = request;

        Ok(GenerationOutput {
            image,
            prompt,
            input_images: reference_images,
        })
    }
}

/// First 100 characters of a prompt, for logs
fn prompt_preview(prompt: &str) -> String {
    let mut preview: String = prompt.chars().take(100).collect();
    if preview.len() < prompt.len() {
        preview.push('…');
    }
    preview
}
