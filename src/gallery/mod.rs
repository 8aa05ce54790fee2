//! Shared public gallery
//!
//! Provides:
//! - Durable, bounded storage of published images (most recent first)
//! - Publishing with per-entry delete tokens shown once to the publisher
//! - Token-free listing for everyone else

mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::generate_token;
use crate::config::Config;
use crate::error::GatewayError;
use crate::image::ImageDataUrl;

pub use store::{GalleryStore, RemoveOutcome};

/// A stored gallery entry, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryEntry {
    pub id: String,
    pub prompt: String,
    pub image: ImageDataUrl,
    #[serde(default)]
    pub reference_images: Vec<ImageDataUrl>,
    pub created_at: DateTime<Utc>,
    pub delete_token: String,
}

/// A gallery entry as shown to readers; carries no delete token
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicEntry {
    pub id: String,
    pub prompt: String,
    pub image: ImageDataUrl,
    pub reference_images: Vec<ImageDataUrl>,
    pub created_at: DateTime<Utc>,
}

impl From<GalleryEntry> for PublicEntry {
    fn from(entry: GalleryEntry) -> Self {
        Self {
            id: entry.id,
            prompt: entry.prompt,
            image: entry.image,
            reference_images: entry.reference_images,
            created_at: entry.created_at,
        }
    }
}

/// Result of a publish: the public entry plus its one-time delete token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedEntry {
    pub item: PublicEntry,
    pub delete_token: String,
}

/// Gallery rules on top of [`GalleryStore`]
#[derive(Debug)]
pub struct GalleryService {
    store: GalleryStore,
    max_images: usize,
    max_prompt_chars: usize,
}

impl GalleryService {
    pub fn new(store: GalleryStore, max_images: usize, max_prompt_chars: usize) -> Self {
        Self {
            store,
            max_images,
            max_prompt_chars,
        }
    }

    /// Open the configured gallery document
    pub async fn open(config: &Config) -> Result<Self, GatewayError> {
        let store = GalleryStore::open(&config.gallery_path, config.gallery_max_items).await?;
        info!(
            "Gallery ready at {} (up to {} items)",
            store.path().display(),
            config.gallery_max_items
        );
        Ok(Self::new(store, config.max_images, config.max_prompt_chars))
    }

    /// Publish an image.
    ///
    /// The prompt must be non-blank and the image a valid data URL.
    /// Reference images failing the shape check are dropped, the rest are
    /// capped at the configured maximum.
    pub async fn publish<S: AsRef<str>>(
        &self,
        prompt: &str,
        image: &str,
        reference_images: &[S],
    ) -> Result<PublishedEntry, GatewayError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GatewayError::validation("prompt must not be empty"));
        }
        if prompt.chars().count() > self.max_prompt_chars {
            return Err(GatewayError::validation(format!(
                "prompt exceeds {} characters",
                self.max_prompt_chars
            )));
        }

        let image = ImageDataUrl::parse(image)
            .ok_or_else(|| GatewayError::validation("image is not a valid data URL"))?;

        let reference_images: Vec<ImageDataUrl> = reference_images
            .iter()
            .filter_map(|img| ImageDataUrl::parse(img.as_ref()))
            .take(self.max_images)
            .collect();

        let entry = GalleryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            prompt: prompt.to_string(),
            image,
            reference_images,
            created_at: Utc::now(),
            delete_token: generate_token(),
        };

        let delete_token = entry.delete_token.clone();
        self.store.insert(entry.clone()).await?;

        info!(
            "Published gallery entry {} ({} reference images)",
            entry.id,
            entry.reference_images.len()
        );

        Ok(PublishedEntry {
            item: entry.into(),
            delete_token,
        })
    }

    /// List all entries, most recent first, without delete tokens
    pub async fn list_public(&self) -> Vec<PublicEntry> {
        self.store
            .read_all()
            .await
            .into_iter()
            .map(PublicEntry::from)
            .collect()
    }

    /// Delete an entry owned by the holder of `token`
    pub async fn delete(&self, id: &str, token: &str) -> Result<RemoveOutcome, GatewayError> {
        self.store.remove_by_id(id, token).await
    }
}
