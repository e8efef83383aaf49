use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppError;

/// Hard cap on uploaded image size, enforced at the API boundary before
/// bytes reach the hosting collaborator.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct StoredImage {
    #[serde(rename = "secure_url")]
    pub url: String,
    #[serde(rename = "public_id")]
    pub id: String,
}

/// Binary-store collaborator: accept bytes, return a public URL and an
/// opaque asset ID.
#[async_trait]
pub trait BinaryStore: Send + Sync {
    async fn store(&self, bytes: Vec<u8>, folder: &str) -> Result<StoredImage, AppError>;
}

pub struct HttpBinaryStore {
    client: reqwest::Client,
    endpoint: String,
    preset: String,
}

impl HttpBinaryStore {
    pub fn new(endpoint: String, preset: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        Self {
            client,
            endpoint,
            preset,
        }
    }
}

#[async_trait]
impl BinaryStore for HttpBinaryStore {
    async fn store(&self, bytes: Vec<u8>, folder: &str) -> Result<StoredImage, AppError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name("upload");

        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.preset.clone())
            .text("folder", folder.to_string())
            .part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Dispatch(format!("image host unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Dispatch(format!(
                "image host returned {}",
                response.status()
            )));
        }

        response
            .json::<StoredImage>()
            .await
            .map_err(|e| AppError::Dispatch(format!("image host response unreadable: {e}")))
    }
}
