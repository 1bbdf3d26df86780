use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::CloudinaryConfig;
use crate::errors::{AppError, Result};
use crate::storage::{BlobStore, StoredBlob, UploadOptions};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";
const DEFAULT_DELIVERY_BASE: &str = "https://res.cloudinary.com";

pub struct CloudinaryStore {
    config: CloudinaryConfig,
    client: reqwest::Client,
    api_base: String,
    delivery_base: String,
}

#[derive(Debug, Deserialize)]
struct UploadApiResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyApiResponse {
    result: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            delivery_base: DEFAULT_DELIVERY_BASE.to_string(),
        }
    }

    /// Point the store at a different API host (used by tests).
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.api_base, self.config.cloud_name, action
        )
    }

    /// Signs the request the way the provider expects: parameters sorted by
    /// name, joined with `&`, secret appended, SHA-256 hex digest.
    fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
        let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
        sorted.sort_by_key(|(k, _)| *k);

        let to_sign: Vec<String> = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let mut hasher = Sha256::new();
        hasher.update(to_sign.join("&"));
        hasher.update(api_secret);
        format!("{:x}", hasher.finalize())
    }
}

#[async_trait]
impl BlobStore for CloudinaryStore {
    async fn upload(&self, source_url: &str, options: &UploadOptions) -> Result<StoredBlob> {
        let timestamp = Utc::now().timestamp().to_string();
        let tags = options.tags.join(",");
        let public_id = options.public_id.clone().unwrap_or_default();

        let signature = Self::sign(
            &[
                ("folder", options.folder.as_str()),
                ("public_id", public_id.as_str()),
                ("tags", tags.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.config.api_secret,
        );

        let mut form = vec![
            ("file", source_url.to_string()),
            ("folder", options.folder.clone()),
            ("tags", tags),
            ("timestamp", timestamp),
            ("api_key", self.config.api_key.clone()),
            ("signature", signature),
        ];
        if !public_id.is_empty() {
            form.push(("public_id", public_id));
        }

        let response = self
            .client
            .post(self.endpoint("upload"))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "Upload failed with status {}",
                response.status()
            )));
        }

        let body: UploadApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Unexpected upload response: {}", e)))?;

        Ok(StoredBlob {
            secure_url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<()> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = Self::sign(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );

        let form = [
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
            ("api_key", self.config.api_key.clone()),
            ("signature", signature),
        ];

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Destroy request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "Destroy failed with status {}",
                response.status()
            )));
        }

        let body: DestroyApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Unexpected destroy response: {}", e)))?;

        // The provider reports "not found" as a result string, not an HTTP
        // error; treat it as success since the blob is gone either way.
        if body.result != "ok" && body.result != "not found" {
            return Err(AppError::Storage(format!(
                "Destroy rejected: {}",
                body.result
            )));
        }

        Ok(())
    }

    fn transform_url(&self, public_id: &str, width: u32, height: u32, crop: &str) -> String {
        format!(
            "{}/{}/image/upload/c_{},w_{},h_{}/{}",
            self.delivery_base, self.config.cloud_name, crop, width, height, public_id
        )
    }
}
