use async_trait::async_trait;

use crate::config::CloudinaryConfig;
use crate::errors::Result;

pub mod cloudinary;

pub const UPLOADS_FOLDER: &str = "jewelry-uploads";
pub const TEMP_FOLDER: &str = "jewelry-temp";
pub const PROCESSED_FOLDER: &str = "jewelry-processed";

/// A blob persisted in the CDN-backed store.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub secure_url: String,
    pub public_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub folder: String,
    pub tags: Vec<String>,
    pub public_id: Option<String>,
}

/// Seam over the blob/CDN provider. `transform_url` is pure URL templating;
/// only `upload` and `destroy` touch the network.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch-and-store: the provider pulls `source_url` itself.
    async fn upload(&self, source_url: &str, options: &UploadOptions) -> Result<StoredBlob>;

    async fn destroy(&self, public_id: &str) -> Result<()>;

    fn transform_url(&self, public_id: &str, width: u32, height: u32, crop: &str) -> String;
}

pub fn create_blob_store(config: &CloudinaryConfig) -> Box<dyn BlobStore> {
    Box::new(cloudinary::CloudinaryStore::new(config.clone()))
}
