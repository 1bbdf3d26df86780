use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{ProcessedImage, UsageSnapshot};
use crate::services::generator::{GenerationInvoker, GenerationRequest};
use crate::services::lifecycle::LifecycleResolver;
use crate::services::media::{MediaStore, StoreDisposition};
use crate::services::usage::QuotaLedger;
use crate::storage::BlobStore;

/// Background style presets. The prompt drives the generation call; the
/// fallback for an unknown id is the first entry.
pub struct StyleOption {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt: &'static str,
}

pub const STYLE_OPTIONS: &[StyleOption] = &[
    StyleOption {
        id: "luxury-gold",
        name: "Luxury Gold",
        prompt: "elegant gold background, luxury jewelry display, warm golden lighting, premium showcase, sophisticated ambiance",
    },
    StyleOption {
        id: "marble-white",
        name: "Marble White",
        prompt: "clean white marble surface, minimalist jewelry showcase, soft lighting, elegant presentation, pristine background",
    },
    StyleOption {
        id: "velvet-black",
        name: "Velvet Black",
        prompt: "premium black velvet background, dramatic jewelry lighting, luxury display, sophisticated dark ambiance",
    },
    StyleOption {
        id: "rose-gold",
        name: "Rose Gold",
        prompt: "warm rose gold background, elegant jewelry presentation, soft pink metallic lighting, luxury showcase",
    },
    StyleOption {
        id: "crystal-clear",
        name: "Crystal Clear",
        prompt: "transparent crystal background with subtle shine, clean jewelry display, pristine lighting, minimalist elegance",
    },
    StyleOption {
        id: "sapphire-blue",
        name: "Sapphire Blue",
        prompt: "deep blue luxury background, elegant jewelry showcase, sophisticated blue lighting, premium presentation",
    },
];

pub fn style_by_id(id: &str) -> &'static StyleOption {
    STYLE_OPTIONS
        .iter()
        .find(|s| s.id == id)
        .unwrap_or(&STYLE_OPTIONS[0])
}

/// Output formats offered by the size step.
pub struct SizeOption {
    pub id: &'static str,
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

pub const SIZE_OPTIONS: &[SizeOption] = &[
    SizeOption { id: "facebook-post", name: "Facebook Post", width: 1200, height: 630 },
    SizeOption { id: "instagram-post", name: "Instagram Post", width: 1080, height: 1080 },
    SizeOption { id: "instagram-story", name: "Instagram Story", width: 1080, height: 1920 },
    SizeOption { id: "twitter-post", name: "Twitter Post", width: 1200, height: 675 },
    SizeOption { id: "linkedin-post", name: "LinkedIn Post", width: 1200, height: 627 },
    SizeOption { id: "pinterest-pin", name: "Pinterest Pin", width: 1000, height: 1500 },
    SizeOption { id: "custom-square", name: "Custom Square", width: 2000, height: 2000 },
    SizeOption { id: "high-res", name: "High Resolution", width: 3000, height: 2000 },
];

pub fn size_by_id(id: &str) -> Option<&'static SizeOption> {
    SIZE_OPTIONS.iter().find(|s| s.id == id)
}

/// Workflow phase as reported to the UI. The server itself is stateless;
/// the tag travels in responses and the client owns step navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Ready,
    Generating,
    Results,
    UsageLimit,
    Error,
}

#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub user_id: String,
    pub source_public_id: String,
    pub style_id: String,
    pub size_id: String,
}

#[derive(Debug, Serialize)]
pub struct GeneratedImage {
    pub id: Uuid,
    pub image_url: String,
    pub style: String,
    pub size: String,
    pub prompt: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateOutcome {
    pub state: WorkflowState,
    pub images: Vec<GeneratedImage>,
    pub processed_count: usize,
    pub usage: UsageSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ResolveOutcome {
    pub state: WorkflowState,
    pub saved_count: usize,
    pub discarded_count: usize,
    pub saved_images: Vec<ProcessedImage>,
    pub usage: UsageSnapshot,
}

/// Top-level sequence tying the quota ledger, generation invoker, media
/// store, and lifecycle resolver into one user-facing operation.
#[derive(Clone)]
pub struct WorkflowOrchestrator {
    ledger: QuotaLedger,
    invoker: GenerationInvoker,
    media: MediaStore,
    resolver: LifecycleResolver,
    blobs: Arc<dyn BlobStore>,
}

impl WorkflowOrchestrator {
    pub fn new(
        ledger: QuotaLedger,
        invoker: GenerationInvoker,
        media: MediaStore,
        resolver: LifecycleResolver,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            ledger,
            invoker,
            media,
            resolver,
            blobs,
        }
    }

    /// validate inputs -> check quota -> generate -> store as temporary ->
    /// charge for what actually landed -> drop the uploaded source.
    ///
    /// Quota gates generation only; the limit never blocks earlier steps.
    pub async fn generate(&self, params: &GenerateParams) -> Result<GenerateOutcome> {
        if params.user_id.is_empty() {
            return Err(AppError::Validation("User ID is required".to_string()));
        }
        if params.source_public_id.is_empty() {
            return Err(AppError::Validation(
                "An uploaded source image is required".to_string(),
            ));
        }
        if params.style_id.is_empty() || params.size_id.is_empty() {
            return Err(AppError::Validation(
                "Missing required data for generation".to_string(),
            ));
        }

        let size = size_by_id(&params.size_id)
            .ok_or_else(|| AppError::Validation("Unknown output size".to_string()))?;
        let style = style_by_id(&params.style_id);

        let usage = self.ledger.get_usage(&params.user_id).await?;
        if usage.remaining <= 0 {
            return Err(AppError::QuotaExhausted);
        }

        // The provider pulls the source at the selected output dimensions.
        let source_url =
            self.blobs
                .transform_url(&params.source_public_id, size.width, size.height, "fill");

        let request = GenerationRequest {
            image_url: source_url,
            prompt: style.prompt.to_string(),
            style_id: style.id.to_string(),
            width: size.width,
            height: size.height,
        };

        let variants = self
            .invoker
            .generate(&request, usage.remaining as i64)
            .await?;
        let urls: Vec<String> = variants.into_iter().map(|v| v.url).collect();

        // Upstream generation URLs expire within the hour; persist first,
        // settle accounting after.
        let outcome = self
            .media
            .store(
                &urls,
                &params.user_id,
                style.name,
                size.name,
                StoreDisposition::Temporary,
            )
            .await?;

        match self
            .ledger
            .charge(&params.user_id, outcome.processed_count as i32)
            .await
        {
            Ok(new_usage) => info!(
                charged = outcome.processed_count,
                new_usage, "usage updated after generation"
            ),
            Err(e) => warn!("could not update monthly usage: {}", e),
        }

        // Best effort; a stale source upload is only a leak, not a failure.
        if let Err(e) = self.blobs.destroy(&params.source_public_id).await {
            warn!(
                public_id = %params.source_public_id,
                "could not delete original image: {}", e
            );
        }

        let images = outcome
            .stored
            .into_iter()
            .map(|row| GeneratedImage {
                id: row.id,
                image_url: row.image_url,
                style: row.style,
                size: row.size,
                prompt: style.prompt.to_string(),
                status: row.status,
            })
            .collect();

        let usage = self.ledger.get_usage(&params.user_id).await?;

        Ok(GenerateOutcome {
            state: WorkflowState::Results,
            images,
            processed_count: outcome.processed_count,
            usage,
        })
    }

    /// Keep the selected images, clean up the rest of the batch. The
    /// requested ids double as the discard exclusion list so an image whose
    /// promotion failed is not destroyed behind the user's back.
    pub async fn resolve_keep(&self, user_id: &str, image_ids: &[Uuid]) -> Result<ResolveOutcome> {
        if image_ids.is_empty() {
            return Err(AppError::Validation(
                "No images selected to save".to_string(),
            ));
        }

        let promoted = self.resolver.promote(user_id, image_ids).await?;
        let discarded_count = self.resolver.discard_remaining(user_id, image_ids).await?;
        let usage = self.ledger.get_usage(user_id).await?;

        Ok(ResolveOutcome {
            state: WorkflowState::Ready,
            saved_count: promoted.saved_count,
            discarded_count,
            saved_images: promoted.saved_images,
            usage,
        })
    }

    /// Discard the whole pending batch.
    pub async fn resolve_discard_all(&self, user_id: &str) -> Result<ResolveOutcome> {
        let discarded_count = self.resolver.discard_remaining(user_id, &[]).await?;
        let usage = self.ledger.get_usage(user_id).await?;

        Ok(ResolveOutcome {
            state: WorkflowState::Ready,
            saved_count: 0,
            discarded_count,
            saved_images: Vec::new(),
            usage,
        })
    }
}
