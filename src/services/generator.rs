use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::config::GeneratorConfig;
use crate::errors::{AppError, Result};

/// One background-generation call's worth of input.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image_url: String,
    pub prompt: String,
    pub style_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVariant {
    pub url: String,
}

/// External generation capability: one call yields one background variant.
/// Implementations are selected by configuration (live API vs. demo).
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_background(&self, request: &GenerationRequest) -> Result<GeneratedVariant>;
}

/// The provider answers with whatever shape it feels like: a bare URL
/// string, an array of URLs, or an object carrying an `output` or `url`
/// field. Map them all to one internal type and reject the rest.
pub fn normalize_variant(value: &Value) -> Result<GeneratedVariant> {
    match value {
        Value::String(url) if !url.is_empty() => Ok(GeneratedVariant { url: url.clone() }),
        Value::Array(items) => items
            .iter()
            .find_map(|item| normalize_variant(item).ok())
            .ok_or_else(|| {
                AppError::Generation("Generation response array held no usable URL".to_string())
            }),
        Value::Object(map) => map
            .get("output")
            .or_else(|| map.get("url"))
            .ok_or_else(|| {
                AppError::Generation("Unrecognized generation response shape".to_string())
            })
            .and_then(normalize_variant),
        _ => Err(AppError::Generation(
            "Unrecognized generation response shape".to_string(),
        )),
    }
}

const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";

/// Live generator backed by the hosted Bria background-swap model.
pub struct BriaGenerator {
    config: GeneratorConfig,
    client: reqwest::Client,
    api_base: String,
}

impl BriaGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point the generator at a different API host (used by tests).
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ImageGenerator for BriaGenerator {
    async fn generate_background(&self, request: &GenerationRequest) -> Result<GeneratedVariant> {
        let url = format!("{}/models/{}/predictions", self.api_base, self.config.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.replicate_api_token)
            .header("Prefer", "wait")
            .json(&json!({
                "input": {
                    "fast": true,
                    "sync": true,
                    "image": request.image_url,
                    "bg_prompt": request.prompt,
                    "refine_prompt": true,
                    "enhance_ref_image": true,
                }
            }))
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Generation(format!(
                "Generation failed with status {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Unexpected generation response: {}", e)))?;

        normalize_variant(body.get("output").unwrap_or(&body))
    }
}

/// Demo-mode generator producing deterministic placeholder URLs so the full
/// workflow can run without the external capability.
pub struct PlaceholderGenerator {
    counter: AtomicUsize,
}

impl PlaceholderGenerator {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }

    fn style_color(style_id: &str) -> &'static str {
        match style_id {
            "marble-white" => "F5F5F5",
            "velvet-black" => "1C1C1C",
            "rose-gold" => "E8B4B8",
            "crystal-clear" => "E0F6FF",
            "sapphire-blue" => "4169E1",
            _ => "FFD700", // luxury-gold
        }
    }
}

impl Default for PlaceholderGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerator for PlaceholderGenerator {
    async fn generate_background(&self, request: &GenerationRequest) -> Result<GeneratedVariant> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let color = Self::style_color(&request.style_id);
        Ok(GeneratedVariant {
            url: format!(
                "https://dummyimage.com/{}x{}/{}/000000.png&text=Demo+{}",
                request.width, request.height, color, n
            ),
        })
    }
}

/// Fans out up to four concurrent generation calls bounded by the caller's
/// remaining quota, retries each call once, and collects whatever succeeded.
#[derive(Clone)]
pub struct GenerationInvoker {
    generator: Arc<dyn ImageGenerator>,
    max_per_request: usize,
    attempts_per_call: usize,
}

impl GenerationInvoker {
    pub fn new(generator: Arc<dyn ImageGenerator>, max_per_request: usize) -> Self {
        Self {
            generator,
            max_per_request: max_per_request.max(1),
            attempts_per_call: 2,
        }
    }

    /// Returns at most `clamp(remaining_quota, 1, max)` variants; callers
    /// must read the actual count, never assume the requested one. Fails
    /// only when every call exhausted its attempts.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        remaining_quota: i64,
    ) -> Result<Vec<GeneratedVariant>> {
        if remaining_quota <= 0 {
            return Err(AppError::QuotaExhausted);
        }

        let wanted = (remaining_quota as usize).clamp(1, self.max_per_request);
        tracing::info!(wanted, "invoking background generation");

        let calls = (0..wanted).map(|index| self.call_with_retry(request, index));
        let settled = futures::future::join_all(calls).await;

        let variants: Vec<GeneratedVariant> = settled.into_iter().flatten().collect();
        if variants.is_empty() {
            return Err(AppError::Generation(
                "No images were successfully generated".to_string(),
            ));
        }

        Ok(variants)
    }

    async fn call_with_retry(
        &self,
        request: &GenerationRequest,
        index: usize,
    ) -> Option<GeneratedVariant> {
        for attempt in 1..=self.attempts_per_call {
            match self.generator.generate_background(request).await {
                Ok(variant) => return Some(variant),
                Err(e) => {
                    warn!(index, attempt, "generation call failed: {}", e);
                }
            }
        }
        None
    }
}
