#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use jewelryai_server::config::{CloudinaryConfig, Config, GeneratorConfig, GeneratorMode};
use jewelryai_server::create_app;
use jewelryai_server::database::{Database, ImageStore, UserStore};
use jewelryai_server::errors::{AppError, Result};
use jewelryai_server::handlers::AppState;
use jewelryai_server::models::{NewProcessedImage, ProcessedImage, User, UserProfile};
use jewelryai_server::services::generator::{
    GeneratedVariant, GenerationInvoker, GenerationRequest, ImageGenerator,
};
use jewelryai_server::services::lifecycle::LifecycleResolver;
use jewelryai_server::services::media::MediaStore;
use jewelryai_server::services::usage::{PlanLimits, QuotaLedger};
use jewelryai_server::services::workflow::WorkflowOrchestrator;
use jewelryai_server::storage::{BlobStore, StoredBlob, UploadOptions};

pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn seed_user(&self, id: &str, plan: &str, monthly_usage: i32, last_reset: DateTime<Utc>) {
        let now = Utc::now();
        self.users.lock().unwrap().insert(
            id.to_string(),
            User {
                id: id.to_string(),
                email: format!("{}@example.com", id),
                name: id.to_string(),
                avatar_url: None,
                plan: plan.to_string(),
                monthly_usage,
                last_usage_reset: last_reset,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }

    async fn reset_usage_if_stale(
        &self,
        user_id: &str,
        month_start: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        Ok(users.get_mut(user_id).map(|user| {
            if user.last_usage_reset < month_start {
                user.monthly_usage = 0;
                user.last_usage_reset = month_start;
            }
            user.clone()
        }))
    }

    async fn charge_usage(
        &self,
        user_id: &str,
        count: i32,
        month_start: DateTime<Utc>,
    ) -> Result<Option<i32>> {
        let mut users = self.users.lock().unwrap();
        Ok(users.get_mut(user_id).map(|user| {
            if user.last_usage_reset < month_start {
                user.monthly_usage = count;
                user.last_usage_reset = month_start;
            } else {
                user.monthly_usage += count;
            }
            user.monthly_usage
        }))
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&profile.id) {
            Some(user) => {
                user.email = profile.email.clone();
                user.name = profile.name.clone();
                user.avatar_url = profile.avatar_url.clone();
                user.updated_at = Utc::now();
            }
            None => {
                let now = Utc::now();
                users.insert(
                    profile.id.clone(),
                    User {
                        id: profile.id.clone(),
                        email: profile.email.clone(),
                        name: profile.name.clone(),
                        avatar_url: profile.avatar_url.clone(),
                        plan: "free".to_string(),
                        monthly_usage: 0,
                        last_usage_reset: now,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        Ok(self.users.lock().unwrap().remove(user_id).is_some())
    }
}

pub struct MemoryImageStore {
    rows: Mutex<HashMap<Uuid, ProcessedImage>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }

    pub fn row(&self, id: Uuid) -> Option<ProcessedImage> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<ProcessedImage> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn temporary_for(&self, user_id: &str) -> Vec<ProcessedImage> {
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id && r.status == "temporary")
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn insert(&self, image: &NewProcessedImage) -> Result<ProcessedImage> {
        let row = ProcessedImage {
            id: Uuid::new_v4(),
            user_id: image.user_id.clone(),
            image_url: image.image_url.clone(),
            public_id: image.public_id.clone(),
            style: image.style.clone(),
            size: image.size.clone(),
            status: image.status.clone(),
            expires_at: image.expires_at,
            saved_at: image.saved_at,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_temporary_owned(
        &self,
        user_id: &str,
        ids: &[Uuid],
    ) -> Result<Vec<ProcessedImage>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id && r.status == "temporary" && ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn find_temporary_excluding(
        &self,
        user_id: &str,
        exclude_ids: &[Uuid],
    ) -> Result<Vec<ProcessedImage>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.user_id == user_id && r.status == "temporary" && !exclude_ids.contains(&r.id)
            })
            .cloned()
            .collect())
    }

    async fn find_saved_owned(&self, user_id: &str, ids: &[Uuid]) -> Result<Vec<ProcessedImage>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id && r.status == "saved" && ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn mark_saved(
        &self,
        id: Uuid,
        image_url: &str,
        public_id: &str,
        saved_at: DateTime<Utc>,
    ) -> Result<Option<ProcessedImage>> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.get_mut(&id).filter(|r| r.status == "temporary").map(|row| {
            row.status = "saved".to_string();
            row.image_url = image_url.to_string();
            row.public_id = public_id.to_string();
            row.expires_at = None;
            row.saved_at = Some(saved_at);
            row.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }

    async fn list_saved(&self, user_id: &str) -> Result<Vec<ProcessedImage>> {
        let mut rows: Vec<ProcessedImage> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id && r.status == "saved")
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_expired(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ProcessedImage>> {
        let mut rows: Vec<ProcessedImage> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.status == "temporary" && r.expires_at.map(|e| e < now).unwrap_or(false)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.expires_at);
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

/// Blob store tracking live public ids; uploads of flagged source URLs and
/// destroys of flagged public ids fail on purpose.
pub struct MemoryBlobStore {
    live: Mutex<HashSet<String>>,
    destroyed: Mutex<Vec<String>>,
    fail_upload_sources: Mutex<HashSet<String>>,
    fail_destroy_ids: Mutex<HashSet<String>>,
    counter: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            live: Mutex::new(HashSet::new()),
            destroyed: Mutex::new(Vec::new()),
            fail_upload_sources: Mutex::new(HashSet::new()),
            fail_destroy_ids: Mutex::new(HashSet::new()),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn fail_uploads_from(&self, source_url: &str) {
        self.fail_upload_sources
            .lock()
            .unwrap()
            .insert(source_url.to_string());
    }

    pub fn fail_destroy_of(&self, public_id: &str) {
        self.fail_destroy_ids
            .lock()
            .unwrap()
            .insert(public_id.to_string());
    }

    pub fn is_live(&self, public_id: &str) -> bool {
        self.live.lock().unwrap().contains(public_id)
    }

    pub fn destroyed_ids(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, source_url: &str, options: &UploadOptions) -> Result<StoredBlob> {
        if self.fail_upload_sources.lock().unwrap().contains(source_url) {
            return Err(AppError::Storage("upload rejected".to_string()));
        }

        let name = options
            .public_id
            .clone()
            .unwrap_or_else(|| format!("blob_{}", self.counter.fetch_add(1, Ordering::SeqCst)));
        let public_id = format!("{}/{}", options.folder, name);
        self.live.lock().unwrap().insert(public_id.clone());

        Ok(StoredBlob {
            secure_url: format!("https://cdn.test/{}.png", public_id),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<()> {
        if self.fail_destroy_ids.lock().unwrap().contains(public_id) {
            return Err(AppError::Storage("destroy rejected".to_string()));
        }
        self.live.lock().unwrap().remove(public_id);
        self.destroyed.lock().unwrap().push(public_id.to_string());
        Ok(())
    }

    fn transform_url(&self, public_id: &str, width: u32, height: u32, crop: &str) -> String {
        format!(
            "https://cdn.test/c_{},w_{},h_{}/{}",
            crop, width, height, public_id
        )
    }
}

/// Generator yielding sequential URLs, with an optional hard-failure switch.
pub struct SequenceGenerator {
    calls: AtomicUsize,
    failing: bool,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for SequenceGenerator {
    async fn generate_background(&self, _request: &GenerationRequest) -> Result<GeneratedVariant> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(AppError::Generation("generator down".to_string()));
        }
        Ok(GeneratedVariant {
            url: format!("https://generated.test/variant-{}.png", n),
        })
    }
}

pub const TEMP_TTL_SECS: i64 = 7200;

/// Everything wired together against the in-memory fakes.
pub struct Harness {
    pub users: Arc<MemoryUserStore>,
    pub images: Arc<MemoryImageStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub generator: Arc<SequenceGenerator>,
    pub ledger: QuotaLedger,
    pub media: MediaStore,
    pub resolver: LifecycleResolver,
    pub workflow: WorkflowOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_generator(Arc::new(SequenceGenerator::new()))
    }

    pub fn with_generator(generator: Arc<SequenceGenerator>) -> Self {
        let users = Arc::new(MemoryUserStore::new());
        let images = Arc::new(MemoryImageStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());

        let ledger = QuotaLedger::new(
            users.clone() as Arc<dyn UserStore>,
            PlanLimits { free: 12, pro: 60 },
        );
        let invoker =
            GenerationInvoker::new(generator.clone() as Arc<dyn ImageGenerator>, 4);
        let media = MediaStore::new(
            blobs.clone() as Arc<dyn BlobStore>,
            images.clone() as Arc<dyn ImageStore>,
            ledger.clone(),
            TEMP_TTL_SECS,
        );
        let resolver = LifecycleResolver::new(
            blobs.clone() as Arc<dyn BlobStore>,
            images.clone() as Arc<dyn ImageStore>,
        );
        let workflow = WorkflowOrchestrator::new(
            ledger.clone(),
            invoker,
            media.clone(),
            resolver.clone(),
            blobs.clone() as Arc<dyn BlobStore>,
        );

        Self {
            users,
            images,
            blobs,
            generator,
            ledger,
            media,
            resolver,
            workflow,
        }
    }

    /// Router over this harness's fakes. The pool is lazy; nothing dials
    /// the database unless a route actually queries it.
    pub fn app(&self) -> axum::Router {
        let config = Config {
            database_url: "postgresql://localhost/unreachable".to_string(),
            port: 0,
            cloudinary: CloudinaryConfig {
                cloud_name: "demo".to_string(),
                api_key: String::new(),
                api_secret: String::new(),
            },
            generator: GeneratorConfig {
                mode: GeneratorMode::Demo,
                replicate_api_token: String::new(),
                model: "bria/generate-background".to_string(),
            },
            free_plan_limit: 12,
            pro_plan_limit: 60,
            max_images_per_request: 4,
            temp_image_ttl_secs: TEMP_TTL_SECS,
            sweep_interval_secs: 900,
        };
        let database = Database::connect_lazy(&config.database_url).unwrap();

        create_app(AppState {
            database,
            config,
            users: self.users.clone() as Arc<dyn UserStore>,
            images: self.images.clone() as Arc<dyn ImageStore>,
            blobs: self.blobs.clone() as Arc<dyn BlobStore>,
            ledger: self.ledger.clone(),
            workflow: self.workflow.clone(),
            resolver: self.resolver.clone(),
        })
    }

    /// Seeds a user plus an uploaded source blob, returning its public id.
    pub async fn seed_user_with_upload(&self, user_id: &str, plan: &str, usage: i32) -> String {
        self.users
            .seed_user(user_id, plan, usage, Utc::now() - Duration::minutes(1));
        let blob = self
            .blobs
            .upload(
                "https://customer.test/ring.jpg",
                &UploadOptions {
                    folder: "jewelry-uploads".to_string(),
                    tags: vec!["jewelry".to_string(), "original".to_string()],
                    public_id: Some(format!("upload_{}", user_id)),
                },
            )
            .await
            .unwrap();
        blob.public_id
    }
}
