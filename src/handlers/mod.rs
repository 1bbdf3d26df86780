use std::sync::Arc;

use crate::config::Config;
use crate::database::{Database, ImageStore, UserStore};
use crate::services::lifecycle::LifecycleResolver;
use crate::services::usage::QuotaLedger;
use crate::services::workflow::WorkflowOrchestrator;
use crate::storage::BlobStore;

pub mod gallery;
pub mod health;
pub mod usage;
pub mod webhooks;
pub mod workflow;

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub images: Arc<dyn ImageStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub ledger: QuotaLedger,
    pub workflow: WorkflowOrchestrator,
    pub resolver: LifecycleResolver,
}
