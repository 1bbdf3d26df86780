use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use jewelryai_server::{
    config::{Config, GeneratorMode},
    create_app,
    database::{
        queries::{PgImageStore, PgUserStore},
        Database, ImageStore, UserStore,
    },
    handlers::AppState,
    services::{
        generator::{BriaGenerator, GenerationInvoker, ImageGenerator, PlaceholderGenerator},
        lifecycle::LifecycleResolver,
        media::MediaStore,
        sweeper::ExpirySweeper,
        usage::{PlanLimits, QuotaLedger},
        workflow::WorkflowOrchestrator,
    },
    storage::{create_blob_store, BlobStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let database = Database::new(&config.database_url).await?;
    database.migrate().await?;
    tracing::info!("database connected and migrated");

    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(database.pool().clone()));
    let images: Arc<dyn ImageStore> = Arc::new(PgImageStore::new(database.pool().clone()));
    let blobs: Arc<dyn BlobStore> = Arc::from(create_blob_store(&config.cloudinary));

    let ledger = QuotaLedger::new(
        users.clone(),
        PlanLimits {
            free: config.free_plan_limit,
            pro: config.pro_plan_limit,
        },
    );

    let generator: Arc<dyn ImageGenerator> = match config.generator.mode {
        GeneratorMode::Live => Arc::new(BriaGenerator::new(config.generator.clone())),
        GeneratorMode::Demo => {
            tracing::warn!("demo mode: serving placeholder generations");
            Arc::new(PlaceholderGenerator::new())
        }
    };
    let invoker = GenerationInvoker::new(generator, config.max_images_per_request);

    let media = MediaStore::new(
        blobs.clone(),
        images.clone(),
        ledger.clone(),
        config.temp_image_ttl_secs,
    );
    let resolver = LifecycleResolver::new(blobs.clone(), images.clone());
    let workflow = WorkflowOrchestrator::new(
        ledger.clone(),
        invoker,
        media,
        resolver.clone(),
        blobs.clone(),
    );

    let sweeper = ExpirySweeper::new(
        images.clone(),
        blobs.clone(),
        Duration::from_secs(config.sweep_interval_secs),
    );
    tokio::spawn(sweeper.run());

    let port = config.port;
    let state = AppState {
        database,
        config,
        users,
        images,
        blobs,
        ledger,
        workflow,
        resolver,
    };

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
