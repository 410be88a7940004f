use std::sync::Arc;

#[cfg(feature = "utoipa")]
use axum::Json;
use axum::{Router, routing::get};
use clap::Parser;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
#[cfg(feature = "utoipa")]
use utoipa_scalar::{Scalar, Servable};

mod clock;
mod config;
mod db;
mod middleware;
mod models;
mod observability;
#[cfg(feature = "utoipa")]
mod openapi;
mod retention;
mod routes;
mod services;
mod validation;

#[cfg(test)]
mod tests;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub services: services::Services,
    pub clock: Arc<dyn clock::Clock>,
    /// Tracks background tasks so shutdown can wait for them.
    pub task_tracker: TaskTracker,
}

impl AppState {
    /// Connect to the configured database and build the services.
    ///
    /// Runs migrations first when the database config asks for it.
    pub async fn new(config: &config::AppConfig) -> db::DbResult<Self> {
        let db = db::DbPool::from_config(&config.database).await?;
        if config.database.run_migrations() {
            db.run_migrations().await?;
        }

        Ok(Self::from_parts(Arc::new(db), Arc::new(clock::SystemClock)))
    }

    pub fn from_parts(db: Arc<db::DbPool>, clock: Arc<dyn clock::Clock>) -> Self {
        Self {
            services: services::Services::new(db.clone(), clock.clone()),
            db,
            clock,
            task_tracker: TaskTracker::new(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Patient records service", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "patients.toml")]
    config: String,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the HTTP server and the purge scheduler (default)
    Serve,
    /// Run the retention purge once and exit
    Purge,
    /// Run database migrations and exit
    ///
    /// Useful for init containers or CI/CD pipelines.
    Migrate,
    /// Export the OpenAPI specification (JSON format)
    #[cfg(feature = "utoipa")]
    Openapi {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

pub fn build_app(config: &config::AppConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .route("/health/ready", get(routes::health::readiness))
        .nest("/api/v1", routes::patient_routes());

    // OpenAPI spec and Scalar docs UI (optional)
    #[cfg(feature = "utoipa")]
    {
        app = app
            .route("/openapi.json", get(openapi_json))
            .merge(Scalar::with_url("/api/docs", openapi::ApiDoc::build()));
    }

    if config.observability.metrics.enabled {
        app = app.route(
            &config.observability.metrics.path,
            get(routes::health::metrics),
        );
    }

    app.layer(axum::middleware::from_fn(
        middleware::request_id_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
    .with_state(state)
}

/// Returns the OpenAPI spec as JSON
#[cfg(feature = "utoipa")]
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::build())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        None | Some(Command::Serve) => run_server(&args.config).await,
        Some(Command::Purge) => run_purge(&args.config).await,
        Some(Command::Migrate) => run_migrate(&args.config).await,
        #[cfg(feature = "utoipa")]
        Some(Command::Openapi { output }) => run_openapi_export(output),
    }
}

fn load_config(path: &str) -> config::AppConfig {
    match config::AppConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn init_tracing_or_exit(config: &config::AppConfig) {
    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_server(config_path: &str) {
    let config = load_config(config_path);
    init_tracing_or_exit(&config);

    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        tracing::warn!(error = %e, "Failed to initialize metrics: {e}");
    }

    tracing::info!(config_file = %config_path, "Starting patient records service");

    // Validated when the config was loaded
    let schedule = match config.app.config.schedule.schedule() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Invalid purge schedule");
            std::process::exit(1);
        }
    };

    let state = match AppState::new(&config).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let task_tracker = state.task_tracker.clone();

    let job = retention::PurgeJob::new(
        state.db.patients(),
        state.clock.clone(),
        &config.patient.records.retention,
    );
    task_tracker.spawn(retention::start_purge_worker(
        job,
        schedule,
        shutdown.clone(),
    ));

    let app = build_app(&config, state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, address = %bind_addr, "Failed to bind to address");
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on http://{}", bind_addr);

    let shutdown_timeout = std::time::Duration::from_secs(config.server.shutdown_timeout_secs);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(task_tracker, shutdown, shutdown_timeout))
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal(
    task_tracker: TaskTracker,
    shutdown: CancellationToken,
    timeout: std::time::Duration,
) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, waiting for background tasks to complete...");

    shutdown.cancel();
    task_tracker.close();

    match tokio::time::timeout(timeout, task_tracker.wait()).await {
        Ok(()) => tracing::info!("All background tasks completed"),
        Err(_) => {
            tracing::warn!("Timeout waiting for background tasks, some may not have completed")
        }
    }

    tracing::info!("Shutdown complete");
}

/// Run a single purge pass against the configured database.
async fn run_purge(config_path: &str) {
    let config = load_config(config_path);
    init_tracing_or_exit(&config);

    let state = match AppState::new(&config).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let job = retention::PurgeJob::new(
        state.db.patients(),
        state.clock.clone(),
        &config.patient.records.retention,
    );
    match job.run_once().await {
        Ok(result) => {
            tracing::info!(
                cutoff = %result.cutoff,
                deleted = result.deleted,
                dry_run = result.dry_run,
                "Purge complete"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Purge failed");
            eprintln!("Error: Purge failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_migrate(config_path: &str) {
    let config = load_config(config_path);
    init_tracing_or_exit(&config);

    tracing::info!(config_file = %config_path, "Running database migrations");

    if config.database.is_none() {
        eprintln!("Error: Database is not configured. Nothing to migrate.");
        std::process::exit(1);
    }

    match db::DbPool::from_config(&config.database).await {
        Ok(pool) => match pool.run_migrations().await {
            Ok(()) => {
                tracing::info!("Database migrations completed successfully");
                std::process::exit(0);
            }
            Err(e) => {
                tracing::error!(error = %e, "Database migrations failed");
                eprintln!("Error: Database migrations failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "utoipa")]
fn run_openapi_export(output: Option<String>) {
    let spec = openapi::ApiDoc::build();
    let content = match serde_json::to_string_pretty(&spec) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: Failed to serialize OpenAPI spec: {}", e);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &content) {
                eprintln!("Error: Failed to write to {}: {}", path, e);
                std::process::exit(1);
            }
            eprintln!("OpenAPI spec written to {}", path);
        }
        None => println!("{}", content),
    }
}
