//! cadence - lifecycle control for recurring schedules.
//!
//! Usage:
//!   cadence serve [--config FILE]        Start the HTTP API
//!   cadence validate --config FILE       Validate a configuration file
//!   cadence check-cron EXPR              Print the next firings of a cron expression

use cadence::api::{self, ApiConfig};
use cadence::config::StorageConfig;
use cadence::{
    AppRegistry, CronSchedule, InMemoryStorage, LifecycleController, LifecycleMetrics,
    ScheduleRepository, ServiceConfig, StorageError, YamlLoader,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// cadence - lifecycle control for recurring schedules
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Path to the service configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate a configuration file without starting
    Validate {
        /// Path to the service configuration file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Print the next firings of a cron expression
    CheckCron {
        /// Cron expression (5 or 6 fields, or a shortcut such as @daily)
        #[arg(value_name = "EXPR")]
        expression: String,

        /// Timezone the expression is evaluated in
        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// Number of firings to print
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => {
            serve(config, host, port).await?;
        }
        Commands::Validate { config } => {
            validate_config(config)?;
        }
        Commands::CheckCron {
            expression,
            timezone,
            count,
        } => {
            check_cron(&expression, &timezone, count)?;
        }
    }

    Ok(())
}

type Backends = (Arc<dyn ScheduleRepository>, Arc<dyn AppRegistry>);

/// Open the configured storage backend.
async fn open_storage(config: &StorageConfig) -> Result<Backends, StorageError> {
    match config {
        StorageConfig::Memory => {
            info!("Using in-memory storage");
            let storage = Arc::new(InMemoryStorage::new());
            let schedules: Arc<dyn ScheduleRepository> = storage.clone();
            let apps: Arc<dyn AppRegistry> = storage;
            Ok((schedules, apps))
        }
        #[cfg(feature = "sqlite")]
        StorageConfig::Sqlite { path } => {
            info!("Using SQLite storage at {}", path);
            let storage = Arc::new(cadence::SqliteStorage::new(path).await?);
            let schedules: Arc<dyn ScheduleRepository> = storage.clone();
            let apps: Arc<dyn AppRegistry> = storage;
            Ok((schedules, apps))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageConfig::Sqlite { .. } => Err(StorageError::Other(
            "built without the sqlite feature".to_string(),
        )),
    }
}

/// Insert the configured apps and schedules, skipping ones already stored.
async fn seed(
    config: &ServiceConfig,
    schedules: &dyn ScheduleRepository,
    apps: &dyn AppRegistry,
) -> Result<(), StorageError> {
    for app in &config.apps {
        match apps.save_app(app.clone()).await {
            Ok(()) => info!(app_id = %app.app_id, "Registered app"),
            Err(StorageError::DuplicateKey(_)) => {
                warn!(app_id = %app.app_id, "App already registered, keeping stored copy")
            }
            Err(e) => return Err(e),
        }
    }

    for schedule in &config.schedules {
        match schedules.save_schedule(schedule.clone()).await {
            Ok(()) => info!(schedule_id = %schedule.schedule_id, "Seeded schedule"),
            Err(StorageError::DuplicateKey(_)) => {
                warn!(schedule_id = %schedule.schedule_id, "Schedule already stored, keeping stored copy")
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Start the HTTP API and run until Ctrl+C.
async fn serve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            YamlLoader::load_service_config(&path)?
        }
        None => ServiceConfig::default(),
    };
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let (schedules, apps) = open_storage(&config.storage).await?;
    seed(&config, schedules.as_ref(), apps.as_ref()).await?;
    info!(
        "Loaded {} app(s) and {} schedule(s) from configuration",
        config.apps.len(),
        config.schedules.len()
    );

    let metrics = Arc::new(LifecycleMetrics::new()?);
    let controller = LifecycleController::new(schedules, apps)
        .with_rules(config.rules.clone())
        .with_storage_timeout(config.storage_timeout())
        .with_metrics(metrics);

    let server = api::start_server(
        ApiConfig::from(&config.server),
        api::create_api_state(controller),
    )
    .await?;
    let abort = server.abort_handle();
    info!("Press Ctrl+C to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            abort.abort();
        }
        result = server => {
            if let Err(e) = result {
                error!("API server task failed: {}", e);
            }
        }
    }

    info!("Goodbye!");
    Ok(())
}

/// Validate a configuration file without starting.
fn validate_config(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating configuration: {}", path.display());

    match YamlLoader::load_service_config(&path) {
        Ok(config) => {
            info!(
                "Configuration is valid: {} app(s), {} schedule(s), listening on {}:{}",
                config.apps.len(),
                config.schedules.len(),
                config.server.host,
                config.server.port
            );
            Ok(())
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            Err(e.into())
        }
    }
}

/// Print the next `count` firings of a cron expression.
fn check_cron(
    expression: &str,
    timezone: &str,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let schedule = CronSchedule::with_timezone(expression, timezone)?;
    let now = chrono::Utc::now();

    println!("Expression: {}", schedule.expression());
    println!("Timezone:   {}", schedule.timezone());
    if let Some(gap) = schedule.min_gap_after(now, count) {
        println!("Min gap:    {}s", gap.as_secs());
    }
    println!();

    let firings = schedule.next_n_after(now, count);
    if firings.is_empty() {
        println!("No upcoming firings");
    }
    for firing in firings {
        println!("  {}", firing.to_rfc3339());
    }

    Ok(())
}
