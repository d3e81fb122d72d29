use std::sync::Arc;

use colored::Colorize;
use log::{error, info};
use thiserror::Error;
use tokio::runtime::{self, Runtime};
use venueplus_collab::{
    AuthError, Collab, CryptoError, DatabaseError, FieldCipher, HashingConfig, MemoryDatabase,
    PgDatabase, SharedDatabase, StoreConfig,
};
use venueplus_server::{run_server, ServerConfig};

mod logging;

/// Everything read from the environment at startup.
struct AppConfig {
    store: StoreConfig,
    hashing: HashingConfig,
    server: ServerConfig,
}

impl AppConfig {
    fn from_env() -> Self {
        Self {
            store: StoreConfig::from_env(),
            hashing: HashingConfig::from_env(),
            server: ServerConfig::from_env(),
        }
    }
}

struct VenuePlus {
    collab: Arc<Collab>,
    server: ServerConfig,
    runtime: Runtime,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("A database connection is configured but VENUEPLUS_ENCRYPTION_KEY is not set")]
    MissingEncryptionKey,

    #[error("Invalid encryption key: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Could not seed the default club: {0}")]
    Seed(#[from] AuthError),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl StartupError {
    fn hint(&self) -> String {
        match self {
            Self::MissingEncryptionKey | Self::Crypto(_) => "Set VENUEPLUS_ENCRYPTION_KEY to a non-empty secret, or unset VENUEPLUS_DB_CONNECTION to use the in-memory store.".to_string(),
            Self::Database(_) => "This is a database error. Make sure the Postgres instance in VENUEPLUS_DB_CONNECTION is running and reachable, then try again.".to_string(),
            Self::Seed(_) => "The store was reachable but seeding failed. Check the logs above for the underlying error.".to_string(),
            Self::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

impl VenuePlus {
    fn new(config: AppConfig) -> Result<Self, StartupError> {
        info!("Building async runtime...");
        let runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("venueplus-async")
            .build()
            .map_err(|e| StartupError::Fatal(e.to_string()))?;

        let database = runtime.block_on(open_store(&config.store))?;
        let collab = Collab::new(database, config.hashing);

        runtime.block_on(
            collab.ensure_defaults(config.store.default_staff_password.as_deref()),
        )?;

        Ok(Self {
            collab: Arc::new(collab),
            server: config.server,
            runtime,
        })
    }

    fn run(self) {
        let result = self
            .runtime
            .block_on(run_server(self.collab.clone(), self.server));

        match result {
            Ok(()) => info!("Stopped."),
            Err(err) => error!("Server stopped unexpectedly: {}", err),
        }
    }
}

/// Picks Postgres when a connection string is configured, the in-memory store otherwise
async fn open_store(config: &StoreConfig) -> Result<SharedDatabase, StartupError> {
    match &config.connection_string {
        Some(url) => {
            let key = config
                .encryption_key
                .as_deref()
                .ok_or(StartupError::MissingEncryptionKey)?;

            info!("Connecting to database...");
            let database = PgDatabase::new(url, FieldCipher::new(key)?).await?;
            database.migrate().await?;

            Ok(Arc::new(database))
        }
        None => {
            info!(
                "No database configured, keeping state in memory with snapshots at {}",
                config.data_file.display()
            );

            Ok(Arc::new(MemoryDatabase::open(config.data_file.clone()).await))
        }
    }
}

fn main() {
    logging::init_logger();

    match VenuePlus::new(AppConfig::from_env()) {
        Ok(venueplus) => {
            info!("Initialized successfully.");
            venueplus.run();
        }
        Err(error) => {
            error!(
                "{} Read the error below to troubleshoot the issue.",
                "VenuePlus failed to start!".bold().red()
            );
            error!("{}", error);
            error!(
                "{}",
                format!("Hint: {}", error.hint())
                    .bright_black()
                    .italic()
            );
        }
    }
}
