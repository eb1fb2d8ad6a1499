//! Runtime configuration shared by the binaries.
//!
//! Every setting is a flag with an environment fallback. Binaries call
//! `dotenv::dotenv()` before parsing so a local `.env` file works as well.

use clap::Args;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::geo::{BoundarySource, DEFAULT_BOUNDARY_URL};

/// Database connection settings
#[derive(Args, Debug, Clone)]
pub struct DbSettings {
    /// Connection string: rocksdb://<path>, mem://, ws://<host>:<port>
    #[arg(id = "db_url", long = "db-url", env = "PULSE_DB_URL", default_value = "rocksdb://data/pulse.db")]
    pub url: String,

    /// Namespace holding the Pulse tables
    #[arg(long = "db-ns", env = "PULSE_DB_NS", default_value = "pulse")]
    pub namespace: String,

    /// Database holding the Pulse tables
    #[arg(long = "db-name", env = "PULSE_DB_NAME", default_value = "phonepe")]
    pub database: String,

    /// Root user for remote engines
    #[arg(long = "db-user", env = "PULSE_DB_USER")]
    pub username: Option<String>,

    /// Root password for remote engines
    #[arg(long = "db-pass", env = "PULSE_DB_PASS", hide_env_values = true)]
    pub password: Option<String>,
}

impl DbSettings {
    /// Settings for a throwaway in-memory database
    pub fn in_memory() -> Self {
        Self {
            url: "mem://".to_string(),
            namespace: "pulse".to_string(),
            database: "phonepe".to_string(),
            username: None,
            password: None,
        }
    }
}

/// Where the state boundary GeoJSON comes from
#[derive(Args, Debug, Clone)]
pub struct BoundarySettings {
    /// Remote GeoJSON feature collection keyed by properties.ST_NM
    #[arg(id = "boundary_url", long = "boundary-url", env = "PULSE_BOUNDARY_URL", default_value = DEFAULT_BOUNDARY_URL)]
    pub url: String,

    /// Local GeoJSON file; takes precedence over --boundary-url
    #[arg(id = "boundary_file", long = "boundary-file", env = "PULSE_BOUNDARY_FILE")]
    pub file: Option<PathBuf>,
}

impl BoundarySettings {
    pub fn source(&self) -> BoundarySource {
        match &self.file {
            Some(path) => BoundarySource::File(path.clone()),
            None => BoundarySource::Url(self.url.clone()),
        }
    }
}

/// Install the global tracing subscriber, filtered by RUST_LOG (default: info)
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();
}
