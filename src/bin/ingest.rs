use anyhow::{Context, Result};
use clap::Parser;
use csv::ReaderBuilder;
use pulse_insights::config::{self, DbSettings};
use pulse_insights::db::{self, DbConn};
use pulse_insights::models::{
    AggregatedInsurance, AggregatedTransaction, Table, TopInsurance, TopTransaction, TopUser,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Load the Pulse CSV exports into the database
#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Bulk-load <table>.csv files into the Pulse tables")]
struct Args {
    #[command(flatten)]
    db: DbSettings,

    /// Directory holding one CSV file per table
    #[arg(short, long, default_value = "data/pulse")]
    input: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    config::init_tracing();
    let args = Args::parse();

    info!("Connecting to SurrealDB at {}", args.db.url);
    let db = db::connect(&args.db).await?;

    info!("Initializing schema...");
    db::init_schema(&db).await?;

    let mut totals = Vec::new();
    for table in Table::ALL {
        let path = args.input.join(format!("{}.csv", table.name()));
        let loaded = match table {
            Table::AggregatedTransactions => ingest_table::<AggregatedTransaction>(&db, table, &path).await?,
            Table::AggregatedInsurance => ingest_table::<AggregatedInsurance>(&db, table, &path).await?,
            Table::TopTransaction => ingest_table::<TopTransaction>(&db, table, &path).await?,
            Table::TopInsurance => ingest_table::<TopInsurance>(&db, table, &path).await?,
            Table::TopUser => ingest_table::<TopUser>(&db, table, &path).await?,
        };
        totals.push((table, loaded));
    }

    // Verify counts
    info!("Database totals:");
    for (table, loaded) in totals {
        let stored: Option<i64> = db
            .query(format!("SELECT count() FROM {} GROUP ALL", table.name()))
            .await?
            .take("count")?;
        info!("  {}: {:?} (loaded {} this run)", table, stored, loaded);
    }

    Ok(())
}

/// Parse one CSV file and insert its rows; bad rows are skipped with a warning
async fn ingest_table<T>(db: &DbConn, table: Table, path: &Path) -> Result<usize>
where
    T: DeserializeOwned + Serialize + 'static,
{
    if !path.exists() {
        warn!("No file for {} at {:?}, skipping", table, path);
        return Ok(0);
    }

    info!("Reading CSV from {:?}", path);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut rows: Vec<T> = Vec::new();
    let mut error_count = 0;
    for (i, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                if error_count < 5 {
                    warn!("Failed to parse {} record {}: {}", table, i, e);
                }
                error_count += 1;
            }
        }
    }

    info!("Parsed {} records for {} ({} errors)", rows.len(), table, error_count);
    let inserted = db::insert_rows(db, table, rows).await?;
    info!("Inserted {} rows into {}", inserted, table);

    Ok(inserted)
}
