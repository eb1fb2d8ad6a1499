use anyhow::{Context, Result};
use serde::Serialize;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::config::DbSettings;
use crate::models::Table;

pub type DbConn = Surreal<Any>;

/// Rows per INSERT statement during bulk loads
const INSERT_BATCH: usize = 500;

/// Open the database named by the settings' connection string
pub async fn connect(settings: &DbSettings) -> Result<DbConn> {
    let db = any::connect(settings.url.as_str())
        .await
        .with_context(|| format!("connecting to {}", settings.url))?;

    if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
        db.signin(Root {
            username: username.as_str(),
            password: password.as_str(),
        })
        .await
        .context("signing in to database")?;
    }

    db.use_ns(settings.namespace.as_str())
        .use_db(settings.database.as_str())
        .await?;

    info!(url = %settings.url, ns = %settings.namespace, db = %settings.database, "connected to database");
    Ok(db)
}

/// Initialize database schema
pub async fn init_schema(db: &DbConn) -> Result<()> {
    db.query(
        r#"
        DEFINE TABLE aggregated_transactions SCHEMALESS;
        DEFINE INDEX idx_at_period ON aggregated_transactions FIELDS year, quarter;
        DEFINE INDEX idx_at_state ON aggregated_transactions FIELDS state;

        DEFINE TABLE aggregated_insurance SCHEMALESS;
        DEFINE INDEX idx_ai_period ON aggregated_insurance FIELDS year, quarter;
        DEFINE INDEX idx_ai_state ON aggregated_insurance FIELDS state;

        DEFINE TABLE top_transaction SCHEMALESS;
        DEFINE INDEX idx_tt_period ON top_transaction FIELDS entity_type, year, quarter;

        DEFINE TABLE top_insurance SCHEMALESS;
        DEFINE INDEX idx_ti_period ON top_insurance FIELDS entity_type, year, quarter;

        DEFINE TABLE top_user SCHEMALESS;
        DEFINE INDEX idx_tu_period ON top_user FIELDS entity_type, year, quarter;
        "#,
    )
    .await?
    .check()?;

    Ok(())
}

/// Bulk insert rows into one of the Pulse tables, returning the number written
pub async fn insert_rows<T>(db: &DbConn, table: Table, mut rows: Vec<T>) -> Result<usize>
where
    T: Serialize + 'static,
{
    let total = rows.len();
    let statement = format!("INSERT INTO {} $rows", table.name());

    while !rows.is_empty() {
        let rest = rows.split_off(rows.len().min(INSERT_BATCH));
        let batch = std::mem::replace(&mut rows, rest);
        debug!(table = %table, batch = batch.len(), "inserting batch");
        db.query(statement.as_str())
            .bind(("rows", batch))
            .await?
            .check()
            .with_context(|| format!("inserting into {}", table))?;
    }

    Ok(total)
}
