//! REST API Server for the Pulse dashboard
//!
//! Usage:
//!   ./target/release/api_server [options]
//!
//! Options:
//!   --port PORT               Port to listen on (default: 8080, env PULSE_PORT)
//!   --db-url URL              SurrealDB connection string (default: rocksdb://data/pulse.db)
//!   --boundary-file PATH      Local state boundary GeoJSON instead of the remote gist
//!   --preload-boundaries      Fetch the boundary document before accepting requests
//!
//! REST endpoints:
//!   GET /api/v1/health                              - Health check
//!   GET /api/v1/options                             - Questions, years, quarters
//!   GET /api/v1/overview?view=state|district        - Home map and top 10
//!   GET /api/v1/case-study?question=N&year=Y&quarter=Q - Business case study
//!   GET /api/v1/boundaries                          - State boundary GeoJSON

use anyhow::Result;
use clap::Parser;
use pulse_insights::api::{create_router, DashboardService};
use pulse_insights::config::{self, BoundarySettings, DbSettings};
use pulse_insights::db;
use pulse_insights::geo::BoundaryProvider;
use pulse_insights::report::ReportComposer;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "api_server")]
#[command(about = "Serve the Pulse dashboard reports over REST")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PULSE_PORT", default_value = "8080")]
    port: u16,

    #[command(flatten)]
    db: DbSettings,

    #[command(flatten)]
    boundary: BoundarySettings,

    /// Fetch the boundary document at startup instead of on first use
    #[arg(long)]
    preload_boundaries: bool,
}

fn print_banner(args: &Args) {
    println!("============================================================");
    println!("         PHONEPE PULSE INSIGHTS API SERVER");
    println!("============================================================");
    println!();
    println!("  Port:       {}", args.port);
    println!("  REST:       http://localhost:{}/api/v1/", args.port);
    println!("  Database:   {} ({}/{})", args.db.url, args.db.namespace, args.db.database);
    println!("  Boundaries: {}", args.boundary.source());
    println!();
    println!("REST Endpoints:");
    println!("  GET /api/v1/health              Health check");
    println!("  GET /api/v1/options             Selector values");
    println!("  GET /api/v1/overview            Home map and top 10");
    println!("  GET /api/v1/case-study          Business case study");
    println!("  GET /api/v1/boundaries          State boundary GeoJSON");
    println!();
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    config::init_tracing();
    let args = Args::parse();

    print_banner(&args);

    let db = db::connect(&args.db).await?;
    let boundaries = BoundaryProvider::new(args.boundary.source());
    if args.preload_boundaries {
        let set = boundaries.get().await?;
        info!("Preloaded {} boundary features", set.len());
    }

    let service = Arc::new(DashboardService::new(ReportComposer::new(db, boundaries)));
    let app = create_router(service);

    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    info!("Starting REST server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_flags_parse() {
        Args::command().debug_assert();
    }
}
