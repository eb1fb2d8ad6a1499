//! Terminal report for the Pulse business questions
//!
//! Run:
//!   ./target/release/pulse_insights --question 1 --year 2022 --quarter 2
//!   ./target/release/pulse_insights --overview district
//!   ./target/release/pulse_insights --question 3 --year 2021 --quarter 1 --json

use anyhow::Result;
use clap::Parser;
use pulse_insights::config::{self, BoundarySettings, DbSettings};
use pulse_insights::db;
use pulse_insights::geo::BoundaryProvider;
use pulse_insights::map::ChoroplethMap;
use pulse_insights::query::ResultTable;
use pulse_insights::report::{OverviewView, QuerySelection, ReportComposer};
use serde_json::{json, Value};

#[derive(Parser, Debug)]
#[command(name = "pulse_insights")]
#[command(about = "Print PhonePe Pulse case-study and overview reports")]
struct Cli {
    #[command(flatten)]
    db: DbSettings,

    #[command(flatten)]
    boundary: BoundarySettings,

    /// Business question (1-5)
    #[arg(short, long, conflicts_with = "overview")]
    question: Option<u8>,

    /// Year of the selection (2018-2023)
    #[arg(short, long, default_value = "2022")]
    year: i32,

    /// Quarter of the selection (1-4)
    #[arg(long, default_value = "1")]
    quarter: u8,

    /// Home overview instead of a question: state or district
    #[arg(long)]
    overview: Option<String>,

    /// Emit the report as JSON with plotly figures
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    config::init_tracing();
    let cli = Cli::parse();

    let db = db::connect(&cli.db).await?;
    let composer = ReportComposer::new(db, BoundaryProvider::new(cli.boundary.source()));
    // figures reference the boundary document by its source instead of embedding it
    let geojson = json!(composer.boundaries().source().to_string());

    match cli.question {
        Some(question) => {
            let selection = QuerySelection::new(question, cli.year, cli.quarter)?;
            let report = composer.case_study(selection).await?;
            if cli.json {
                let doc = json!({
                    "question": report.question.number(),
                    "title": report.title,
                    "scope": report.scope,
                    "generated_at": report.generated_at,
                    "map": map_json(&report.map, geojson.clone()),
                    "table": report.table,
                    "bar": report.bar.to_plotly(),
                    "pie": report.pie.to_plotly(),
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
                return Ok(());
            }

            banner(&format!("Q{}. {}", report.question.number(), report.title));
            print_table(&report.table);
            println!("\n  {} total: {:.2}", report.pie.title, report.pie.total());
            print_map_summary(&report.map);
        }
        None => {
            let view = match cli.overview.as_deref() {
                Some(v) => v.parse::<OverviewView>()?,
                None => OverviewView::default(),
            };
            let report = composer.overview(view).await?;
            if cli.json {
                let doc = json!({
                    "view": report.view,
                    "generated_at": report.generated_at,
                    "map": map_json(&report.map, geojson.clone()),
                    "top_title": report.top_title,
                    "top": report.top,
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
                return Ok(());
            }

            banner("PHONEPE PULSE OVERVIEW");
            println!("{}", report.top_title.to_uppercase());
            println!("{}", "-".repeat(40));
            print_table(&report.top);
            print_map_summary(&report.map);
        }
    }

    println!("\n{}", "=".repeat(60));
    Ok(())
}

fn map_json(map: &ChoroplethMap, geojson: Value) -> Value {
    json!({
        "title": map.title,
        "unmatched": map.unmatched,
        "figure": map.to_plotly(geojson),
    })
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("  {}", title);
    println!("{}\n", "=".repeat(60));
}

fn cell(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => format!("{:.2}", n.as_f64().unwrap_or_default()),
        },
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

fn print_table(table: &ResultTable) {
    if table.is_empty() {
        println!("  (no rows)");
        return;
    }

    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| table.columns.iter().map(|c| cell(row.get(c))).collect())
        .collect();
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| cells.iter().map(|r| r[i].len()).chain([c.len()]).max().unwrap_or(0))
        .collect();

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c, w = *w))
        .collect();
    println!("  {}", header.join("  "));
    println!("  {}", "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    for row in &cells {
        let line: Vec<String> = row.iter().zip(&widths).map(|(v, w)| format!("{:<w$}", v, w = *w)).collect();
        println!("  {}", line.join("  "));
    }
}

fn print_map_summary(map: &ChoroplethMap) {
    println!("\nMAP: {}", map.title);
    println!("{}", "-".repeat(40));
    println!("  Matched regions:   {:>5}", map.regions.len());
    println!("  Unmatched regions: {:>5}", map.unmatched.len());
    if let Some(scale) = &map.scale {
        println!("  {} range: {:.2} .. {:.2}", map.metric, scale.min, scale.max);
    }
    for name in &map.unmatched {
        println!("    ! {}", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_flags_parse() {
        Cli::command().debug_assert();
    }
}
