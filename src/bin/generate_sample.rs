//! Sample Pulse Data Generator
//!
//! Writes the five table exports with seeded random values so the report and
//! API can be exercised without the real Pulse dataset.
//!
//! Usage:
//!   cargo run --release --bin generate_sample -- --output data/pulse --seed 42

use anyhow::{Context, Result};
use clap::Parser;
use csv::WriterBuilder;
use pulse_insights::models::{
    AggregatedInsurance, AggregatedTransaction, EntityType, Table, TopInsurance, TopTransaction, TopUser,
};
use pulse_insights::report::{QUARTERS, YEARS};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
#[command(about = "Generate sample Pulse CSV exports")]
struct Args {
    /// Output directory for the <table>.csv files
    #[arg(short, long, default_value = "data/pulse")]
    output: PathBuf,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// First year with insurance data
    #[arg(long, default_value = "2020")]
    insurance_from: i32,
}

/// States in lower case as the Pulse tables store them, with two districts each.
/// "andaman & nicobar islands" keeps the Pulse spelling; the boundary gist names it
/// "Andaman & Nicobar", so it shows up in the map's unmatched list.
const STATES: [(&str, [&str; 2]); 36] = [
    ("andaman & nicobar islands", ["south andaman", "nicobars"]),
    ("andhra pradesh", ["visakhapatnam", "krishna"]),
    ("arunachal pradesh", ["papum pare", "tawang"]),
    ("assam", ["kamrup metropolitan", "dibrugarh"]),
    ("bihar", ["patna", "gaya"]),
    ("chandigarh", ["chandigarh", "chandigarh north"]),
    ("chhattisgarh", ["raipur", "bilaspur"]),
    ("dadra & nagar haveli & daman & diu", ["dadra and nagar haveli", "daman"]),
    ("delhi", ["south delhi", "north west delhi"]),
    ("goa", ["north goa", "south goa"]),
    ("gujarat", ["ahmadabad", "surat"]),
    ("haryana", ["gurugram", "faridabad"]),
    ("himachal pradesh", ["kangra", "shimla"]),
    ("jammu & kashmir", ["jammu", "srinagar"]),
    ("jharkhand", ["ranchi", "dhanbad"]),
    ("karnataka", ["bengaluru urban", "mysuru"]),
    ("kerala", ["ernakulam", "thiruvananthapuram"]),
    ("ladakh", ["leh ladakh", "kargil"]),
    ("lakshadweep", ["lakshadweep district", "kavaratti"]),
    ("madhya pradesh", ["indore", "bhopal"]),
    ("maharashtra", ["pune", "thane"]),
    ("manipur", ["imphal west", "imphal east"]),
    ("meghalaya", ["east khasi hills", "west garo hills"]),
    ("mizoram", ["aizawl", "lunglei"]),
    ("nagaland", ["dimapur", "kohima"]),
    ("odisha", ["khordha", "cuttack"]),
    ("puducherry", ["puducherry", "karaikal"]),
    ("punjab", ["ludhiana", "jalandhar"]),
    ("rajasthan", ["jaipur", "jodhpur"]),
    ("sikkim", ["east district", "south district"]),
    ("tamil nadu", ["chennai", "coimbatore"]),
    ("telangana", ["hyderabad", "medchal malkajgiri"]),
    ("tripura", ["west tripura", "gomati"]),
    ("uttar pradesh", ["lucknow", "gautam buddha nagar"]),
    ("uttarakhand", ["dehradun", "haridwar"]),
    ("west bengal", ["kolkata", "north twenty four parganas"]),
];

const TRANSACTION_TYPES: [&str; 5] = [
    "Recharge & bill payments",
    "Peer-to-peer payments",
    "Merchant payments",
    "Financial Services",
    "Others",
];

/// Relative share of each transaction type in the totals
const TYPE_WEIGHTS: [f64; 5] = [0.12, 0.45, 0.40, 0.01, 0.02];

#[derive(Default)]
struct SampleTables {
    aggregated_transactions: Vec<AggregatedTransaction>,
    aggregated_insurance: Vec<AggregatedInsurance>,
    top_transaction: Vec<TopTransaction>,
    top_insurance: Vec<TopInsurance>,
    top_user: Vec<TopUser>,
}

/// Quarter-on-quarter growth applied to every state's base volume
fn growth(year: i32, quarter: u8) -> f64 {
    let step = (year - YEARS.start()) * 4 + (quarter as i32 - 1);
    1.12f64.powi(step)
}

fn pincode(rng: &mut impl Rng, state_index: usize) -> String {
    format!("{}{:05}", 1 + state_index % 8, rng.gen_range(0..100_000u32))
}

fn generate(args: &Args, rng: &mut StdRng) -> SampleTables {
    let mut tables = SampleTables::default();

    for (s, (state, districts)) in STATES.iter().enumerate() {
        // per-state scale so states differ by orders of magnitude
        let base = rng.gen_range(2_000.0..2_000_000.0f64);
        let users_base = rng.gen_range(10_000..5_000_000i64);

        for year in YEARS {
            for quarter in QUARTERS {
                let scale = base * growth(year, quarter);

                let mut state_count = 0;
                let mut state_amount = 0.0;
                for (kind, weight) in TRANSACTION_TYPES.iter().zip(TYPE_WEIGHTS) {
                    let count = (scale * weight * rng.gen_range(0.8..1.2f64)).round() as i64;
                    let amount = count as f64 * rng.gen_range(150.0..2_500.0f64);
                    state_count += count;
                    state_amount += amount;
                    tables.aggregated_transactions.push(AggregatedTransaction {
                        state: state.to_string(),
                        year,
                        quarter,
                        transaction_type: kind.to_string(),
                        transaction_count: count,
                        transaction_amount: amount,
                    });
                }

                tables.top_transaction.push(TopTransaction {
                    state: state.to_string(),
                    year,
                    quarter,
                    entity_type: EntityType::States,
                    entity_name: state.to_string(),
                    transaction_count: state_count,
                    transaction_amount: state_amount,
                });

                let insured = year >= args.insurance_from;
                let insurance_count = (scale * 0.002 * rng.gen_range(0.5..1.5f64)).round() as i64;
                if insured {
                    tables.aggregated_insurance.push(AggregatedInsurance {
                        state: state.to_string(),
                        year,
                        quarter,
                        insurance_type: "Insurance".to_string(),
                        insurance_count,
                        insurance_amount: insurance_count as f64 * rng.gen_range(300.0..1_500.0f64),
                    });
                }

                // district rows split the state totals
                let first_share = rng.gen_range(0.4..0.7f64);
                for (d, district) in districts.iter().enumerate() {
                    let share = if d == 0 { first_share } else { (1.0 - first_share) * 0.8 };
                    tables.top_transaction.push(TopTransaction {
                        state: state.to_string(),
                        year,
                        quarter,
                        entity_type: EntityType::Districts,
                        entity_name: district.to_string(),
                        transaction_count: (state_count as f64 * share).round() as i64,
                        transaction_amount: state_amount * share,
                    });
                    tables.top_user.push(TopUser {
                        state: state.to_string(),
                        year,
                        quarter,
                        entity_type: EntityType::Districts,
                        entity_name: district.to_string(),
                        registered_users: (users_base as f64 * growth(year, quarter).sqrt() * share).round() as i64,
                    });
                    if insured {
                        let count = (insurance_count as f64 * share).round() as i64;
                        tables.top_insurance.push(TopInsurance {
                            state: state.to_string(),
                            year,
                            quarter,
                            entity_type: EntityType::Districts,
                            entity_name: district.to_string(),
                            insurance_count: count,
                            insurance_amount: count as f64 * rng.gen_range(300.0..1_500.0f64),
                        });
                    }
                }

                let pin_share = rng.gen_range(0.02..0.1f64);
                tables.top_transaction.push(TopTransaction {
                    state: state.to_string(),
                    year,
                    quarter,
                    entity_type: EntityType::Pincodes,
                    entity_name: pincode(&mut *rng, s),
                    transaction_count: (state_count as f64 * pin_share).round() as i64,
                    transaction_amount: state_amount * pin_share,
                });
            }
        }
    }

    tables
}

fn write_table<T: Serialize>(dir: &Path, table: Table, rows: &[T]) -> Result<usize> {
    let path = dir.join(format!("{}.csv", table.name()));
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    println!("   {:<25} {:>8} rows", table.name(), rows.len());
    Ok(rows.len())
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("🔧 Sample Pulse Data Generator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Output:           {}", args.output.display());
    println!("States:           {}", STATES.len());
    println!("Years:            {}-{}", YEARS.start(), YEARS.end());
    println!("Insurance from:   {}", args.insurance_from);
    if let Some(seed) = args.seed {
        println!("Random seed:      {}", seed);
    }
    println!();

    let mut rng: StdRng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    println!("🏭 Generating sample data...");
    let tables = generate(&args, &mut rng);

    let mut total = 0;
    total += write_table(&args.output, Table::AggregatedTransactions, &tables.aggregated_transactions)?;
    total += write_table(&args.output, Table::AggregatedInsurance, &tables.aggregated_insurance)?;
    total += write_table(&args.output, Table::TopTransaction, &tables.top_transaction)?;
    total += write_table(&args.output, Table::TopInsurance, &tables.top_insurance)?;
    total += write_table(&args.output, Table::TopUser, &tables.top_user)?;

    println!("\n✅ Generation complete!");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total written:     {:>8}", total);

    Ok(())
}
