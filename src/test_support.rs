//! Fixtures shared by the unit tests: a small boundary document and an
//! in-memory database seeded with deterministic Pulse rows.

use crate::config::DbSettings;
use crate::db::{self, DbConn};
use crate::geo::{BoundaryProvider, BoundarySet, BoundarySource};
use crate::models::{
    AggregatedInsurance, AggregatedTransaction, EntityType, Table, TopInsurance, TopTransaction, TopUser,
};
use crate::report::ReportComposer;

/// Five state features with unit-square geometries
pub const BOUNDARY_FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"ST_NM": "Tamil Nadu"},
     "geometry": {"type": "Polygon", "coordinates": [[[78,10],[79,10],[79,11],[78,11],[78,10]]]}},
    {"type": "Feature", "properties": {"ST_NM": "Karnataka"},
     "geometry": {"type": "Polygon", "coordinates": [[[75,13],[76,13],[76,14],[75,14],[75,13]]]}},
    {"type": "Feature", "properties": {"ST_NM": "Maharashtra"},
     "geometry": {"type": "Polygon", "coordinates": [[[74,18],[75,18],[75,19],[74,19],[74,18]]]}},
    {"type": "Feature", "properties": {"ST_NM": "Kerala"},
     "geometry": {"type": "Polygon", "coordinates": [[[76,9],[77,9],[77,10],[76,10],[76,9]]]}},
    {"type": "Feature", "properties": {"ST_NM": "Andaman & Nicobar"},
     "geometry": {"type": "Polygon", "coordinates": [[[92,11],[93,11],[93,12],[92,12],[92,11]]]}}
  ]
}"#;

/// State names as they appear in the tables; the last has no boundary feature
pub const STATES: [&str; 5] = [
    "tamil nadu",
    "karnataka",
    "maharashtra",
    "kerala",
    "andaman-&-nicobar-islands",
];

const DISTRICTS: [[&str; 3]; 5] = [
    ["chennai", "coimbatore", "madurai"],
    ["bengaluru urban", "mysuru", "belagavi"],
    ["pune", "mumbai suburban", "thane"],
    ["ernakulam", "thiruvananthapuram", "kozhikode"],
    ["south andaman", "nicobars", "north and middle andaman"],
];

const TRANSACTION_TYPES: [&str; 3] = ["Peer-to-peer payments", "Merchant payments", "Recharge & bill payments"];

const YEARS: [i32; 2] = [2020, 2022];

pub fn boundary_fixture() -> BoundarySet {
    BoundarySet::from_geojson_str(BOUNDARY_FIXTURE).expect("boundary fixture parses")
}

pub async fn seeded_db() -> DbConn {
    let db = db::connect(&DbSettings::in_memory()).await.expect("in-memory database");
    db::init_schema(&db).await.expect("schema");

    let mut aggregated = Vec::new();
    let mut insurance = Vec::new();
    for year in YEARS {
        for quarter in 1..=4u8 {
            for (s, state) in STATES.iter().enumerate() {
                for (t, kind) in TRANSACTION_TYPES.iter().enumerate() {
                    let count = 100 * (s as i64 + 1) + 10 * t as i64 + quarter as i64;
                    aggregated.push(AggregatedTransaction {
                        state: state.to_string(),
                        year,
                        quarter,
                        transaction_type: kind.to_string(),
                        transaction_count: count,
                        transaction_amount: count as f64 * 250.0,
                    });
                }
                let count = 10 * (s as i64 + 1) + quarter as i64;
                insurance.push(AggregatedInsurance {
                    state: state.to_string(),
                    year,
                    quarter,
                    insurance_type: "Insurance".to_string(),
                    insurance_count: count,
                    insurance_amount: count as f64 * 1200.0,
                });
            }
        }
    }

    let mut top_transactions = Vec::new();
    let mut top_insurance = Vec::new();
    let mut top_users = Vec::new();
    for year in YEARS {
        for quarter in 1..=2u8 {
            for (s, state) in STATES.iter().enumerate() {
                for (d, district) in DISTRICTS[s].iter().enumerate() {
                    // distinct ranks: later states and earlier districts weigh more
                    let weight = (s as i64 + 1) * 10 + (3 - d as i64);
                    top_transactions.push(TopTransaction {
                        state: state.to_string(),
                        year,
                        quarter,
                        entity_type: EntityType::Districts,
                        entity_name: district.to_string(),
                        transaction_count: weight * 7,
                        transaction_amount: weight as f64 * 1000.0,
                    });
                    top_insurance.push(TopInsurance {
                        state: state.to_string(),
                        year,
                        quarter,
                        entity_type: EntityType::Districts,
                        entity_name: district.to_string(),
                        insurance_count: weight * 3,
                        insurance_amount: weight as f64 * 900.0,
                    });
                    top_users.push(TopUser {
                        state: state.to_string(),
                        year,
                        quarter,
                        entity_type: EntityType::Districts,
                        entity_name: district.to_string(),
                        registered_users: weight * 1000,
                    });
                }
                // a state-level row that district queries must ignore
                top_transactions.push(TopTransaction {
                    state: state.to_string(),
                    year,
                    quarter,
                    entity_type: EntityType::States,
                    entity_name: state.to_string(),
                    transaction_count: 1_000_000,
                    transaction_amount: 1e12,
                });
            }
        }
    }

    db::insert_rows(&db, Table::AggregatedTransactions, aggregated).await.expect("seed");
    db::insert_rows(&db, Table::AggregatedInsurance, insurance).await.expect("seed");
    db::insert_rows(&db, Table::TopTransaction, top_transactions).await.expect("seed");
    db::insert_rows(&db, Table::TopInsurance, top_insurance).await.expect("seed");
    db::insert_rows(&db, Table::TopUser, top_users).await.expect("seed");

    db
}

pub async fn seeded_composer() -> ReportComposer {
    let db = seeded_db().await;
    let boundaries = BoundaryProvider::new(BoundarySource::Inline(BOUNDARY_FIXTURE.to_string()));
    ReportComposer::new(db, boundaries)
}
