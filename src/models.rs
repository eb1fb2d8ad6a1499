use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five read-only Pulse tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    AggregatedTransactions,
    AggregatedInsurance,
    TopTransaction,
    TopInsurance,
    TopUser,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::AggregatedTransactions,
        Table::AggregatedInsurance,
        Table::TopTransaction,
        Table::TopInsurance,
        Table::TopUser,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::AggregatedTransactions => "aggregated_transactions",
            Table::AggregatedInsurance => "aggregated_insurance",
            Table::TopTransaction => "top_transaction",
            Table::TopInsurance => "top_insurance",
            Table::TopUser => "top_user",
        }
    }

    /// Column allow-list; nothing outside it may appear in query text
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::AggregatedTransactions => &[
                "state",
                "year",
                "quarter",
                "transaction_type",
                "transaction_count",
                "transaction_amount",
            ],
            Table::AggregatedInsurance => &[
                "state",
                "year",
                "quarter",
                "insurance_type",
                "insurance_count",
                "insurance_amount",
            ],
            Table::TopTransaction => &[
                "state",
                "year",
                "quarter",
                "entity_type",
                "entity_name",
                "transaction_count",
                "transaction_amount",
            ],
            Table::TopInsurance => &[
                "state",
                "year",
                "quarter",
                "entity_type",
                "entity_name",
                "insurance_count",
                "insurance_amount",
            ],
            Table::TopUser => &[
                "state",
                "year",
                "quarter",
                "entity_type",
                "entity_name",
                "registered_users",
            ],
        }
    }

    pub fn has_column(self, column: &str) -> bool {
        self.columns().contains(&column)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Granularity of a row in the `top_*` tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    States,
    Districts,
    Pincodes,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::States => "states",
            EntityType::Districts => "districts",
            EntityType::Pincodes => "pincodes",
        }
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "states" | "state" => Ok(EntityType::States),
            "districts" | "district" => Ok(EntityType::Districts),
            "pincodes" | "pincode" => Ok(EntityType::Pincodes),
            other => Err(format!("unknown entity type '{}'", other)),
        }
    }
}

// Rows double as CSV records; the aliases accept the column headers of the
// original Pulse table exports.

/// Row of `aggregated_transactions`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedTransaction {
    #[serde(alias = "State")]
    pub state: String,
    #[serde(alias = "Year")]
    pub year: i32,
    #[serde(alias = "Quarter")]
    pub quarter: u8,
    #[serde(alias = "Transaction_type")]
    pub transaction_type: String,
    #[serde(alias = "Transaction_count")]
    pub transaction_count: i64,
    #[serde(alias = "Transaction_amount")]
    pub transaction_amount: f64,
}

/// Row of `aggregated_insurance`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedInsurance {
    #[serde(alias = "State")]
    pub state: String,
    #[serde(alias = "Year")]
    pub year: i32,
    #[serde(alias = "Quarter")]
    pub quarter: u8,
    #[serde(alias = "Insurance_type")]
    pub insurance_type: String,
    #[serde(alias = "Insurance_count")]
    pub insurance_count: i64,
    #[serde(alias = "Insurance_amount")]
    pub insurance_amount: f64,
}

/// Row of `top_transaction`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopTransaction {
    #[serde(alias = "State")]
    pub state: String,
    #[serde(alias = "Year")]
    pub year: i32,
    #[serde(alias = "Quarter")]
    pub quarter: u8,
    #[serde(alias = "type")]
    pub entity_type: EntityType,
    #[serde(alias = "entityName")]
    pub entity_name: String,
    #[serde(alias = "count")]
    pub transaction_count: i64,
    #[serde(alias = "amount")]
    pub transaction_amount: f64,
}

/// Row of `top_insurance`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopInsurance {
    #[serde(alias = "State")]
    pub state: String,
    #[serde(alias = "Year")]
    pub year: i32,
    #[serde(alias = "Quarter")]
    pub quarter: u8,
    #[serde(alias = "type")]
    pub entity_type: EntityType,
    #[serde(alias = "entityName")]
    pub entity_name: String,
    #[serde(alias = "count")]
    pub insurance_count: i64,
    #[serde(alias = "amount")]
    pub insurance_amount: f64,
}

/// Row of `top_user`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopUser {
    #[serde(alias = "State")]
    pub state: String,
    #[serde(alias = "Year")]
    pub year: i32,
    #[serde(alias = "Quarter")]
    pub quarter: u8,
    pub entity_type: EntityType,
    #[serde(alias = "name")]
    pub entity_name: String,
    #[serde(alias = "registeredUsers")]
    pub registered_users: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_has_period_columns() {
        for table in Table::ALL {
            assert!(table.has_column("state"), "{} lacks state", table);
            assert!(table.has_column("year"), "{} lacks year", table);
            assert!(table.has_column("quarter"), "{} lacks quarter", table);
        }
    }

    #[test]
    fn test_entity_type_parsing() {
        assert_eq!("districts".parse::<EntityType>(), Ok(EntityType::Districts));
        assert_eq!(" State ".parse::<EntityType>(), Ok(EntityType::States));
        assert!("villages".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_csv_accepts_original_headers() {
        let data = "State,Year,Quarter,type,entityName,count,amount\n\
                    tamil nadu,2022,2,districts,chennai,120,4500.5\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<TopTransaction> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity_type, EntityType::Districts);
        assert_eq!(rows[0].entity_name, "chennai");
        assert_eq!(rows[0].transaction_amount, 4500.5);
    }
}
