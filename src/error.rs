use thiserror::Error;

/// Rejected user selection (question, year, quarter, overview view)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("unknown question {0}; valid questions are 1-5")]
    UnknownQuestion(u8),

    #[error("year {0} is out of range; valid years are 2018-2023")]
    YearOutOfRange(i32),

    #[error("quarter {0} is out of range; valid quarters are 1-4")]
    QuarterOutOfRange(u8),

    #[error("unknown view '{0}'; expected 'state' or 'district'")]
    UnknownView(String),
}

/// Aggregate query that cannot be turned into a statement
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("column '{column}' does not exist on table '{table}'")]
    UnknownColumn { table: &'static str, column: String },

    #[error("query on '{0}' has no aggregates")]
    NoAggregates(&'static str),

    #[error("order-by target '{0}' is neither a grouping column nor an aggregate alias")]
    UnknownOrderTarget(String),

    #[error("filter on '{0}' given more than once")]
    DuplicateFilter(&'static str),
}
