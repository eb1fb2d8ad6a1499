//! Aggregate queries over the Pulse tables.
//!
//! A query is assembled from allow-listed identifiers only: the table comes from
//! [`Table`], grouping and aggregate columns are checked against the table's
//! column list, and every filter value travels as a bound parameter. The
//! statement text therefore never contains user-selected values.

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt::Write as _;
use tracing::debug;

use crate::db::DbConn;
use crate::error::QueryError;
use crate::models::{EntityType, Table};

/// Equality filter; the value is always bound, never interpolated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Year(i32),
    Quarter(u8),
    EntityType(EntityType),
}

impl Filter {
    /// Column compared against; doubles as the parameter name
    pub fn column(&self) -> &'static str {
        match self {
            Filter::Year(_) => "year",
            Filter::Quarter(_) => "quarter",
            Filter::EntityType(_) => "entity_type",
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Filter::Year(y) => Value::from(*y),
            Filter::Quarter(q) => Value::from(*q),
            Filter::EntityType(t) => Value::from(t.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Grouping column and the label it carries in the result table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupColumn {
    pub column: &'static str,
    pub label: &'static str,
}

/// `math::sum(column) AS alias`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregate {
    pub column: &'static str,
    pub alias: &'static str,
}

/// Statement text plus the parameters it references
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub bindings: Vec<(&'static str, Value)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    table: Table,
    group_by: Vec<GroupColumn>,
    aggregates: Vec<Aggregate>,
    filters: Vec<Filter>,
    order_by: Option<(&'static str, SortOrder)>,
    limit: Option<usize>,
}

impl AggregateQuery {
    pub fn on(table: Table) -> Self {
        Self {
            table,
            group_by: Vec::new(),
            aggregates: Vec::new(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn group_by(mut self, column: &'static str, label: &'static str) -> Self {
        self.group_by.push(GroupColumn { column, label });
        self
    }

    pub fn sum(mut self, column: &'static str, alias: &'static str) -> Self {
        self.aggregates.push(Aggregate { column, alias });
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Order by an aggregate alias or a grouping column
    pub fn order_by(mut self, target: &'static str, order: SortOrder) -> Self {
        self.order_by = Some((target, order));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        let table = self.table;
        if self.aggregates.is_empty() {
            return Err(QueryError::NoAggregates(table.name()));
        }

        let columns = self
            .group_by
            .iter()
            .map(|g| g.column)
            .chain(self.aggregates.iter().map(|a| a.column))
            .chain(self.filters.iter().map(Filter::column));
        for column in columns {
            if !table.has_column(column) {
                return Err(QueryError::UnknownColumn {
                    table: table.name(),
                    column: column.to_string(),
                });
            }
        }

        // aliases and labels become identifiers in the statement
        for name in self
            .aggregates
            .iter()
            .map(|a| a.alias)
            .chain(self.group_by.iter().map(|g| g.label))
        {
            if !is_identifier(name) {
                return Err(QueryError::UnknownColumn {
                    table: table.name(),
                    column: name.to_string(),
                });
            }
        }

        for (i, filter) in self.filters.iter().enumerate() {
            if self.filters[..i].iter().any(|f| f.column() == filter.column()) {
                return Err(QueryError::DuplicateFilter(filter.column()));
            }
        }

        if let Some((target, _)) = self.order_by {
            let known = self.aggregates.iter().any(|a| a.alias == target)
                || self.group_by.iter().any(|g| g.column == target);
            if !known {
                return Err(QueryError::UnknownOrderTarget(target.to_string()));
            }
        }

        Ok(())
    }

    /// Render the statement text and its bindings.
    ///
    /// Ordering and the row limit are not part of the statement: SurrealDB
    /// returns grouped rows in group-key order, so `fetch` ranks afterwards.
    pub fn to_statement(&self) -> Result<Statement, QueryError> {
        self.validate()?;

        let mut projection: Vec<String> = self.group_by.iter().map(|g| g.column.to_string()).collect();
        projection.extend(
            self.aggregates
                .iter()
                .map(|a| format!("math::sum({}) AS {}", a.column, a.alias)),
        );

        let mut text = format!("SELECT {} FROM {}", projection.join(", "), self.table.name());

        if !self.filters.is_empty() {
            let conditions: Vec<String> = self
                .filters
                .iter()
                .map(|f| format!("{} = ${}", f.column(), f.column()))
                .collect();
            let _ = write!(text, " WHERE {}", conditions.join(" AND "));
        }

        if self.group_by.is_empty() {
            text.push_str(" GROUP ALL");
        } else {
            let columns: Vec<&str> = self.group_by.iter().map(|g| g.column).collect();
            let _ = write!(text, " GROUP BY {}", columns.join(", "));
        }

        let bindings = self.filters.iter().map(|f| (f.column(), f.value())).collect();

        Ok(Statement { text, bindings })
    }

    /// Run the query and relabel its columns
    pub async fn fetch(&self, db: &DbConn) -> Result<ResultTable> {
        let statement = self.to_statement()?;
        debug!(table = %self.table, sql = %statement.text, "running aggregate query");

        let mut query = db.query(statement.text);
        for (name, value) in statement.bindings {
            query = query.bind((name, value));
        }
        let rows: Vec<Value> = query.await?.take(0)?;

        let mut table = self.relabel(rows);
        self.rank(&mut table);
        debug!(table = %self.table, rows = table.len(), "aggregate query returned");
        Ok(table)
    }

    /// Sort by the order target and keep at most `limit` rows
    fn rank(&self, table: &mut ResultTable) {
        if let Some((target, order)) = self.order_by {
            // a grouping column is addressed by its label once relabelled
            let key = self
                .group_by
                .iter()
                .find(|g| g.column == target)
                .map_or(target, |g| g.label);
            table.rows.sort_by(|a, b| {
                let ordering = compare_cells(a.get(key), b.get(key));
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }
        if let Some(n) = self.limit {
            table.rows.truncate(n);
        }
    }

    fn relabel(&self, rows: Vec<Value>) -> ResultTable {
        let mut columns: Vec<String> = self.group_by.iter().map(|g| g.label.to_string()).collect();
        columns.extend(self.aggregates.iter().map(|a| a.alias.to_string()));

        let rows = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(mut fields) => {
                    let mut out = Map::new();
                    for g in &self.group_by {
                        out.insert(g.label.to_string(), fields.remove(g.column).unwrap_or(Value::Null));
                    }
                    for a in &self.aggregates {
                        out.insert(a.alias.to_string(), fields.remove(a.alias).unwrap_or(Value::Null));
                    }
                    Some(out)
                }
                _ => None,
            })
            .collect();

        ResultTable { columns, rows }
    }
}

fn cell_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Numbers compare numerically, anything else as text; missing cells sort first
fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (cell_number(a), cell_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => {
            let text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
            text(a).cmp(&text(b))
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Result of an aggregate query: ordered column names and one object per row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn text(&self, row: usize, column: &str) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_str()
    }

    /// Numeric cell; numeric strings (decimals) are parsed
    pub fn number(&self, row: usize, column: &str) -> Option<f64> {
        cell_number(self.rows.get(row)?.get(column))
    }

    /// Column rendered as text; missing cells become empty strings
    pub fn texts(&self, column: &str) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| match row.get(column) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect()
    }

    /// Column as numbers; missing or non-numeric cells become 0
    pub fn numbers(&self, column: &str) -> Vec<f64> {
        (0..self.rows.len())
            .map(|i| self.number(i, column).unwrap_or(0.0))
            .collect()
    }
}
