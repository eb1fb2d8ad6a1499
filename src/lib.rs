//! PhonePe Pulse transaction insights.
//!
//! Aggregate queries over the Pulse tables, state-name normalization against a
//! boundary dataset, and choropleth/bar/pie figures for a fixed set of business
//! questions, served over REST or printed to the terminal.

pub mod api;
pub mod charts;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod map;
pub mod models;
pub mod query;
pub mod region_names;
pub mod report;

#[cfg(test)]
pub(crate) mod test_support;
