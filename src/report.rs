//! Business-question reports.
//!
//! Each question is a [`QuestionDescriptor`]: which table feeds the map, which
//! grouped query feeds the detail table, how the filters depend on the selected
//! year and quarter, and how the bar and pie charts are drawn. One composer runs
//! every descriptor the same way.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::info;

use crate::charts::{BarChart, Palette, PieChart};
use crate::db::DbConn;
use crate::error::SelectionError;
use crate::geo::BoundaryProvider;
use crate::map::{render_choropleth, ChoroplethMap};
use crate::models::{EntityType, Table};
use crate::query::{AggregateQuery, Filter, ResultTable, SortOrder};

pub const YEARS: RangeInclusive<i32> = 2018..=2023;
pub const QUARTERS: RangeInclusive<u8> = 1..=4;

/// Grouping label every map query uses for the region column
pub const STATE_LABEL: &str = "State";

/// Rows kept by the ranked detail tables
pub const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionId {
    TransactionDynamics,
    InsurancePenetration,
    DistrictTransactions,
    UserRegistration,
    InsuranceTransactions,
}

impl QuestionId {
    pub const ALL: [QuestionId; 5] = [
        QuestionId::TransactionDynamics,
        QuestionId::InsurancePenetration,
        QuestionId::DistrictTransactions,
        QuestionId::UserRegistration,
        QuestionId::InsuranceTransactions,
    ];

    pub fn number(self) -> u8 {
        match self {
            QuestionId::TransactionDynamics => 1,
            QuestionId::InsurancePenetration => 2,
            QuestionId::DistrictTransactions => 3,
            QuestionId::UserRegistration => 4,
            QuestionId::InsuranceTransactions => 5,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            QuestionId::TransactionDynamics => "Decoding Transaction Dynamics on PhonePe",
            QuestionId::InsurancePenetration => "Insurance Penetration and Growth Potential Analysis",
            QuestionId::DistrictTransactions => "Transaction Analysis Across States and Districts",
            QuestionId::UserRegistration => "User Registration Analysis",
            QuestionId::InsuranceTransactions => "Insurance Transactions Analysis",
        }
    }
}

impl TryFrom<u8> for QuestionId {
    type Error = SelectionError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        QuestionId::ALL
            .into_iter()
            .find(|q| q.number() == n)
            .ok_or(SelectionError::UnknownQuestion(n))
    }
}

/// Validated (question, year, quarter) picked by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuerySelection {
    pub question: QuestionId,
    pub year: i32,
    pub quarter: u8,
}

impl QuerySelection {
    pub fn new(question: u8, year: i32, quarter: u8) -> Result<Self, SelectionError> {
        let question = QuestionId::try_from(question)?;
        if !YEARS.contains(&year) {
            return Err(SelectionError::YearOutOfRange(year));
        }
        if !QUARTERS.contains(&quarter) {
            return Err(SelectionError::QuarterOutOfRange(quarter));
        }
        Ok(Self { question, year, quarter })
    }
}

/// Which parts of the selection filter a question's queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterScope {
    AllTime,
    Year,
    YearQuarter,
}

impl FilterScope {
    pub fn filters(self, selection: &QuerySelection) -> Vec<Filter> {
        match self {
            FilterScope::AllTime => Vec::new(),
            FilterScope::Year => vec![Filter::Year(selection.year)],
            FilterScope::YearQuarter => vec![Filter::Year(selection.year), Filter::Quarter(selection.quarter)],
        }
    }

    /// Suffix for chart titles, e.g. "Q2 2022"
    pub fn period_label(self, selection: &QuerySelection) -> Option<String> {
        match self {
            FilterScope::AllTime => None,
            FilterScope::Year => Some(selection.year.to_string()),
            FilterScope::YearQuarter => Some(format!("Q{} {}", selection.quarter, selection.year)),
        }
    }
}

fn titled(base: &str, period: Option<&str>) -> String {
    match period {
        Some(p) => format!("{} - {}", base, p),
        None => base.to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MapSpec {
    pub table: Table,
    pub metric_column: &'static str,
    pub metric_alias: &'static str,
    pub title: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct BarSpec {
    pub x: &'static str,
    pub y: &'static str,
    pub color: Option<&'static str>,
    pub title: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct PieSpec {
    pub names: &'static str,
    pub values: &'static str,
    pub title: &'static str,
    pub hole: f64,
    pub palette: Palette,
}

#[derive(Debug, Clone, Copy)]
pub struct DetailSpec {
    pub table: Table,
    /// (column, label)
    pub group_by: &'static [(&'static str, &'static str)],
    /// (column, alias)
    pub sums: &'static [(&'static str, &'static str)],
    /// Aggregate alias ranked descending, keeping [`TOP_N`] rows
    pub rank_by: Option<&'static str>,
    pub bar: BarSpec,
    pub pie: PieSpec,
}

#[derive(Debug, Clone, Copy)]
pub struct QuestionDescriptor {
    pub id: QuestionId,
    pub scope: FilterScope,
    pub entity_type: Option<EntityType>,
    pub map: MapSpec,
    pub detail: DetailSpec,
}

impl QuestionDescriptor {
    pub fn for_question(id: QuestionId) -> Self {
        match id {
            QuestionId::TransactionDynamics => Self {
                id,
                scope: FilterScope::YearQuarter,
                entity_type: None,
                map: MapSpec {
                    table: Table::AggregatedTransactions,
                    metric_column: "transaction_amount",
                    metric_alias: "Total_Transaction_Amount",
                    title: "Transaction Amount by State",
                },
                detail: DetailSpec {
                    table: Table::AggregatedTransactions,
                    group_by: &[("transaction_type", "Transaction_type")],
                    sums: &[
                        ("transaction_count", "Total_Transaction_Count"),
                        ("transaction_amount", "Total_Transaction_Amount"),
                    ],
                    rank_by: None,
                    bar: BarSpec {
                        x: "Transaction_type",
                        y: "Total_Transaction_Amount",
                        color: Some("Transaction_type"),
                        title: "Transaction Amount by Type",
                    },
                    pie: PieSpec {
                        names: "Transaction_type",
                        values: "Total_Transaction_Amount",
                        title: "Transaction Type Distribution",
                        hole: 0.5,
                        palette: Palette::Reds,
                    },
                },
            },
            QuestionId::InsurancePenetration => Self {
                id,
                scope: FilterScope::Year,
                entity_type: None,
                map: MapSpec {
                    table: Table::AggregatedInsurance,
                    metric_column: "insurance_amount",
                    metric_alias: "Total_Insurance_Amount",
                    title: "Insurance Amount by State",
                },
                detail: DetailSpec {
                    table: Table::AggregatedInsurance,
                    group_by: &[("state", STATE_LABEL)],
                    sums: &[
                        ("insurance_count", "Total_Insurance_Count"),
                        ("insurance_amount", "Total_Insurance_Amount"),
                    ],
                    rank_by: None,
                    bar: BarSpec {
                        x: STATE_LABEL,
                        y: "Total_Insurance_Amount",
                        color: None,
                        title: "Insurance Amount by State",
                    },
                    pie: PieSpec {
                        names: STATE_LABEL,
                        values: "Total_Insurance_Amount",
                        title: "Insurance Distribution by State",
                        hole: 0.5,
                        palette: Palette::Blues,
                    },
                },
            },
            QuestionId::DistrictTransactions => Self {
                id,
                scope: FilterScope::AllTime,
                entity_type: Some(EntityType::Districts),
                map: MapSpec {
                    table: Table::TopTransaction,
                    metric_column: "transaction_amount",
                    metric_alias: "Total_Amount",
                    title: "District Transaction Amount by State",
                },
                detail: DetailSpec {
                    table: Table::TopTransaction,
                    group_by: &[("entity_name", "District"), ("state", STATE_LABEL)],
                    sums: &[
                        ("transaction_count", "Total_Transactions"),
                        ("transaction_amount", "Total_Amount"),
                    ],
                    rank_by: Some("Total_Amount"),
                    bar: BarSpec {
                        x: "District",
                        y: "Total_Amount",
                        color: Some(STATE_LABEL),
                        title: "Top 10 Districts by Transaction Amount",
                    },
                    pie: PieSpec {
                        names: "District",
                        values: "Total_Amount",
                        title: "Transaction Distribution - Top 10 Districts",
                        hole: 0.6,
                        palette: Palette::OrRd,
                    },
                },
            },
            QuestionId::UserRegistration => Self {
                id,
                scope: FilterScope::YearQuarter,
                entity_type: Some(EntityType::Districts),
                map: MapSpec {
                    table: Table::TopUser,
                    metric_column: "registered_users",
                    metric_alias: "Total_Users",
                    title: "Registered Users by State",
                },
                detail: DetailSpec {
                    table: Table::TopUser,
                    group_by: &[("entity_name", "District"), ("state", STATE_LABEL)],
                    sums: &[("registered_users", "Total_Registered_Users")],
                    rank_by: Some("Total_Registered_Users"),
                    bar: BarSpec {
                        x: "District",
                        y: "Total_Registered_Users",
                        color: Some(STATE_LABEL),
                        title: "Top 10 Districts by Registered Users",
                    },
                    pie: PieSpec {
                        names: "District",
                        values: "Total_Registered_Users",
                        title: "Registered Users Distribution",
                        hole: 0.6,
                        palette: Palette::Purples,
                    },
                },
            },
            QuestionId::InsuranceTransactions => Self {
                id,
                scope: FilterScope::YearQuarter,
                entity_type: Some(EntityType::Districts),
                map: MapSpec {
                    table: Table::TopInsurance,
                    metric_column: "insurance_amount",
                    metric_alias: "Total_Insurance_Amount",
                    title: "Insurance Amount by State",
                },
                detail: DetailSpec {
                    table: Table::TopInsurance,
                    group_by: &[("entity_name", "District"), ("state", STATE_LABEL)],
                    sums: &[
                        ("insurance_count", "Total_Insurance_Transactions"),
                        ("insurance_amount", "Total_Insurance_Amount"),
                    ],
                    rank_by: Some("Total_Insurance_Transactions"),
                    bar: BarSpec {
                        x: "District",
                        y: "Total_Insurance_Transactions",
                        color: Some(STATE_LABEL),
                        title: "Top 10 Districts by Insurance Transactions",
                    },
                    pie: PieSpec {
                        names: "District",
                        values: "Total_Insurance_Transactions",
                        title: "Insurance Transactions Distribution",
                        hole: 0.6,
                        palette: Palette::Greens,
                    },
                },
            },
        }
    }

    fn filters(&self, selection: &QuerySelection) -> Vec<Filter> {
        let mut filters = self.scope.filters(selection);
        if let Some(entity_type) = self.entity_type {
            filters.push(Filter::EntityType(entity_type));
        }
        filters
    }

    /// State-level aggregate feeding the choropleth
    pub fn map_query(&self, selection: &QuerySelection) -> AggregateQuery {
        AggregateQuery::on(self.map.table)
            .group_by("state", STATE_LABEL)
            .sum(self.map.metric_column, self.map.metric_alias)
            .filters(self.filters(selection))
    }

    pub fn detail_query(&self, selection: &QuerySelection) -> AggregateQuery {
        let detail = &self.detail;
        let mut query = AggregateQuery::on(detail.table).filters(self.filters(selection));
        for &(column, label) in detail.group_by {
            query = query.group_by(column, label);
        }
        for &(column, alias) in detail.sums {
            query = query.sum(column, alias);
        }
        if let Some(alias) = detail.rank_by {
            query = query.order_by(alias, SortOrder::Desc).limit(TOP_N);
        }
        query
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseStudyReport {
    pub question: QuestionId,
    pub title: &'static str,
    pub selection: QuerySelection,
    pub scope: FilterScope,
    pub generated_at: DateTime<Utc>,
    /// State-level rows behind the map, before the boundary join
    pub map_data: ResultTable,
    pub map: ChoroplethMap,
    pub table: ResultTable,
    pub bar: BarChart,
    pub pie: PieChart,
}

/// Home page granularity for the ranked list next to the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverviewView {
    #[default]
    State,
    District,
}

impl FromStr for OverviewView {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "state" | "states" => Ok(OverviewView::State),
            "district" | "districts" => Ok(OverviewView::District),
            _ => Err(SelectionError::UnknownView(s.to_string())),
        }
    }
}

impl OverviewView {
    pub fn top_query(self) -> AggregateQuery {
        match self {
            OverviewView::State => AggregateQuery::on(Table::AggregatedTransactions)
                .group_by("state", STATE_LABEL)
                .sum("transaction_amount", "Total_Transaction_Amount")
                .order_by("Total_Transaction_Amount", SortOrder::Desc)
                .limit(TOP_N),
            OverviewView::District => AggregateQuery::on(Table::TopTransaction)
                .group_by("entity_name", "District")
                .group_by("state", STATE_LABEL)
                .sum("transaction_amount", "Total_Transaction_Amount")
                .filter(Filter::EntityType(EntityType::Districts))
                .order_by("Total_Transaction_Amount", SortOrder::Desc)
                .limit(TOP_N),
        }
    }

    pub fn top_title(self) -> &'static str {
        match self {
            OverviewView::State => "Top 10 States by Transaction Amount",
            OverviewView::District => "Top 10 Districts by Transaction Amount",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewReport {
    pub view: OverviewView,
    pub generated_at: DateTime<Utc>,
    pub map_data: ResultTable,
    pub map: ChoroplethMap,
    pub top_title: &'static str,
    pub top: ResultTable,
}

pub fn overview_map_query() -> AggregateQuery {
    AggregateQuery::on(Table::AggregatedTransactions)
        .group_by("state", STATE_LABEL)
        .sum("transaction_amount", "Total_Transaction_Amount")
}

/// Runs question descriptors and the home overview against one database handle
#[derive(Clone)]
pub struct ReportComposer {
    db: DbConn,
    boundaries: BoundaryProvider,
}

impl ReportComposer {
    pub fn new(db: DbConn, boundaries: BoundaryProvider) -> Self {
        Self { db, boundaries }
    }

    pub fn boundaries(&self) -> &BoundaryProvider {
        &self.boundaries
    }

    pub async fn case_study(&self, selection: QuerySelection) -> Result<CaseStudyReport> {
        let descriptor = QuestionDescriptor::for_question(selection.question);
        let period = descriptor.scope.period_label(&selection);
        let period = period.as_deref();
        info!(
            question = selection.question.number(),
            year = selection.year,
            quarter = selection.quarter,
            "composing case study"
        );

        let map_data = descriptor.map_query(&selection).fetch(&self.db).await?;
        let boundaries = self.boundaries.get().await?;
        let map = render_choropleth(
            &map_data,
            STATE_LABEL,
            descriptor.map.metric_alias,
            &boundaries,
            titled(descriptor.map.title, period),
        );

        let table = descriptor.detail_query(&selection).fetch(&self.db).await?;
        let bar_spec = descriptor.detail.bar;
        let bar = BarChart::from_table(&table, bar_spec.x, bar_spec.y, bar_spec.color, titled(bar_spec.title, period));
        let pie_spec = descriptor.detail.pie;
        let pie = PieChart::from_table(
            &table,
            pie_spec.names,
            pie_spec.values,
            titled(pie_spec.title, period),
            pie_spec.hole,
            pie_spec.palette,
        );

        Ok(CaseStudyReport {
            question: selection.question,
            title: selection.question.title(),
            selection,
            scope: descriptor.scope,
            generated_at: Utc::now(),
            map_data,
            map,
            table,
            bar,
            pie,
        })
    }

    pub async fn overview(&self, view: OverviewView) -> Result<OverviewReport> {
        info!(?view, "composing overview");
        let map_data = overview_map_query().fetch(&self.db).await?;
        let boundaries = self.boundaries.get().await?;
        let map = render_choropleth(
            &map_data,
            STATE_LABEL,
            "Total_Transaction_Amount",
            &boundaries,
            "Total Transaction Amount by State (All Time)",
        );
        let top = view.top_query().fetch(&self.db).await?;

        Ok(OverviewReport {
            view,
            generated_at: Utc::now(),
            map_data,
            map,
            top_title: view.top_title(),
            top,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seeded_composer, seeded_db};
    use std::collections::{BTreeSet, HashSet};

    #[test]
    fn test_selection_validation() {
        assert!(QuerySelection::new(1, 2022, 2).is_ok());
        assert_eq!(QuerySelection::new(6, 2022, 2), Err(SelectionError::UnknownQuestion(6)));
        assert_eq!(QuerySelection::new(1, 2017, 2), Err(SelectionError::YearOutOfRange(2017)));
        assert_eq!(QuerySelection::new(1, 2022, 5), Err(SelectionError::QuarterOutOfRange(5)));
    }

    #[test]
    fn test_question_numbers_round_trip() {
        for q in QuestionId::ALL {
            assert_eq!(QuestionId::try_from(q.number()), Ok(q));
        }
    }

    #[test]
    fn test_every_descriptor_builds_valid_queries() {
        let selection = QuerySelection::new(1, 2021, 3).unwrap();
        for q in QuestionId::ALL {
            let d = QuestionDescriptor::for_question(q);
            assert_eq!(d.id, q);
            let selection = QuerySelection { question: q, ..selection };
            d.map_query(&selection).validate().unwrap();
            let detail = d.detail_query(&selection);
            detail.validate().unwrap();
            assert_eq!(detail.row_limit(), d.detail.rank_by.map(|_| TOP_N));
        }
        OverviewView::State.top_query().validate().unwrap();
        OverviewView::District.top_query().validate().unwrap();
        overview_map_query().validate().unwrap();
    }

    #[test]
    fn test_scope_drives_filters_and_titles() {
        let selection = QuerySelection::new(2, 2020, 4).unwrap();
        let d = QuestionDescriptor::for_question(QuestionId::InsurancePenetration);
        let stmt = d.map_query(&selection).to_statement().unwrap();
        assert!(stmt.text.contains("WHERE year = $year GROUP BY state"));
        assert_eq!(d.scope.period_label(&selection).as_deref(), Some("2020"));

        let d = QuestionDescriptor::for_question(QuestionId::DistrictTransactions);
        let stmt = d.map_query(&selection).to_statement().unwrap();
        assert!(!stmt.text.contains("$year"));
        assert!(stmt.text.contains("entity_type = $entity_type"));
        assert_eq!(d.scope.period_label(&selection), None);
    }

    #[test]
    fn test_overview_view_parsing() {
        assert_eq!("District".parse::<OverviewView>(), Ok(OverviewView::District));
        assert_eq!(
            "county".parse::<OverviewView>(),
            Err(SelectionError::UnknownView("county".into()))
        );
    }

    #[tokio::test]
    async fn test_transaction_types_unique_for_every_period() {
        let db = seeded_db().await;
        let d = QuestionDescriptor::for_question(QuestionId::TransactionDynamics);
        for year in YEARS {
            for quarter in QUARTERS {
                let selection = QuerySelection::new(1, year, quarter).unwrap();
                let table = d.detail_query(&selection).fetch(&db).await.unwrap();
                let types = table.texts("Transaction_type");
                let unique: HashSet<&String> = types.iter().collect();
                assert_eq!(unique.len(), types.len(), "duplicate type rows for Q{} {}", quarter, year);
            }
        }
    }

    #[tokio::test]
    async fn test_ranked_questions_are_bounded_and_ordered() {
        let composer = seeded_composer().await;
        for q in [3u8, 4, 5] {
            let report = composer.case_study(QuerySelection::new(q, 2022, 1).unwrap()).await.unwrap();
            let d = QuestionDescriptor::for_question(report.question);
            let rank_by = d.detail.rank_by.unwrap();
            let ranked = report.table.numbers(rank_by);
            assert!(!ranked.is_empty(), "question {} returned no rows", q);
            assert!(ranked.len() <= TOP_N);
            assert!(ranked.windows(2).all(|w| w[0] >= w[1]), "question {} not ranked: {:?}", q, ranked);
        }
    }

    #[tokio::test]
    async fn test_insurance_map_and_table_share_states() {
        let composer = seeded_composer().await;
        let report = composer.case_study(QuerySelection::new(2, 2020, 1).unwrap()).await.unwrap();

        assert!(report.map_data.has_column(STATE_LABEL));
        assert!(report.table.has_column(STATE_LABEL));
        let map_states: BTreeSet<String> = report.map_data.texts(STATE_LABEL).into_iter().collect();
        let table_states: BTreeSet<String> = report.table.texts(STATE_LABEL).into_iter().collect();
        assert!(!map_states.is_empty());
        assert_eq!(map_states, table_states);
        assert_eq!(report.map.title, "Insurance Amount by State - 2020");
    }

    #[tokio::test]
    async fn test_case_study_reports_unmatched_regions() {
        let composer = seeded_composer().await;
        let report = composer.case_study(QuerySelection::new(1, 2022, 2).unwrap()).await.unwrap();

        let rendered: Vec<&str> = report.map.regions.iter().map(|r| r.region.as_str()).collect();
        assert!(rendered.contains(&"Tamil Nadu"));
        assert_eq!(
            report.map.unmatched.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
            vec!["Andaman-&-Nicobar-Islands"]
        );
        assert_eq!(report.map.title, "Transaction Amount by State - Q2 2022");
        assert_eq!(report.bar.title, "Transaction Amount by Type - Q2 2022");
        assert_eq!(report.pie.labels.len(), report.table.len());
    }

    #[tokio::test]
    async fn test_overview_lists() {
        let composer = seeded_composer().await;
        let report = composer.overview(OverviewView::District).await.unwrap();
        assert_eq!(report.top.columns, vec!["District", "State", "Total_Transaction_Amount"]);
        assert_eq!(report.top.len(), TOP_N);
        assert!(!report.map.regions.is_empty());

        let report = composer.overview(OverviewView::State).await.unwrap();
        assert!(report.top.len() <= TOP_N);
        assert_eq!(report.top_title, "Top 10 States by Transaction Amount");
    }
}
