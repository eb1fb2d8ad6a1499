//! Shared business logic for the dashboard API

use std::sync::Arc;
use thiserror::Error;

use crate::error::SelectionError;
use crate::geo::BoundarySet;
use crate::report::{
    CaseStudyReport, OverviewReport, OverviewView, QuerySelection, QuestionId, ReportComposer, QUARTERS, YEARS,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Values the selectors may offer
#[derive(Debug, Clone)]
pub struct SelectionOptions {
    pub questions: Vec<(u8, &'static str)>,
    pub years: Vec<i32>,
    pub quarters: Vec<u8>,
}

pub struct DashboardService {
    composer: ReportComposer,
}

impl DashboardService {
    pub fn new(composer: ReportComposer) -> Self {
        Self { composer }
    }

    pub fn options(&self) -> SelectionOptions {
        SelectionOptions {
            questions: QuestionId::ALL.iter().map(|q| (q.number(), q.title())).collect(),
            years: YEARS.collect(),
            quarters: QUARTERS.collect(),
        }
    }

    pub async fn case_study(&self, question: u8, year: i32, quarter: u8) -> Result<CaseStudyReport, ServiceError> {
        let selection = QuerySelection::new(question, year, quarter)?;
        Ok(self.composer.case_study(selection).await?)
    }

    pub async fn overview(&self, view: Option<&str>) -> Result<OverviewReport, ServiceError> {
        let view = match view {
            Some(v) => v.parse::<OverviewView>()?,
            None => OverviewView::default(),
        };
        Ok(self.composer.overview(view).await?)
    }

    pub async fn boundaries(&self) -> Result<Arc<BoundarySet>, ServiceError> {
        Ok(self.composer.boundaries().get().await?)
    }
}
