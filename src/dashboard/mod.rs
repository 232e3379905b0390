//! Screen loaders. Each one runs a batch of independent reads, derives
//! display statistics from whatever succeeded, and hands back plain data
//! for the renderer.

pub mod analytics;

use serde::Serialize;
use serde_json::Value;

use crate::aggregate::{
    clamp_percentage, count_field, extract_collection, extract_object, number_field, percentage_of, Batch, BatchReport,
    Generation, RefreshFeedback, Totals,
};
use crate::error::GatewayError;
use crate::gateway::{paths, ApiRequest, RequestGateway};
use crate::models::{CategoryBreakdown, DailyTrendPoint, MonthlyPoint};
use crate::services::analytics_service::{requests, rows, DateRange};
use crate::services::DEFAULT_TREND_DAYS;

pub use analytics::{AnalyticsScreen, AnalyticsSnapshot};

/// Result of one screen load
#[derive(Debug)]
pub enum ScreenLoad<T> {
    Ready(T),
    /// A newer load was started while this one was in flight
    Superseded,
    /// No usable session, or the session was rejected mid-load
    LoginRequired(GatewayError),
}

impl<T> ScreenLoad<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            ScreenLoad::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, ScreenLoad::Superseded)
    }

    pub fn login_required(&self) -> Option<&GatewayError> {
        match self {
            ScreenLoad::LoginRequired(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopCategory {
    pub name: String,
    pub total: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub generation: u64,
    pub totals: Totals,
    pub today_total: f64,
    pub top_category: Option<TopCategory>,
    pub categories: Vec<CategoryBreakdown>,
    pub trend: Vec<DailyTrendPoint>,
    pub months: Vec<MonthlyPoint>,
    pub month_totals: Totals,
    #[serde(skip)]
    pub feedback: RefreshFeedback,
}

const SUMMARY: &str = "summary";
const CATEGORIES: &str = "categories";
const TREND: &str = "daily_trend";
const MONTHS: &str = "monthly_summary";

/// Landing dashboard: summary cards, category split, recent trend and the
/// current year by month
#[derive(Debug)]
pub struct DashboardScreen {
    gateway: RequestGateway,
    generation: Generation,
}

impl DashboardScreen {
    pub fn new(gateway: RequestGateway) -> Self {
        Self {
            gateway,
            generation: Generation::new(),
        }
    }

    pub async fn load(&self, explicit_refresh: bool) -> ScreenLoad<DashboardSnapshot> {
        if !self.gateway.session().is_usable() {
            return ScreenLoad::LoginRequired(GatewayError::session_expired("Please log in to continue"));
        }

        let id = self.generation.next();
        let range = DateRange::default();
        let report = Batch::new()
            .add(SUMMARY, self.gateway.get_json(ApiRequest::get(paths::EXPENSE_SUMMARY)))
            .add(CATEGORIES, self.gateway.get_json(requests::categories(&range)))
            .add(TREND, self.gateway.get_json(requests::daily_trend(DEFAULT_TREND_DAYS)))
            .add(MONTHS, self.gateway.get_json(requests::monthly_summary()))
            .run()
            .await;

        if !self.generation.is_current(id) {
            tracing::debug!("Dropping superseded dashboard load {}", id);
            return ScreenLoad::Superseded;
        }
        if let Some(err) = report.session_expired() {
            return ScreenLoad::LoginRequired(err.clone());
        }

        ScreenLoad::Ready(DashboardSnapshot::from_report(id, &report, explicit_refresh))
    }
}

impl DashboardSnapshot {
    /// Statistics come only from the endpoints that answered
    pub fn from_report(generation: u64, report: &BatchReport, explicit_refresh: bool) -> Self {
        let categories: Vec<CategoryBreakdown> = report
            .collection(CATEGORIES)
            .iter()
            .map(CategoryBreakdown::from_row)
            .collect();

        let summary = report.object(SUMMARY).map(Value::Object);
        let totals = match &summary {
            Some(s) => Totals::new(
                number_field(s, "total_amount"),
                count_field(s, "total_expenses"),
            ),
            None => Totals::from_rows(&report.collection(CATEGORIES), "total", Some("count")),
        };
        let today_total = summary.as_ref().map(|s| number_field(s, "today_total")).unwrap_or(0.0);

        let trend = report
            .value(TREND)
            .map(|body| rows(body, DailyTrendPoint::from_row))
            .unwrap_or_default();
        let months = report
            .value(MONTHS)
            .map(|body| rows(body, MonthlyPoint::from_row))
            .unwrap_or_default();
        let month_totals = months
            .iter()
            .fold(Totals::default(), |acc, m| acc.merge(Totals::new(m.total, m.count)));

        Self {
            generation,
            top_category: top_category(&categories),
            totals,
            today_total,
            categories,
            trend,
            months,
            month_totals,
            feedback: report.feedback_by(explicit_refresh, has_activity),
        }
    }
}

/// The summary, trend and monthly endpoints answer an empty account with
/// zero-filled payloads, so only non-zero amounts or counts count as data.
fn has_activity(label: &str, value: &Value) -> bool {
    if label == SUMMARY {
        return extract_object(value)
            .map(Value::Object)
            .is_some_and(|s| count_field(&s, "total_expenses") > 0 || number_field(&s, "total_amount") != 0.0);
    }
    extract_collection(value)
        .iter()
        .any(|row| count_field(row, "count") > 0 || number_field(row, "total") != 0.0)
}

/// Largest category by amount. Its share is recomputed from the category
/// rows when the server did not send one.
pub fn top_category(categories: &[CategoryBreakdown]) -> Option<TopCategory> {
    let grand_total: f64 = categories.iter().map(|c| c.total).sum();
    let top = categories
        .iter()
        .filter(|c| c.total > 0.0)
        .max_by(|a, b| a.total.total_cmp(&b.total))?;

    let percentage = if top.percentage > 0.0 {
        clamp_percentage(top.percentage)
    } else {
        percentage_of(top.total, grand_total)
    };

    Some(TopCategory {
        name: top.category.clone(),
        total: top.total,
        percentage,
    })
}
