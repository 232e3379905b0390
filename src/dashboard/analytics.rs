use serde::Serialize;

use super::ScreenLoad;
use crate::aggregate::{percentage_of, Batch, BatchReport, Generation, RefreshFeedback, Totals};
use crate::error::GatewayError;
use crate::gateway::RequestGateway;
use crate::models::{CategoryBreakdown, CrossTabRow, PaymentBreakdown};
use crate::services::analytics_service::{requests, rows, DateRange};

const CATEGORIES: &str = "categories";
const PAYMENT_MODES: &str = "payment_modes";
const CROSS_TAB: &str = "cross_tab";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSnapshot {
    pub generation: u64,
    pub range: DateRange,
    pub categories: Vec<CategoryBreakdown>,
    pub payment_modes: Vec<PaymentBreakdown>,
    pub cross_tab: Vec<CrossTabRow>,
    pub category_totals: Totals,
    pub payment_totals: Totals,
    #[serde(skip)]
    pub feedback: RefreshFeedback,
}

/// Breakdown screen filtered by an optional date range
#[derive(Debug)]
pub struct AnalyticsScreen {
    gateway: RequestGateway,
    generation: Generation,
}

impl AnalyticsScreen {
    pub fn new(gateway: RequestGateway) -> Self {
        Self {
            gateway,
            generation: Generation::new(),
        }
    }

    /// Changing the range while a load is in flight supersedes it
    pub async fn load(&self, range: DateRange, explicit_refresh: bool) -> ScreenLoad<AnalyticsSnapshot> {
        if !self.gateway.session().is_usable() {
            return ScreenLoad::LoginRequired(GatewayError::session_expired("Please log in to continue"));
        }

        let id = self.generation.next();
        let report = Batch::new()
            .add(CATEGORIES, self.gateway.get_json(requests::categories(&range)))
            .add(PAYMENT_MODES, self.gateway.get_json(requests::payment_modes(&range)))
            .add(CROSS_TAB, self.gateway.get_json(requests::cross_tab(&range)))
            .run()
            .await;

        if !self.generation.is_current(id) {
            tracing::debug!("Dropping superseded analytics load {}", id);
            return ScreenLoad::Superseded;
        }
        if let Some(err) = report.session_expired() {
            return ScreenLoad::LoginRequired(err.clone());
        }

        ScreenLoad::Ready(AnalyticsSnapshot::from_report(id, range, &report, explicit_refresh))
    }
}

impl AnalyticsSnapshot {
    pub fn from_report(generation: u64, range: DateRange, report: &BatchReport, explicit_refresh: bool) -> Self {
        let mut categories = report
            .value(CATEGORIES)
            .map(|body| rows(body, CategoryBreakdown::from_row))
            .unwrap_or_default();
        let mut payment_modes = report
            .value(PAYMENT_MODES)
            .map(|body| rows(body, PaymentBreakdown::from_row))
            .unwrap_or_default();
        let cross_tab = report
            .value(CROSS_TAB)
            .map(|body| rows(body, CrossTabRow::from_row))
            .unwrap_or_default();

        let category_totals = categories
            .iter()
            .fold(Totals::default(), |acc, c| acc.merge(Totals::new(c.total, c.count)));
        let payment_totals = payment_modes
            .iter()
            .fold(Totals::default(), |acc, p| acc.merge(Totals::new(p.total, p.count)));

        // Shares the server left out are derived from the rows we have
        for row in categories.iter_mut().filter(|r| r.percentage == 0.0) {
            row.percentage = percentage_of(row.total, category_totals.total);
        }
        for row in payment_modes.iter_mut().filter(|r| r.percentage == 0.0) {
            row.percentage = percentage_of(row.total, payment_totals.total);
        }

        Self {
            generation,
            range,
            categories,
            payment_modes,
            cross_tab,
            category_totals,
            payment_totals,
            feedback: report.feedback(explicit_refresh),
        }
    }
}
