use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::aggregate::extract_collection;
use crate::error::GatewayError;
use crate::gateway::{paths, ApiRequest, RequestGateway};
use crate::models::{CategoryBreakdown, CrossTabRow, DailyTrendPoint, MonthlyPoint, PaymentBreakdown};

pub const DEFAULT_TREND_DAYS: u32 = 7;

/// Optional inclusive date filter shared by the breakdown endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .query_opt("start_date", self.start)
            .query_opt("end_date", self.end)
    }
}

/// Request builders, shared with the screens that batch these endpoints
pub mod requests {
    use super::*;

    pub fn categories(range: &DateRange) -> ApiRequest {
        range.apply(ApiRequest::get(paths::ANALYTICS_CATEGORIES))
    }

    pub fn payment_modes(range: &DateRange) -> ApiRequest {
        range.apply(ApiRequest::get(paths::ANALYTICS_PAYMENT_MODES))
    }

    pub fn cross_tab(range: &DateRange) -> ApiRequest {
        range.apply(ApiRequest::get(paths::ANALYTICS_CROSS_TAB))
    }

    pub fn daily_trend(days: u32) -> ApiRequest {
        ApiRequest::get(paths::ANALYTICS_DAILY_TREND).query("days", days.max(1))
    }

    pub fn monthly_summary() -> ApiRequest {
        ApiRequest::get(paths::ANALYTICS_MONTHLY_SUMMARY)
    }
}

/// Typed readers over the analytics endpoints
#[derive(Debug, Clone)]
pub struct AnalyticsService {
    gateway: RequestGateway,
}

impl AnalyticsService {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    pub async fn categories(&self, range: &DateRange) -> Result<Vec<CategoryBreakdown>, GatewayError> {
        let body = self.gateway.get_json(requests::categories(range)).await?;
        Ok(rows(&body, CategoryBreakdown::from_row))
    }

    pub async fn payment_modes(&self, range: &DateRange) -> Result<Vec<PaymentBreakdown>, GatewayError> {
        let body = self.gateway.get_json(requests::payment_modes(range)).await?;
        Ok(rows(&body, PaymentBreakdown::from_row))
    }

    pub async fn cross_tab(&self, range: &DateRange) -> Result<Vec<CrossTabRow>, GatewayError> {
        let body = self.gateway.get_json(requests::cross_tab(range)).await?;
        Ok(rows(&body, CrossTabRow::from_row))
    }

    pub async fn daily_trend(&self, days: u32) -> Result<Vec<DailyTrendPoint>, GatewayError> {
        let body = self.gateway.get_json(requests::daily_trend(days)).await?;
        Ok(rows(&body, DailyTrendPoint::from_row))
    }

    pub async fn monthly_summary(&self) -> Result<Vec<MonthlyPoint>, GatewayError> {
        let body = self.gateway.get_json(requests::monthly_summary()).await?;
        Ok(rows(&body, MonthlyPoint::from_row))
    }
}

pub fn rows<T>(body: &Value, parse: fn(&Value) -> T) -> Vec<T> {
    extract_collection(body).iter().map(parse).collect()
}
