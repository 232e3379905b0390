use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lenient;
use crate::aggregate::{clamp_percentage, count_field, number_field, text_field};

/// Row of `categories-vs-expenses`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub color: Option<String>,
    pub total: f64,
    pub count: u64,
    pub percentage: f64,
}

impl CategoryBreakdown {
    pub fn from_row(row: &Value) -> Self {
        Self {
            category: non_empty_or(text_field(row, "category"), "Uncategorized"),
            color: row.get("color").and_then(Value::as_str).map(str::to_string),
            total: number_field(row, "total"),
            count: count_field(row, "count"),
            percentage: clamp_percentage(number_field(row, "percentage")),
        }
    }
}

/// Row of `payment-modes-vs-expenses`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaymentBreakdown {
    /// Display label, e.g. "GPay - SBI"
    pub label: String,
    pub payment_mode: String,
    pub bank_name: Option<String>,
    pub total: f64,
    pub count: u64,
    pub percentage: f64,
}

impl PaymentBreakdown {
    pub fn from_row(row: &Value) -> Self {
        let payment_mode = text_field(row, "payment_mode");
        let label = match text_field(row, "paymentmode") {
            label if !label.is_empty() => label,
            _ => non_empty_or(payment_mode.clone(), "Unknown"),
        };

        Self {
            label,
            payment_mode,
            bank_name: row.get("bank_name").and_then(Value::as_str).map(str::to_string),
            total: number_field(row, "total"),
            count: count_field(row, "count"),
            percentage: clamp_percentage(number_field(row, "percentage")),
        }
    }
}

/// One category of `payment-modes-vs-categories`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrossTabRow {
    pub category: String,
    pub payments: Vec<CrossTabCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrossTabCell {
    pub payment_mode: String,
    pub total: f64,
    pub count: u64,
}

impl CrossTabRow {
    /// `payments` is a map of label to `{total, count}`; other shapes read as empty
    pub fn from_row(row: &Value) -> Self {
        let payments = match row.get("payments") {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(label, cell)| CrossTabCell {
                    payment_mode: label.clone(),
                    total: number_field(cell, "total"),
                    count: count_field(cell, "count"),
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            category: non_empty_or(text_field(row, "category"), "Uncategorized"),
            payments,
        }
    }

    pub fn total(&self) -> f64 {
        self.payments.iter().map(|p| p.total).sum()
    }
}

/// Day of `daily-trend`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyTrendPoint {
    pub date: String,
    pub dayname: String,
    pub total: f64,
    pub count: u64,
    pub average: f64,
}

impl DailyTrendPoint {
    pub fn from_row(row: &Value) -> Self {
        Self {
            date: text_field(row, "date"),
            dayname: text_field(row, "dayname"),
            total: number_field(row, "total"),
            count: count_field(row, "count"),
            average: number_field(row, "average"),
        }
    }
}

/// Month of `monthly-summary`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub month_number: u32,
    pub total: f64,
    pub count: u64,
    pub average: f64,
}

impl MonthlyPoint {
    pub fn from_row(row: &Value) -> Self {
        Self {
            month: text_field(row, "month"),
            month_number: count_field(row, "month_number") as u32,
            total: number_field(row, "total"),
            count: count_field(row, "count"),
            average: number_field(row, "average"),
        }
    }
}

/// Answer from `POST /api/ai/query`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiAnswer {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub query: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub answer: String,
    #[serde(default)]
    pub context: Option<AiContext>,
    /// Set when the model was unavailable and the server's fallback text is shown
    #[serde(default)]
    pub is_fallback: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiContext {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub period: String,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_expenses: f64,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub expense_count: u64,
}

/// Response of `GET /api/ai/suggestions`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    #[serde(default, deserialize_with = "lenient::lines")]
    pub suggestions: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub period: String,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_analyzed: f64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub is_ai_generated: bool,
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
