use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::lenient;
use crate::error::GatewayError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentMode {
    #[serde(default)]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub name: String,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

impl PaymentMode {
    /// "GPay - SBI", or just the name without a bank
    pub fn label(&self) -> String {
        if let Some(display) = self.display_name.as_deref().filter(|d| !d.is_empty()) {
            return display.to_string();
        }
        match self.bank_name.as_deref().filter(|b| !b.is_empty()) {
            Some(bank) => format!("{} - {}", self.name, bank),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub payment_mode_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub expense_date: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpensePage {
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub total_count: u64,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSummary {
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_amount: f64,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub total_expenses: u64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub today_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpenseFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_mode_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

/// Body of `POST /api/expenses/add`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewExpense {
    pub category_id: i64,
    pub payment_mode_id: i64,
    pub amount: f64,
    pub description: String,
    /// Defaults to today on the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_date: Option<String>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpenseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_mode_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_date: Option<String>,
}

impl NewExpense {
    pub fn validate(&self) -> Result<(), GatewayError> {
        validate_amount(self.amount)?;
        validate_description(&self.description)?;
        if let Some(date) = &self.expense_date {
            validate_date(date)?;
        }
        Ok(())
    }
}

impl ExpenseUpdate {
    pub fn is_empty(&self) -> bool {
        self == &ExpenseUpdate::default()
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.is_empty() {
            return Err(GatewayError::validation("No changes provided"));
        }
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(date) = &self.expense_date {
            validate_date(date)?;
        }
        Ok(())
    }
}

fn validate_amount(amount: f64) -> Result<(), GatewayError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(GatewayError::validation("Amount must be greater than 0"));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), GatewayError> {
    if description.trim().is_empty() {
        return Err(GatewayError::validation("Description is required"));
    }
    Ok(())
}

fn validate_date(date: &str) -> Result<(), GatewayError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| GatewayError::validation("Invalid date format. Use YYYY-MM-DD"))
}
