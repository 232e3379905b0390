use serde_json::Value;

use crate::aggregate::extract_collection_field;
use crate::error::GatewayError;
use crate::gateway::{paths, ApiRequest, RequestGateway};
use crate::models::{
    Category, Expense, ExpenseFilters, ExpensePage, ExpenseSummary, ExpenseUpdate, NewExpense, PaymentMode,
};

#[derive(Debug, Clone)]
pub struct ExpenseService {
    gateway: RequestGateway,
}

impl ExpenseService {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, filters: &ExpenseFilters) -> Result<ExpensePage, GatewayError> {
        let request = ApiRequest::get(paths::EXPENSES)
            .query_opt("start_date", filters.start_date)
            .query_opt("end_date", filters.end_date)
            .query_opt("category_id", filters.category_id)
            .query_opt("payment_mode_id", filters.payment_mode_id)
            .query_opt("limit", filters.limit)
            .query_opt("offset", filters.offset);

        let body = self.gateway.get_json(request).await?;
        Ok(page_from(&body))
    }

    pub async fn get(&self, id: i64) -> Result<Expense, GatewayError> {
        let body = self.gateway.get_json(ApiRequest::get(paths::expense(id))).await?;
        expense_from(body)
    }

    pub async fn create(&self, expense: &NewExpense) -> Result<Expense, GatewayError> {
        expense.validate()?;
        let body = self.gateway.post_json(paths::EXPENSES_ADD, expense).await?;
        expense_from(body)
    }

    pub async fn update(&self, id: i64, changes: &ExpenseUpdate) -> Result<Expense, GatewayError> {
        changes.validate()?;
        let body = self.gateway.put_json(&paths::expense(id), changes).await?;
        expense_from(body)
    }

    pub async fn delete(&self, id: i64) -> Result<(), GatewayError> {
        self.gateway.delete_json(&paths::expense(id)).await.map(|_| ())
    }

    pub async fn categories(&self) -> Result<Vec<Category>, GatewayError> {
        let body = self.gateway.get_json(ApiRequest::get(paths::EXPENSE_CATEGORIES)).await?;
        Ok(parse_rows(&body, "categories"))
    }

    pub async fn payment_modes(&self) -> Result<Vec<PaymentMode>, GatewayError> {
        let body = self.gateway.get_json(ApiRequest::get(paths::EXPENSE_PAYMENT_MODES)).await?;
        Ok(parse_rows(&body, "payment_modes"))
    }

    pub async fn summary(&self, filters: &ExpenseFilters) -> Result<ExpenseSummary, GatewayError> {
        let request = ApiRequest::get(paths::EXPENSE_SUMMARY)
            .query_opt("start_date", filters.start_date)
            .query_opt("end_date", filters.end_date);
        let body = self.gateway.get_json(request).await?;
        Ok(serde_json::from_value(body).unwrap_or_default())
    }
}

/// `{expenses, total_count}` or a bare/`data` list; unreadable rows are skipped
pub fn page_from(body: &Value) -> ExpensePage {
    let expenses: Vec<Expense> = parse_rows(body, "expenses");
    let total_count = body
        .get("total_count")
        .and_then(Value::as_u64)
        .unwrap_or(expenses.len() as u64);

    ExpensePage {
        total_count,
        limit: body.get("limit").and_then(Value::as_u64).map(|n| n as u32),
        offset: body.get("offset").and_then(Value::as_u64).map(|n| n as u32),
        expenses,
    }
}

fn parse_rows<T: serde::de::DeserializeOwned>(body: &Value, key: &str) -> Vec<T> {
    extract_collection_field(body, key)
        .into_iter()
        .filter_map(|row| serde_json::from_value(row).ok())
        .collect()
}

// Single expense, either bare or wrapped in `expense`
fn expense_from(body: Value) -> Result<Expense, GatewayError> {
    let value = match body.get("expense") {
        Some(inner) => inner.clone(),
        None => body,
    };
    Ok(serde_json::from_value(value)?)
}
