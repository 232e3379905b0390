/// Backend route table
pub mod paths {
    pub const AUTH_LOGIN: &str = "/api/auth/login";
    pub const AUTH_REGISTER: &str = "/api/auth/register";
    pub const AUTH_LOGOUT: &str = "/api/auth/logout";
    pub const AUTH_ME: &str = "/api/auth/me";
    pub const AUTH_REFRESH: &str = "/api/auth/refresh";

    pub const EXPENSES: &str = "/api/expenses";
    pub const EXPENSES_ADD: &str = "/api/expenses/add";
    pub const EXPENSE_CATEGORIES: &str = "/api/expenses/categories";
    pub const EXPENSE_PAYMENT_MODES: &str = "/api/expenses/payment-modes";
    pub const EXPENSE_SUMMARY: &str = "/api/expenses/summary";

    pub const ANALYTICS_CATEGORIES: &str = "/api/analytics/categories-vs-expenses";
    pub const ANALYTICS_PAYMENT_MODES: &str = "/api/analytics/payment-modes-vs-expenses";
    pub const ANALYTICS_CROSS_TAB: &str = "/api/analytics/payment-modes-vs-categories";
    pub const ANALYTICS_DAILY_TREND: &str = "/api/analytics/daily-trend";
    pub const ANALYTICS_MONTHLY_SUMMARY: &str = "/api/analytics/monthly-summary";

    pub const AI_QUERY: &str = "/api/ai/query";
    pub const AI_SUGGESTIONS: &str = "/api/ai/suggestions";

    pub const EXPORT_CSV: &str = "/api/export/csv";
    pub const EXPORT_PDF: &str = "/api/export/pdf";

    pub fn expense(id: i64) -> String {
        format!("{}/{}", EXPENSES, id)
    }
}

const AUTH_PREFIX: &str = "/api/auth/";

/// Whether a 401 on a route means the whole session is invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteScope {
    /// login, register, logout, me, refresh
    Authentication,
    /// Business data; a 401 here may have other causes
    Business,
}

impl RouteScope {
    pub fn classify(path: &str) -> Self {
        let path = path.split('?').next().unwrap_or(path);
        let normalized = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        if normalized.starts_with(AUTH_PREFIX) {
            RouteScope::Authentication
        } else {
            RouteScope::Business
        }
    }
}
