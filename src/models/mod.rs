/// Wire models for the expense backend
pub mod analytics;
pub mod expense;
pub mod lenient;

pub use analytics::{
    AiAnswer, AiContext, CategoryBreakdown, CrossTabCell, CrossTabRow, DailyTrendPoint, MonthlyPoint,
    PaymentBreakdown, Suggestions,
};
pub use expense::{
    Category, Expense, ExpenseFilters, ExpensePage, ExpenseSummary, ExpenseUpdate, NewExpense, PaymentMode,
};
