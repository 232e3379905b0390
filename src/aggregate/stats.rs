use serde::Serialize;
use serde_json::Value;

/// Numeric field of a row. Numbers and numeric strings are read,
/// everything else (missing, null, text, NaN) counts as zero.
pub fn number_field(row: &Value, key: &str) -> f64 {
    let value = match row.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Non-negative integer field, same leniency as `number_field`
pub fn count_field(row: &Value, key: &str) -> u64 {
    let n = number_field(row, key);
    if n > 0.0 {
        n.round() as u64
    } else {
        0
    }
}

pub fn text_field(row: &Value, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Display percentage limited to `[0, 100]`
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

pub fn percentage_of(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 0.0;
    }
    clamp_percentage(round2(part / whole * 100.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sum, count and guarded average over a set of rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub total: f64,
    pub count: u64,
    pub average: f64,
}

impl Totals {
    pub fn new(total: f64, count: u64) -> Self {
        let average = if count == 0 { 0.0 } else { total / count as f64 };
        Self { total, count, average }
    }

    /// Copy with total and average rounded to cents, for display
    pub fn rounded(self) -> Self {
        Self {
            total: round2(self.total),
            count: self.count,
            average: round2(self.average),
        }
    }

    /// Sum `amount_key` across rows. With a `count_key` each row
    /// contributes that many transactions, otherwise one.
    pub fn from_rows(rows: &[Value], amount_key: &str, count_key: Option<&str>) -> Self {
        let total = rows.iter().map(|row| number_field(row, amount_key)).sum();
        let count = match count_key {
            Some(key) => rows.iter().map(|row| count_field(row, key)).sum(),
            None => rows.len() as u64,
        };
        Self::new(total, count)
    }

    pub fn merge(self, other: Totals) -> Self {
        Self::new(self.total + other.total, self.count + other.count)
    }
}
