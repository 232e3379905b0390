use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_HISTORY_CAP: usize = 10;

/// Informational record of a finished export; not authoritative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportHistoryEntry {
    pub format: String,
    pub report_type: String,
    pub period: String,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
}

impl ExportHistoryEntry {
    pub fn new(
        format: impl Into<String>,
        report_type: impl Into<String>,
        period: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            format: format.into(),
            report_type: report_type.into(),
            period: period.into(),
            filename: filename.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Newest-first list capped to a fixed number of entries
#[derive(Debug, Clone, PartialEq)]
pub struct ExportHistory {
    entries: Vec<ExportHistoryEntry>,
    cap: usize,
}

impl ExportHistory {
    pub fn new(cap: usize) -> Self {
        Self { entries: Vec::new(), cap }
    }

    /// Parse a stored list. Anything that is not a JSON array reads as empty;
    /// individual entries that fail to parse are dropped.
    pub fn from_stored(raw: Option<&str>, cap: usize) -> Self {
        let entries = raw
            .and_then(|raw| serde_json::from_str::<Vec<Value>>(raw).ok())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .take(cap)
            .collect();

        Self { entries, cap }
    }

    pub fn push(&mut self, entry: ExportHistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(self.cap);
    }

    pub fn entries(&self) -> &[ExportHistoryEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ExportHistoryEntry> {
        self.entries
    }

    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> ExportHistoryEntry {
        ExportHistoryEntry::new("csv", "expenses", "month", format!("expenses_{n}.csv"))
    }

    #[test]
    fn test_push_caps_and_orders_newest_first() {
        let mut history = ExportHistory::new(DEFAULT_HISTORY_CAP);
        for n in 0..10 {
            history.push(entry(n));
        }
        assert_eq!(history.entries().len(), 10);

        history.push(entry(10));
        let names: Vec<&str> = history.entries().iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "expenses_10.csv");
        // Oldest (0) evicted
        assert!(!names.contains(&"expenses_0.csv"));
        assert_eq!(names[9], "expenses_1.csv");
    }

    #[test]
    fn test_corrupt_storage_reads_empty() {
        assert!(ExportHistory::from_stored(Some("not json"), 10).entries().is_empty());
        assert!(ExportHistory::from_stored(Some(r#"{"a":1}"#), 10).entries().is_empty());
        assert!(ExportHistory::from_stored(None, 10).entries().is_empty());
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let good = serde_json::to_value(entry(1)).unwrap();
        let raw = serde_json::json!([{"format": 3}, good]).to_string();
        let history = ExportHistory::from_stored(Some(&raw), 10);
        assert_eq!(history.entries().len(), 1);
        assert_eq!(history.entries()[0].filename, "expenses_1.csv");
    }
}
