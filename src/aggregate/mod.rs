//! Partial-failure aggregation for screens that read several independent
//! endpoints at once.
//!
//! All requests in a batch run concurrently and are awaited together; a
//! failed request contributes an empty value and is reported only to the
//! log. Statistics are computed after the whole batch has settled.

pub mod stats;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::{Map, Value};

use crate::error::GatewayError;

pub use stats::{clamp_percentage, count_field, number_field, percentage_of, round2, text_field, Totals};

pub type RequestOutcome = Result<Value, GatewayError>;

/// Ordered set of independent fetches for one screen render
#[derive(Default)]
pub struct Batch<'a> {
    labels: Vec<&'static str>,
    ops: Vec<BoxFuture<'a, RequestOutcome>>,
}

impl<'a> Batch<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(mut self, label: &'static str, op: F) -> Self
    where
        F: Future<Output = RequestOutcome> + Send + 'a,
    {
        self.labels.push(label);
        self.ops.push(op.boxed());
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Wait for every fetch to settle. One failure never cancels the rest.
    pub async fn run(self) -> BatchReport {
        let outcomes = fetch_all(self.ops).await;

        let report = BatchReport {
            entries: self.labels.into_iter().zip(outcomes).collect(),
        };
        for (label, err) in report.failures() {
            tracing::warn!("{} failed: {} ({})", label, err, err.error_code());
        }
        report
    }
}

/// Await every fetch concurrently; outcomes come back in input order
pub async fn fetch_all(ops: Vec<BoxFuture<'_, RequestOutcome>>) -> Vec<RequestOutcome> {
    join_all(ops).await
}

/// Settled outcomes of a batch, in the order they were added
#[derive(Debug)]
pub struct BatchReport {
    entries: Vec<(&'static str, RequestOutcome)>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn outcome(&self, label: &str) -> Option<&RequestOutcome> {
        self.entries.iter().find(|(l, _)| *l == label).map(|(_, o)| o)
    }

    /// Payload of a successful fetch, `None` if it failed or is unknown
    pub fn value(&self, label: &str) -> Option<&Value> {
        self.outcome(label).and_then(|o| o.as_ref().ok())
    }

    /// List-shaped endpoint; failures read as an empty list
    pub fn collection(&self, label: &str) -> Vec<Value> {
        self.value(label).map(extract_collection).unwrap_or_default()
    }

    /// List wrapped under a named key (e.g. `expenses`); failures read as empty
    pub fn collection_field(&self, label: &str, key: &str) -> Vec<Value> {
        self.value(label)
            .map(|v| extract_collection_field(v, key))
            .unwrap_or_default()
    }

    /// Single-object endpoint; failures read as `None`
    pub fn object(&self, label: &str) -> Option<Map<String, Value>> {
        self.value(label).and_then(extract_object)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &GatewayError)> {
        self.entries
            .iter()
            .filter_map(|(label, outcome)| outcome.as_ref().err().map(|e| (*label, e)))
    }

    pub fn failed_labels(&self) -> Vec<&'static str> {
        self.failures().map(|(label, _)| label).collect()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_ok()).count()
    }

    /// A forced logout anywhere in the batch, if one happened
    pub fn session_expired(&self) -> Option<&GatewayError> {
        self.failures().map(|(_, e)| e).find(|e| e.requires_login())
    }

    pub fn has_data(&self) -> bool {
        self.has_data_by(|_, value| has_data(value))
    }

    /// True when any successful payload passes `is_data`. Screens whose
    /// endpoints send zero-filled shapes supply their own test.
    pub fn has_data_by(&self, is_data: impl Fn(&'static str, &Value) -> bool) -> bool {
        self.entries
            .iter()
            .any(|(label, outcome)| matches!(outcome, Ok(value) if is_data(*label, value)))
    }

    pub fn feedback(&self, explicit_refresh: bool) -> RefreshFeedback {
        self.feedback_by(explicit_refresh, |_, value| has_data(value))
    }

    pub fn feedback_by(&self, explicit_refresh: bool, is_data: impl Fn(&'static str, &Value) -> bool) -> RefreshFeedback {
        if !explicit_refresh {
            RefreshFeedback::Silent
        } else if self.has_data_by(is_data) {
            RefreshFeedback::Updated
        } else {
            RefreshFeedback::NothingFound
        }
    }
}

/// What to tell the user after a load. Individual endpoint failures are
/// deliberately not part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshFeedback {
    /// Explicit refresh with at least one endpoint returning data
    Updated,
    /// Explicit refresh where everything came back empty or failed
    NothingFound,
    /// Implicit load, nothing to announce
    Silent,
}

impl RefreshFeedback {
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            RefreshFeedback::Updated => Some("Data refreshed"),
            RefreshFeedback::NothingFound => Some("No data found for the selected period"),
            RefreshFeedback::Silent => None,
        }
    }
}

/// Bare array, or an object wrapping an array under `data`. Any other
/// shape is an empty collection.
pub fn extract_collection(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Like `extract_collection`, but checks `key` first
pub fn extract_collection_field(value: &Value, key: &str) -> Vec<Value> {
    match value.get(key) {
        Some(Value::Array(items)) => items.clone(),
        _ => extract_collection(value),
    }
}

/// Object, or the object under `data`
pub fn extract_object(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => match map.get("data") {
            Some(Value::Object(inner)) => Some(inner.clone()),
            _ => Some(map.clone()),
        },
        _ => None,
    }
}

/// Generic emptiness: null, `[]`, `{}` or `{"data": <empty>}`
pub fn has_data(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => match map.get("data") {
            Some(inner) => has_data(inner),
            None => !map.is_empty(),
        },
        _ => true,
    }
}

/// Monotonic request ids for one screen. Results whose id is no longer
/// current belong to a superseded fetch and are discarded.
#[derive(Debug, Default)]
pub struct Generation {
    latest: AtomicU64,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, id: u64) -> bool {
        self.current() == id
    }
}
