use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Uniform result record of one bulk call.
///
/// `took` and `success-count` are always present, `null` when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BulkStats {
    pub index: Option<String>,
    pub weight: u64,
    pub unit: String,
    pub took: Option<i64>,
    pub success: bool,
    pub success_count: Option<u64>,
    pub error_count: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_description: Option<String>,
    /// Per operation: `item-count` and one counter per reported result.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ops: Option<BTreeMap<String, BTreeMap<String, u64>>>,
    #[serde(rename = "shards_histogram", skip_serializing_if = "Option::is_none", default)]
    pub shards_histogram: Option<Vec<ShardHistogramEntry>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bulk_request_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_document_size_bytes: Option<u64>,
    #[serde(rename = "ingest_took", skip_serializing_if = "Option::is_none", default)]
    pub ingest_took: Option<i64>,
}

impl BulkStats {
    /// Record with no counts filled in yet.
    pub fn new(index: Option<String>, weight: u64, unit: impl Into<String>) -> Self {
        Self {
            index,
            weight,
            unit: unit.into(),
            took: None,
            success: true,
            success_count: None,
            error_count: 0,
            error_type: None,
            error_description: None,
            ops: None,
            shards_histogram: None,
            bulk_request_size_bytes: None,
            total_document_size_bytes: None,
            ingest_took: None,
        }
    }

    /// Sets the error counters, marking the record failed when `error_count > 0`.
    pub fn record_errors(&mut self, error_count: u64, details: &ErrorDetails) {
        self.error_count = error_count;
        self.success = error_count == 0;
        if error_count > 0 {
            self.error_type = Some("bulk".to_string());
            if !details.is_empty() {
                self.error_description = Some(details.description());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardCounts {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
}

impl ShardCounts {
    /// Histogram key, `total-successful-failed`.
    pub fn key(&self) -> String {
        format!("{}-{}-{}", self.total, self.successful, self.failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShardHistogramEntry {
    pub item_count: u64,
    pub shards: ShardCounts,
}

/// Distinct `(status, reason)` pairs of failed items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetails(BTreeSet<(i64, Option<String>)>);

impl ErrorDetails {
    pub fn add(&mut self, status: i64, reason: Option<String>) {
        self.0.insert((status, reason));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn description(&self) -> String {
        self.0
            .iter()
            .map(|(status, reason)| match reason {
                Some(reason) => format!("HTTP status: {status}, message: {reason}"),
                None => format!("HTTP status: {status}"),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}
