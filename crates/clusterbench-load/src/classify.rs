//! Classification of cluster-reported error payloads.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

const DEFAULT_DESCRIPTION: &str = "error occured, check logs for details";

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]").expect("Failed to compile bracket pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationErrorKind {
    Unknown,
    IndexOperation,
    SearchOperation,
}

/// A cluster failure mapped to the benchmark operation that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationError {
    pub kind: OperationErrorKind,
    pub description: String,
    pub operation: Option<&'static str>,
    pub status: Option<i64>,
}

impl OperationError {
    fn unknown() -> Self {
        Self {
            kind: OperationErrorKind::Unknown,
            description: DEFAULT_DESCRIPTION.to_string(),
            operation: None,
            status: None,
        }
    }

    /// Human readable message for reports.
    pub fn message(&self) -> String {
        let operation = self.operation.unwrap_or("unknown operation");
        match (self.kind, self.status) {
            (OperationErrorKind::Unknown, _) => self.description.clone(),
            (_, Some(403)) => format!("permission denied for {operation}. check logs for details"),
            (OperationErrorKind::IndexOperation, Some(500)) => {
                format!("internal server error for {operation}. check logs for details")
            }
            (OperationErrorKind::SearchOperation, Some(500)) => {
                format!("internal server error for {operation} index. check logs for details")
            }
            _ => self.description.clone(),
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for OperationError {}

fn action(token: &str) -> Option<(OperationErrorKind, &'static str)> {
    let mapped = match token {
        "indices:admin/create" => (OperationErrorKind::IndexOperation, "index-create"),
        "indices:admin/delete" => (OperationErrorKind::IndexOperation, "index-delete"),
        "indices:data/write/bulk" => (OperationErrorKind::IndexOperation, "index-append"),
        "indices:admin/refresh" => (OperationErrorKind::IndexOperation, "refresh-after-index"),
        "indices:admin/forcemerge" => (OperationErrorKind::IndexOperation, "force-merge"),
        "indices:data/read/search" => (OperationErrorKind::SearchOperation, "search"),
        _ => return None,
    };
    Some(mapped)
}

/// Classifies an error payload of the form `{"error": {"reason": ...}, "status": ...}`.
///
/// Every bracketed token in the reason is checked and the last recognised
/// action wins. Without a recognised action the error is unknown and carries
/// neither the reason nor the status.
pub fn classify(payload: &Value) -> OperationError {
    let mut classified = OperationError::unknown();
    let Some(reason) = payload
        .get("error")
        .and_then(|error| error.get("reason"))
        .and_then(Value::as_str)
    else {
        return classified;
    };

    for token in BRACKETED.captures_iter(reason).filter_map(|captures| captures.get(1)) {
        if let Some((kind, operation)) = action(token.as_str()) {
            classified.kind = kind;
            classified.operation = Some(operation);
        }
    }
    if classified.kind != OperationErrorKind::Unknown {
        classified.description = reason.to_string();
        classified.status = payload.get("status").and_then(Value::as_i64);
    }
    classified
}
