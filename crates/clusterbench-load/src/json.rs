use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use clusterbench_core::WireEncoding;

use crate::error::{ProtocolError, ProtocolResult};
use crate::params::BulkParams;
use crate::protocol::{BulkProtocol, WireRequest, WireResponse};
use crate::stats::{BulkStats, ErrorDetails, ShardCounts, ShardHistogramEntry};

/// Bulk over the REST API with a newline-delimited JSON body.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBulkProtocol;

/// Only the fields needed when no item failed.
#[derive(Deserialize)]
struct ResponseSummary {
    #[serde(default)]
    errors: bool,
    took: Option<i64>,
}

#[derive(Deserialize)]
struct Response {
    took: Option<i64>,
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<BTreeMap<String, ItemResult>>,
    ingest_took: Option<i64>,
}

#[derive(Deserialize)]
struct ItemResult {
    status: i64,
    result: Option<String>,
    #[serde(rename = "_shards")]
    shards: Option<ShardCounts>,
    error: Option<Value>,
}

impl ItemResult {
    fn failed(&self) -> bool {
        self.status > 299 || self.shards.is_some_and(|shards| shards.failed > 0)
    }

    fn record(&self, details: &mut ErrorDetails) {
        let reason = match &self.error {
            None | Some(Value::Null) => None,
            Some(Value::Object(error)) => error.get("reason").and_then(Value::as_str).map(str::to_string),
            Some(Value::String(error)) => Some(error.clone()),
            Some(other) => Some(other.to_string()),
        };
        details.add(self.status, reason);
    }
}

impl JsonBulkProtocol {
    /// Counts successes and failures.
    ///
    /// Items are only parsed when the response reports errors. Without errors the
    /// success count is known only when the bulk size is counted in documents.
    pub fn simple_stats(body: &[u8], params: &BulkParams) -> ProtocolResult<BulkStats> {
        let summary: ResponseSummary = serde_json::from_slice(body).map_err(decode_error)?;
        let mut stats = BulkStats::new(params.index.clone(), params.bulk_size, params.unit.clone());
        stats.took = summary.took;
        stats.success_count = (params.unit == "docs").then_some(params.bulk_size);

        if summary.errors {
            let response: Response = serde_json::from_slice(body).map_err(decode_error)?;
            let mut details = ErrorDetails::default();
            let mut succeeded = 0;
            let mut failed = 0;

            for data in response.items.iter().filter_map(|item| item.values().next()) {
                if data.failed() {
                    failed += 1;
                    data.record(&mut details);
                } else {
                    succeeded += 1;
                }
            }
            record_outcome(&mut stats, params, succeeded, failed, &details);
        }
        Ok(stats)
    }

    /// Full per-item analysis: operation counters, shard histogram and request sizes.
    pub fn detailed_stats(body: &[u8], params: &BulkParams) -> ProtocolResult<BulkStats> {
        let response: Response = serde_json::from_slice(body).map_err(decode_error)?;
        let mut stats = BulkStats::new(params.index.clone(), params.bulk_size, params.unit.clone());

        let lines = params.lines();
        let request_size: usize = lines.iter().map(|line| line.len()).sum();
        let document_size: usize = params.documents().iter().map(|line| line.len()).sum();

        let mut ops: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
        let mut histogram: Vec<ShardHistogramEntry> = Vec::new();
        let mut details = ErrorDetails::default();
        let mut succeeded = 0;
        let mut failed = 0;

        for (op, data) in response.items.iter().filter_map(|item| item.iter().next()) {
            let counters = ops.entry(op.clone()).or_default();
            *counters.entry("item-count".to_string()).or_default() += 1;
            if let Some(result) = &data.result {
                *counters.entry(result.clone()).or_default() += 1;
            }

            if let Some(shards) = data.shards {
                match histogram.iter_mut().find(|entry| entry.shards.key() == shards.key()) {
                    Some(entry) => entry.item_count += 1,
                    None => histogram.push(ShardHistogramEntry { item_count: 1, shards }),
                }
            }

            if data.failed() {
                failed += 1;
                data.record(&mut details);
            } else {
                succeeded += 1;
            }
        }

        stats.took = response.took;
        if response.errors {
            record_outcome(&mut stats, params, succeeded, failed, &details);
        } else {
            stats.success_count = Some(succeeded);
            stats.record_errors(failed, &details);
        }
        stats.ops = Some(ops);
        stats.shards_histogram = Some(histogram);
        stats.bulk_request_size_bytes = Some(request_size as u64);
        stats.total_document_size_bytes = Some(document_size as u64);
        stats.ingest_took = response.ingest_took;
        Ok(stats)
    }
}

/// Applies the item counts of a response flagged with `errors`.
///
/// When no failed item can be found the whole batch counts as failed.
fn record_outcome(
    stats: &mut BulkStats,
    params: &BulkParams,
    succeeded: u64,
    failed: u64,
    details: &ErrorDetails,
) {
    if failed == 0 {
        warn!(index = ?params.index, "response reports errors without failed items, counting batch as failed");
        stats.success_count = Some(0);
        stats.record_errors(params.bulk_size, details);
    } else {
        stats.success_count = Some(succeeded);
        stats.record_errors(failed, details);
    }
}

fn decode_error(err: serde_json::Error) -> ProtocolError {
    ProtocolError::Decode(err.to_string())
}

impl BulkProtocol for JsonBulkProtocol {
    fn encoding(&self) -> WireEncoding {
        WireEncoding::Json
    }

    fn build(&self, params: &BulkParams) -> ProtocolResult<WireRequest> {
        Ok(WireRequest::Json {
            index: params.index.clone(),
            body: params.body.clone(),
        })
    }

    /// Unreadable bodies are reported as a failed batch rather than an error.
    fn parse_stats(&self, response: &WireResponse, params: &BulkParams) -> ProtocolResult<BulkStats> {
        let WireResponse::Json(body) = response else {
            return Err(ProtocolError::EncodingMismatch {
                expected: WireEncoding::Json,
                actual: response.encoding(),
            });
        };

        let parsed = if params.detailed_results {
            Self::detailed_stats(body, params)
        } else {
            Self::simple_stats(body, params)
        };

        match parsed {
            Ok(stats) => {
                debug!(index = ?stats.index, errors = stats.error_count, "parsed json bulk response");
                Ok(stats)
            }
            Err(err) => {
                warn!(index = ?params.index, %err, "unreadable bulk response, counting batch as failed");
                let mut stats = BulkStats::new(params.index.clone(), params.bulk_size, params.unit.clone());
                stats.success_count = Some(0);
                stats.record_errors(params.bulk_size, &ErrorDetails::default());
                stats.error_description = Some(err.to_string());
                Ok(stats)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    const BODY: &[u8] = b"{\"index\":{\"_index\":\"logs\"}}\n{\"msg\":\"a\"}\n{\"index\":{\"_index\":\"logs\"}}\n{\"msg\":\"bb\"}\n";

    fn params(unit: &str) -> BulkParams {
        BulkParams::new("logs", BODY, 2, unit)
    }

    fn parse(response: serde_json::Value, params: &BulkParams) -> BulkStats {
        let body = Bytes::from(serde_json::to_vec(&response).unwrap());
        JsonBulkProtocol.parse_stats(&WireResponse::Json(body), params).unwrap()
    }

    #[test]
    fn test_build_forwards_body() {
        let request = JsonBulkProtocol.build(&params("docs")).unwrap();
        assert_eq!(
            request,
            WireRequest::Json {
                index: Some("logs".to_string()),
                body: Bytes::from_static(BODY),
            }
        );
    }

    #[test]
    fn test_simple_stats_without_errors() {
        let stats = parse(json!({"took": 30, "errors": false, "items": []}), &params("docs"));
        assert_eq!(stats.took, Some(30));
        assert_eq!(stats.success_count, Some(2));
        assert!(stats.success);

        // success count unknown unless counted in docs
        let stats = parse(json!({"took": 30, "errors": false}), &params("ops"));
        assert_eq!(stats.success_count, None);
    }

    #[test]
    fn test_simple_stats_with_errors() {
        let response = json!({
            "took": 30,
            "errors": true,
            "items": [
                {"index": {"status": 201, "_shards": {"total": 2, "successful": 2, "failed": 0}}},
                {"index": {"status": 400, "error": {"type": "mapper_parsing_exception", "reason": "failed to parse"}}},
                {"create": {"status": 201, "_shards": {"total": 2, "successful": 1, "failed": 1}}}
            ]
        });
        let stats = parse(response, &params("docs"));

        assert!(!stats.success);
        assert_eq!(stats.success_count, Some(1));
        assert_eq!(stats.error_count, 2);
        assert_eq!(stats.error_type.as_deref(), Some("bulk"));
        assert_eq!(
            stats.error_description.as_deref(),
            Some("HTTP status: 201; HTTP status: 400, message: failed to parse")
        );
    }

    #[test]
    fn test_errors_without_failed_items_fail_batch() {
        let params = BulkParams::new("logs", BODY, 5, "docs");

        let stats = parse(json!({"took": 3, "errors": true}), &params);
        assert!(!stats.success);
        assert_eq!(stats.error_count, 5);
        assert_eq!(stats.success_count, Some(0));
        assert_eq!(stats.error_type.as_deref(), Some("bulk"));
        assert_eq!(stats.took, Some(3));

        let stats = parse(
            json!({"took": 3, "errors": true, "items": [{"index": {"status": 201}}]}),
            &params.clone().with_detailed_results(true),
        );
        assert!(!stats.success);
        assert_eq!(stats.error_count, 5);
        assert_eq!(stats.success_count, Some(0));
    }

    #[test]
    fn test_detailed_stats() {
        let response = json!({
            "took": 12,
            "ingest_took": 4,
            "errors": false,
            "items": [
                {"index": {"status": 201, "result": "created", "_shards": {"total": 2, "successful": 2, "failed": 0}}},
                {"index": {"status": 200, "result": "updated", "_shards": {"total": 2, "successful": 2, "failed": 0}}}
            ]
        });
        let stats = parse(response, &params("docs").with_detailed_results(true));

        let ops = stats.ops.unwrap();
        assert_eq!(ops["index"]["item-count"], 2);
        assert_eq!(ops["index"]["created"], 1);
        assert_eq!(ops["index"]["updated"], 1);

        let histogram = stats.shards_histogram.unwrap();
        assert_eq!(histogram.len(), 1);
        assert_eq!(histogram[0].item_count, 2);
        assert_eq!(histogram[0].shards.key(), "2-2-0");

        assert_eq!(stats.total_document_size_bytes, Some(23));
        assert_eq!(stats.bulk_request_size_bytes, Some(23 + 2 * 27));
        assert_eq!(stats.ingest_took, Some(4));
        assert_eq!(stats.success_count, Some(2));
    }

    #[test]
    fn test_unreadable_response_fails_batch() {
        let stats = JsonBulkProtocol
            .parse_stats(&WireResponse::Json(Bytes::from_static(b"<html>")), &params("docs"))
            .unwrap();

        assert!(!stats.success);
        assert_eq!(stats.error_count, 2);
        assert_eq!(stats.success_count, Some(0));
    }

    #[test]
    fn test_encoding_mismatch() {
        let err = JsonBulkProtocol
            .parse_stats(
                &WireResponse::Protobuf(clusterbench_proto::BulkResponse::default()),
                &params("docs"),
            )
            .unwrap_err();
        assert!(matches!(err, ProtocolError::EncodingMismatch { .. }));
    }
}
