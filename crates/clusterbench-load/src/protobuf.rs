use prost::Message;
use tracing::debug;

use clusterbench_core::WireEncoding;
use clusterbench_proto::{BulkRequest, BulkRequestBody, BulkResponse, OperationContainer};

use crate::error::{ProtocolError, ProtocolResult};
use crate::params::BulkParams;
use crate::protocol::{BulkProtocol, WireRequest, WireResponse};
use crate::stats::{BulkStats, ErrorDetails};

/// Bulk over the gRPC document API. Every document is sent as an index operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufBulkProtocol;

impl ProtobufBulkProtocol {
    pub fn build_request(params: &BulkParams) -> ProtocolResult<BulkRequest> {
        let index = params
            .index
            .clone()
            .ok_or(ProtocolError::MissingParameter("index", WireEncoding::Protobuf))?;

        let request_body = params
            .documents()
            .into_iter()
            .map(|document| BulkRequestBody {
                operation_container: Some(OperationContainer::index()),
                object: document.to_vec(),
            })
            .collect();

        Ok(BulkRequest { index, request_body })
    }

    /// Decodes a response received as raw protobuf bytes.
    pub fn decode_response(bytes: &[u8]) -> ProtocolResult<BulkResponse> {
        Ok(BulkResponse::decode(bytes)?)
    }

    /// Normalizes a response.
    ///
    /// A set `errors` flag fails the whole batch without looking at items,
    /// since this encoding carries no per-item diagnostics worth reporting.
    pub fn build_stats(response: &BulkResponse, params: &BulkParams) -> ProtocolResult<BulkStats> {
        if params.detailed_results {
            return Err(ProtocolError::DetailedResultsUnsupported);
        }

        let mut stats = BulkStats::new(params.index.clone(), params.bulk_size, params.unit.clone());
        let details = ErrorDetails::default();

        if response.errors {
            stats.success_count = Some(0);
            stats.record_errors(params.bulk_size, &details);
        } else {
            let failed = response.items.iter().filter(|item| item.status() > 299).count() as u64;
            let total = response.items.len() as u64;
            stats.took = Some(response.took);
            stats.success_count = Some(total - failed);
            stats.record_errors(failed, &details);
        }

        debug!(index = ?stats.index, errors = stats.error_count, "parsed protobuf bulk response");
        Ok(stats)
    }
}

impl BulkProtocol for ProtobufBulkProtocol {
    fn encoding(&self) -> WireEncoding {
        WireEncoding::Protobuf
    }

    fn build(&self, params: &BulkParams) -> ProtocolResult<WireRequest> {
        Self::build_request(params).map(WireRequest::Protobuf)
    }

    fn parse_stats(&self, response: &WireResponse, params: &BulkParams) -> ProtocolResult<BulkStats> {
        match response {
            WireResponse::Protobuf(response) => Self::build_stats(response, params),
            other => Err(ProtocolError::EncodingMismatch {
                expected: WireEncoding::Protobuf,
                actual: other.encoding(),
            }),
        }
    }
}
