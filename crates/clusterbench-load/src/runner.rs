use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use clusterbench_core::WireEncoding;

use crate::classify::{classify, OperationError};
use crate::error::ProtocolResult;
use crate::params::BulkParams;
use crate::protocol::{protocol_for, BulkProtocol, WireRequest, WireResponse};
use crate::stats::BulkStats;

/// Sends bulk requests to the cluster.
///
/// A rejected call returns the cluster's error payload,
/// e.g. `{"error": {"reason": ...}, "status": 403}`.
#[async_trait]
pub trait BulkTransport: Send + Sync {
    async fn bulk(&self, request: WireRequest) -> Result<WireResponse, Value>;
}

/// Result of one bulk call.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOutcome {
    Stats(BulkStats),
    Failed(OperationError),
}

/// Builds a request, sends it and normalizes whatever comes back.
pub struct BulkRunner<T> {
    protocol: Box<dyn BulkProtocol>,
    transport: T,
}

impl<T: BulkTransport> BulkRunner<T> {
    pub fn new(encoding: WireEncoding, transport: T) -> Self {
        Self {
            protocol: protocol_for(encoding),
            transport,
        }
    }

    pub fn encoding(&self) -> WireEncoding {
        self.protocol.encoding()
    }

    /// Cluster-reported failures become [`BulkOutcome::Failed`]; only protocol
    /// misuse, such as asking for detailed protobuf results, is an error.
    pub async fn run(&self, params: &BulkParams) -> ProtocolResult<BulkOutcome> {
        let request = self.protocol.build(params)?;

        match self.transport.bulk(request).await {
            Ok(response) => {
                let stats = self.protocol.parse_stats(&response, params)?;
                debug!(index = ?stats.index, success = stats.success, took = ?stats.took, "bulk finished");
                Ok(BulkOutcome::Stats(stats))
            }
            Err(payload) => {
                let error = classify(&payload);
                warn!(index = ?params.index, operation = ?error.operation, status = ?error.status, "{}", error.message());
                Ok(BulkOutcome::Failed(error))
            }
        }
    }
}
