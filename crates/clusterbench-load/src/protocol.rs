//! Bulk request builders, one per wire encoding.

use bytes::Bytes;

use clusterbench_core::WireEncoding;
use clusterbench_proto::{BulkRequest, BulkResponse};

use crate::error::ProtocolResult;
use crate::json::JsonBulkProtocol;
use crate::params::BulkParams;
use crate::protobuf::ProtobufBulkProtocol;
use crate::stats::BulkStats;

/// A bulk request ready to hand to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum WireRequest {
    Protobuf(BulkRequest),
    /// Newline-delimited body for the REST bulk endpoint.
    Json { index: Option<String>, body: Bytes },
}

impl WireRequest {
    pub fn encoding(&self) -> WireEncoding {
        match self {
            Self::Protobuf(_) => WireEncoding::Protobuf,
            Self::Json { .. } => WireEncoding::Json,
        }
    }
}

/// A bulk response as returned by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum WireResponse {
    Protobuf(BulkResponse),
    /// Raw JSON body, parsed lazily.
    Json(Bytes),
}

impl WireResponse {
    pub fn encoding(&self) -> WireEncoding {
        match self {
            Self::Protobuf(_) => WireEncoding::Protobuf,
            Self::Json(_) => WireEncoding::Json,
        }
    }
}

/// Builds bulk requests and normalizes bulk responses for one encoding.
///
/// Implementations are stateless and shared across concurrent bulk calls.
pub trait BulkProtocol: Send + Sync {
    fn encoding(&self) -> WireEncoding;

    fn build(&self, params: &BulkParams) -> ProtocolResult<WireRequest>;

    fn parse_stats(&self, response: &WireResponse, params: &BulkParams) -> ProtocolResult<BulkStats>;
}

/// Protocol implementation for the configured encoding.
pub fn protocol_for(encoding: WireEncoding) -> Box<dyn BulkProtocol> {
    match encoding {
        WireEncoding::Json => Box::new(JsonBulkProtocol),
        WireEncoding::Protobuf => Box::new(ProtobufBulkProtocol),
    }
}
