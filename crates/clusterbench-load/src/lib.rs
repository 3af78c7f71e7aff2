//! Load execution and diagnostics for ClusterBench.
//!
//! Builds bulk requests for the REST (newline-delimited JSON) and gRPC
//! (protobuf) encodings, normalizes bulk responses into [`BulkStats`] and maps
//! cluster error payloads to [`OperationError`]s.

pub mod classify;
pub mod error;
pub mod json;
pub mod params;
pub mod protobuf;
pub mod protocol;
pub mod runner;
pub mod stats;

pub use classify::{classify, OperationError, OperationErrorKind};
pub use error::{ProtocolError, ProtocolResult};
pub use json::JsonBulkProtocol;
pub use params::BulkParams;
pub use protobuf::ProtobufBulkProtocol;
pub use protocol::{protocol_for, BulkProtocol, WireRequest, WireResponse};
pub use runner::{BulkOutcome, BulkRunner, BulkTransport};
pub use stats::{BulkStats, ErrorDetails, ShardCounts, ShardHistogramEntry};
