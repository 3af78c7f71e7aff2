use thiserror::Error;

use clusterbench_core::WireEncoding;

/// Failures building or reading bulk wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Detailed results not supported for gRPC bulk requests")]
    DetailedResultsUnsupported,

    #[error("parameter [{0}] is required for {1:?} bulk requests")]
    MissingParameter(&'static str, WireEncoding),

    #[error("could not decode bulk response: {0}")]
    Decode(String),

    #[error("expected a {expected:?} message but got {actual:?}")]
    EncodingMismatch {
        expected: WireEncoding,
        actual: WireEncoding,
    },
}

impl From<prost::DecodeError> for ProtocolError {
    fn from(err: prost::DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
