use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;

use clusterbench_core::WireEncoding;
use clusterbench_load::{protocol_for, BulkParams, BulkStats, ProtobufBulkProtocol, WireResponse};

/// Request and response files captured from one bulk call.
pub struct CapturedBulk<'a> {
    pub index: &'a str,
    pub request: &'a Path,
    pub response: &'a Path,
    pub bulk_size: u64,
    pub unit: &'a str,
    pub detailed: bool,
}

pub fn stats(encoding: WireEncoding, captured: &CapturedBulk<'_>) -> Result<()> {
    let request = std::fs::read(captured.request)
        .with_context(|| format!("failed to read {}", captured.request.display()))?;
    let response = std::fs::read(captured.response)
        .with_context(|| format!("failed to read {}", captured.response.display()))?;

    let params = BulkParams::new(captured.index, request, captured.bulk_size, captured.unit)
        .with_detailed_results(captured.detailed);
    let stats = normalize(encoding, &params, response)?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Normalizes a raw bulk response body with the protocol of `encoding`.
fn normalize(encoding: WireEncoding, params: &BulkParams, response: Vec<u8>) -> Result<BulkStats> {
    let response = match encoding {
        WireEncoding::Json => WireResponse::Json(Bytes::from(response)),
        WireEncoding::Protobuf => WireResponse::Protobuf(
            ProtobufBulkProtocol::decode_response(&response).context("invalid protobuf bulk response")?,
        ),
    };

    protocol_for(encoding)
        .parse_stats(&response, params)
        .context("failed to normalize bulk response")
}
