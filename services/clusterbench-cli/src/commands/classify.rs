use anyhow::{Context, Result};
use serde_json::{json, Value};

use clusterbench_load::classify;

pub fn classify_payload(payload: &str) -> Result<()> {
    let payload: Value = serde_json::from_str(payload).context("payload is not valid JSON")?;
    let error = classify(&payload);

    let report = json!({
        "kind": error.kind,
        "operation": error.operation,
        "status": error.status,
        "message": error.message(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
