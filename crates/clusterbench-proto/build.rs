fn main() -> Result<(), Box<dyn std::error::Error>> {
    prost_build::compile_protos(&["proto/clusterbench/document/v1/document.proto"], &["proto"])?;
    Ok(())
}
