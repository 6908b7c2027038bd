fn main() -> Result<(), Box<dyn std::error::Error>> {
    // protoc is unavailable in this environment; compile the proto with
    // protox (pure Rust) and hand the descriptors to tonic-build.
    let fds = protox::compile(["proto/telemon.proto"], ["proto"])?;
    tonic_build::configure().compile_fds(fds)?;
    Ok(())
}
