fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure().build_server(true).build_client(true).compile_protos(
        &["proto/ledger_source.proto", "proto/events.proto"],
        &["proto"],
    )?;
    Ok(())
}
