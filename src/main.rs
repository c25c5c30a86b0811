#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = nexus4d_api::run().await {
        eprintln!("nexus4d-api fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
