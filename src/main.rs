#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examina::run().await {
        eprintln!("examina fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
