#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examina::run_worker().await {
        eprintln!("examina-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
