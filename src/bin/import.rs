use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: examina-import <catalog.json>");
        std::process::exit(2);
    };

    if let Err(e) = examina::run_import(&path).await {
        eprintln!("examina-import fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
