use clap::Parser;
use tracing_subscriber::EnvFilter;
use updrop::{Config, Server, UploadHandler};

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();

    let upload_dir = std::path::absolute(&config.upload_dir)?;
    tracing::info!("Serving on http://{}", config.addr());
    tracing::info!("Uploaded files will be saved in: {}", upload_dir.display());

    Server::builder()
        .try_bind(config.addr())?
        .serve(UploadHandler::new(config.upload_dir))
}
