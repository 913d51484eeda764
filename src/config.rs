use std::path::PathBuf;

use clap::Parser;

/// Startup configuration, from the command line or the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "updrop", version, about)]
pub struct Config {
    /// Address to bind the listener to
    #[arg(long, env = "UPDROP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "UPDROP_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory where uploaded files are stored, created on demand
    #[arg(long, env = "UPDROP_UPLOAD_DIR", default_value = "uploaded_files")]
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
