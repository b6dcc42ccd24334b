use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Root directory of the local blob store.
    pub blob_root: String,
    /// Path of the JSON file holding the metadata cache.
    pub cache_path: String,
    /// Base URL under which stored objects are publicly served.
    pub public_base_url: String,
    /// Deployment origin embedded in share links.
    pub origin: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "File sharing service with public share links")]
pub struct Args {
    /// Host to bind to (overrides FILEDROP_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILEDROP_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded blobs are stored (overrides FILEDROP_BLOB_ROOT)
    #[arg(long)]
    pub blob_root: Option<String>,

    /// JSON metadata cache file (overrides FILEDROP_CACHE_PATH)
    #[arg(long)]
    pub cache_path: Option<String>,

    /// Public base URL for serving blobs (overrides FILEDROP_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Origin used when rendering share links (overrides FILEDROP_ORIGIN)
    #[arg(long)]
    pub origin: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("FILEDROP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("FILEDROP_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing FILEDROP_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading FILEDROP_PORT"),
        };
        let env_blob_root =
            env::var("FILEDROP_BLOB_ROOT").unwrap_or_else(|_| "./data/blobs".into());
        let env_cache_path =
            env::var("FILEDROP_CACHE_PATH").unwrap_or_else(|_| "./data/files.json".into());
        let env_public_base = env::var("FILEDROP_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", env_port));
        let env_origin = env::var("FILEDROP_ORIGIN")
            .unwrap_or_else(|_| format!("http://localhost:{}", env_port));

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            blob_root: args.blob_root.unwrap_or(env_blob_root),
            cache_path: args.cache_path.unwrap_or(env_cache_path),
            public_base_url: args.public_base_url.unwrap_or(env_public_base),
            origin: args.origin.unwrap_or(env_origin),
        };

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
