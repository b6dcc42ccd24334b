use anyhow::Result;
use axum::Router;
use filedrop::{
    config,
    routes,
    services::{
        blob_store::BlobStore, lifecycle::FileService, metadata_cache::MetadataCache,
        share::ShareResolver,
    },
};
use std::{fs, io::ErrorKind, path::Path};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting filedrop with config: {:?}", cfg);

    // --- Ensure blob store root exists ---
    if !Path::new(&cfg.blob_root).exists() {
        fs::create_dir_all(&cfg.blob_root)?;
        tracing::info!("Created blob store root at {}", cfg.blob_root);
    }

    // --- Ensure the cache file's directory exists ---
    if let Some(parent) = Path::new(&cfg.cache_path).parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created cache directory {:?}", parent);
        }
    }

    // --- Initialize core services ---
    let store = BlobStore::new(&cfg.blob_root, &cfg.public_base_url);
    let cache = MetadataCache::new(&cfg.cache_path);
    let resolver = ShareResolver::new(cache.clone(), store.clone(), &cfg.origin);
    let files = FileService::new(store, cache, resolver);

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(files);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
