use anyhow::{Context, Result};
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{io::ErrorKind, str::FromStr, sync::Arc};
use tokio::{fs, net::TcpListener};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;


use config::{AppConfig, Mode};
use services::{
    auth::JwtAuth, faststart::FfmpegFastStart, object_storage::S3ObjectStorage,
    prober::FfprobeInspector, video_store::VideoStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + run mode ---
    let (cfg, mode) = AppConfig::from_env_and_args()?;

    if let Mode::IssueToken(user_id) = mode {
        let token = JwtAuth::new(&cfg.jwt_secret)
            .issue_token(user_id, chrono::Duration::hours(24))
            .context("signing access token")?;
        println!("{token}");
        return Ok(());
    }

    tracing::info!("Starting tubely with config: {:?}", cfg);

    // --- Ensure local directories exist ---
    for dir in [&cfg.assets_root, &cfg.temp_dir] {
        if !fs::try_exists(dir).await.unwrap_or(false) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
            tracing::info!("Created directory at {}", dir.display());
        }
    }

    // --- Initialize SQLite connection ---
    let connect_options = SqliteConnectOptions::from_str(&cfg.database_url)
        .with_context(|| format!("parsing database url `{}`", cfg.database_url))?
        .create_if_missing(true);
    if let Some(parent) = connect_options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .context("connecting to sqlite")?,
    );
    let store = VideoStore::new(db);

    // --- Handle migration mode ---
    if mode == Mode::Migrate {
        store.migrate().await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize collaborators ---
    let storage = Arc::new(S3ObjectStorage::new(
        &cfg.s3_bucket,
        &cfg.s3_region,
        cfg.s3_endpoint.as_deref(),
    )?);
    let state = state::AppState::new(
        &cfg,
        store,
        storage,
        Arc::new(FfprobeInspector::new(cfg.ffprobe.clone())),
        Arc::new(FfmpegFastStart::new(cfg.ffmpeg.clone())),
    );

    // --- Build router ---
    let app: Router = routes::routes::routes(state);

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
