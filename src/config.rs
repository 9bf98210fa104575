use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt, path::PathBuf};
use uuid::Uuid;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub assets_root: PathBuf,
    pub temp_dir: PathBuf,
    pub public_url: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub jwt_secret: String,
    pub ffmpeg: String,
    pub ffprobe: String,
}

/// One-shot actions requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Serve,
    Migrate,
    IssueToken(Uuid),
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Video hosting backend")]
pub struct Args {
    /// Host to bind to (overrides TUBELY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides TUBELY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides TUBELY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory thumbnails are written to and served from (overrides TUBELY_ASSETS_ROOT)
    #[arg(long)]
    pub assets_root: Option<PathBuf>,

    /// Directory for staged uploads (overrides TUBELY_TEMP_DIR)
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Base URL used in thumbnail links (overrides TUBELY_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Bucket receiving video uploads (overrides TUBELY_S3_BUCKET)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Bucket region (overrides TUBELY_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Custom endpoint for S3-compatible providers (overrides TUBELY_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    /// Print an access token for the given user id and exit
    #[arg(long, value_name = "USER_ID")]
    pub issue_token: Option<Uuid>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and run mode.
    pub fn from_env_and_args() -> Result<(Self, Mode)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("TUBELY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("TUBELY_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing TUBELY_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 8091,
            Err(err) => return Err(err).context("reading TUBELY_PORT"),
        };
        let env_db = env::var("TUBELY_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/tubely.db".into());
        let env_assets = env::var("TUBELY_ASSETS_ROOT").unwrap_or_else(|_| "./assets".into());
        let env_temp = env::var_os("TUBELY_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);
        let env_region = env::var("TUBELY_S3_REGION").unwrap_or_else(|_| "us-east-1".into());

        // --- Merge ---
        let port = args.port.unwrap_or(env_port);
        let mode = match (args.migrate, args.issue_token) {
            (true, _) => Mode::Migrate,
            (false, Some(user_id)) => Mode::IssueToken(user_id),
            (false, None) => Mode::Serve,
        };
        let s3_bucket = require_bucket(
            mode,
            args.s3_bucket.or_else(|| env::var("TUBELY_S3_BUCKET").ok()),
        )?;
        let jwt_secret = env::var("TUBELY_JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .context("TUBELY_JWT_SECRET must be set")?;

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port,
            database_url: args.database_url.unwrap_or(env_db),
            assets_root: args.assets_root.unwrap_or_else(|| env_assets.into()),
            temp_dir: args.temp_dir.unwrap_or(env_temp),
            public_url: args
                .public_url
                .or_else(|| env::var("TUBELY_PUBLIC_URL").ok())
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            s3_bucket,
            s3_region: args.s3_region.unwrap_or(env_region),
            s3_endpoint: args
                .s3_endpoint
                .or_else(|| env::var("TUBELY_S3_ENDPOINT").ok()),
            jwt_secret,
            ffmpeg: env::var("TUBELY_FFMPEG").unwrap_or_else(|_| "ffmpeg".into()),
            ffprobe: env::var("TUBELY_FFPROBE").unwrap_or_else(|_| "ffprobe".into()),
        };

        Ok((cfg, mode))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The upload bucket is only needed when serving; one-shot modes never
/// touch the object store.
fn require_bucket(mode: Mode, bucket: Option<String>) -> Result<String> {
    match (mode, bucket) {
        (_, Some(bucket)) if !bucket.is_empty() => Ok(bucket),
        (Mode::Serve, _) => anyhow::bail!("TUBELY_S3_BUCKET (or --s3-bucket) must be set"),
        _ => Ok(String::new()),
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("assets_root", &self.assets_root)
            .field("temp_dir", &self.temp_dir)
            .field("public_url", &self.public_url)
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_region", &self.s3_region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("jwt_secret", &"<redacted>")
            .field("ffmpeg", &self.ffmpeg)
            .field("ffprobe", &self.ffprobe)
            .finish()
    }
}
