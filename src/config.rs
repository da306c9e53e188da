use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub signing_secret: String,
    pub public_base_url: String,
    pub url_ttl_secs: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Trinket market/booth API")]
pub struct Args {
    /// Host to bind to (overrides TRINKET_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides TRINKET_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where image objects are stored (overrides TRINKET_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides TRINKET_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Secret for signing object URLs (overrides TRINKET_SIGNING_SECRET)
    #[arg(long)]
    pub signing_secret: Option<String>,

    /// Base URL clients use to reach this service, without trailing slash
    /// (overrides TRINKET_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Signed-URL validity in seconds (overrides TRINKET_URL_TTL_SECS)
    #[arg(long)]
    pub url_ttl_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    ///
    /// Database URL, storage dir, and signing secret are required; a missing
    /// value aborts startup instead of running partially configured.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        let host = args
            .host
            .or_else(|| env::var("TRINKET_HOST").ok())
            .unwrap_or_else(|| "0.0.0.0".into());
        let port = match args.port {
            Some(port) => port,
            None => match env::var("TRINKET_PORT") {
                Ok(value) => value
                    .parse::<u16>()
                    .with_context(|| format!("parsing TRINKET_PORT value `{}`", value))?,
                Err(env::VarError::NotPresent) => 3000,
                Err(err) => return Err(err).context("reading TRINKET_PORT"),
            },
        };

        let database_url = args
            .database_url
            .or_else(|| env::var("TRINKET_DATABASE_URL").ok())
            .context("TRINKET_DATABASE_URL is required (or pass --database-url)")?;
        let storage_dir = args
            .storage_dir
            .or_else(|| env::var("TRINKET_STORAGE_DIR").ok())
            .context("TRINKET_STORAGE_DIR is required (or pass --storage-dir)")?;
        let signing_secret = args
            .signing_secret
            .or_else(|| env::var("TRINKET_SIGNING_SECRET").ok())
            .context("TRINKET_SIGNING_SECRET is required (or pass --signing-secret)")?;

        let public_base_url = args
            .public_base_url
            .or_else(|| env::var("TRINKET_PUBLIC_BASE_URL").ok())
            .unwrap_or_else(|| format!("http://{}:{}", host, port));
        let url_ttl_secs = match args.url_ttl_secs {
            Some(ttl) => ttl,
            None => match env::var("TRINKET_URL_TTL_SECS") {
                Ok(value) => value
                    .parse::<u64>()
                    .with_context(|| format!("parsing TRINKET_URL_TTL_SECS value `{}`", value))?,
                Err(env::VarError::NotPresent) => 3600,
                Err(err) => return Err(err).context("reading TRINKET_URL_TTL_SECS"),
            },
        };

        let cfg = Self {
            host,
            port,
            storage_dir,
            database_url,
            signing_secret,
            public_base_url,
            url_ttl_secs,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
