use crate::services::{
    generation::{DEFAULT_ENDPOINT, DEFAULT_MODEL},
    image_service::DEFAULT_MAX_FILE_SIZE,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, path::PathBuf, str::FromStr};

/// Room for the text fields and multipart framing on top of the file itself.
const BODY_OVERHEAD: usize = 2 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: PathBuf,
    pub public_base_url: Option<String>,
    /// Build asset URLs from `X-Forwarded-*` headers. Only safe behind a proxy
    /// that overwrites them.
    pub trust_forwarded_headers: bool,
    pub api_key: Option<String>,
    pub default_model: String,
    pub max_file_size: usize,
    pub max_body_size: usize,
    pub backend_endpoint: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("storage_dir", &self.storage_dir)
            .field("public_base_url", &self.public_base_url)
            .field("trust_forwarded_headers", &self.trust_forwarded_headers)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("default_model", &self.default_model)
            .field("max_file_size", &self.max_file_size)
            .field("max_body_size", &self.max_body_size)
            .field("backend_endpoint", &self.backend_endpoint)
            .finish()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Image generation gateway with multipart ingestion")]
pub struct Args {
    /// Host to bind to (overrides IMAGEGEN_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGEGEN_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where images are stored and served from (overrides GENERATED_DIR)
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Base URL used in returned image links (overrides IMAGEGEN_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Trust X-Forwarded-Host/-Proto when building URLs (overrides IMAGEGEN_TRUST_FORWARDED_HEADERS)
    #[arg(long)]
    pub trust_forwarded_headers: bool,

    /// Default generation model (overrides IMAGEGEN_MODEL)
    #[arg(long = "model")]
    pub default_model: Option<String>,

    /// Maximum attachment size in bytes (overrides IMAGEGEN_MAX_FILE_SIZE)
    #[arg(long)]
    pub max_file_size: Option<usize>,

    /// Maximum request body size in bytes (overrides IMAGEGEN_MAX_BODY_SIZE)
    #[arg(long)]
    pub max_body_size: Option<usize>,

    /// Generation API base URL (overrides IMAGEGEN_BACKEND_ENDPOINT)
    #[arg(long)]
    pub backend_endpoint: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::resolve(args, |key| env::var(key).ok())
    }

    /// Merge CLI args over values from `lookup` over defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        // --- Environment fallback ---
        let env_host = non_empty("IMAGEGEN_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(&lookup, "IMAGEGEN_PORT")?.unwrap_or(8000);
        let env_storage = non_empty("GENERATED_DIR").unwrap_or_else(|| "static".into());
        let env_model = non_empty("IMAGEGEN_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into());
        let env_trust_forwarded = parse_var::<bool>(&lookup, "IMAGEGEN_TRUST_FORWARDED_HEADERS")?;
        let env_max_file = parse_var(&lookup, "IMAGEGEN_MAX_FILE_SIZE")?;
        let env_max_body = parse_var(&lookup, "IMAGEGEN_MAX_BODY_SIZE")?;
        let env_endpoint =
            non_empty("IMAGEGEN_BACKEND_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.into());

        // --- Merge ---
        let max_file_size = args
            .max_file_size
            .or(env_max_file)
            .unwrap_or(DEFAULT_MAX_FILE_SIZE);
        let max_body_size = args
            .max_body_size
            .or(env_max_body)
            .unwrap_or(max_file_size.saturating_add(BODY_OVERHEAD));

        if max_file_size == 0 {
            anyhow::bail!("max file size must be greater than zero");
        }

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or_else(|| PathBuf::from(env_storage)),
            public_base_url: args
                .public_base_url
                .or_else(|| non_empty("IMAGEGEN_PUBLIC_BASE_URL"))
                .map(|url| url.trim_end_matches('/').to_string()),
            trust_forwarded_headers: args.trust_forwarded_headers
                || env_trust_forwarded.unwrap_or(false),
            api_key: non_empty("GOOGLE_API_KEY"),
            default_model: args.default_model.unwrap_or(env_model),
            max_file_size,
            max_body_size,
            backend_endpoint: args.backend_endpoint.unwrap_or(env_endpoint),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        _ => Ok(None),
    }
}
