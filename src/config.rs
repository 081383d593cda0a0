use crate::pipeline::{PipelinePolicy, object_store::ObjectStoreConfig};
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, path::PathBuf, str::FromStr, time::Duration};

const ENV_PREFIX: &str = "VIDEO_INGEST_";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub assets_root: PathBuf,
    pub temp_dir: PathBuf,
    /// Base URL under which `/assets` is reachable by clients.
    pub public_url: String,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub distribution_url: Option<String>,
    pub ffprobe_path: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub tool_timeout: Option<Duration>,
    pub upload_timeout: Option<Duration>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Video upload ingest service")]
pub struct Args {
    /// Host to bind to (overrides VIDEO_INGEST_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDEO_INGEST_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides VIDEO_INGEST_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory for thumbnails (overrides VIDEO_INGEST_ASSETS_ROOT)
    #[arg(long)]
    pub assets_root: Option<PathBuf>,

    /// Scratch directory for staged uploads (overrides VIDEO_INGEST_TEMP_DIR)
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Public base URL of this service (overrides VIDEO_INGEST_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Destination bucket (overrides VIDEO_INGEST_S3_BUCKET)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Bucket region (overrides VIDEO_INGEST_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Endpoint of an S3-compatible provider (overrides VIDEO_INGEST_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// CDN base URL for public video links (overrides VIDEO_INGEST_DISTRIBUTION_URL)
    #[arg(long)]
    pub distribution_url: Option<String>,

    /// ffprobe binary (overrides VIDEO_INGEST_FFPROBE_PATH)
    #[arg(long)]
    pub ffprobe_path: Option<PathBuf>,

    /// ffmpeg binary (overrides VIDEO_INGEST_FFMPEG_PATH)
    #[arg(long)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Per-invocation limit for ffprobe/ffmpeg (overrides VIDEO_INGEST_TOOL_TIMEOUT_SECS)
    #[arg(long)]
    pub tool_timeout_secs: Option<u64>,

    /// Limit for a single object store put (overrides VIDEO_INGEST_UPLOAD_TIMEOUT_SECS)
    #[arg(long)]
    pub upload_timeout_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::merge(args, |name| env::var(format!("{ENV_PREFIX}{name}")))?;
        Ok((cfg, migrate))
    }

    /// Flag value first, then `lookup(<NAME>)`, then the default.
    fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let port = match args.port {
            Some(port) => port,
            None => parse_var(&lookup, "PORT")?.unwrap_or(8091),
        };
        let tool_timeout_secs = match args.tool_timeout_secs {
            Some(secs) => Some(secs),
            None => parse_var::<u64, _>(&lookup, "TOOL_TIMEOUT_SECS")?,
        };
        let upload_timeout_secs = match args.upload_timeout_secs {
            Some(secs) => Some(secs),
            None => parse_var::<u64, _>(&lookup, "UPLOAD_TIMEOUT_SECS")?,
        };

        Ok(Self {
            host: args
                .host
                .or(string_var(&lookup, "HOST")?)
                .unwrap_or_else(|| "0.0.0.0".into()),
            port,
            database_url: args
                .database_url
                .or(string_var(&lookup, "DATABASE_URL")?)
                .unwrap_or_else(|| "sqlite://./data/videos.db".into()),
            assets_root: args
                .assets_root
                .or(string_var(&lookup, "ASSETS_ROOT")?.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("./assets")),
            temp_dir: args
                .temp_dir
                .or(string_var(&lookup, "TEMP_DIR")?.map(PathBuf::from))
                .unwrap_or_else(env::temp_dir),
            public_url: args
                .public_url
                .or(string_var(&lookup, "PUBLIC_URL")?)
                .unwrap_or_else(|| format!("http://localhost:{port}"))
                .trim_end_matches('/')
                .to_string(),
            s3_bucket: args.s3_bucket.or(string_var(&lookup, "S3_BUCKET")?),
            s3_region: args
                .s3_region
                .or(string_var(&lookup, "S3_REGION")?)
                .unwrap_or_else(|| "us-east-1".into()),
            s3_endpoint: args.s3_endpoint.or(string_var(&lookup, "S3_ENDPOINT")?),
            distribution_url: args
                .distribution_url
                .or(string_var(&lookup, "DISTRIBUTION_URL")?),
            ffprobe_path: args
                .ffprobe_path
                .or(string_var(&lookup, "FFPROBE_PATH")?.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("ffprobe")),
            ffmpeg_path: args
                .ffmpeg_path
                .or(string_var(&lookup, "FFMPEG_PATH")?.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
            tool_timeout: tool_timeout_secs.map(Duration::from_secs),
            upload_timeout: upload_timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Store settings; the bucket has no default.
    pub fn object_store_config(&self) -> Result<ObjectStoreConfig> {
        let bucket = self.s3_bucket.clone().context(
            "no S3 bucket configured, pass --s3-bucket or set VIDEO_INGEST_S3_BUCKET",
        )?;
        Ok(ObjectStoreConfig {
            bucket,
            region: self.s3_region.clone(),
            endpoint: self.s3_endpoint.clone(),
            distribution_url: self.distribution_url.clone(),
        })
    }

    pub fn pipeline_policy(&self) -> PipelinePolicy {
        PipelinePolicy {
            tool_timeout: self.tool_timeout,
            upload_timeout: self.upload_timeout,
            ..PipelinePolicy::default()
        }
    }
}

fn string_var<F>(lookup: &F, name: &str) -> Result<Option<String>>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {ENV_PREFIX}{name}")),
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Result<String, env::VarError>,
{
    string_var(lookup, name)?
        .map(|value| {
            value
                .parse::<T>()
                .with_context(|| format!("parsing {ENV_PREFIX}{name} value `{}`", value))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(
        vars: &[(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Result<String, env::VarError> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        move |name: &str| {
            vars.get(name)
                .map(|v| v.to_string())
                .ok_or(env::VarError::NotPresent)
        }
    }

    #[test]
    fn defaults_apply_without_flags_or_env() {
        let cfg = AppConfig::merge(Args::default(), lookup(&[])).unwrap();

        assert_eq!(cfg.addr(), "0.0.0.0:8091");
        assert_eq!(cfg.database_url, "sqlite://./data/videos.db");
        assert_eq!(cfg.public_url, "http://localhost:8091");
        assert_eq!(cfg.s3_region, "us-east-1");
        assert_eq!(cfg.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert!(cfg.tool_timeout.is_none());
        assert!(cfg.pipeline_policy().upload_timeout.is_none());
        assert!(cfg.object_store_config().is_err());
    }

    #[test]
    fn flags_override_environment() {
        let args = Args {
            port: Some(9000),
            s3_bucket: Some("from-flag".into()),
            ..Args::default()
        };
        let cfg = AppConfig::merge(
            args,
            lookup(&[
                ("PORT", "7000"),
                ("S3_BUCKET", "from-env"),
                ("S3_REGION", "us-east-2"),
                ("TOOL_TIMEOUT_SECS", "120"),
                ("UPLOAD_TIMEOUT_SECS", "600"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.tool_timeout, Some(Duration::from_secs(120)));
        let store = cfg.object_store_config().unwrap();
        assert_eq!(store.bucket, "from-flag");
        assert_eq!(store.region, "us-east-2");
        let policy = cfg.pipeline_policy();
        assert_eq!(policy.tool_timeout, Some(Duration::from_secs(120)));
        assert_eq!(policy.upload_timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn invalid_port_names_the_variable() {
        let err = AppConfig::merge(Args::default(), lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(format!("{err:#}").contains("VIDEO_INGEST_PORT"));
    }
}
