//! Command-line parsing and startup configuration.

use std::path::{Path, PathBuf};

use lotkeeper::transport::ServerConfig;
use lotkeeper::{Category, CategoryParseError, LotConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    Usage(String),

    #[error("invalid --capacity '{0}', expected CATEGORY=N")]
    Capacity(String),

    #[error(transparent)]
    Category(#[from] CategoryParseError),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Everything needed to start the server.
#[derive(Debug, Clone)]
pub struct Startup {
    pub lot: LotConfig,
    pub server: ServerConfig,
}

/// Raw flags, before the config file is merged in.
#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub config: Option<PathBuf>,
    pub capacities: Vec<(Category, u32)>,
    pub rate: Option<f64>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub await_explicit_shutdown: bool,
    pub help: bool,
}

pub const USAGE: &str = "\
Usage: lotkeeper [options]

Options:
  --config <file>              JSON lot config {\"capacities\": {...}, \"hourly_rate\": ...}
  --capacity <CATEGORY=N>      Slots for a category (repeatable) [default: CAR=5 MOTORCYCLE=3 TRUCK=2]
  --rate <amount>              Hourly rate, one-hour minimum [default: 5.0]
  --host <addr>                Listen address [default: 0.0.0.0]
  --port <port>                Listen port [default: 5000]
  --await-explicit-shutdown    Ignore SIGTERM; stop on SIGINT or POST /shutdown
  -h, --help                   Show this help";

pub fn parse_args(args: &[String]) -> Result<Args, ConfigError> {
    let mut parsed = Args::default();

    let mut i = 1; // skip argv[0]
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                parsed.config = Some(PathBuf::from(value(args, i, "--config")?));
            }
            "--capacity" => {
                i += 1;
                parsed.capacities.push(parse_capacity(value(args, i, "--capacity")?)?);
            }
            "--rate" => {
                i += 1;
                let raw = value(args, i, "--rate")?;
                let rate = raw
                    .parse::<f64>()
                    .map_err(|_| ConfigError::Usage(format!("invalid --rate '{raw}'")))?;
                parsed.rate = Some(rate);
            }
            "--host" => {
                i += 1;
                parsed.host = Some(value(args, i, "--host")?.to_string());
            }
            "--port" => {
                i += 1;
                let raw = value(args, i, "--port")?;
                let port = raw
                    .parse::<u16>()
                    .map_err(|_| ConfigError::Usage(format!("invalid --port '{raw}'")))?;
                parsed.port = Some(port);
            }
            "--await-explicit-shutdown" => parsed.await_explicit_shutdown = true,
            "--help" | "-h" => parsed.help = true,
            arg => return Err(ConfigError::Usage(format!("unexpected argument: {arg}"))),
        }
        i += 1;
    }

    Ok(parsed)
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, ConfigError> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::Usage(format!("{flag} requires a value")))
}

fn parse_capacity(raw: &str) -> Result<(Category, u32), ConfigError> {
    let (category, count) = raw
        .split_once('=')
        .ok_or_else(|| ConfigError::Capacity(raw.to_string()))?;
    let category = category.parse::<Category>()?;
    let count = count
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::Capacity(raw.to_string()))?;
    Ok((category, count))
}

fn load_lot_config(path: &Path) -> Result<LotConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Args {
    /// Merge flags over the config file (or defaults).
    ///
    /// With no file, any `--capacity` flag replaces the default capacity map
    /// instead of adding to it.
    pub fn into_startup(self) -> Result<Startup, ConfigError> {
        let mut lot = match &self.config {
            Some(path) => load_lot_config(path)?,
            None if !self.capacities.is_empty() => LotConfig {
                capacities: Default::default(),
                ..LotConfig::default()
            },
            None => LotConfig::default(),
        };

        lot.capacities.extend(self.capacities);
        if let Some(rate) = self.rate {
            lot.hourly_rate = rate;
        }

        let defaults = ServerConfig::default();
        let server = ServerConfig {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            await_explicit_shutdown: self.await_explicit_shutdown,
        };

        Ok(Startup { lot, server })
    }
}
