use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

pub const DATASET_FILE: &str = "energy_data.csv";
pub const MODEL_FILE: &str = "energy_model.json";
pub const METADATA_FILE: &str = "model_metadata.json";

/// Where the model store keeps its files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            upload_dir: default_upload_dir(),
            model_dir: default_model_dir(),
        }
    }
}

impl StoreConfig {
    /// All three directories under one root. Handy for tests and demos.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data_dir: root.join("data"),
            upload_dir: root.join("uploads"),
            model_dir: root.join("models"),
        }
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(DATASET_FILE)
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.model_dir.join(METADATA_FILE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Months returned by the forecast endpoint.
    #[serde(default = "default_forecast_horizon")]
    pub forecast_horizon: usize,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_forecast_horizon() -> usize {
    6
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            forecast_horizon: default_forecast_horizon(),
            store: StoreConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads `.env` if present, then applies `ENERGY_*` overrides from the
    /// process environment.
    #[cfg(feature = "server")]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. Unparsable numbers
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("ENERGY_HOST") {
            config.host = host;
        }
        config.port = parse_or_default(&lookup, "ENERGY_PORT", config.port);
        config.forecast_horizon =
            parse_or_default(&lookup, "ENERGY_FORECAST_HORIZON", config.forecast_horizon);
        if config.forecast_horizon == 0 {
            warn!("ENERGY_FORECAST_HORIZON must be at least 1; using default");
            config.forecast_horizon = default_forecast_horizon();
        }

        if let Some(dir) = lookup("ENERGY_DATA_DIR") {
            config.store.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("ENERGY_UPLOAD_DIR") {
            config.store.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("ENERGY_MODEL_DIR") {
            config.store.model_dir = PathBuf::from(dir);
        }

        config
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}; using {}", key, raw, default);
            default
        }),
    }
}
