use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::GeoAccession;
use crate::error::GeoHcaError;

pub const DEFAULT_CONFIG_FILE: &str = "geo-to-hca.json";
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_BATCH_SIZE: usize = 200;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub accessions: Vec<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub eutils: Option<EutilsEntry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EutilsEntry {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub request_delay_ms: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<usize>,
    #[serde(default)]
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EutilsSettings {
    pub api_key: Option<String>,
    pub request_delay_ms: u64,
    pub max_retries: usize,
    pub batch_size: usize,
}

impl Default for EutilsSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub accessions: Vec<GeoAccession>,
    pub output_dir: Utf8PathBuf,
    pub eutils: EutilsSettings,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the config file. An explicit path must exist; the default file
    /// is optional unless `require_default` is set.
    pub fn resolve(
        path: Option<&str>,
        require_default: bool,
    ) -> Result<ResolvedConfig, GeoHcaError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            if require_default {
                return Err(GeoHcaError::MissingConfig);
            }
            return Self::resolve_config(Config::default(), api_key_from_env());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| GeoHcaError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| GeoHcaError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config, api_key_from_env())
    }

    pub fn resolve_config(
        config: Config,
        env_api_key: Option<String>,
    ) -> Result<ResolvedConfig, GeoHcaError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let accessions = config
            .accessions
            .iter()
            .map(|value| value.parse())
            .collect::<Result<Vec<GeoAccession>, GeoHcaError>>()?;

        let output_dir = config
            .output_dir
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        let entry = config.eutils.unwrap_or_default();
        let api_key = entry
            .api_key
            .filter(|key| !key.trim().is_empty())
            .or(env_api_key);
        let eutils = EutilsSettings {
            request_delay_ms: entry.request_delay_ms.unwrap_or(DEFAULT_REQUEST_DELAY_MS),
            max_retries: entry.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            batch_size: entry.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1),
            api_key,
        };

        tracing::debug!(
            schema_version,
            accessions = accessions.len(),
            output_dir = %output_dir,
            api_key = eutils.api_key.is_some(),
            "resolved config"
        );

        Ok(ResolvedConfig {
            schema_version,
            accessions,
            output_dir,
            eutils,
        })
    }
}

fn api_key_from_env() -> Option<String> {
    std::env::var("NCBI_API_KEY")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
