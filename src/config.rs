use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// Env var naming an optional YAML config file.
pub const CONFIG_ENV: &str = "DVF_CONFIG";
pub const DATA_DIR_ENV: &str = "DVF_DATA_DIR";
pub const FORCE_REBUILD_ENV: &str = "DVF_FORCE_REBUILD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// `code_departement` value rows must carry.
    pub region_code: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            region_code: "75".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    /// Postal codes outside this prefix are dropped.
    pub postal_prefix: String,
    /// Smallest habitable built area, m².
    pub min_surface: f64,
    pub surface_quantile: f64,
    pub price_low_quantile: f64,
    pub price_high_quantile: f64,
    /// Hard floor / ceiling of the €/m² band.
    pub min_price_m2: f64,
    pub max_price_m2: f64,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            postal_prefix: "75".into(),
            min_surface: 9.0,
            surface_quantile: 0.999,
            price_low_quantile: 0.001,
            price_high_quantile: 0.999,
            min_price_m2: 1_000.0,
            max_price_m2: 50_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub pattern: String,
    pub use_cache: bool,
    pub force_rebuild: bool,
    pub persist_clean: bool,
    pub expected_years: Vec<i32>,
    pub ingest: IngestConfig,
    pub clean: CleanConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            pattern: "75_*.csv".into(),
            use_cache: true,
            force_rebuild: false,
            persist_clean: true,
            expected_years: (2020..=2024).collect(),
            ingest: IngestConfig::default(),
            clean: CleanConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// YAML file from `DVF_CONFIG` if set (defaults otherwise), then
    /// `DVF_DATA_DIR` / `DVF_FORCE_REBUILD` overrides.
    pub fn from_env() -> Result<Self> {
        let mut cfg = match env::var_os(CONFIG_ENV) {
            Some(path) => {
                info!(path = ?path, "loading config file");
                Self::from_yaml_file(Path::new(&path))?
            }
            None => Self::default(),
        };
        if let Some(dir) = env::var_os(DATA_DIR_ENV) {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Ok(flag) = env::var(FORCE_REBUILD_ENV) {
            cfg.force_rebuild = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(cfg)
    }

    pub fn cache_dir(&self) -> PathBuf {
        crate::cache::artifact::cache_dir(&self.data_dir)
    }
}
