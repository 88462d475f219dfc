//! Configuration file handling.
//!
//! Settings live in `natality.toml`. Every section is optional; CLI flags
//! override whatever the file provides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::BucketSpec;
use crate::data::filter::RecordFilter;
use crate::data::layout::Layout;

pub const DEFAULT_CONFIG_FILE: &str = "natality.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Population to tabulate.
    #[serde(default)]
    pub filter: RecordFilter,

    /// Dimensions for the bucketed export.
    #[serde(default)]
    pub buckets: BucketSpec,

    /// Output locations.
    #[serde(default)]
    pub output: OutputConfig,

    /// Column layout override for fixed-width input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
}

/// Where results are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// PNG chart written by `report`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<PathBuf>,

    /// Weekly table JSON written by `report`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_json: Option<PathBuf>,

    /// Bucketed JSON written by `export`.
    #[serde(default = "default_export")]
    pub export: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            chart: Some(default_chart()),
            weekly_json: None,
            export: default_export(),
        }
    }
}

fn default_chart() -> PathBuf {
    PathBuf::from("delivery_analysis.png")
}

fn default_export() -> PathBuf {
    PathBuf::from("delivery_buckets.json")
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;

        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the explicit path if given, else `natality.toml` in the current
    /// directory if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            log::info!("Using {DEFAULT_CONFIG_FILE} from the current directory");
            return Self::load(local);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        self.filter.validate().context("invalid [filter] section")?;
        self.buckets.validate().context("invalid [buckets] section")?;
        if let Some(layout) = &self.layout {
            layout.validate().context("invalid [layout] section")?;
        }
        Ok(())
    }

    /// The configured layout, or the 2023 public-use layout.
    pub fn layout(&self) -> Layout {
        self.layout.clone().unwrap_or_default()
    }

    /// Default configuration as commented TOML, for `init-config`.
    pub fn default_toml() -> Result<String> {
        let body =
            toml::to_string_pretty(&Self::default()).context("serializing default config")?;
        Ok(format!(
            "# natality-weeks configuration\n\
             #\n\
             # [filter]      population to tabulate (omit a key to leave it unconstrained)\n\
             # [buckets]     dimensions of the bucketed JSON export\n\
             # [output]      output file locations\n\
             # [[layout.fields]] optional column layout override, e.g.\n\
             #   field = \"mother_age\", start = 74, end = 76\n\n{body}"
        ))
    }
}
