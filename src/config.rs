use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConversionError;
use crate::ratio::NanPolicy;
use crate::schema::catalogue;

/// Formula version stamped on output rows unless configured otherwise.
pub const DEFAULT_FORMULA_VERSION: &str = "0.1.0";

/// Settings passed explicitly into every pipeline call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub formula_version: String,
    pub nan_policy: NanPolicy,
}

impl PipelineConfig {
    pub fn new(formula_version: impl Into<String>) -> Self {
        Self {
            formula_version: formula_version.into(),
            nan_policy: NanPolicy::default(),
        }
    }

    pub fn with_nan_policy(mut self, nan_policy: NanPolicy) -> Self {
        self.nan_policy = nan_policy;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FORMULA_VERSION)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogueSource {
    pub path: PathBuf,
    pub id_stage: i64,
}

/// Column names of the genetic catalogue files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogueColumns {
    #[serde(default = "default_age_column")]
    pub age: String,
    #[serde(default = "default_sex_column")]
    pub sex: String,
    #[serde(default = "default_genetic_line_column")]
    pub genetic_line: String,
    #[serde(default = "default_accumulated_column")]
    pub accumulated: String,
    #[serde(default = "default_daily_column")]
    pub daily: String,
}

impl Default for CatalogueColumns {
    fn default() -> Self {
        Self {
            age: default_age_column(),
            sex: default_sex_column(),
            genetic_line: default_genetic_line_column(),
            accumulated: default_accumulated_column(),
            daily: default_daily_column(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceConfig {
    #[serde(default = "default_genetic_line")]
    pub genetic_line: String,
    #[serde(default)]
    pub sources: Vec<CatalogueSource>,
    #[serde(default)]
    pub columns: CatalogueColumns,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            genetic_line: default_genetic_line(),
            sources: Vec::new(),
            columns: CatalogueColumns::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Directory for an additional JSON log file; console only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
        }
    }
}

/// Run configuration read from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default = "default_formula_version")]
    pub formula_version: String,
    #[serde(default)]
    pub nan_policy: NanPolicy,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            formula_version: default_formula_version(),
            nan_policy: NanPolicy::default(),
            reference: ReferenceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConversionError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConversionError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConversionError> {
        let config: RunConfig = toml::from_str(content)?;
        if config.formula_version.trim().is_empty() {
            return Err(ConversionError::Config(
                "formula_version must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig::new(self.formula_version.clone()).with_nan_policy(self.nan_policy)
    }
}

fn default_formula_version() -> String {
    DEFAULT_FORMULA_VERSION.to_string()
}

fn default_genetic_line() -> String {
    catalogue::DEFAULT_GENETIC_LINE.to_string()
}

fn default_age_column() -> String {
    catalogue::AGE.to_string()
}

fn default_sex_column() -> String {
    catalogue::SEX.to_string()
}

fn default_genetic_line_column() -> String {
    catalogue::GENETIC_LINE.to_string()
}

fn default_accumulated_column() -> String {
    catalogue::ACCUMULATED.to_string()
}

fn default_daily_column() -> String {
    catalogue::DAILY.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
