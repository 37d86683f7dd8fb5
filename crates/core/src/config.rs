use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching::{DEFAULT_FUZZY_FLOOR, DEFAULT_TOP_N};

/// Effective engine configuration: defaults, patched by an optional TOML
/// file, then `RFQMATCH_*` environment overrides, then validated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EngineConfig {
    pub matching: MatchingConfig,
    pub pricing: PricingConfig,
    pub review: ReviewConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchingConfig {
    /// Fuzzy matches below this Dice score are excluded from results.
    pub fuzzy_floor: f64,
    /// Matches retained per candidate.
    pub top_n: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PricingConfig {
    /// Minimum acceptable (price - cost) / price before a pricing
    /// opportunity is surfaced.
    pub margin_floor: f64,
    /// Stock levels below this raise an informational alert.
    pub low_stock_threshold: u32,
    /// Estimated cost ratio applied when an entry has no cost on file.
    pub cost_fallback_ratio: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReviewConfig {
    /// Default confidence threshold for bulk-applying matches.
    pub bulk_apply_threshold: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matching: MatchingConfig { fuzzy_floor: DEFAULT_FUZZY_FLOOR, top_n: DEFAULT_TOP_N },
            pricing: PricingConfig {
                margin_floor: 0.20,
                low_stock_threshold: 20,
                cost_fallback_ratio: 0.6,
            },
            review: ReviewConfig { bulk_apply_threshold: 0.6 },
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    matching: Option<MatchingPatch>,
    pricing: Option<PricingPatch>,
    review: Option<ReviewPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchingPatch {
    fuzzy_floor: Option<f64>,
    top_n: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    margin_floor: Option<f64>,
    low_stock_threshold: Option<u32>,
    cost_fallback_ratio: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ReviewPatch {
    bulk_apply_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl EngineConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("rfqmatch.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(matching) = patch.matching {
            if let Some(fuzzy_floor) = matching.fuzzy_floor {
                self.matching.fuzzy_floor = fuzzy_floor;
            }
            if let Some(top_n) = matching.top_n {
                self.matching.top_n = top_n;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(margin_floor) = pricing.margin_floor {
                self.pricing.margin_floor = margin_floor;
            }
            if let Some(low_stock_threshold) = pricing.low_stock_threshold {
                self.pricing.low_stock_threshold = low_stock_threshold;
            }
            if let Some(cost_fallback_ratio) = pricing.cost_fallback_ratio {
                self.pricing.cost_fallback_ratio = cost_fallback_ratio;
            }
        }

        if let Some(review) = patch.review {
            if let Some(bulk_apply_threshold) = review.bulk_apply_threshold {
                self.review.bulk_apply_threshold = bulk_apply_threshold;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RFQMATCH_MATCHING_FUZZY_FLOOR") {
            self.matching.fuzzy_floor = parse_f64("RFQMATCH_MATCHING_FUZZY_FLOOR", &value)?;
        }
        if let Some(value) = read_env("RFQMATCH_MATCHING_TOP_N") {
            self.matching.top_n = parse_usize("RFQMATCH_MATCHING_TOP_N", &value)?;
        }

        if let Some(value) = read_env("RFQMATCH_PRICING_MARGIN_FLOOR") {
            self.pricing.margin_floor = parse_f64("RFQMATCH_PRICING_MARGIN_FLOOR", &value)?;
        }
        if let Some(value) = read_env("RFQMATCH_PRICING_LOW_STOCK_THRESHOLD") {
            self.pricing.low_stock_threshold =
                parse_u32("RFQMATCH_PRICING_LOW_STOCK_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("RFQMATCH_PRICING_COST_FALLBACK_RATIO") {
            self.pricing.cost_fallback_ratio =
                parse_f64("RFQMATCH_PRICING_COST_FALLBACK_RATIO", &value)?;
        }

        if let Some(value) = read_env("RFQMATCH_REVIEW_BULK_APPLY_THRESHOLD") {
            self.review.bulk_apply_threshold =
                parse_f64("RFQMATCH_REVIEW_BULK_APPLY_THRESHOLD", &value)?;
        }

        let log_level =
            read_env("RFQMATCH_LOGGING_LEVEL").or_else(|| read_env("RFQMATCH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RFQMATCH_LOGGING_FORMAT").or_else(|| read_env("RFQMATCH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.matching.fuzzy_floor) {
            return Err(ConfigError::Validation(
                "matching.fuzzy_floor must be in range 0.0..=1.0".to_string(),
            ));
        }
        if self.matching.top_n == 0 {
            return Err(ConfigError::Validation(
                "matching.top_n must be greater than zero".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.pricing.margin_floor) {
            return Err(ConfigError::Validation(
                "pricing.margin_floor must be in range 0.0..1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pricing.cost_fallback_ratio)
            || self.pricing.cost_fallback_ratio == 0.0
        {
            return Err(ConfigError::Validation(
                "pricing.cost_fallback_ratio must be in range (0.0, 1.0]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.review.bulk_apply_threshold) {
            return Err(ConfigError::Validation(
                "review.bulk_apply_threshold must be in range 0.0..=1.0".to_string(),
            ));
        }
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("rfqmatch.toml"), PathBuf::from("config/rfqmatch.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{EngineConfig, LoadOptions, LogFormat};

    #[test]
    fn defaults_match_documented_tunables() {
        let config = EngineConfig::default();
        assert_eq!(config.matching.fuzzy_floor, 0.3);
        assert_eq!(config.matching.top_n, 5);
        assert_eq!(config.pricing.margin_floor, 0.20);
        assert_eq!(config.pricing.low_stock_threshold, 20);
        assert_eq!(config.review.bulk_apply_threshold, 0.6);
    }

    #[test]
    fn toml_patch_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[matching]\nfuzzy_floor = 0.5\n\n[pricing]\nmargin_floor = 0.25\nlow_stock_threshold = 10"
        )
        .expect("write");

        let config = EngineConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
        })
        .expect("load");

        assert_eq!(config.matching.fuzzy_floor, 0.5);
        assert_eq!(config.pricing.margin_floor, 0.25);
        assert_eq!(config.pricing.low_stock_threshold, 10);
        // Untouched sections keep defaults.
        assert_eq!(config.review.bulk_apply_threshold, 0.6);
    }

    #[test]
    fn logging_section_patch_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[logging]\nlevel = \"debug\"\nformat = \"json\"").expect("write");

        let config = EngineConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
        })
        .expect("load");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = EngineConfig::load(LoadOptions {
            config_path: Some("definitely-not-here.toml".into()),
            require_file: true,
        });
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_floor_fails_validation() {
        let mut config = EngineConfig::default();
        config.matching.fuzzy_floor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_top_n_fails_validation() {
        let mut config = EngineConfig::default();
        config.matching.top_n = 0;
        assert!(config.validate().is_err());
    }
}
