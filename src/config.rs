use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::fusion::WeightingPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub storage: StorageConfig,
    pub tracker: TrackerConfig,
    pub fusion: FusionConfig,
    pub strength: StrengthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Upstream endpoint serving the on-sale period and match listing
    pub url: String,
    /// Total request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Skip TLS certificate verification for this client only
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub referer: Option<String>,
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root of the document namespace
    pub root_dir: PathBuf,
    /// Observation log key, relative to `root_dir`
    pub observation_log: String,
    /// Directory (relative to `root_dir`) holding per-period documents
    pub result_dir: String,
}

impl StorageConfig {
    /// Store key for a per-period document, e.g. `result/26027期_预测概率.json`
    pub fn period_key(&self, period_number: u64, suffix: &str) -> String {
        format!("{}/{}{}", self.result_dir, period_number, suffix)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Process exit code reported for a new period (2 = legacy, 1 = newer variant)
    pub new_period_exit_code: i32,
    /// Filename suffix scanned when no upstream signal is available
    pub local_scan_suffix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FusionConfig {
    pub weighting: WeightingPolicy,
    /// Factor applied to the basic source under `discounted_basic`
    pub basic_discount: f64,
    pub basic_suffix: String,
    pub advanced_suffix: String,
    pub auxiliary_suffix: String,
    pub output_suffix: String,
}

/// Common-opponent strength scoring. Output goes to `fusion.auxiliary_suffix`.
#[derive(Debug, Clone, Deserialize)]
pub struct StrengthConfig {
    /// Suffix of the head-to-head history documents read as input
    pub history_suffix: String,
    /// Weight lost per week of match age
    pub weekly_decay: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Self::with_defaults(Config::builder())?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("POOLCAST_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (POOLCAST_FUSION__WEIGHTING, etc.)
            .add_source(
                Environment::with_prefix("POOLCAST")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("provider.url", "https://ews.500.com/score/zq/info?vtype=sfc")?
            .set_default("provider.timeout_secs", 20)?
            .set_default("provider.accept_invalid_certs", false)?
            .set_default("provider.referer", "https://yllive-m.500.com/home/zq/sfc/cur")?
            .set_default("storage.root_dir", ".")?
            .set_default("storage.observation_log", "present.json")?
            .set_default("storage.result_dir", "result")?
            .set_default("tracker.new_period_exit_code", 2)?
            .set_default("tracker.local_scan_suffix", "期_历史交锋.json")?
            .set_default("fusion.weighting", "discounted_basic")?
            .set_default("fusion.basic_discount", 0.8)?
            .set_default("fusion.basic_suffix", "期_预测概率.json")?
            .set_default("fusion.advanced_suffix", "期_高级预测概率.json")?
            .set_default("fusion.auxiliary_suffix", "期_共同对手实力分.json")?
            .set_default("fusion.output_suffix", "期_融合预测.json")?
            .set_default("strength.history_suffix", "期_历史交锋.json")?
            .set_default("strength.weekly_decay", 0.01)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)
    }

    /// Configuration with built-in defaults only
    pub fn default_config() -> Self {
        Self {
            provider: ProviderConfig {
                url: "https://ews.500.com/score/zq/info?vtype=sfc".to_string(),
                timeout_secs: default_timeout_secs(),
                accept_invalid_certs: false,
                user_agent: default_user_agent(),
                referer: Some("https://yllive-m.500.com/home/zq/sfc/cur".to_string()),
            },
            storage: StorageConfig {
                root_dir: PathBuf::from("."),
                observation_log: "present.json".to_string(),
                result_dir: "result".to_string(),
            },
            tracker: TrackerConfig {
                new_period_exit_code: 2,
                local_scan_suffix: "期_历史交锋.json".to_string(),
            },
            fusion: FusionConfig {
                weighting: WeightingPolicy::DiscountedBasic,
                basic_discount: crate::fusion::DEFAULT_BASIC_DISCOUNT,
                basic_suffix: "期_预测概率.json".to_string(),
                advanced_suffix: "期_高级预测概率.json".to_string(),
                auxiliary_suffix: "期_共同对手实力分.json".to_string(),
                output_suffix: "期_融合预测.json".to_string(),
            },
            strength: StrengthConfig {
                history_suffix: "期_历史交锋.json".to_string(),
                weekly_decay: crate::strength::DEFAULT_WEEKLY_DECAY,
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.provider.timeout_secs == 0 {
            errors.push("provider.timeout_secs must be positive".to_string());
        }

        if !matches!(self.tracker.new_period_exit_code, 1 | 2) {
            errors.push(format!(
                "tracker.new_period_exit_code must be 1 or 2, got {}",
                self.tracker.new_period_exit_code
            ));
        }

        let discount = self.fusion.basic_discount;
        if !discount.is_finite() || discount <= 0.0 || discount > 1.0 {
            errors.push(format!(
                "fusion.basic_discount must be in (0, 1], got {discount}"
            ));
        }

        let decay = self.strength.weekly_decay;
        if !decay.is_finite() || decay < 0.0 {
            errors.push(format!("strength.weekly_decay must be >= 0, got {decay}"));
        }

        let suffixes = [
            ("tracker.local_scan_suffix", &self.tracker.local_scan_suffix),
            ("fusion.basic_suffix", &self.fusion.basic_suffix),
            ("fusion.advanced_suffix", &self.fusion.advanced_suffix),
            ("fusion.auxiliary_suffix", &self.fusion.auxiliary_suffix),
            ("fusion.output_suffix", &self.fusion.output_suffix),
            ("strength.history_suffix", &self.strength.history_suffix),
        ];
        for (name, value) in suffixes {
            if value.trim().is_empty() {
                errors.push(format!("{name} must not be empty"));
            }
        }

        if self.storage.observation_log.trim().is_empty() {
            errors.push("storage.observation_log must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
