use crate::error::{AnalysisError, Result};
use crate::signals::RECENT_SIGNAL_WINDOW;
use serde::{Deserialize, Serialize};

/// Analysis engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// RSI period
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    /// Fast EMA period (drives the crossover signal)
    #[serde(default = "default_ema_fast_period")]
    pub ema_fast_period: usize,

    /// Slow EMA period (display only)
    #[serde(default = "default_ema_slow_period")]
    pub ema_slow_period: usize,

    /// Share of supervised examples used for training
    #[serde(default = "default_train_fraction")]
    pub train_fraction: f64,

    /// Trailing bars scanned for the recent-signal log
    #[serde(default = "default_recent_signal_window")]
    pub recent_signal_window: usize,

    /// Forecast model settings
    #[serde(default)]
    pub forest: ForestConfig,
}

/// Random-forest settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Base RNG seed; tree `i` uses `seed + i`
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Depth cap, unlimited when absent
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Nodes with fewer samples become leaves
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
}

// Default value functions
fn default_rsi_period() -> usize {
    14
}

fn default_ema_fast_period() -> usize {
    20
}

fn default_ema_slow_period() -> usize {
    50
}

fn default_train_fraction() -> f64 {
    0.8
}

fn default_recent_signal_window() -> usize {
    RECENT_SIGNAL_WINDOW
}

fn default_n_trees() -> usize {
    100
}

fn default_seed() -> u64 {
    42
}

fn default_min_samples_split() -> usize {
    2
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            seed: default_seed(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            ema_fast_period: default_ema_fast_period(),
            ema_slow_period: default_ema_slow_period(),
            train_fraction: default_train_fraction(),
            recent_signal_window: default_recent_signal_window(),
            forest: ForestConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::ConfigError(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rsi_period == 0 || self.ema_fast_period == 0 || self.ema_slow_period == 0 {
            return Err(AnalysisError::ConfigError("indicator periods must be positive".to_string()));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(AnalysisError::ConfigError(format!(
                "train_fraction {} must be inside (0, 1)",
                self.train_fraction
            )));
        }
        if self.forest.n_trees == 0 {
            return Err(AnalysisError::ConfigError("forest needs at least one tree".to_string()));
        }
        Ok(())
    }
}
