use anyhow::{Context, Result};
use sc_analysis::AnalysisConfig;
use sc_hub::HubConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Websocket listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the chart API
    #[serde(default = "default_chart_endpoint")]
    pub chart_endpoint: String,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8001".to_string()
}

fn default_chart_endpoint() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            chart_endpoint: default_chart_endpoint(),
            hub: HubConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: RelayConfig = serde_yaml::from_str(yaml)?;
        config.hub.validate()?;
        config.analysis.validate()?;
        Ok(config)
    }
}
