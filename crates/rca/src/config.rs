//! Service configuration, environment-driven with in-cluster defaults.

use crate::ai::client::LlmConfig;
use crate::cryostat::CryostatConfig;
use crate::prometheus::PrometheusConfig;

/// Top-level configuration for one service instance.
#[derive(Debug, Clone)]
pub struct RcaConfig {
    /// Prometheus client settings
    pub prometheus: PrometheusConfig,
    /// Cryostat client settings
    pub cryostat: CryostatConfig,
    /// Model endpoint settings
    pub llm: LlmConfig,
    /// Model used for anomaly detection
    pub detector_model: String,
    /// Model used for root cause analysis
    pub analyst_model: String,
    /// Model used for validation/formatting
    pub validator_model: String,
    /// Label selector (`key=value`) marking pods for the scanner
    pub scan_label: String,
    /// Scheduled scan cadence in serve mode
    pub scan_interval_secs: u64,
    /// Log tail cap per fetch
    pub log_tail_lines: i64,
}

impl Default for RcaConfig {
    fn default() -> Self {
        Self {
            prometheus: PrometheusConfig::default(),
            cryostat: CryostatConfig::default(),
            llm: LlmConfig::default(),
            detector_model: env_or("RCA_DETECTOR_MODEL", "gpt-4o-mini"),
            analyst_model: env_or("RCA_ANALYST_MODEL", "gpt-4o"),
            validator_model: env_or("RCA_VALIDATOR_MODEL", "gpt-4o"),
            scan_label: env_or("RCA_LABEL", "rca.enabled=true"),
            scan_interval_secs: env_parse("RCA_SCAN_INTERVAL_SECS", 300),
            log_tail_lines: env_parse("RCA_LOG_TAIL", 500),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
