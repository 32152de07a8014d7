//! Configuration surface consumed by the pipeline.
//!
//! Values arrive from CLI flags, optionally seeded from a YAML file; the
//! pipeline itself receives plain validated values. All numeric knobs must
//! be positive, and violations are fatal at startup.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Selects the aggregation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Count trace occurrences (CPU-time accounting).
    Cpu,
    /// Average sampled memory magnitudes per trace.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Ingestion server base URL, e.g. "https://pyroscope.example.com".
    #[serde(default)]
    pub server: String,

    /// Application name samples are reported under.
    #[serde(default)]
    pub app_name: String,

    /// Bearer token for the ingestion endpoint. Empty disables auth.
    #[serde(default)]
    pub auth_token: String,

    /// Profiler sampling rate in Hz; converts sample counts to CPU time
    /// on the server side. Default: 100.
    #[serde(default = "default_rate_hz")]
    pub rate_hz: u32,

    /// Maximum time between dispatches. Default: 10s.
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Maximum number of grouped traces per dispatch. Default: 250.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    /// Dispatch queue capacity; the producer suspends beyond it.
    /// Default: 10000.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Maximum concurrent ingest requests. Default: 10.
    #[serde(default = "default_concurrent_request_limit")]
    pub concurrent_request_limit: usize,

    /// Static tags attached to every sample.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Plugins to apply, in order.
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Aggregation metric. Default: cpu.
    #[serde(default = "default_metric")]
    pub metric: MetricKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: String::new(),
            app_name: String::new(),
            auth_token: String::new(),
            rate_hz: default_rate_hz(),
            interval: default_interval(),
            batch_limit: default_batch_limit(),
            queue_capacity: default_queue_capacity(),
            concurrent_request_limit: default_concurrent_request_limit(),
            tags: BTreeMap::new(),
            plugins: Vec::new(),
            metric: default_metric(),
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&raw).context("parsing config file")
    }

    /// Enforces the startup invariants of the configuration surface.
    pub fn validate(&self) -> Result<()> {
        if self.server.is_empty() {
            bail!("server URL is required");
        }
        if self.app_name.is_empty() {
            bail!("app name is required");
        }
        if self.rate_hz == 0 {
            bail!("rate_hz must be positive");
        }
        if self.interval.as_secs() == 0 {
            bail!("interval must be at least one second");
        }
        if self.batch_limit == 0 {
            bail!("batch_limit must be positive");
        }
        if self.queue_capacity == 0 {
            bail!("queue_capacity must be positive");
        }
        if self.concurrent_request_limit == 0 {
            bail!("concurrent_request_limit must be positive");
        }
        Ok(())
    }
}

/// Parses one repeatable `key=value` tag argument.
pub fn parse_tag(raw: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("invalid tag format (expected key=value): {raw}");
    };
    Ok((name.to_string(), value.to_string()))
}

fn default_rate_hz() -> u32 {
    100
}

fn default_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_batch_limit() -> usize {
    250
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_concurrent_request_limit() -> usize {
    10
}

fn default_metric() -> MetricKind {
    MetricKind::Cpu
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            server: "http://pyroscope.local:4040".to_string(),
            app_name: "app".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults_validate_once_required_fields_set() {
        valid().validate().expect("valid config");
    }

    #[test]
    fn test_missing_server_rejected() {
        let cfg = Config {
            server: String::new(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_values_rejected() {
        for mutate in [
            (|c: &mut Config| c.rate_hz = 0) as fn(&mut Config),
            |c| c.interval = Duration::ZERO,
            |c| c.batch_limit = 0,
            |c| c.queue_capacity = 0,
            |c| c.concurrent_request_limit = 0,
        ] {
            let mut cfg = valid();
            mutate(&mut cfg);
            assert!(cfg.validate().is_err());
        }
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(
            parse_tag("host=server1").expect("valid tag"),
            ("host".to_string(), "server1".to_string())
        );
        assert!(parse_tag("host").is_err());
    }

    #[test]
    fn test_yaml_config_parses_with_defaults() {
        let cfg: Config = serde_yaml::from_str(
            "server: http://pyroscope.local:4040\napp_name: app\ninterval: 30s\nmetric: memory\n",
        )
        .expect("valid yaml");
        assert_eq!(cfg.interval, Duration::from_secs(30));
        assert_eq!(cfg.metric, MetricKind::Memory);
        assert_eq!(cfg.batch_limit, 250);
    }
}
