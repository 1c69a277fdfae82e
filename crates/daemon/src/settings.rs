// Daemon settings (read once at startup)

use anyhow::{bail, Context, Result};
use erp_intake_core::application::worker::constants::{
    DEFAULT_MIN_CONFIDENCE, DEFAULT_WORKER_COUNT,
};

pub const ENV_WORKERS: &str = "ERP_INTAKE_WORKERS";
pub const ENV_MIN_CONFIDENCE: &str = "ERP_INTAKE_MIN_CONFIDENCE";
pub const ENV_LOG_FORMAT: &str = "ERP_INTAKE_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaemonSettings {
    pub workers: usize,
    pub min_confidence: f64,
    pub log_format: LogFormat,
}

impl DaemonSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let workers = match lookup(ENV_WORKERS) {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("{} must be a positive integer", ENV_WORKERS))?,
            None => DEFAULT_WORKER_COUNT,
        };
        if workers == 0 {
            bail!("{} must be at least 1", ENV_WORKERS);
        }

        let min_confidence = match lookup(ENV_MIN_CONFIDENCE) {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number", ENV_MIN_CONFIDENCE))?,
            None => DEFAULT_MIN_CONFIDENCE,
        };
        if !(0.0..=1.0).contains(&min_confidence) {
            bail!("{} must be within 0.0..=1.0", ENV_MIN_CONFIDENCE);
        }

        let log_format = match lookup(ENV_LOG_FORMAT).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            workers,
            min_confidence,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = DaemonSettings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.workers, DEFAULT_WORKER_COUNT);
        assert_eq!(settings.min_confidence, DEFAULT_MIN_CONFIDENCE);
        assert_eq!(settings.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let settings = DaemonSettings::from_lookup(|key| match key {
            ENV_WORKERS => Some("4".to_string()),
            ENV_MIN_CONFIDENCE => Some("0.5".to_string()),
            ENV_LOG_FORMAT => Some("json".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.min_confidence, 0.5);
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_zero_workers_and_bad_confidence() {
        assert!(DaemonSettings::from_lookup(|key| {
            (key == ENV_WORKERS).then(|| "0".to_string())
        })
        .is_err());
        assert!(DaemonSettings::from_lookup(|key| {
            (key == ENV_MIN_CONFIDENCE).then(|| "1.7".to_string())
        })
        .is_err());
    }
}
