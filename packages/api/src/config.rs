//! Service configuration.

use std::time::Duration;

use chrono::TimeDelta;
use db::DbConfig;
use schedule_core::AnalyzerConfig;

use crate::ServiceError;

/// Configuration for the schedule issue service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Storage backend.
    pub db: DbConfig,
    /// How long a stored issue set counts as fresh.
    pub freshness_window: TimeDelta,
    /// Lifetime of admission entries.
    pub coordination_ttl: Duration,
    /// Lifetime of job records.
    pub job_record_ttl: Duration,
    /// Interval between purges of expired job records.
    pub housekeeping_interval: Duration,
    pub analyzer: AnalyzerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::memory(),
            freshness_window: TimeDelta::hours(24),
            coordination_ttl: actors::DEFAULT_COORDINATION_TTL,
            job_record_ttl: actors::DEFAULT_JOB_TTL,
            housekeeping_interval: actors::DEFAULT_HOUSEKEEPING_INTERVAL,
            analyzer: AnalyzerConfig::default(),
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, ServiceError> {
    value
        .trim()
        .parse()
        .map_err(|e| ServiceError::Config(format!("{}={:?}: {}", key, value, e)))
}

impl ServiceConfig {
    /// Read overrides from `SCHEDULE_*` environment variables.
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from a variable lookup, starting from the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServiceError> {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("SCHEDULE_DB_ENDPOINT") {
            config.db = config.db.with_endpoint(endpoint);
        }
        if let Some(namespace) = lookup("SCHEDULE_DB_NAMESPACE") {
            config.db = config.db.with_namespace(namespace);
        }
        if let Some(database) = lookup("SCHEDULE_DB_DATABASE") {
            config.db = config.db.with_database(database);
        }
        if let Some(hours) = lookup("SCHEDULE_FRESHNESS_HOURS") {
            let hours = parse_number("SCHEDULE_FRESHNESS_HOURS", &hours)?;
            let hours = i64::try_from(hours)
                .ok()
                .and_then(TimeDelta::try_hours)
                .ok_or_else(|| {
                    ServiceError::Config(format!("SCHEDULE_FRESHNESS_HOURS out of range: {}", hours))
                })?;
            config.freshness_window = hours;
        }
        if let Some(secs) = lookup("SCHEDULE_COORDINATION_TTL_SECS") {
            config.coordination_ttl =
                Duration::from_secs(parse_number("SCHEDULE_COORDINATION_TTL_SECS", &secs)?);
        }
        if let Some(secs) = lookup("SCHEDULE_JOB_TTL_SECS") {
            config.job_record_ttl =
                Duration::from_secs(parse_number("SCHEDULE_JOB_TTL_SECS", &secs)?);
        }

        Ok(config)
    }

    pub fn with_db(mut self, db: DbConfig) -> Self {
        self.db = db;
        self
    }

    pub fn with_freshness_window(mut self, window: TimeDelta) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn with_coordination_ttl(mut self, ttl: Duration) -> Self {
        self.coordination_ttl = ttl;
        self
    }

    pub fn with_job_record_ttl(mut self, ttl: Duration) -> Self {
        self.job_record_ttl = ttl;
        self
    }

    pub fn with_housekeeping_interval(mut self, interval: Duration) -> Self {
        self.housekeeping_interval = interval;
        self
    }

    pub fn with_analyzer(mut self, analyzer: AnalyzerConfig) -> Self {
        self.analyzer = analyzer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap_or_default();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.freshness_window, TimeDelta::hours(24));
        assert_eq!(config.coordination_ttl, Duration::from_secs(600));
    }

    #[test]
    fn variables_override_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("SCHEDULE_DB_ENDPOINT", "rocksdb://./data"),
            ("SCHEDULE_DB_NAMESPACE", "mirea"),
            ("SCHEDULE_FRESHNESS_HOURS", "6"),
            ("SCHEDULE_COORDINATION_TTL_SECS", " 120 "),
            ("SCHEDULE_JOB_TTL_SECS", "3600"),
        ]));
        let Ok(config) = config else {
            panic!("valid variables rejected: {:?}", config);
        };
        assert_eq!(config.db.endpoint, "rocksdb://./data");
        assert_eq!(config.db.namespace, "mirea");
        assert_eq!(config.db.database, "issues");
        assert_eq!(config.freshness_window, TimeDelta::hours(6));
        assert_eq!(config.coordination_ttl, Duration::from_secs(120));
        assert_eq!(config.job_record_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn malformed_number_is_rejected() {
        let result = ServiceConfig::from_lookup(lookup(&[("SCHEDULE_JOB_TTL_SECS", "a day")]));
        assert!(matches!(result, Err(ServiceError::Config(msg)) if msg.contains("SCHEDULE_JOB_TTL_SECS")));
    }
}
