//! Client configuration, with environment overrides.

use std::time::Duration;

use crate::scheduler::DEFAULT_QUIET_WINDOW;

pub const ENV_SERVER_URL: &str = "PSEUDOCODE_SERVER_URL";
pub const ENV_QUIET_MS: &str = "PSEUDOCODE_QUIET_MS";
pub const ENV_TIMEOUT_SECS: &str = "PSEUDOCODE_TIMEOUT_SECS";
pub const ENV_MAX_STEPS: &str = "PSEUDOCODE_MAX_STEPS";

/// Error produced while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but does not parse.
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the interpreter service.
    pub server_url: String,
    /// Debounce window before re-highlighting.
    pub quiet_window: Duration,
    /// Per-request timeout for remote calls.
    pub request_timeout: Duration,
    /// Upper bound on steps a consistency check will drive.
    pub max_steps: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            quiet_window: DEFAULT_QUIET_WINDOW,
            request_timeout: Duration::from_secs(30),
            max_steps: 10_000,
        }
    }
}

impl Config {
    /// Defaults overridden by `PSEUDOCODE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_SERVER_URL) {
            config.server_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ms) = parse_var(&lookup, ENV_QUIET_MS)? {
            config.quiet_window = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var(&lookup, ENV_TIMEOUT_SECS)? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(steps) = parse_var(&lookup, ENV_MAX_STEPS)? {
            config.max_steps = usize::try_from(steps).map_err(|_| ConfigError::Invalid {
                var: ENV_MAX_STEPS,
                value: steps.to_string(),
            })?;
        }

        Ok(config)
    }
}

fn parse_var<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { var, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_overrides() {
        let config = Config::from_lookup(|_| None).expect("config");
        assert_eq!(config, Config::default());
        assert_eq!(config.quiet_window, Duration::from_millis(100));
    }

    #[test]
    fn overrides_apply() {
        let config = Config::from_lookup(|var| match var {
            ENV_SERVER_URL => Some("http://interp:9000/".to_string()),
            ENV_QUIET_MS => Some("250".to_string()),
            ENV_MAX_STEPS => Some("50".to_string()),
            _ => None,
        })
        .expect("config");
        assert_eq!(config.server_url, "http://interp:9000");
        assert_eq!(config.quiet_window, Duration::from_millis(250));
        assert_eq!(config.max_steps, 50);
    }

    #[test]
    fn invalid_number_is_reported() {
        let err = Config::from_lookup(|var| (var == ENV_TIMEOUT_SECS).then(|| "soon".to_string()))
            .expect_err("should fail");
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: ENV_TIMEOUT_SECS,
                value: "soon".to_string(),
            }
        );
    }
}
