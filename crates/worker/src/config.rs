use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use lyricflow_core::retry::{Backoff, RetryPolicy, DEFAULT_MAX_RETRIES};
use lyricflow_pipeline::DispatcherConfig;
use lyricflow_services::transcription::DEFAULT_LANGUAGE;
use lyricflow_services::ServiceEndpoint;

/// A configuration variable is missing or malformed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub dispatcher: DispatcherConfig,
    /// `None` keeps the uploaded audio (pass-through).
    pub style_transfer: Option<ServiceEndpoint>,
    pub transcription: ServiceEndpoint,
    pub transcription_language: String,
    /// `None` uses the placeholder renderer.
    pub render: Option<ServiceEndpoint>,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `DATABASE_URL`               | required                   |
    /// | `DATABASE_MAX_CONNECTIONS`   | `10`                       |
    /// | `JOB_POLL_INTERVAL_MS`       | `5000`                     |
    /// | `JOB_BATCH_SIZE`             | `10`                       |
    /// | `JOB_MAX_RETRIES`            | `3`                        |
    /// | `JOB_HANDLER_TIMEOUT_SECS`   | `600`                      |
    /// | `JOB_RETRY_INITIAL_DELAY_MS` | `5000`                     |
    /// | `JOB_RETRY_MAX_DELAY_MS`     | `60000`                    |
    /// | `STYLE_TRANSFER_API_URL`     | unset (pass-through)       |
    /// | `STYLE_TRANSFER_API_KEY`     | unset                      |
    /// | `TRANSCRIPTION_API_URL`      | required                   |
    /// | `TRANSCRIPTION_API_KEY`      | unset                      |
    /// | `TRANSCRIPTION_LANGUAGE`     | `fr`                       |
    /// | `RENDER_API_URL`             | unset (placeholder)        |
    /// | `RENDER_API_KEY`             | unset                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Same as [`from_env`](Self::from_env) over an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let env = Env(vars);

        let database_url = env.required("DATABASE_URL")?;
        let database_max_connections = env.positive("DATABASE_MAX_CONNECTIONS", 10)?;

        let poll_interval_ms: u64 = env.positive("JOB_POLL_INTERVAL_MS", 5000)?;
        let batch_size: usize = env.positive("JOB_BATCH_SIZE", 10)?;
        let max_retries: i32 = env.positive("JOB_MAX_RETRIES", DEFAULT_MAX_RETRIES)?;
        let handler_timeout_secs: u64 = env.positive("JOB_HANDLER_TIMEOUT_SECS", 600)?;
        let initial_delay_ms: u64 = env.parsed("JOB_RETRY_INITIAL_DELAY_MS", 5000)?;
        let max_delay_ms: u64 = env.parsed("JOB_RETRY_MAX_DELAY_MS", 60_000)?;

        let dispatcher = DispatcherConfig {
            poll_interval: Duration::from_millis(poll_interval_ms),
            batch_size,
            retry: RetryPolicy {
                max_retries,
                backoff: Backoff {
                    initial_delay: Duration::from_millis(initial_delay_ms),
                    max_delay: Duration::from_millis(max_delay_ms),
                    ..Backoff::default()
                },
            },
            handler_timeout: Duration::from_secs(handler_timeout_secs),
        };

        let transcription = env
            .endpoint("TRANSCRIPTION_API_URL", "TRANSCRIPTION_API_KEY")
            .ok_or(ConfigError::Missing("TRANSCRIPTION_API_URL"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            dispatcher,
            style_transfer: env.endpoint("STYLE_TRANSFER_API_URL", "STYLE_TRANSFER_API_KEY"),
            transcription,
            transcription_language: env
                .optional("TRANSCRIPTION_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            render: env.endpoint("RENDER_API_URL", "RENDER_API_KEY"),
        })
    }
}

/// Lookup helpers over a variable map. Blank values count as unset.
struct Env<'a>(&'a HashMap<String, String>);

impl Env<'_> {
    fn optional(&self, name: &str) -> Option<String> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn parsed<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(name) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name,
                expected: "a non-negative integer",
                value,
            }),
        }
    }

    fn positive<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + Default,
    {
        let value = self.parsed(name, default)?;
        if value > T::default() {
            Ok(value)
        } else {
            Err(ConfigError::Invalid {
                name,
                expected: "a positive integer",
                value: self.optional(name).unwrap_or_default(),
            })
        }
    }

    fn endpoint(&self, url_var: &str, key_var: &str) -> Option<ServiceEndpoint> {
        self.optional(url_var)
            .map(|url| ServiceEndpoint::new(url, self.optional(key_var)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgres://localhost/lyricflow"),
            ("TRANSCRIPTION_API_URL", "https://whisper.example.com"),
        ]
    }

    #[test]
    fn defaults_apply_when_only_required_vars_set() {
        let config = WorkerConfig::from_vars(&vars(&minimal())).unwrap();

        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.dispatcher.poll_interval, Duration::from_millis(5000));
        assert_eq!(config.dispatcher.batch_size, 10);
        assert_eq!(config.dispatcher.retry.max_retries, 3);
        assert_eq!(config.dispatcher.handler_timeout, Duration::from_secs(600));
        assert_eq!(
            config.dispatcher.retry.backoff.initial_delay,
            Duration::from_secs(5)
        );
        assert_eq!(
            config.dispatcher.retry.backoff.max_delay,
            Duration::from_secs(60)
        );
        assert_eq!(config.transcription_language, "fr");
        assert!(config.transcription.api_key.is_none());
        assert!(config.style_transfer.is_none());
        assert!(config.render.is_none());
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = WorkerConfig::from_vars(&vars(&[(
            "TRANSCRIPTION_API_URL",
            "https://whisper.example.com",
        )]))
        .unwrap_err();
        assert_matches!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn missing_transcription_url_is_reported() {
        let err = WorkerConfig::from_vars(&vars(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert_matches!(err, ConfigError::Missing("TRANSCRIPTION_API_URL"));
    }

    #[test]
    fn overrides_and_optional_services() {
        let mut pairs = minimal();
        pairs.extend([
            ("JOB_POLL_INTERVAL_MS", "250"),
            ("JOB_BATCH_SIZE", "3"),
            ("JOB_MAX_RETRIES", "5"),
            ("JOB_RETRY_INITIAL_DELAY_MS", "0"),
            ("STYLE_TRANSFER_API_URL", "https://style.example.com"),
            ("STYLE_TRANSFER_API_KEY", "secret"),
            ("RENDER_API_URL", "  "),
            ("TRANSCRIPTION_LANGUAGE", "en"),
        ]);
        let config = WorkerConfig::from_vars(&vars(&pairs)).unwrap();

        assert_eq!(config.dispatcher.poll_interval, Duration::from_millis(250));
        assert_eq!(config.dispatcher.batch_size, 3);
        assert_eq!(config.dispatcher.retry.max_retries, 5);
        assert_eq!(config.dispatcher.retry.backoff.initial_delay, Duration::ZERO);
        assert_eq!(
            config.style_transfer,
            Some(ServiceEndpoint::new(
                "https://style.example.com",
                Some("secret".to_string())
            ))
        );
        assert!(config.render.is_none());
        assert_eq!(config.transcription_language, "en");
    }

    #[test]
    fn malformed_number_is_invalid() {
        let mut pairs = minimal();
        pairs.push(("JOB_BATCH_SIZE", "ten"));
        let err = WorkerConfig::from_vars(&vars(&pairs)).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { name: "JOB_BATCH_SIZE", .. });
    }

    #[test]
    fn zero_poll_interval_is_invalid() {
        let mut pairs = minimal();
        pairs.push(("JOB_POLL_INTERVAL_MS", "0"));
        let err = WorkerConfig::from_vars(&vars(&pairs)).unwrap_err();
        assert_matches!(
            err,
            ConfigError::Invalid {
                name: "JOB_POLL_INTERVAL_MS",
                expected: "a positive integer",
                ..
            }
        );
    }
}
