use crate::error::Error;
use livy_client::LivyConfig;
use livy_exec::ExecutionConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_LIVY_URL: &str = "http://localhost:8998";

/// Everything a [`Notebook`](crate::Notebook) needs to talk to one Livy server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotebookConfig {
    pub livy: LivyConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LIVY_URL)
    }
}

impl NotebookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            livy: LivyConfig::new(url),
            execution: ExecutionConfig::default(),
        }
    }

    /// Parse a TOML document with `[livy]` and `[execution]` tables.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Build a configuration from interpreter properties such as
    /// `zeppelin.livy.url` or `livy.spark.executor.memory`.
    pub fn from_properties<'a, I>(properties: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        config.apply_properties(properties)?;
        Ok(config)
    }

    /// Overlay interpreter properties on this configuration. Keys may carry a
    /// `zeppelin.` prefix; unknown keys outside `livy.spark.` are ignored.
    pub fn apply_properties<'a, I>(&mut self, properties: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in properties {
            let name = key.strip_prefix("zeppelin.").unwrap_or(key);
            let value = value.trim();
            match name {
                "livy.url" => self.livy.url = value.to_string(),
                "livy.session.create_timeout" => {
                    self.execution.session_create_timeout =
                        Duration::from_secs(parse(key, value)?);
                }
                "livy.pull_status.interval.millis" => {
                    self.execution.poll_interval = Duration::from_millis(parse(key, value)?);
                }
                "livy.spark.sql.maxResult" => self.execution.max_result_rows = parse(key, value)?,
                "livy.spark.sql.field.truncate" => {
                    self.execution.enable_field_truncation = parse(key, value)?;
                }
                "livy.spark.sql.field.maxLength" => {
                    self.execution.max_field_length = parse(key, value)?;
                }
                "livy.http.headers" => self.livy.headers.extend(parse_headers(value)?),
                "livy.shared_session" => {
                    self.execution.shared_session_key = non_empty(value);
                }
                "livy.name" => self.execution.session_name = non_empty(value),
                "livy.proxy_user" => self.execution.proxy_user = non_empty(value),
                "livy.displayAppInfo" => self.execution.display_app_info = parse(key, value)?,
                _ => match name.strip_prefix("livy.spark.") {
                    Some(conf) if !value.is_empty() => {
                        self.execution
                            .spark_conf
                            .insert(format!("spark.{}", conf), value.to_string());
                    }
                    _ => debug!("Ignoring property {}", key),
                },
            }
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", key, value)))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// `Name: value; Other-Name: value`
fn parse_headers(value: &str) -> Result<HashMap<String, String>, Error> {
    let mut headers = HashMap::new();
    for pair in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        match pair.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                headers.insert(name.trim().to_string(), value.trim().to_string());
            }
            _ => {
                return Err(Error::Config(format!(
                    "Invalid HTTP header {:?}, expected `name: value`",
                    pair
                )))
            }
        }
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spark_properties_become_session_conf() {
        let config = NotebookConfig::from_properties([
            ("zeppelin.livy.url", "http://livy:8998"),
            ("livy.spark.executor.cores", "4"),
            ("livy.spark.dynamicAllocation.enabled", "true"),
            ("livy.spark.driver.memory", ""),
            ("livy.name", "notebook-session"),
            ("zeppelin.interpreter.output.limit", "100"),
        ])
        .unwrap();

        assert_eq!(config.livy.url, "http://livy:8998");
        assert_eq!(
            config.execution.spark_conf.get("spark.executor.cores"),
            Some(&"4".to_string())
        );
        assert_eq!(
            config
                .execution
                .spark_conf
                .get("spark.dynamicAllocation.enabled"),
            Some(&"true".to_string())
        );
        assert_eq!(config.execution.spark_conf.len(), 2);
        assert!(!config.execution.display_app_info);
        assert_eq!(
            config.execution.session_name.as_deref(),
            Some("notebook-session")
        );
    }

    #[test]
    fn test_rendering_properties_are_not_spark_conf() {
        let config = NotebookConfig::from_properties([
            ("zeppelin.livy.spark.sql.maxResult", "50"),
            ("zeppelin.livy.spark.sql.field.truncate", "false"),
            ("zeppelin.livy.spark.sql.field.maxLength", "8"),
            ("zeppelin.livy.session.create_timeout", "30"),
            ("zeppelin.livy.pull_status.interval.millis", "250"),
            ("zeppelin.livy.displayAppInfo", "true"),
        ])
        .unwrap();

        let execution = &config.execution;
        assert_eq!(execution.max_result_rows, 50);
        assert!(!execution.enable_field_truncation);
        assert_eq!(execution.max_field_length, 8);
        assert_eq!(execution.session_create_timeout, Duration::from_secs(30));
        assert_eq!(execution.poll_interval, Duration::from_millis(250));
        assert!(execution.display_app_info);
        assert!(execution.spark_conf.is_empty());
    }

    #[test]
    fn test_http_headers() {
        let config = NotebookConfig::from_properties([(
            "zeppelin.livy.http.headers",
            "X-Auth: token-1; X-Team : data ;",
        )])
        .unwrap();
        assert_eq!(config.livy.headers.get("X-Auth"), Some(&"token-1".to_string()));
        assert_eq!(config.livy.headers.get("X-Team"), Some(&"data".to_string()));

        let err = NotebookConfig::from_properties([("livy.http.headers", "no-colon")]);
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_number() {
        let err = NotebookConfig::from_properties([("livy.spark.sql.maxResult", "lots")]);
        match err {
            Err(Error::Config(message)) => assert!(message.contains("livy.spark.sql.maxResult")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_shared_session_key() {
        let config =
            NotebookConfig::from_properties([("livy.shared_session", "team-a")]).unwrap();
        assert_eq!(config.execution.shared_session_key.as_deref(), Some("team-a"));

        let config = NotebookConfig::from_properties([("livy.shared_session", " ")]).unwrap();
        assert!(config.execution.shared_session_key.is_none());
    }

    #[test]
    fn test_toml_file() {
        let config = NotebookConfig::from_toml_str(
            r#"
            [livy]
            url = "https://livy.example.com"
            headers = { "X-Auth" = "abc" }

            [execution]
            session_create_timeout = 45
            poll_interval = 200
            max_result_rows = 10
            shared_session_key = "team"

            [execution.spark_conf]
            "spark.executor.memory" = "2g"
            "#,
        )
        .unwrap();

        assert_eq!(config.livy.url, "https://livy.example.com");
        assert_eq!(config.livy.request_timeout_secs, 30);
        assert_eq!(config.livy.headers.get("X-Auth"), Some(&"abc".to_string()));
        assert_eq!(
            config.execution.session_create_timeout,
            Duration::from_secs(45)
        );
        assert_eq!(config.execution.poll_interval, Duration::from_millis(200));
        assert_eq!(config.execution.max_result_rows, 10);
        assert_eq!(config.execution.max_field_length, 20);
        assert_eq!(config.execution.shared_session_key.as_deref(), Some("team"));
        assert_eq!(
            config.execution.spark_conf.get("spark.executor.memory"),
            Some(&"2g".to_string())
        );
    }

    #[test]
    fn test_toml_requires_url() {
        let err = NotebookConfig::from_toml_str("[execution]\nmax_result_rows = 1\n");
        assert!(matches!(err, Err(Error::Toml(_))));
    }
}
