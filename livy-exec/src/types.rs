use livy_client::SessionKind;
use livy_segment::{SourceKind, SqlQuotePolicy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ErrorKind;
use crate::output::TEXT_MIME;

/// Session kind a language binding runs on. SQL rides on a Scala session.
pub fn session_kind_for(language: SourceKind) -> SessionKind {
    match language {
        SourceKind::Scala | SourceKind::Sql => SessionKind::Spark,
        SourceKind::Python => SessionKind::PySpark,
        SourceKind::R => SessionKind::SparkR,
    }
}

/// Statement kind for a language on servers that accept per-statement kinds
pub fn statement_kind_for(language: SourceKind) -> SessionKind {
    match language {
        SourceKind::Scala => SessionKind::Spark,
        SourceKind::Python => SessionKind::PySpark,
        SourceKind::R => SessionKind::SparkR,
        SourceKind::Sql => SessionKind::Sql,
    }
}

/// Execution settings shared by the session manager, executor and classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Seconds to wait for a new session to become idle
    #[serde(with = "duration_secs")]
    pub session_create_timeout: Duration,
    /// Delay between two status polls
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,
    /// Upper bound on a single statement, cancel is attempted when reached
    #[serde(with = "duration_secs")]
    pub statement_timeout: Duration,
    pub max_result_rows: usize,
    pub max_field_length: usize,
    pub enable_field_truncation: bool,
    /// Sessions created with the same key are reused across bindings
    pub shared_session_key: Option<String>,
    pub sql_quote_policy: SqlQuotePolicy,
    pub session_name: Option<String>,
    pub proxy_user: Option<String>,
    /// Spark configuration sent with session creation
    pub spark_conf: HashMap<String, String>,
    /// Append the Spark application id and UI link to successful runs
    pub display_app_info: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            session_create_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(1000),
            statement_timeout: Duration::from_secs(3600),
            max_result_rows: 1000,
            max_field_length: 20,
            enable_field_truncation: true,
            shared_session_key: None,
            sql_quote_policy: SqlQuotePolicy::default(),
            session_name: None,
            proxy_user: None,
            spark_conf: HashMap::new(),
            display_app_info: false,
        }
    }
}

/// How a terminal statement got there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Completed,
    Cancelled,
    /// A cancel was requested but the statement finished first
    CancelRace,
}

/// Unclassified outcome of one statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOutput {
    pub success: bool,
    /// Payloads keyed by media type, as reported by the server
    pub data: Map<String, Value>,
    /// Multi-line error text when `success` is false
    pub trace: Option<String>,
    pub termination: Termination,
}

impl RawOutput {
    pub fn ok(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            data,
            trace: None,
            termination: Termination::Completed,
        }
    }

    pub fn failed(trace: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Map::new(),
            trace: Some(trace.into()),
            termination: Termination::Completed,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.data.get(TEXT_MIME).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultKind {
    Text,
    Html,
    Table,
    Image,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    /// Opaque base64 content, never decoded here
    Binary { media_type: String, data: String },
}

/// Display-ready result of one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedResult {
    pub kind: ResultKind,
    pub payload: Payload,
    /// Rows were dropped to honour the row limit
    #[serde(default)]
    pub truncated: bool,
}

impl TypedResult {
    pub fn new(kind: ResultKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            payload: Payload::Text(text.into()),
            truncated: false,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ResultKind::Text, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(ResultKind::Error, text)
    }

    pub fn image(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Image,
            payload: Payload::Binary {
                media_type: media_type.into(),
                data: data.into(),
            },
            truncated: false,
        }
    }

    /// Text payload, or the base64 data of a binary one
    pub fn data(&self) -> &str {
        match &self.payload {
            Payload::Text(text) => text,
            Payload::Binary { data, .. } => data,
        }
    }
}

/// Ordered results of a run and the failure that stopped it, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub results: Vec<TypedResult>,
    pub failure: Option<ErrorKind>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
