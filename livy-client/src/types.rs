use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

pub type SessionId = u64;
pub type StatementId = u64;

/// Interpreter kind a Livy session (or a single statement) runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Spark,
    PySpark,
    SparkR,
    Sql,
    /// One session serving every language, Livy 0.5+
    Shared,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Spark => "spark",
            SessionKind::PySpark => "pyspark",
            SessionKind::SparkR => "sparkr",
            SessionKind::Sql => "sql",
            SessionKind::Shared => "shared",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Starting,
    Idle,
    Busy,
    ShuttingDown,
    Error,
    Dead,
    Killed,
    Success,
    #[serde(other)]
    Unknown,
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// The session will never accept statements again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::ShuttingDown
                | SessionState::Error
                | SessionState::Dead
                | SessionState::Killed
                | SessionState::Success
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: SessionId,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub proxy_user: Option<String>,
    pub state: SessionState,
    /// Kept as text; older servers report kinds this client does not know
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub app_info: HashMap<String, Option<String>>,
    #[serde(default)]
    pub log: Vec<String>,
}

impl SessionInfo {
    /// Spark UI link, when the server reports one
    pub fn spark_ui_url(&self) -> Option<&str> {
        self.app_info.get("sparkUiUrl").and_then(|v| v.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub kind: SessionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_user: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub conf: HashMap<String, String>,
}

impl CreateSessionRequest {
    pub fn new(kind: SessionKind) -> Self {
        Self {
            kind,
            name: None,
            proxy_user: None,
            conf: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLog {
    pub id: SessionId,
    #[serde(default)]
    pub from: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementState {
    Waiting,
    Running,
    Available,
    Error,
    Cancelling,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl StatementState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StatementState::Available | StatementState::Error | StatementState::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStatus {
    Ok,
    Error,
}

/// Jupyter-style result of a finished statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementOutput {
    pub status: OutputStatus,
    #[serde(default)]
    pub execution_count: Option<i64>,
    /// Payloads keyed by media type
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub ename: Option<String>,
    #[serde(default)]
    pub evalue: Option<String>,
    #[serde(default)]
    pub traceback: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementInfo {
    pub id: StatementId,
    #[serde(default)]
    pub code: Option<String>,
    pub state: StatementState,
    #[serde(default)]
    pub output: Option<StatementOutput>,
    #[serde(default)]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub code: String,
    /// Per-statement kind, only meaningful on shared sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SessionKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub code: String,
    pub kind: SessionKind,
    pub cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_info_from_server() {
        let info: SessionInfo = serde_json::from_value(json!({
            "id": 3,
            "appId": "application_1_0001",
            "owner": null,
            "proxyUser": null,
            "state": "starting",
            "kind": "shared",
            "appInfo": {"driverLogUrl": null, "sparkUiUrl": "http://ui:4040"},
            "log": ["stdout: ", "line"]
        }))
        .unwrap();

        assert_eq!(info.id, 3);
        assert_eq!(info.state, SessionState::Starting);
        assert_eq!(info.spark_ui_url(), Some("http://ui:4040"));
        assert_eq!(info.log.len(), 2);
    }

    #[test]
    fn test_unknown_states_do_not_fail() {
        let state: SessionState = serde_json::from_value(json!("recovering")).unwrap();
        assert_eq!(state, SessionState::Unknown);
        let state: StatementState = serde_json::from_value(json!("queued")).unwrap();
        assert_eq!(state, StatementState::Unknown);
    }

    #[test]
    fn test_create_request_omits_empty_fields() {
        let body = serde_json::to_value(CreateSessionRequest::new(SessionKind::PySpark)).unwrap();
        assert_eq!(body, json!({"kind": "pyspark"}));

        let mut request = CreateSessionRequest::new(SessionKind::Shared);
        request.proxy_user = Some("alice".into());
        request
            .conf
            .insert("spark.driver.memory".into(), "1g".into());
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(body["proxyUser"], "alice");
        assert_eq!(body["conf"]["spark.driver.memory"], "1g");
    }

    #[test]
    fn test_error_output_parses() {
        let output: StatementOutput = serde_json::from_value(json!({
            "status": "error",
            "execution_count": 1,
            "ename": "NameError",
            "evalue": "name 'a' is not defined",
            "traceback": ["Traceback ...\n"]
        }))
        .unwrap();
        assert_eq!(output.status, OutputStatus::Error);
        assert!(output.data.is_empty());
        assert_eq!(output.traceback.len(), 1);
    }
}
