use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Client, Method, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    config::LivyConfig,
    error::Error,
    transport::LivyTransport,
    types::{
        CompletionRequest, CompletionResponse, CreateSessionRequest, ExecuteRequest, SessionId,
        SessionInfo, SessionLog, StatementId, StatementInfo, VersionResponse,
    },
};

/// HTTP client for a single Livy server
pub struct LivyClient {
    client: Client,
    config: LivyConfig,
}

impl LivyClient {
    /// Create a new LivyClient with the given configuration
    pub fn new(config: LivyConfig) -> Result<Self, Error> {
        if config.url.trim().is_empty() {
            return Err(Error::Configuration("Livy url must not be empty".into()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(default_headers(&config)?)
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LivyConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("{} {}", method, path);
        self.client.request(method, self.config.endpoint(path))
    }

    async fn check(response: Response) -> Result<Response, Error> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await?;
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(message));
        }
        Err(Error::Api {
            status_code: status.as_u16(),
            message,
        })
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, Error> {
        let response = Self::check(builder.send().await?).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn default_headers(config: &LivyConfig) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("x-requested-by"),
        HeaderValue::from_str(&config.requested_by)
            .map_err(|e| Error::Configuration(format!("Invalid X-Requested-By value: {}", e)))?,
    );

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Configuration(format!("Invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Configuration(format!("Invalid value for header {}: {}", name, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[async_trait]
impl LivyTransport for LivyClient {
    async fn version(&self) -> Result<VersionResponse, Error> {
        Self::send(self.request(Method::GET, "/version")).await
    }

    async fn create_session(&self, request: &CreateSessionRequest) -> Result<SessionInfo, Error> {
        Self::send(self.request(Method::POST, "/sessions").json(request)).await
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionInfo, Error> {
        Self::send(self.request(Method::GET, &format!("/sessions/{}", id))).await
    }

    async fn session_log(&self, id: SessionId) -> Result<SessionLog, Error> {
        Self::send(self.request(Method::GET, &format!("/sessions/{}/log", id))).await
    }

    async fn close_session(&self, id: SessionId) -> Result<(), Error> {
        let builder = self.request(Method::DELETE, &format!("/sessions/{}", id));
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    async fn submit_statement(
        &self,
        session: SessionId,
        request: &ExecuteRequest,
    ) -> Result<StatementInfo, Error> {
        let path = format!("/sessions/{}/statements", session);
        Self::send(self.request(Method::POST, &path).json(request)).await
    }

    async fn get_statement(
        &self,
        session: SessionId,
        statement: StatementId,
    ) -> Result<StatementInfo, Error> {
        let path = format!("/sessions/{}/statements/{}", session, statement);
        Self::send(self.request(Method::GET, &path)).await
    }

    async fn cancel_statement(
        &self,
        session: SessionId,
        statement: StatementId,
    ) -> Result<(), Error> {
        let path = format!("/sessions/{}/statements/{}/cancel", session, statement);
        Self::check(self.request(Method::POST, &path).send().await?).await?;
        Ok(())
    }

    async fn completion(
        &self,
        session: SessionId,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, Error> {
        let path = format!("/sessions/{}/completion", session);
        Self::send(self.request(Method::POST, &path).json(request)).await
    }
}
