use async_trait::async_trait;

use crate::{
    error::Error,
    types::{
        CompletionRequest, CompletionResponse, CreateSessionRequest, ExecuteRequest, SessionId,
        SessionInfo, SessionLog, StatementId, StatementInfo, VersionResponse,
    },
};

/// Livy REST operations, one method per endpoint.
///
/// [`crate::LivyClient`] speaks HTTP; tests substitute in-memory fakes.
#[async_trait]
pub trait LivyTransport: Send + Sync {
    /// `GET /version`. Servers older than 0.3 answer 404.
    async fn version(&self) -> Result<VersionResponse, Error>;

    /// `POST /sessions`
    async fn create_session(&self, request: &CreateSessionRequest) -> Result<SessionInfo, Error>;

    /// `GET /sessions/{id}`
    async fn get_session(&self, id: SessionId) -> Result<SessionInfo, Error>;

    /// `GET /sessions/{id}/log`
    async fn session_log(&self, id: SessionId) -> Result<SessionLog, Error>;

    /// `DELETE /sessions/{id}`
    async fn close_session(&self, id: SessionId) -> Result<(), Error>;

    /// `POST /sessions/{id}/statements`
    async fn submit_statement(
        &self,
        session: SessionId,
        request: &ExecuteRequest,
    ) -> Result<StatementInfo, Error>;

    /// `GET /sessions/{id}/statements/{sid}`
    async fn get_statement(
        &self,
        session: SessionId,
        statement: StatementId,
    ) -> Result<StatementInfo, Error>;

    /// `POST /sessions/{id}/statements/{sid}/cancel`
    async fn cancel_statement(&self, session: SessionId, statement: StatementId)
        -> Result<(), Error>;

    /// `POST /sessions/{id}/completion`
    async fn completion(
        &self,
        session: SessionId,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, Error>;
}
