use livy_client::{
    ExecuteRequest, LivyTransport, OutputStatus, SessionId, StatementId, StatementInfo,
    StatementOutput, StatementState,
};
use serde_json::Map;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{
    error::Error,
    session::{CancelTarget, Session, SessionManager},
    types::{ExecutionConfig, RawOutput, Termination},
    version::{CapabilitySet, Feature},
};

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Spark messages Livy uses for a cancelled job. Only consulted when the
/// server reports a plain error instead of the `cancelled` state.
const CANCELLATION_MESSAGES: [&str; 2] = ["Job is cancelled", "cancelled part of cancelled job group"];

/// Submits statements and polls them to a terminal state.
///
/// Each executor has its own identity on a session, so [`Self::cancel`]
/// only ever targets statements this executor submitted.
pub struct StatementExecutor {
    transport: Arc<dyn LivyTransport>,
    capabilities: CapabilitySet,
    poll_interval: Duration,
    timeout: Duration,
    owner: u64,
}

impl StatementExecutor {
    pub fn new(
        transport: Arc<dyn LivyTransport>,
        capabilities: CapabilitySet,
        config: &ExecutionConfig,
    ) -> Self {
        Self {
            transport,
            capabilities,
            poll_interval: config.poll_interval,
            timeout: config.statement_timeout,
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn for_manager(manager: &SessionManager) -> Self {
        Self::new(
            manager.transport(),
            manager.capabilities(),
            manager.config(),
        )
    }

    pub async fn execute(
        &self,
        session: &Session,
        request: &ExecuteRequest,
    ) -> Result<RawOutput, Error> {
        if session.is_dead() {
            return Err(Error::SessionDead(session.id()));
        }
        self.settle(session).await?;
        let mut in_flight = session.begin(self.owner)?;

        let submitted = self
            .transport
            .submit_statement(session.id(), request)
            .await
            .map_err(|e| lost(session, e))?;
        let statement = submitted.id;
        debug!("Submitted statement {} to session {}", statement, session.id());
        if in_flight.submitted(statement) {
            self.send_cancel(session.id(), statement).await;
        }

        let deadline = Instant::now() + self.timeout;
        let mut state = submitted.state;
        let mut info = submitted;
        while !state.is_terminal() {
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "Statement {} still {:?} after {:?}",
                    statement, state, self.timeout
                );
                if self.capabilities.supports(Feature::Cancel) && in_flight.claim_cancel() {
                    self.send_cancel(session.id(), statement).await;
                }
                return Err(Error::ExecutionTimeout(self.timeout));
            }

            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
            info = self
                .transport
                .get_statement(session.id(), statement)
                .await
                .map_err(|e| lost(session, e))?;
            state = advance(state, info.state);
        }
        in_flight.finished();

        Ok(finish(info, state, in_flight.cancel_requested()))
    }

    /// Check on a statement an earlier execution left running. The session
    /// stays unavailable until the server reports it terminal.
    async fn settle(&self, session: &Session) -> Result<(), Error> {
        let Some(statement) = session.abandoned() else {
            return Ok(());
        };
        let info = self
            .transport
            .get_statement(session.id(), statement)
            .await
            .map_err(|e| lost(session, e))?;
        if !info.state.is_terminal() {
            debug!(
                "Statement {} on session {} is still {:?}",
                statement,
                session.id(),
                info.state
            );
            return Err(Error::SessionNotIdle(session.id()));
        }
        session.settled(statement);
        Ok(())
    }

    /// Cancel this executor's statement on `session`, if one is in flight.
    /// Repeated calls and servers without cancel support are no-ops.
    pub async fn cancel(&self, session: &Session) -> Result<(), Error> {
        if !self.capabilities.supports(Feature::Cancel) {
            debug!("Server cannot cancel statements, ignoring cancel request");
            return Ok(());
        }
        match session.request_cancel(self.owner) {
            CancelTarget::Statement(statement) => self.send_cancel(session.id(), statement).await,
            CancelTarget::Pending => debug!("Cancel deferred until submission completes"),
            CancelTarget::Idle | CancelTarget::AlreadySent => {}
        }
        Ok(())
    }

    async fn send_cancel(&self, session: SessionId, statement: StatementId) {
        info!("Cancelling statement {} on session {}", statement, session);
        if let Err(e) = self.transport.cancel_statement(session, statement).await {
            warn!("Cancel request for statement {} failed: {}", statement, e);
        }
    }
}

fn lost(session: &Session, e: livy_client::Error) -> Error {
    if e.is_not_found() {
        session.mark_dead();
        return Error::SessionDead(session.id());
    }
    Error::Transport(e)
}

fn rank(state: StatementState) -> u8 {
    match state {
        StatementState::Waiting | StatementState::Unknown => 0,
        StatementState::Running => 1,
        StatementState::Cancelling => 2,
        StatementState::Available | StatementState::Error | StatementState::Cancelled => 3,
    }
}

/// Next observed state, never moving backwards
pub(crate) fn advance(current: StatementState, next: StatementState) -> StatementState {
    if rank(next) >= rank(current) {
        next
    } else {
        current
    }
}

fn reads_as_cancellation(trace: &str) -> bool {
    CANCELLATION_MESSAGES.iter().any(|m| trace.contains(m))
}

fn finish(info: StatementInfo, state: StatementState, cancel_requested: bool) -> RawOutput {
    let cancelled_state = state == StatementState::Cancelled;
    match info.output {
        Some(output) if output.status == OutputStatus::Ok && !cancelled_state => {
            let mut raw = RawOutput::ok(output.data);
            if cancel_requested {
                debug!("Statement {} finished before the cancel landed", info.id);
                raw.termination = Termination::CancelRace;
            }
            raw
        }
        output => {
            let trace = output
                .as_ref()
                .map(error_trace)
                .filter(|trace| !trace.is_empty());
            let cancelled =
                cancelled_state || trace.as_deref().is_some_and(reads_as_cancellation);
            let termination = if cancelled {
                Termination::Cancelled
            } else if cancel_requested {
                Termination::CancelRace
            } else {
                Termination::Completed
            };
            let trace = trace.unwrap_or_else(|| {
                if cancelled {
                    format!("Statement {} was cancelled", info.id)
                } else {
                    format!("Statement {} failed without output", info.id)
                }
            });
            RawOutput {
                success: false,
                data: Map::new(),
                trace: Some(trace),
                termination,
            }
        }
    }
}

/// Error value followed by the traceback, one frame per line.
pub fn error_trace(output: &StatementOutput) -> String {
    let mut trace = output
        .evalue
        .clone()
        .or_else(|| output.ename.clone())
        .unwrap_or_default();
    for frame in &output.traceback {
        if !trace.is_empty() && !trace.ends_with('\n') {
            trace.push('\n');
        }
        trace.push_str(frame);
    }
    trace.trim_end_matches('\n').to_string()
}
