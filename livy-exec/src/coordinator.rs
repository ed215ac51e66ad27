use livy_client::{CompletionRequest, ExecuteRequest, SessionKind};
use livy_segment::{Segmenter, SourceBlock, SourceKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{
    error::{Error, ErrorKind},
    output::OutputClassifier,
    session::{Released, Session, SessionManager},
    statement::StatementExecutor,
    types::{
        session_kind_for, statement_kind_for, ResultKind, RunResult, Termination, TypedResult,
    },
    version::Feature,
};

/// How a coordinator's statements reach a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub session_kind: SessionKind,
    /// Coordinators with the same key share one session
    pub shared_key: Option<String>,
    /// Tag every statement with the language's kind
    pub per_statement_kind: bool,
}

impl Binding {
    /// A session of its own
    pub fn exclusive(language: SourceKind) -> Self {
        Self {
            session_kind: session_kind_for(language),
            shared_key: None,
            per_statement_kind: false,
        }
    }

    /// A session shared with other bindings of the same session kind
    pub fn keyed(language: SourceKind, key: impl Into<String>) -> Self {
        Self {
            shared_key: Some(key.into()),
            ..Self::exclusive(language)
        }
    }

    /// One `shared` session serving every language
    pub fn shared(key: impl Into<String>) -> Self {
        Self {
            session_kind: SessionKind::Shared,
            shared_key: Some(key.into()),
            per_statement_kind: true,
        }
    }
}

enum Rendering {
    Plain,
    ShowTable,
}

/// Clears the active session when a run ends, even if its future is dropped
struct ActiveGuard<'a>(&'a Mutex<Option<Arc<Session>>>);

impl<'a> ActiveGuard<'a> {
    fn set(active: &'a Mutex<Option<Arc<Session>>>, session: Arc<Session>) -> Self {
        *active.lock().unwrap_or_else(PoisonError::into_inner) = Some(session);
        Self(active)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Runs source blocks of one language, statement by statement.
pub struct ExecutionCoordinator {
    language: SourceKind,
    binding: Binding,
    manager: SessionManager,
    executor: StatementExecutor,
    classifier: OutputClassifier,
    segmenter: Segmenter,
    session: tokio::sync::Mutex<Option<Arc<Session>>>,
    active: Mutex<Option<Arc<Session>>>,
    cancel_requested: AtomicBool,
    spark2: OnceCell<bool>,
}

impl ExecutionCoordinator {
    pub fn new(language: SourceKind, manager: SessionManager, binding: Binding) -> Self {
        let config = manager.config();
        Self {
            language,
            binding,
            executor: StatementExecutor::for_manager(&manager),
            classifier: OutputClassifier::new(config),
            segmenter: Segmenter::new(config.sql_quote_policy),
            manager,
            session: tokio::sync::Mutex::new(None),
            active: Mutex::new(None),
            cancel_requested: AtomicBool::new(false),
            spark2: OnceCell::new(),
        }
    }

    pub fn standalone(language: SourceKind, manager: SessionManager) -> Self {
        Self::new(language, manager, Binding::exclusive(language))
    }

    pub fn language(&self) -> SourceKind {
        self.language
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Execute `code` one statement at a time and collect a result per
    /// statement. Stops at the first failing statement. There is always at
    /// least one result.
    pub async fn run(&self, code: &str) -> RunResult {
        let span = info_span!("run", language = %self.language);
        self.run_block(code).instrument(span).await
    }

    async fn run_block(&self, code: &str) -> RunResult {
        self.cancel_requested.store(false, Ordering::SeqCst);

        let segmentation = self
            .segmenter
            .split(&SourceBlock::new(self.language, code));
        if segmentation.is_empty() {
            return RunResult {
                results: vec![TypedResult::text("")],
                failure: None,
            };
        }

        let session = match self.session().await {
            Ok(session) => session,
            Err(e) => return failed(Vec::new(), e),
        };
        let _active = ActiveGuard::set(&self.active, session.clone());

        let mut results = Vec::with_capacity(segmentation.len());
        for unit in segmentation.units() {
            if self.cancel_requested.load(Ordering::SeqCst) {
                return failed(results, Error::ExecutionCancelled);
            }
            if let Some(reason) = unit.incomplete {
                debug!("Statement at line {} may be incomplete: {:?}", unit.line, reason);
            }

            let (request, rendering) = self.request_for(&unit.text);
            let raw = match self.executor.execute(&session, &request).await {
                Ok(raw) => raw,
                Err(e) => {
                    error!("Statement at line {} failed: {}", unit.line, e);
                    return failed(results, e);
                }
            };

            let result = match rendering {
                Rendering::Plain => self.classifier.classify(&raw),
                Rendering::ShowTable => self.classifier.classify_show_output(&raw),
            };
            let failure = (result.kind == ResultKind::Error).then(|| match raw.termination {
                Termination::Cancelled => ErrorKind::ExecutionCancelled,
                _ => ErrorKind::ExecutionError,
            });
            results.push(result);
            if let Some(kind) = failure {
                info!("Statement at line {} failed, skipping the rest", unit.line);
                return RunResult {
                    results,
                    failure: Some(kind),
                };
            }
        }

        if self.manager.config().display_app_info {
            if let Some(app_info) = self.app_info(&session).await {
                results.push(app_info);
            }
        }
        RunResult {
            results,
            failure: None,
        }
    }

    /// Spark application id and UI link of `session` as an HTML result
    async fn app_info(&self, session: &Session) -> Option<TypedResult> {
        let info = match self.manager.transport().get_session(session.id()).await {
            Ok(info) => info,
            Err(e) => {
                debug!("No application info for session {}: {}", session.id(), e);
                return None;
            }
        };
        let app_id = info.app_id.as_deref()?;
        let html = match info.spark_ui_url() {
            Some(url) => format!(
                "<hr/>Spark Application Id: {}<br/>Spark WebUI: <a href=\"{}\">{}</a>",
                app_id, url, url
            ),
            None => format!("<hr/>Spark Application Id: {}", app_id),
        };
        Some(TypedResult::new(ResultKind::Html, html))
    }

    /// Cancel whatever statement of this coordinator is in flight. Also stops
    /// the current run before its next statement.
    pub async fn cancel_current(&self) -> Result<(), Error> {
        self.cancel_requested.store(true, Ordering::SeqCst);
        let active = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match active {
            Some(session) => self.executor.cancel(&session).await,
            None => {
                debug!("Nothing in flight to cancel");
                Ok(())
            }
        }
    }

    /// Completion candidates at `cursor`, empty when the server cannot complete.
    pub async fn complete(&self, buffer: &str, cursor: usize) -> Result<Vec<String>, Error> {
        if !self.manager.capabilities().supports(Feature::CodeCompletion) {
            return Ok(Vec::new());
        }
        let session = self.session().await?;
        let request = CompletionRequest {
            code: buffer.to_string(),
            kind: statement_kind_for(self.language),
            cursor,
        };
        let response = self
            .manager
            .transport()
            .completion(session.id(), &request)
            .await?;
        Ok(response.candidates)
    }

    /// Whether the session runs Spark 2 or later. Probed once.
    pub async fn probe_spark2(&self) -> Result<bool, Error> {
        self.spark2
            .get_or_try_init(|| self.detect_spark2())
            .await
            .copied()
    }

    async fn detect_spark2(&self) -> Result<bool, Error> {
        let code = match self.language {
            SourceKind::R if !self.manager.capabilities().supports(Feature::SparkRProbe) => {
                return Ok(false);
            }
            SourceKind::R => "sparkR.session()",
            _ => "spark",
        };
        let kind = self.binding.per_statement_kind.then(|| match self.language {
            SourceKind::Sql => SessionKind::Spark,
            language => statement_kind_for(language),
        });

        let session = self.session().await?;
        let request = ExecuteRequest {
            code: code.to_string(),
            kind,
        };
        let raw = self.executor.execute(&session, &request).await?;
        let spark2 = match self.language {
            SourceKind::R => raw.success && !raw.text().unwrap_or_default().contains("Error"),
            _ => raw.success,
        };
        debug!("Spark 2 probe for {}: {}", self.language, spark2);
        Ok(spark2)
    }

    /// Give the session back to the manager.
    pub async fn close(&self) -> Result<Released, Error> {
        match self.session.lock().await.take() {
            Some(session) => self.manager.release(session).await,
            None => Ok(Released::NotHeld),
        }
    }

    async fn session(&self) -> Result<Arc<Session>, Error> {
        let mut current = self.session.lock().await;
        if let Some(session) = current.as_ref() {
            if !session.is_dead() {
                return Ok(session.clone());
            }
        }
        if let Some(dead) = current.take() {
            info!("Replacing dead session {}", dead.id());
            self.manager.release(dead).await?;
        }

        let session = self
            .manager
            .acquire(self.binding.session_kind, self.binding.shared_key.as_deref())
            .await?;
        *current = Some(session.clone());
        Ok(session)
    }

    fn request_for(&self, code: &str) -> (ExecuteRequest, Rendering) {
        let per_statement = self.binding.per_statement_kind;
        match self.language {
            SourceKind::Sql if self.manager.capabilities().supports(Feature::SqlKind) => (
                ExecuteRequest {
                    code: code.to_string(),
                    kind: Some(SessionKind::Sql),
                },
                Rendering::Plain,
            ),
            SourceKind::Sql => (
                ExecuteRequest {
                    code: self.show_sql(code),
                    kind: per_statement.then_some(SessionKind::Spark),
                },
                Rendering::ShowTable,
            ),
            language => (
                ExecuteRequest {
                    code: code.to_string(),
                    kind: per_statement.then(|| statement_kind_for(language)),
                },
                Rendering::Plain,
            ),
        }
    }

    /// Scala snippet printing the query result as an ASCII table. Cells are
    /// never truncated by Spark; the classifier applies the field limit.
    fn show_sql(&self, query: &str) -> String {
        let query = query.replace(r#"""""#, r#"""" + "\"\"\"" + """"#);
        format!(
            r#"sqlContext.sql("""{}""").show({}, false)"#,
            query,
            self.manager.config().max_result_rows
        )
    }
}

fn failed(mut results: Vec<TypedResult>, e: Error) -> RunResult {
    results.push(TypedResult::error(e.to_string()));
    RunResult {
        results,
        failure: Some(e.kind()),
    }
}
