use crate::{config::NotebookConfig, error::Error};
use livy_client::{LivyClient, LivyTransport};
use livy_exec::{
    Binding, CapabilitySet, ExecutionConfig, ExecutionCoordinator, Feature, Released, RunResult,
    SessionManager,
};
use livy_segment::SourceKind;
use std::sync::Arc;
use tracing::{info, warn};

/// Key under which Scala and SQL share their spark session
const SPARK_GROUP_KEY: &str = "spark";

/// One coordinator per language, all backed by the same session manager.
///
/// With a shared session key on a server that supports it every language
/// runs on a single `shared` session. Otherwise Scala and SQL share a spark
/// session and Python and R get one each.
pub struct Notebook {
    manager: SessionManager,
    shared: bool,
    scala: ExecutionCoordinator,
    python: ExecutionCoordinator,
    r: ExecutionCoordinator,
    sql: ExecutionCoordinator,
}

impl Notebook {
    pub async fn connect(config: NotebookConfig) -> Result<Self, Error> {
        let client = LivyClient::new(config.livy)?;
        info!("Connecting to Livy at {}", client.config().url);
        Ok(Self::with_transport(Arc::new(client), config.execution).await)
    }

    pub async fn with_transport(transport: Arc<dyn LivyTransport>, config: ExecutionConfig) -> Self {
        let manager = SessionManager::start(transport, config).await;
        Self::with_manager(manager)
    }

    pub fn with_manager(manager: SessionManager) -> Self {
        let capabilities = manager.capabilities();
        let shared_key = match manager.config().shared_session_key.clone() {
            Some(key) if capabilities.supports(Feature::SharedSession) => Some(key),
            Some(key) => {
                warn!(
                    "Shared session {:?} requested but Livy {} cannot share sessions across languages",
                    key,
                    describe(capabilities)
                );
                None
            }
            None => None,
        };

        let coordinator = |language| {
            let binding = match (&shared_key, language) {
                (Some(key), _) => Binding::shared(key.clone()),
                (None, SourceKind::Scala | SourceKind::Sql) => {
                    Binding::keyed(language, SPARK_GROUP_KEY)
                }
                (None, _) => Binding::exclusive(language),
            };
            ExecutionCoordinator::new(language, manager.clone(), binding)
        };

        Self {
            shared: shared_key.is_some(),
            scala: coordinator(SourceKind::Scala),
            python: coordinator(SourceKind::Python),
            r: coordinator(SourceKind::R),
            sql: coordinator(SourceKind::Sql),
            manager,
        }
    }

    pub fn coordinator(&self, language: SourceKind) -> &ExecutionCoordinator {
        match language {
            SourceKind::Scala => &self.scala,
            SourceKind::Python => &self.python,
            SourceKind::R => &self.r,
            SourceKind::Sql => &self.sql,
        }
    }

    pub fn capabilities(&self) -> CapabilitySet {
        self.manager.capabilities()
    }

    /// Whether every language runs on one shared session
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub async fn run(&self, language: SourceKind, code: &str) -> RunResult {
        self.coordinator(language).run(code).await
    }

    pub async fn cancel(&self, language: SourceKind) -> Result<(), Error> {
        Ok(self.coordinator(language).cancel_current().await?)
    }

    pub async fn complete(
        &self,
        language: SourceKind,
        buffer: &str,
        cursor: usize,
    ) -> Result<Vec<String>, Error> {
        Ok(self.coordinator(language).complete(buffer, cursor).await?)
    }

    /// Release every language's session and stop the manager.
    pub async fn close(&self) -> Result<(), Error> {
        for coordinator in [&self.scala, &self.python, &self.r, &self.sql] {
            if let Released::CloseFailed(message) = coordinator.close().await? {
                warn!(
                    "Could not close the {} session: {}",
                    coordinator.language(),
                    message
                );
            }
        }
        self.manager.shutdown().await?;
        Ok(())
    }
}

fn describe(capabilities: CapabilitySet) -> String {
    capabilities
        .version()
        .map_or_else(|| "(legacy)".to_string(), |version| version.to_string())
}
