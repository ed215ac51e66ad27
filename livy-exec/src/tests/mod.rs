mod version;

use std::sync::Arc;
use std::time::Duration;

use crate::{ExecutionConfig, SessionManager};
use fixtures::FakeLivy;

pub(crate) fn test_config() -> ExecutionConfig {
    ExecutionConfig {
        session_create_timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(5),
        statement_timeout: Duration::from_secs(5),
        ..ExecutionConfig::default()
    }
}

pub(crate) async fn start(fake: &Arc<FakeLivy>) -> SessionManager {
    SessionManager::start(fake.clone(), test_config()).await
}

pub(crate) async fn start_with(fake: &Arc<FakeLivy>, config: ExecutionConfig) -> SessionManager {
    SessionManager::start(fake.clone(), config).await
}

pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
