use livy_client::{Error as ClientError, VersionResponse};
use std::sync::Arc;

use super::fixtures::{FakeLivy, MockTransport};
use crate::version::{CapabilitySet, Feature, LivyVersion, VersionGate};

#[test]
fn test_parse_versions() {
    assert_eq!(
        LivyVersion::parse("0.7.1-incubating"),
        Some(LivyVersion::new(0, 7, 1))
    );
    assert_eq!(
        LivyVersion::parse("0.5.0-SNAPSHOT"),
        Some(LivyVersion::new(0, 5, 0))
    );
    assert_eq!(LivyVersion::parse("0.3"), Some(LivyVersion::new(0, 3, 0)));
    assert_eq!(LivyVersion::parse("unknown"), None);
    assert_eq!(LivyVersion::new(0, 4, 0).to_string(), "0.4.0");
}

#[test]
fn test_feature_thresholds() {
    let v04 = CapabilitySet::of(LivyVersion::new(0, 4, 0));
    assert!(v04.supports(Feature::Cancel));
    assert!(v04.supports(Feature::SparkRProbe));
    assert!(!v04.supports(Feature::SharedSession));
    assert!(!v04.supports(Feature::SqlKind));

    let v05 = CapabilitySet::of(LivyVersion::new(0, 5, 0));
    assert!(v05.supports(Feature::SharedSession));
    assert!(v05.supports(Feature::CodeCompletion));

    let legacy = CapabilitySet::legacy();
    assert!(legacy.is_legacy());
    for feature in [
        Feature::Cancel,
        Feature::SparkRProbe,
        Feature::SharedSession,
        Feature::CodeCompletion,
        Feature::SqlKind,
    ] {
        assert!(!legacy.supports(feature));
    }
}

#[tokio::test]
async fn test_missing_version_endpoint_means_legacy() {
    let fake = Arc::new(FakeLivy::legacy());
    let gate = VersionGate::new(fake.clone());

    let capabilities = gate.resolve().await;
    assert!(capabilities.is_legacy());
    assert!(!capabilities.supports(Feature::Cancel));

    gate.resolve().await;
    assert_eq!(fake.state().version_calls, 1);
}

#[tokio::test]
async fn test_version_is_resolved_once() {
    let mut transport = MockTransport::new();
    transport.expect_version().times(1).returning(|| {
        Ok(VersionResponse {
            version: "0.6.0-incubating".into(),
        })
    });
    let gate = VersionGate::new(Arc::new(transport));

    for _ in 0..3 {
        let capabilities = gate.resolve().await;
        assert_eq!(capabilities.version(), Some(LivyVersion::new(0, 6, 0)));
    }
}

#[tokio::test]
async fn test_discovery_failure_degrades_to_legacy() {
    let mut transport = MockTransport::new();
    transport.expect_version().times(1).returning(|| {
        Err(ClientError::Api {
            status_code: 503,
            message: "unavailable".into(),
        })
    });
    let gate = VersionGate::new(Arc::new(transport));

    assert!(gate.resolve().await.is_legacy());
    assert!(gate.resolve().await.is_legacy());
}

#[tokio::test]
async fn test_unparseable_version_degrades_to_legacy() {
    let fake = Arc::new(FakeLivy::with_version(Some("trunk")));
    let gate = VersionGate::new(fake);
    assert!(gate.resolve().await.is_legacy());
}
