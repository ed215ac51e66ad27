//! Livy server version discovery and the feature set it unlocks.

use livy_client::LivyTransport;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LivyVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl LivyVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse strings such as `0.7.1-incubating` or `0.5.0-SNAPSHOT`.
    pub fn parse(version: &str) -> Option<Self> {
        let core = version
            .trim()
            .split(|c: char| c == '-' || c == '+')
            .next()?;
        let mut parts = core.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map_or(Some(0), |p| p.parse().ok())?;
        let patch = parts.next().map_or(Some(0), |p| p.parse().ok())?;
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for LivyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Server features gated on version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// `POST /sessions/{id}/statements/{sid}/cancel`
    Cancel,
    /// Probing for Spark 2 through `sparkR.session()`
    SparkRProbe,
    /// Sessions of kind `shared` with a kind per statement
    SharedSession,
    /// `POST /sessions/{id}/completion`
    CodeCompletion,
    /// Statements of kind `sql` returning structured rows
    SqlKind,
}

impl Feature {
    pub fn since(&self) -> LivyVersion {
        match self {
            Feature::Cancel | Feature::SparkRProbe => LivyVersion::new(0, 3, 0),
            Feature::SharedSession | Feature::CodeCompletion | Feature::SqlKind => {
                LivyVersion::new(0, 5, 0)
            }
        }
    }
}

/// Features of one server, fixed once discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    version: Option<LivyVersion>,
}

impl CapabilitySet {
    /// Server without a version endpoint
    pub const fn legacy() -> Self {
        Self { version: None }
    }

    pub const fn of(version: LivyVersion) -> Self {
        Self {
            version: Some(version),
        }
    }

    pub fn version(&self) -> Option<LivyVersion> {
        self.version
    }

    pub fn is_legacy(&self) -> bool {
        self.version.is_none()
    }

    pub fn supports(&self, feature: Feature) -> bool {
        self.version.is_some_and(|v| v >= feature.since())
    }
}

/// Resolves the server's capabilities with a single request and caches them
pub struct VersionGate {
    transport: Arc<dyn LivyTransport>,
    resolved: OnceCell<CapabilitySet>,
}

impl VersionGate {
    pub fn new(transport: Arc<dyn LivyTransport>) -> Self {
        Self {
            transport,
            resolved: OnceCell::new(),
        }
    }

    pub async fn resolve(&self) -> CapabilitySet {
        *self.resolved.get_or_init(|| self.discover()).await
    }

    async fn discover(&self) -> CapabilitySet {
        match self.transport.version().await {
            Ok(response) => match LivyVersion::parse(&response.version) {
                Some(version) => {
                    info!("Livy server version {}", version);
                    CapabilitySet::of(version)
                }
                None => {
                    warn!(
                        "{}",
                        Error::VersionDiscoveryUnavailable(format!(
                            "unparseable version {:?}",
                            response.version
                        ))
                    );
                    CapabilitySet::legacy()
                }
            },
            Err(e) if e.is_not_found() => {
                debug!("No version endpoint, assuming a legacy Livy server");
                CapabilitySet::legacy()
            }
            Err(e) => {
                warn!("{}", Error::VersionDiscoveryUnavailable(e.to_string()));
                CapabilitySet::legacy()
            }
        }
    }
}
