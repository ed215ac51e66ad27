//! Session ownership.
//!
//! A single actor task owns the table of live sessions and their reference
//! counts. Handles talk to it over a channel, so reuse, creation and teardown
//! are serialized without locks. Creation runs in its own task and reports
//! back to the actor, so a slow server never blocks other acquisitions.

use livy_client::{
    CreateSessionRequest, LivyTransport, SessionId, SessionInfo, SessionKind, StatementId,
};
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    error::Error,
    types::ExecutionConfig,
    version::{CapabilitySet, VersionGate},
};

static NEXT_EXCLUSIVE: AtomicU64 = AtomicU64::new(1);

/// Identity under which a session can be reused
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    Shared(String),
    Exclusive(u64),
}

#[derive(Debug, Default)]
struct Slot {
    owner: Option<u64>,
    statement: Option<StatementId>,
    cancel_requested: bool,
    cancel_sent: bool,
    /// Statement that timed out or was dropped while still running remotely
    abandoned: Option<StatementId>,
}

/// What a cancel request found on the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CancelTarget {
    /// Nothing of this owner in flight
    Idle,
    /// Submission still under way, the executor sends the cancel once it has an id
    Pending,
    Statement(StatementId),
    AlreadySent,
}

/// A live remote session
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    kind: SessionKind,
    key: SessionKey,
    slot: Mutex<Slot>,
    dead: AtomicBool,
}

impl Session {
    pub(crate) fn new(id: SessionId, kind: SessionKind, key: SessionKey) -> Self {
        Self {
            id,
            kind,
            key,
            slot: Mutex::new(Slot::default()),
            dead: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }

    pub fn mark_dead(&self) {
        if !self.dead.swap(true, Ordering::SeqCst) {
            warn!("Session {} is dead, the next acquire creates a new one", self.id);
        }
    }

    /// A statement is in flight, or an abandoned one may still be running
    pub fn is_busy(&self) -> bool {
        let slot = self.slot();
        slot.owner.is_some() || slot.abandoned.is_some()
    }

    /// Statement left running by a timed out or dropped execution
    pub(crate) fn abandoned(&self) -> Option<StatementId> {
        self.slot().abandoned
    }

    /// The abandoned statement reached a terminal state.
    pub(crate) fn settled(&self, statement: StatementId) {
        let mut slot = self.slot();
        if slot.abandoned == Some(statement) {
            slot.abandoned = None;
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the session for one statement. Fails fast when another
    /// statement is still in flight.
    pub(crate) fn begin(&self, owner: u64) -> Result<InFlight<'_>, Error> {
        let mut slot = self.slot();
        if slot.owner.is_some() || slot.abandoned.is_some() {
            return Err(Error::SessionNotIdle(self.id));
        }
        *slot = Slot {
            owner: Some(owner),
            ..Slot::default()
        };
        Ok(InFlight {
            session: self,
            finished: false,
        })
    }

    pub(crate) fn request_cancel(&self, owner: u64) -> CancelTarget {
        let mut slot = self.slot();
        if slot.owner != Some(owner) {
            return CancelTarget::Idle;
        }
        if slot.cancel_sent {
            return CancelTarget::AlreadySent;
        }
        slot.cancel_requested = true;
        match slot.statement {
            Some(id) => {
                slot.cancel_sent = true;
                CancelTarget::Statement(id)
            }
            None => CancelTarget::Pending,
        }
    }
}

/// Exclusive claim on a session's statement slot, released on drop.
/// A submitted statement not seen terminal stays recorded as abandoned.
pub(crate) struct InFlight<'a> {
    session: &'a Session,
    finished: bool,
}

impl InFlight<'_> {
    /// Record the submitted statement. Returns true when a cancel arrived
    /// before the id was known and the caller must send it now.
    pub(crate) fn submitted(&self, statement: StatementId) -> bool {
        let mut slot = self.session.slot();
        slot.statement = Some(statement);
        if slot.cancel_requested && !slot.cancel_sent {
            slot.cancel_sent = true;
            return true;
        }
        false
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        self.session.slot().cancel_requested
    }

    /// Take over sending the cancel request. False when it was already sent.
    pub(crate) fn claim_cancel(&self) -> bool {
        let mut slot = self.session.slot();
        slot.cancel_requested = true;
        !std::mem::replace(&mut slot.cancel_sent, true)
    }

    /// The statement was observed in a terminal state.
    pub(crate) fn finished(&mut self) {
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut slot = self.session.slot();
        let abandoned = match slot.statement {
            Some(statement) if !self.finished => {
                debug!(
                    "Statement {} on session {} left running",
                    statement, self.session.id
                );
                Some(statement)
            }
            _ => None,
        };
        *slot = Slot {
            abandoned,
            ..Slot::default()
        };
    }
}

/// Outcome of [`SessionManager::release`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Released {
    StillShared { refs: usize },
    Closed,
    /// The close request failed; the remote session may leak
    CloseFailed(String),
    NotHeld,
}

type Reply = oneshot::Sender<Result<Arc<Session>, Error>>;

enum Command {
    Acquire {
        kind: SessionKind,
        key: SessionKey,
        reply: Reply,
    },
    Release {
        session: Arc<Session>,
        reply: oneshot::Sender<Released>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

enum Entry {
    Creating(Vec<Reply>),
    Live(SessionId),
}

type Created = (SessionKey, Result<Arc<Session>, Error>);

struct Actor {
    transport: Arc<dyn LivyTransport>,
    config: Arc<ExecutionConfig>,
    entries: HashMap<SessionKey, Entry>,
    live: HashMap<SessionId, (Arc<Session>, usize)>,
    created_tx: mpsc::UnboundedSender<Created>,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut created: mpsc::UnboundedReceiver<Created>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Acquire { kind, key, reply }) => self.acquire(kind, key, reply),
                    Some(Command::Release { session, reply }) => self.release(session, reply),
                    Some(Command::Shutdown { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some((key, result)) = created.recv() => self.created(key, result),
            }
        }
        debug!("Session manager stopped");
    }

    fn acquire(&mut self, kind: SessionKind, key: SessionKey, reply: Reply) {
        match self.entries.get_mut(&key) {
            Some(Entry::Creating(waiters)) => {
                waiters.push(reply);
                return;
            }
            Some(Entry::Live(id)) => {
                if let Some((session, refs)) = self.live.get_mut(id) {
                    if !session.is_dead() {
                        *refs += 1;
                        debug!("Reusing session {} ({} holders)", session.id(), refs);
                        let _ = reply.send(Ok(session.clone()));
                        return;
                    }
                }
            }
            None => {}
        }

        self.entries
            .insert(key.clone(), Entry::Creating(vec![reply]));
        let transport = self.transport.clone();
        let config = self.config.clone();
        let created_tx = self.created_tx.clone();
        tokio::spawn(async move {
            let result = create_session(transport.as_ref(), &config, kind, key.clone()).await;
            if let Err(mpsc::error::SendError((_, Ok(session)))) = created_tx.send((key, result)) {
                warn!(
                    "Session {} became ready after the manager stopped, closing it",
                    session.id()
                );
                close(transport.as_ref(), session.id()).await;
            }
        });
    }

    fn created(&mut self, key: SessionKey, result: Result<Arc<Session>, Error>) {
        let waiters = match self.entries.remove(&key) {
            Some(Entry::Creating(waiters)) => waiters,
            Some(entry) => {
                self.entries.insert(key.clone(), entry);
                Vec::new()
            }
            None => Vec::new(),
        };

        match result {
            Ok(session) => {
                let refs = waiters
                    .into_iter()
                    .filter(|waiter| !waiter.is_closed())
                    .map(|waiter| waiter.send(Ok(session.clone())))
                    .filter(Result::is_ok)
                    .count();
                if refs == 0 {
                    debug!("Nobody waits for session {} anymore", session.id());
                    let transport = self.transport.clone();
                    tokio::spawn(async move {
                        close(transport.as_ref(), session.id()).await;
                    });
                    return;
                }
                self.entries.insert(key, Entry::Live(session.id()));
                self.live.insert(session.id(), (session, refs));
            }
            Err(e) => {
                for waiter in waiters {
                    let _ = waiter.send(Err(e.for_waiter()));
                }
            }
        }
    }

    fn release(&mut self, session: Arc<Session>, reply: oneshot::Sender<Released>) {
        let id = session.id();
        let Some((_, refs)) = self.live.get_mut(&id) else {
            let _ = reply.send(Released::NotHeld);
            return;
        };

        *refs -= 1;
        if *refs > 0 {
            let _ = reply.send(Released::StillShared { refs: *refs });
            return;
        }

        self.live.remove(&id);
        if matches!(self.entries.get(session.key()), Some(Entry::Live(live)) if *live == id) {
            self.entries.remove(session.key());
        }
        let transport = self.transport.clone();
        tokio::spawn(async move {
            let released = close(transport.as_ref(), id).await;
            let _ = reply.send(released);
        });
    }

    async fn shutdown(&mut self) {
        for (_, entry) in self.entries.drain() {
            if let Entry::Creating(waiters) = entry {
                for waiter in waiters {
                    let _ = waiter.send(Err(Error::ManagerStopped));
                }
            }
        }
        for (id, _) in self.live.drain() {
            close(self.transport.as_ref(), id).await;
        }
    }
}

async fn close(transport: &dyn LivyTransport, id: SessionId) -> Released {
    match transport.close_session(id).await {
        Ok(()) => {
            info!("Closed session {}", id);
            Released::Closed
        }
        Err(e) if e.is_not_found() => {
            debug!("Session {} was already gone", id);
            Released::Closed
        }
        Err(e) => {
            warn!("Failed to close session {}: {}", id, e);
            Released::CloseFailed(e.to_string())
        }
    }
}

async fn startup_log(transport: &dyn LivyTransport, info: &SessionInfo) -> Vec<String> {
    match transport.session_log(info.id).await {
        Ok(log) if !log.log.is_empty() => log.log,
        Ok(_) => info.log.clone(),
        Err(e) => {
            debug!("Could not fetch log of session {}: {}", info.id, e);
            info.log.clone()
        }
    }
}

async fn create_session(
    transport: &dyn LivyTransport,
    config: &ExecutionConfig,
    kind: SessionKind,
    key: SessionKey,
) -> Result<Arc<Session>, Error> {
    let failed = |e: livy_client::Error| Error::SessionCreateFailed {
        message: e.to_string(),
        log: Vec::new(),
    };

    let request = CreateSessionRequest {
        kind,
        name: Some(
            config
                .session_name
                .clone()
                .unwrap_or_else(|| format!("livy-notebook-{}", Uuid::new_v4())),
        ),
        proxy_user: config.proxy_user.clone(),
        conf: config.spark_conf.clone(),
    };

    let timeout = config.session_create_timeout;
    let started = Instant::now();
    let mut info = transport.create_session(&request).await.map_err(failed)?;
    info!("Created {} session {}, waiting for it to become idle", kind, info.id);

    loop {
        if info.state.is_ready() {
            info!("Session {} is ready", info.id);
            return Ok(Arc::new(Session::new(info.id, kind, key)));
        }

        if info.state.is_terminal() {
            error!("Session {} failed to start: {:?}", info.id, info.state);
            let log = startup_log(transport, &info).await;
            close(transport, info.id).await;
            return Err(Error::SessionCreateFailed {
                message: format!("session {} ended in state {:?}", info.id, info.state),
                log,
            });
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            warn!(
                "Session {} still {:?} after {:?}",
                info.id, info.state, timeout
            );
            close(transport, info.id).await;
            return Err(Error::SessionCreateTimeout(timeout));
        }

        tokio::time::sleep(config.poll_interval.min(timeout - elapsed)).await;
        info = transport.get_session(info.id).await.map_err(failed)?;
    }
}

/// Handle to the session actor
#[derive(Clone)]
pub struct SessionManager {
    commands: mpsc::Sender<Command>,
    transport: Arc<dyn LivyTransport>,
    capabilities: CapabilitySet,
    config: Arc<ExecutionConfig>,
}

impl SessionManager {
    /// Discover the server's capabilities and start the actor.
    pub async fn start(transport: Arc<dyn LivyTransport>, config: ExecutionConfig) -> Self {
        let capabilities = VersionGate::new(transport.clone()).resolve().await;
        Self::with_capabilities(transport, config, capabilities)
    }

    /// Start the actor with known capabilities. Must run inside a Tokio runtime.
    pub fn with_capabilities(
        transport: Arc<dyn LivyTransport>,
        config: ExecutionConfig,
        capabilities: CapabilitySet,
    ) -> Self {
        let config = Arc::new(config);
        let (commands, commands_rx) = mpsc::channel(32);
        let (created_tx, created_rx) = mpsc::unbounded_channel();
        let actor = Actor {
            transport: transport.clone(),
            config: config.clone(),
            entries: HashMap::new(),
            live: HashMap::new(),
            created_tx,
        };
        tokio::spawn(actor.run(commands_rx, created_rx));

        Self {
            commands,
            transport,
            capabilities,
            config,
        }
    }

    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn transport(&self) -> Arc<dyn LivyTransport> {
        self.transport.clone()
    }

    /// Get a ready session. Sessions acquired with the same `shared_key` are
    /// reused until every holder released them; without a key a new session
    /// is always created.
    pub async fn acquire(
        &self,
        kind: SessionKind,
        shared_key: Option<&str>,
    ) -> Result<Arc<Session>, Error> {
        let key = match shared_key {
            Some(key) => SessionKey::Shared(key.to_string()),
            None => SessionKey::Exclusive(NEXT_EXCLUSIVE.fetch_add(1, Ordering::Relaxed)),
        };
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Acquire { kind, key, reply })
            .await
            .map_err(|_| Error::ManagerStopped)?;
        response.await.map_err(|_| Error::ManagerStopped)?
    }

    /// Drop one reference; the last one closes the remote session.
    pub async fn release(&self, session: Arc<Session>) -> Result<Released, Error> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Release { session, reply })
            .await
            .map_err(|_| Error::ManagerStopped)?;
        response.await.map_err(|_| Error::ManagerStopped)
    }

    /// Close every live session and stop the actor.
    pub async fn shutdown(&self) -> Result<(), Error> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Shutdown { reply })
            .await
            .map_err(|_| Error::ManagerStopped)?;
        response.await.map_err(|_| Error::ManagerStopped)
    }
}
