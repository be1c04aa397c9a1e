#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use futures_util::{stream, StreamExt};
use scout_core::{Entity, KeywordPredicate, SessionId};
use scout_engine::{
    EngineConfig, FailureKind, FrameStream, PullError, PushTransport, SessionController,
    SessionHandle, SnapshotFetcher, StartOutcome, TransportError,
};
use tokio::sync::mpsc;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scout_logging::initialize_for_tests);
}

pub fn companies(domains: &[&str]) -> Vec<Entity> {
    domains.iter().map(|d| Entity::with_domain(*d)).collect()
}

pub fn numbered(count: usize) -> Vec<Entity> {
    (0..count)
        .map(|i| Entity::with_domain(format!("c{i}.com")))
        .collect()
}

pub fn domains(entities: &[Entity]) -> Vec<String> {
    entities
        .iter()
        .filter_map(Entity::domain)
        .map(str::to_owned)
        .collect()
}

pub fn bad_gateway() -> PullError {
    PullError {
        kind: FailureKind::HttpStatus(502),
        message: "502 Bad Gateway".to_string(),
    }
}

/// Push transport that hands out pre-scripted streams, one per subscribe.
#[derive(Default)]
pub struct ScriptedPush {
    streams: Mutex<VecDeque<Result<FrameStream, TransportError>>>,
    subscriptions: AtomicUsize,
}

impl ScriptedPush {
    /// Every subscription fails to connect.
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// One subscription fed by the returned sender. Dropping the sender ends
    /// the stream as if the server closed it.
    pub fn with_feed() -> (Arc<Self>, mpsc::UnboundedSender<String>) {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let frames = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|text| (Ok::<_, TransportError>(text), rx))
        })
        .boxed();
        let push = Self::default();
        push.streams.lock().unwrap().push_back(Ok(frames));
        (Arc::new(push), tx)
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PushTransport for ScriptedPush {
    async fn subscribe(&self, session_id: &SessionId) -> Result<FrameStream, TransportError> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        self.streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Connect {
                    url: format!("fake://{session_id}"),
                    reason: "connection refused".to_string(),
                })
            })
    }
}

type Responder = Box<dyn Fn(usize) -> Result<Vec<Entity>, PullError> + Send + Sync>;
type Latency = Box<dyn Fn(usize) -> Duration + Send + Sync>;

/// Snapshot fetcher answering from a closure of the call number.
pub struct ScriptedFetcher {
    respond: Responder,
    latency: Latency,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, Option<SessionId>)>>,
}

impl ScriptedFetcher {
    pub fn new(
        respond: impl Fn(usize) -> Result<Vec<Entity>, PullError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            latency: Box::new(|_| Duration::ZERO),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.with_latency(move |_| delay)
    }

    /// Response latency chosen per call number.
    pub fn with_latency(
        mut self,
        latency: impl Fn(usize) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.latency = Box::new(latency);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, Option<SessionId>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SnapshotFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        query: &str,
        session_id: Option<&SessionId>,
    ) -> Result<Vec<Entity>, PullError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((query.to_string(), session_id.cloned()));
        let delay = (self.latency)(call);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(call)
    }
}

pub fn controller(push: Arc<ScriptedPush>, fetcher: Arc<ScriptedFetcher>) -> SessionController {
    init_logging();
    SessionController::new(
        EngineConfig::default(),
        push,
        fetcher,
        Box::new(KeywordPredicate::default()),
    )
}

pub fn streaming(outcome: StartOutcome) -> SessionHandle {
    match outcome {
        StartOutcome::Streaming(handle) => handle,
        StartOutcome::OneShot(_) => panic!("expected a live session"),
    }
}

pub const PORTFOLIO_QUERY: &str = "Retrieve the YC and Antler portfolios";

pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
