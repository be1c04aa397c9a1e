use std::sync::{Arc, PoisonError};

use scout_core::{Entity, KeywordPredicate, Millis, ResultSet, SessionId, StreamingPredicate};
use scout_logging::{scout_info, scout_warn};
use tokio::sync::{mpsc, Mutex};

use crate::session::wall_clock_ms;
use crate::{
    ChannelManager, EngineConfig, PullError, PushTransport, ReqwestSnapshotFetcher, ScoutError,
    SessionHandle, SnapshotFetcher, WsPushTransport,
};

/// What `start` produced for a query.
pub enum StartOutcome {
    /// A live session; observe it through the handle.
    Streaming(SessionHandle),
    /// The query is not a streaming one: a single deduplicated pull result.
    OneShot(Vec<Entity>),
}

/// Owns the live session and decides how each query is served.
///
/// At most one session is live per controller: starting a new one closes
/// the previous one first.
pub struct SessionController {
    config: EngineConfig,
    push: Arc<dyn PushTransport>,
    fetcher: Arc<dyn SnapshotFetcher>,
    predicate: Box<dyn StreamingPredicate>,
    current: Mutex<Option<SessionHandle>>,
    last_generated_ms: std::sync::Mutex<Millis>,
}

impl SessionController {
    pub fn new(
        config: EngineConfig,
        push: Arc<dyn PushTransport>,
        fetcher: Arc<dyn SnapshotFetcher>,
        predicate: Box<dyn StreamingPredicate>,
    ) -> Self {
        Self {
            config,
            push,
            fetcher,
            predicate,
            current: Mutex::new(None),
            last_generated_ms: std::sync::Mutex::new(0),
        }
    }

    /// Controller wired to the WebSocket and HTTP endpoints in `config`,
    /// with the default keyword predicate.
    pub fn connect(config: EngineConfig) -> Result<Self, PullError> {
        let push = Arc::new(WsPushTransport::new(config.ws_base_url.clone()));
        let fetcher = Arc::new(ReqwestSnapshotFetcher::new(
            config.search_url(),
            config.pull.clone(),
        )?);
        Ok(Self::new(
            config,
            push,
            fetcher,
            Box::new(KeywordPredicate::default()),
        ))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Serve `query`, either as a live session or as a single pull.
    ///
    /// Passing the id of the current session returns its handle without
    /// opening anything new.
    pub async fn start(
        &self,
        query: &str,
        session_id_hint: Option<SessionId>,
    ) -> Result<StartOutcome, ScoutError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScoutError::EmptyQuery);
        }

        if !self.predicate.is_streaming(query) {
            scout_info!("one-shot search for {:?}", query);
            let entities = self.fetcher.fetch(query, None).await?;
            let mut results = ResultSet::new();
            let report = results.merge_snapshot(entities);
            if report.missing_key > 0 {
                scout_warn!("dropped {} results without a domain", report.missing_key);
            }
            return Ok(StartOutcome::OneShot(results.into_entries()));
        }

        let mut current = self.current.lock().await;
        if let (Some(hint), Some(existing)) = (&session_id_hint, current.as_ref()) {
            if existing.id() == hint {
                return Ok(StartOutcome::Streaming(existing.clone()));
            }
        }
        if let Some(previous) = current.take() {
            scout_info!(session = previous.id(); "superseded by a new session");
            previous.close().await;
        }

        let id = session_id_hint.unwrap_or_else(|| self.next_session_id());
        scout_info!(session = id; "starting live session for {:?}", query);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut channels =
            ChannelManager::new(Arc::clone(&self.push), Arc::clone(&self.fetcher), events_tx);
        channels.open_push(id.clone());
        channels.start_pull(query.to_string(), id.clone(), self.config.poll_interval);

        let handle = SessionHandle::spawn(
            id,
            self.config.session_settings(),
            channels,
            events_rx,
            self.config.silence_check_interval,
        );
        *current = Some(handle.clone());
        Ok(StartOutcome::Streaming(handle))
    }

    pub async fn current(&self) -> Option<SessionHandle> {
        self.current.lock().await.clone()
    }

    /// Close the live session, if any.
    pub async fn close(&self) {
        let current = self.current.lock().await.take();
        if let Some(session) = current {
            session.close().await;
        }
    }

    /// `scrape-<millis>`, strictly increasing even within one millisecond.
    fn next_session_id(&self) -> SessionId {
        let mut last = self
            .last_generated_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let ms = wall_clock_ms().max(last.saturating_add(1));
        *last = ms;
        SessionId::generated(ms)
    }
}
