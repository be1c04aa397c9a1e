use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use scout_core::{
    update, Effect, Millis, Msg, SessionId, SessionModel, SessionSettings, SessionState,
    SessionView,
};
use scout_logging::{scout_debug, scout_info};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::duration_ms;
use crate::{ChannelEnvelope, ChannelManager};

/// Wall-clock origin plus monotonic elapsed time, so timestamps look like
/// epoch millis but never jump backwards.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin_ms: Millis,
    started: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            origin_ms: wall_clock_ms(),
            started: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> Millis {
        self.origin_ms
            .saturating_add(duration_ms(self.started.elapsed()))
    }
}

pub(crate) fn wall_clock_ms() -> Millis {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

struct SessionInner {
    id: SessionId,
    model: RwLock<SessionModel>,
    revision: watch::Sender<u64>,
    clock: SessionClock,
    cancel: CancellationToken,
    actor: Mutex<Option<JoinHandle<()>>>,
}

impl SessionInner {
    /// Run one message through `update` under the write lock.
    fn apply(&self, msg: Msg) -> Vec<Effect> {
        let now = self.clock.now_ms();
        let (effects, changed) = {
            let mut guard = self.model.write().unwrap_or_else(PoisonError::into_inner);
            let state = std::mem::take(&mut *guard);
            let (mut state, effects) = update(state, msg, now);
            let changed = state.consume_dirty();
            *guard = state;
            (effects, changed)
        };

        for effect in &effects {
            if let Effect::StatusChanged { from, to } = effect {
                scout_info!(session = self.id; "{} -> {}", from, to);
            }
        }
        if changed {
            self.revision.send_modify(|revision| *revision += 1);
        }
        effects
    }

    fn state(&self) -> SessionState {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state()
    }
}

/// Shared handle to one running session. Cloning is cheap; every clone
/// observes the same session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl SessionHandle {
    /// Create the session model and spawn its actor over `channels` and the
    /// receiving end of their event queue. The actor owns the channels and is
    /// the only writer of the model; events tagged with another session id
    /// are dropped.
    pub fn spawn(
        id: SessionId,
        settings: SessionSettings,
        channels: ChannelManager,
        events: mpsc::UnboundedReceiver<ChannelEnvelope>,
        check_every: Duration,
    ) -> Self {
        let clock = SessionClock::start();
        let model = SessionModel::new(id.clone(), clock.now_ms(), settings);
        let (revision, _) = watch::channel(0);
        let inner = Arc::new(SessionInner {
            id,
            model: RwLock::new(model),
            revision,
            clock,
            cancel: CancellationToken::new(),
            actor: Mutex::new(None),
        });

        let actor = tokio::spawn(run_session(
            Arc::clone(&inner),
            channels,
            events,
            check_every,
        ));
        // Nobody else can hold the lock yet.
        if let Ok(mut slot) = inner.actor.try_lock() {
            *slot = Some(actor);
        }
        Self { inner }
    }

    pub fn id(&self) -> &SessionId {
        &self.inner.id
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// One consistent copy of everything a renderer needs.
    pub fn view(&self) -> SessionView {
        self.inner
            .model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .view()
    }

    /// Revision counter that ticks after every visible change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Resolves with the terminal state once the session has ended.
    pub async fn wait_for_end(&self) -> SessionState {
        let mut revisions = self.subscribe();
        loop {
            let state = self.state();
            if state.is_terminal() {
                return state;
            }
            if revisions.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// Stop the channels, then mark the session Closed. Returns once no
    /// channel task is left; safe to call repeatedly.
    pub async fn close(&self) {
        self.inner.cancel.cancel();
        {
            let mut slot = self.inner.actor.lock().await;
            if let Some(actor) = slot.take() {
                let _ = actor.await;
            }
        }
        self.inner.apply(Msg::CloseRequested);
    }
}

async fn run_session(
    inner: Arc<SessionInner>,
    mut channels: ChannelManager,
    mut events: mpsc::UnboundedReceiver<ChannelEnvelope>,
    check_every: Duration,
) {
    let mut ticker = interval(check_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let effects = tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => break,
            envelope = events.recv() => match envelope {
                Some(envelope) if envelope.session_id == inner.id => inner.apply(envelope.msg),
                Some(envelope) => {
                    scout_debug!(session = inner.id; "dropping event for {}", envelope.session_id);
                    continue;
                }
                None => break,
            },
            _ = ticker.tick() => inner.apply(Msg::Tick),
        };
        if effects
            .iter()
            .any(|effect| matches!(effect, Effect::ReleaseChannels { .. }))
        {
            break;
        }
    }

    channels.stop().await;
    scout_debug!(session = inner.id; "channels released");
}
