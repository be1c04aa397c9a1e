use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use scout_core::{Channel, Entity, Msg, SessionId};
use scout_logging::{scout_debug, scout_info, scout_warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::wire::decode_push;
use crate::{PullError, PushTransport, SnapshotFetcher};

/// One channel event tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEnvelope {
    pub session_id: SessionId,
    pub msg: Msg,
}

/// Runs the push subscription and the poll loop of one session and funnels
/// both into a single queue.
pub struct ChannelManager {
    push: Arc<dyn PushTransport>,
    fetcher: Arc<dyn SnapshotFetcher>,
    events: mpsc::UnboundedSender<ChannelEnvelope>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ChannelManager {
    pub fn new(
        push: Arc<dyn PushTransport>,
        fetcher: Arc<dyn SnapshotFetcher>,
        events: mpsc::UnboundedSender<ChannelEnvelope>,
    ) -> Self {
        Self {
            push,
            fetcher,
            events,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    pub fn open_push(&mut self, session_id: SessionId) {
        let outbox = Outbox::new(session_id, self.events.clone());
        let task = run_push(Arc::clone(&self.push), outbox, self.cancel.child_token());
        self.tasks.push(tokio::spawn(task));
    }

    /// Pull immediately, then every `interval`. A tick that finds the previous
    /// request still unresolved is skipped.
    pub fn start_pull(&mut self, query: String, session_id: SessionId, interval: Duration) {
        let outbox = Outbox::new(session_id, self.events.clone());
        let task = run_pull(
            Arc::clone(&self.fetcher),
            query,
            outbox,
            interval,
            self.cancel.child_token(),
        );
        self.tasks.push(tokio::spawn(task));
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Stop both channels and wait until their tasks are gone. Nothing is
    /// sent on the event queue after this returns.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in &self.tasks {
            task.abort();
        }
    }
}

struct Outbox {
    session_id: SessionId,
    tx: mpsc::UnboundedSender<ChannelEnvelope>,
}

impl Outbox {
    fn new(session_id: SessionId, tx: mpsc::UnboundedSender<ChannelEnvelope>) -> Self {
        Self { session_id, tx }
    }

    /// False once the session stopped listening.
    fn send(&self, msg: Msg) -> bool {
        self.tx
            .send(ChannelEnvelope {
                session_id: self.session_id.clone(),
                msg,
            })
            .is_ok()
    }
}

async fn run_push(transport: Arc<dyn PushTransport>, outbox: Outbox, cancel: CancellationToken) {
    let id = &outbox.session_id;
    let subscribed = tokio::select! {
        _ = cancel.cancelled() => return,
        result = transport.subscribe(id) => result,
    };
    let mut frames = match subscribed {
        Ok(frames) => frames,
        Err(err) => {
            scout_warn!(session = id; "push subscription failed: {}", err);
            outbox.send(Msg::ChannelFailed {
                channel: Channel::Push,
                error: err.to_string(),
            });
            return;
        }
    };
    scout_info!(session = id; "push channel open");
    if !outbox.send(Msg::ChannelOpened(Channel::Push)) {
        return;
    }

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = frames.next() => next,
        };
        let msg = match next {
            Some(Ok(text)) => decode_push(&text).unwrap_or_else(|err| {
                scout_warn!(session = id; "dropping push frame: {}", err);
                Msg::MalformedPayload {
                    channel: Channel::Push,
                    error: err.to_string(),
                }
            }),
            Some(Err(err)) => {
                scout_warn!(session = id; "push channel failed: {}", err);
                outbox.send(Msg::ChannelFailed {
                    channel: Channel::Push,
                    error: err.to_string(),
                });
                return;
            }
            None => {
                scout_info!(session = id; "push channel closed by server");
                outbox.send(Msg::ChannelClosed(Channel::Push));
                return;
            }
        };
        if !outbox.send(msg) {
            return;
        }
    }
}

type PullFuture = BoxFuture<'static, Result<Vec<Entity>, PullError>>;

async fn run_pull(
    fetcher: Arc<dyn SnapshotFetcher>,
    query: String,
    outbox: Outbox,
    period: Duration,
    cancel: CancellationToken,
) {
    let id = &outbox.session_id;
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Option<PullFuture> = None;
    let mut healthy = false;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = settle(&mut in_flight), if in_flight.is_some() => {
                in_flight = None;
                let delivered = match result {
                    Ok(entities) => {
                        scout_debug!(session = id; "pull returned {} companies", entities.len());
                        let opened = healthy || outbox.send(Msg::ChannelOpened(Channel::Pull));
                        healthy = true;
                        opened && outbox.send(Msg::SnapshotReceived(entities))
                    }
                    Err(err) => {
                        scout_warn!(session = id; "pull failed: {}", err);
                        healthy = false;
                        outbox.send(Msg::ChannelFailed {
                            channel: Channel::Pull,
                            error: err.to_string(),
                        })
                    }
                };
                if !delivered {
                    return;
                }
            }
            _ = ticker.tick() => {
                if in_flight.is_some() {
                    scout_debug!(session = id; "previous pull still in flight; skipping tick");
                    continue;
                }
                if !outbox.send(Msg::PullIssued) {
                    return;
                }
                let fetcher = Arc::clone(&fetcher);
                let query = query.clone();
                let session_id = id.clone();
                in_flight = Some(
                    async move { fetcher.fetch(&query, Some(&session_id)).await }.boxed(),
                );
            }
        }
    }
}

async fn settle(in_flight: &mut Option<PullFuture>) -> Result<Vec<Entity>, PullError> {
    match in_flight {
        Some(request) => request.await,
        None => std::future::pending().await,
    }
}
