use std::fmt;

use crate::view_model::UNKNOWN_SOURCE;
use crate::{
    Effect, Entity, EventLog, LifecycleSignal, LogLevel, ProgressReport, ProgressTracker,
    ReleaseReason, ResultSet, SessionStats, SessionView, SnapshotSummary,
};

/// Milliseconds on the session clock.
pub type Millis = u64;

pub const DEFAULT_SILENCE_GRACE_MS: Millis = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `scrape-<millis>` identifier used when the caller supplies none.
    pub fn generated(at_ms: Millis) -> Self {
        Self(format!("scrape-{at_ms}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Starting,
    Running,
    Completed,
    Error,
    Closed,
}

impl SessionState {
    /// Starting or Running: channels are (or may become) active.
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Running)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_live()
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Starting => "Starting",
            SessionState::Running => "Running",
            SessionState::Completed => "Completed",
            SessionState::Error => "Error",
            SessionState::Closed => "Closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub id: SessionId,
    pub state: SessionState,
    pub created_at_ms: Millis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Push,
    Pull,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Push => f.write_str("push"),
            Channel::Pull => f.write_str("pull"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelStatus {
    #[default]
    Connecting,
    Open,
    Closed,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelState {
    pub status: ChannelStatus,
    pub last_activity_ms: Option<Millis>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Quiet period tolerated after the push channel ends before the session
    /// is declared failed.
    pub silence_grace_ms: Millis,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            silence_grace_ms: DEFAULT_SILENCE_GRACE_MS,
        }
    }
}

/// The single-writer state of one session: result set, throughput, event
/// log and lifecycle. Mutated only through [`crate::update`].
#[derive(Debug, Clone, Default)]
pub struct SessionModel {
    session: Session,
    settings: SessionSettings,
    results: ResultSet,
    progress: ProgressTracker,
    log: EventLog,
    push: ChannelState,
    pull: ChannelState,
    push_ended_at_ms: Option<Millis>,
    pull_in_flight: bool,
    last_delivery_ms: Option<Millis>,
    multi_portfolio: bool,
    stats: SessionStats,
    screenshot: Option<String>,
    dirty: bool,
}

impl SessionModel {
    pub fn new(id: SessionId, created_at_ms: Millis, settings: SessionSettings) -> Self {
        let mut model = Self {
            session: Session {
                id,
                state: SessionState::Starting,
                created_at_ms,
            },
            settings,
            ..Self::default()
        };
        model.log.record(
            created_at_ms,
            LogLevel::Info,
            format!("Session {} starting", model.session.id),
        );
        model.dirty = true;
        model
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn id(&self) -> &SessionId {
        &self.session.id
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn channel(&self, channel: Channel) -> ChannelState {
        match channel {
            Channel::Push => self.push,
            Channel::Pull => self.pull,
        }
    }

    pub fn screenshot(&self) -> Option<&str> {
        self.screenshot.as_deref()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session: self.session.clone(),
            entities: self.results.entries().to_vec(),
            stats: self.stats.clone(),
            progress: self.progress.progress(),
            log: self.log.entries().cloned().collect(),
            log_appended: self.log.appended(),
            push: self.push,
            pull: self.pull,
            screenshot: self.screenshot.clone(),
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn channel_opened(&mut self, channel: Channel, now: Millis) -> Vec<Effect> {
        let state = self.channel_mut(channel);
        let was_open = state.status == ChannelStatus::Open;
        state.status = ChannelStatus::Open;
        state.last_activity_ms = Some(now);
        if channel == Channel::Push {
            self.push_ended_at_ms = None;
        }
        if !was_open {
            let message = match channel {
                Channel::Push => "Live updates connected",
                Channel::Pull => "Polling for results",
            };
            self.log.record(now, LogLevel::Info, message);
        }
        self.mark_dirty();
        self.start_running()
    }

    pub(crate) fn channel_ended(
        &mut self,
        channel: Channel,
        error: Option<&str>,
        now: Millis,
    ) -> Vec<Effect> {
        let status = if error.is_some() {
            ChannelStatus::Errored
        } else {
            ChannelStatus::Closed
        };
        self.channel_mut(channel).status = status;
        if channel == Channel::Pull {
            self.pull_in_flight = false;
        }
        if channel == Channel::Push && self.push_ended_at_ms.is_none() {
            self.push_ended_at_ms = Some(now);
        }

        let (level, message) = match (channel, error) {
            (Channel::Push, Some(err)) => (
                LogLevel::Warn,
                format!("Live updates unavailable ({err}); relying on polling"),
            ),
            (Channel::Push, None) => (LogLevel::Info, "Live update channel closed".to_string()),
            (Channel::Pull, Some(err)) => (
                LogLevel::Warn,
                format!("Poll failed ({err}); retrying on next tick"),
            ),
            (Channel::Pull, None) => (LogLevel::Info, "Polling stopped".to_string()),
        };
        self.log.record(now, level, message);
        self.mark_dirty();
        Vec::new()
    }

    /// A request from a polling channel that has been answering counts as
    /// activity for as long as it is outstanding.
    pub(crate) fn on_pull_issued(&mut self, now: Millis) -> Vec<Effect> {
        self.pull_in_flight = true;
        if self.pull.status == ChannelStatus::Open {
            self.touch(Channel::Pull, now);
        }
        Vec::new()
    }

    pub(crate) fn on_malformed(&mut self, channel: Channel, error: &str, now: Millis) -> Vec<Effect> {
        self.touch(channel, now);
        self.log.record(
            now,
            LogLevel::Warn,
            format!("Dropped malformed {channel} message: {error}"),
        );
        self.mark_dirty();
        Vec::new()
    }

    pub(crate) fn on_batch(&mut self, batch: Vec<Entity>, now: Millis) -> Vec<Effect> {
        self.touch(Channel::Push, now);
        let report = self.results.merge_incremental(batch);
        let (added, missing_key) = (report.added.len(), report.missing_key);
        count_sources(&mut self.stats, report.added);
        self.after_merge(Channel::Push, added, missing_key, now);
        Vec::new()
    }

    pub(crate) fn on_snapshot(&mut self, full_list: Vec<Entity>, now: Millis) -> Vec<Effect> {
        self.touch(Channel::Pull, now);
        self.pull_in_flight = false;
        let listed = full_list.len();
        let report = self.results.merge_snapshot(full_list);
        let (added, missing_key, stale) = (report.added.len(), report.missing_key, report.stale);
        count_sources(&mut self.stats, report.added);
        self.stats.last_snapshot = Some(SnapshotSummary {
            at_ms: now,
            listed,
            added,
            stale,
        });
        self.after_merge(Channel::Pull, added, missing_key, now);
        Vec::new()
    }

    pub(crate) fn on_lifecycle(&mut self, signal: LifecycleSignal, now: Millis) -> Vec<Effect> {
        self.touch(Channel::Push, now);
        self.mark_dirty();
        match signal {
            LifecycleSignal::Started {
                message,
                all_portfolios,
            } => {
                self.multi_portfolio |= all_portfolios;
                let message = message.unwrap_or_else(|| "Scraping started".to_string());
                self.log.record(now, LogLevel::Info, message);
                self.start_running()
            }
            LifecycleSignal::Completed {
                message,
                all_portfolios,
            } => {
                let message = message.unwrap_or_else(|| "Portfolio scrape completed".to_string());
                self.log.record(now, LogLevel::Success, message);
                // In a combined run each portfolio reports its own completion;
                // only the combined marker ends the session.
                if all_portfolios || !self.multi_portfolio {
                    self.complete()
                } else {
                    Vec::new()
                }
            }
            LifecycleSignal::ScrapingComplete => {
                self.log
                    .record(now, LogLevel::Success, "All companies delivered");
                self.complete()
            }
            LifecycleSignal::Failed { message } => {
                let message = message.unwrap_or_else(|| "Scraper reported an error".to_string());
                self.log.record(now, LogLevel::Error, message);
                Vec::new()
            }
        }
    }

    pub(crate) fn on_progress(&mut self, report: ProgressReport, now: Millis) -> Vec<Effect> {
        self.touch(Channel::Push, now);
        if report.total.is_some() {
            self.stats.reported_total = report.total;
        }

        let portfolio = report
            .portfolio
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let mut parts = Vec::new();
        if let Some(name) = portfolio {
            let counters = self.stats.reported.entry(name.to_lowercase()).or_default();
            if let Some(companies) = report.companies {
                counters.companies = companies;
            }
            if let Some(attempts) = report.attempts {
                counters.attempts = attempts;
            }
            parts.push(format!(
                "{name}: {} companies after {} attempts",
                counters.companies, counters.attempts
            ));
        }
        if let Some(total) = report.total {
            parts.push(format!("{total} total"));
        }
        if !parts.is_empty() {
            self.log.record(now, LogLevel::Info, parts.join(", "));
        }
        self.mark_dirty();
        Vec::new()
    }

    pub(crate) fn on_screenshot(&mut self, encoded: String, now: Millis) -> Vec<Effect> {
        self.touch(Channel::Push, now);
        self.screenshot = Some(encoded);
        self.mark_dirty();
        Vec::new()
    }

    pub(crate) fn on_ignored(&mut self, now: Millis) -> Vec<Effect> {
        self.touch(Channel::Push, now);
        Vec::new()
    }

    /// Escalate to Error once the push channel has ended and nothing at all
    /// has happened for longer than the grace window. An outstanding request
    /// on a healthy polling channel is not silence.
    pub(crate) fn check_silence(&mut self, now: Millis) -> Vec<Effect> {
        let Some(ended_at) = self.push_ended_at_ms else {
            return Vec::new();
        };
        if self.pull_in_flight && self.pull.status == ChannelStatus::Open {
            return Vec::new();
        }
        let quiet_since = [
            self.push.last_activity_ms,
            self.pull.last_activity_ms,
            self.last_delivery_ms,
        ]
        .into_iter()
        .flatten()
        .fold(ended_at, Millis::max);

        let silent_for = now.saturating_sub(quiet_since);
        if silent_for <= self.settings.silence_grace_ms {
            return Vec::new();
        }

        self.log.record(
            now,
            LogLevel::Error,
            format!(
                "No activity for {:.1}s after live updates stopped; giving up",
                silent_for as f64 / 1000.0
            ),
        );
        match self.transition(SessionState::Error) {
            Some(changed) => vec![changed, self.release_channels(ReleaseReason::SilenceTimeout)],
            None => Vec::new(),
        }
    }

    pub(crate) fn close(&mut self, now: Millis) -> Vec<Effect> {
        if self.session.state == SessionState::Closed {
            return Vec::new();
        }
        self.log.record(now, LogLevel::Info, "Session closed");
        match self.transition(SessionState::Closed) {
            Some(changed) => vec![changed, self.release_channels(ReleaseReason::Closed)],
            None => Vec::new(),
        }
    }

    fn after_merge(&mut self, channel: Channel, added: usize, missing_key: usize, now: Millis) {
        let total = self.results.len();
        if added > 0 {
            self.last_delivery_ms = Some(now);
            let via = match channel {
                Channel::Push => "live update",
                Channel::Pull => "poll",
            };
            self.log.record(
                now,
                LogLevel::Info,
                format!("+{added} companies via {via} ({total} total)"),
            );
        }
        if missing_key > 0 {
            self.log.record(
                now,
                LogLevel::Warn,
                format!("Dropped {missing_key} companies without a domain"),
            );
        }
        self.stats.total = total;
        self.progress.sample(now, total);
        self.mark_dirty();
    }

    fn start_running(&mut self) -> Vec<Effect> {
        if self.session.state == SessionState::Starting {
            self.transition(SessionState::Running).into_iter().collect()
        } else {
            Vec::new()
        }
    }

    fn complete(&mut self) -> Vec<Effect> {
        match self.transition(SessionState::Completed) {
            Some(changed) => vec![changed, self.release_channels(ReleaseReason::Completed)],
            None => Vec::new(),
        }
    }

    fn release_channels(&mut self, reason: ReleaseReason) -> Effect {
        for state in [&mut self.push, &mut self.pull] {
            if state.status != ChannelStatus::Errored {
                state.status = ChannelStatus::Closed;
            }
        }
        Effect::ReleaseChannels { reason }
    }

    fn transition(&mut self, to: SessionState) -> Option<Effect> {
        let from = self.session.state;
        if from == to {
            return None;
        }
        self.session.state = to;
        self.mark_dirty();
        Some(Effect::StatusChanged { from, to })
    }

    fn touch(&mut self, channel: Channel, now: Millis) {
        self.channel_mut(channel).last_activity_ms = Some(now);
    }

    fn channel_mut(&mut self, channel: Channel) -> &mut ChannelState {
        match channel {
            Channel::Push => &mut self.push,
            Channel::Pull => &mut self.pull,
        }
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

fn count_sources(stats: &mut SessionStats, added: &[Entity]) {
    for entity in added {
        let source = entity
            .source()
            .map(str::trim)
            .filter(|source| !source.is_empty())
            .unwrap_or(UNKNOWN_SOURCE);
        *stats.per_source.entry(source.to_string()).or_default() += 1;
    }
}
