//! Scout core: pure session state machine, merge engine and view-model helpers.
mod effect;
mod entity;
mod event_log;
mod msg;
mod predicate;
mod progress;
mod result_set;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, ReleaseReason};
pub use entity::{normalize_domain, DomainKey, Entity, DOMAIN_FIELD, SOURCE_FIELD};
pub use event_log::{EventLog, LogEntry, LogLevel, LOG_CAPACITY};
pub use msg::{LifecycleSignal, Msg, ProgressReport};
pub use predicate::{KeywordPredicate, StreamingPredicate};
pub use progress::{Progress, ProgressTracker, Sample, SAMPLE_WINDOW};
pub use result_set::{MergeReport, ResultSet};
pub use state::{
    Channel, ChannelState, ChannelStatus, Millis, Session, SessionId, SessionModel,
    SessionSettings, SessionState,
};
pub use update::update;
pub use view_model::{PortfolioProgress, SessionStats, SessionView, SnapshotSummary};
