use std::collections::BTreeMap;

use crate::{ChannelState, Entity, LogEntry, Millis, Progress, Session};

/// Label used for entities that carry no `source` field.
pub(crate) const UNKNOWN_SOURCE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionStats {
    pub total: usize,
    /// Merged entities per `source` field.
    pub per_source: BTreeMap<String, usize>,
    /// Counters reported by the scraper per portfolio, keyed by lowercase name.
    pub reported: BTreeMap<String, PortfolioProgress>,
    pub reported_total: Option<u64>,
    pub last_snapshot: Option<SnapshotSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortfolioProgress {
    pub companies: u64,
    pub attempts: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub at_ms: Millis,
    pub listed: usize,
    pub added: usize,
    /// Known entries the snapshot did not list.
    pub stale: usize,
}

/// Everything the renderer needs, copied out in one consistent read.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub session: Session,
    pub entities: Vec<Entity>,
    pub stats: SessionStats,
    pub progress: Progress,
    pub log: Vec<LogEntry>,
    /// Entries ever appended to the log, including evicted ones.
    pub log_appended: u64,
    pub push: ChannelState,
    pub pull: ChannelState,
    pub screenshot: Option<String>,
}
