use crate::{Channel, Entity};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// A channel finished connecting (push) or answered for the first time (pull).
    ChannelOpened(Channel),
    /// A channel ended without error.
    ChannelClosed(Channel),
    /// Transport failure on a channel. The other channel keeps running.
    ChannelFailed { channel: Channel, error: String },
    /// A pull request was sent and is awaiting its response.
    PullIssued,
    /// An inbound payload could not be decoded and was dropped.
    MalformedPayload { channel: Channel, error: String },
    /// Incremental batch from the push channel.
    EntitiesAdded(Vec<Entity>),
    /// Complete result list from a pull.
    SnapshotReceived(Vec<Entity>),
    /// Scraper lifecycle signal from the push channel.
    Lifecycle(LifecycleSignal),
    /// Per-portfolio progress counters from the push channel.
    Progress(ProgressReport),
    /// Latest encoded screenshot of the scraping browser.
    Screenshot(String),
    /// Push message of a type the client does not interpret.
    Ignored { kind: String },
    /// Periodic clock tick, drives the silence rule.
    Tick,
    /// Explicit close by the caller.
    CloseRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// `all_portfolios` is set for the combined multi-portfolio run.
    Started {
        message: Option<String>,
        all_portfolios: bool,
    },
    /// A single portfolio finished, or with `all_portfolios` the whole run.
    Completed {
        message: Option<String>,
        all_portfolios: bool,
    },
    /// Final "all companies delivered" marker.
    ScrapingComplete,
    /// Scraper-side failure report. Logged only.
    Failed { message: Option<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressReport {
    pub portfolio: Option<String>,
    pub companies: Option<u64>,
    /// Scroll or "load more" attempts, depending on the portfolio site.
    pub attempts: Option<u64>,
    pub total: Option<u64>,
}
