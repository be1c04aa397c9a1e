//! Scout engine: transports, channel supervision and the per-session actor.
mod channels;
mod config;
mod controller;
mod pull;
mod push;
mod session;
mod types;
mod wire;

pub use channels::{ChannelEnvelope, ChannelManager};
pub use config::EngineConfig;
pub use controller::{SessionController, StartOutcome};
pub use pull::{PullSettings, ReqwestSnapshotFetcher, SnapshotFetcher};
pub use push::{FrameStream, PushTransport, WsPushTransport};
pub use session::{SessionClock, SessionHandle};
pub use types::{FailureKind, ParseError, PullError, ScoutError, TransportError};
pub use wire::{decode_push, decode_snapshot};
