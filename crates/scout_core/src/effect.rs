use crate::SessionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StatusChanged { from: SessionState, to: SessionState },
    /// Stop the pull timer and drop the push subscription.
    ReleaseChannels { reason: ReleaseReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    Completed,
    SilenceTimeout,
    Closed,
}
