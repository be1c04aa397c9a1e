use crate::{Effect, Millis, Msg, SessionModel};

/// Pure update function: applies a message observed at `now` to the session
/// and returns any effects the runtime must carry out.
///
/// Once a session has left Starting/Running only `CloseRequested` is
/// honoured; late deliveries are discarded so the result set stays exactly
/// as it was when the session ended.
pub fn update(mut state: SessionModel, msg: Msg, now: Millis) -> (SessionModel, Vec<Effect>) {
    let effects = match msg {
        Msg::CloseRequested => state.close(now),
        _ if !state.state().is_live() => Vec::new(),
        Msg::ChannelOpened(channel) => state.channel_opened(channel, now),
        Msg::ChannelClosed(channel) => state.channel_ended(channel, None, now),
        Msg::ChannelFailed { channel, error } => state.channel_ended(channel, Some(&error), now),
        Msg::PullIssued => state.on_pull_issued(now),
        Msg::MalformedPayload { channel, error } => state.on_malformed(channel, &error, now),
        Msg::EntitiesAdded(batch) => state.on_batch(batch, now),
        Msg::SnapshotReceived(full_list) => state.on_snapshot(full_list, now),
        Msg::Lifecycle(signal) => state.on_lifecycle(signal, now),
        Msg::Progress(report) => state.on_progress(report, now),
        Msg::Screenshot(encoded) => state.on_screenshot(encoded, now),
        Msg::Ignored { .. } => state.on_ignored(now),
        Msg::Tick => state.check_silence(now),
    };

    (state, effects)
}
