use std::sync::Once;

use pretty_assertions::assert_eq;
use scout_core::{
    update, Channel, ChannelStatus, Effect, Entity, LifecycleSignal, LogLevel, Msg,
    ProgressReport, ReleaseReason, SessionId, SessionModel, SessionSettings, SessionState,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scout_logging::initialize_for_tests);
}

fn new_session() -> SessionModel {
    SessionModel::new(SessionId::generated(0), 0, SessionSettings::default())
}

fn apply(state: SessionModel, msgs: Vec<(u64, Msg)>) -> (SessionModel, Vec<Effect>) {
    let mut state = state;
    let mut all = Vec::new();
    for (now, msg) in msgs {
        let (next, effects) = update(state, msg, now);
        state = next;
        all.extend(effects);
    }
    (state, all)
}

fn batch(domains: &[&str]) -> Vec<Entity> {
    domains.iter().map(|d| Entity::with_domain(*d)).collect()
}

fn result_domains(state: &SessionModel) -> Vec<String> {
    state
        .results()
        .iter()
        .filter_map(Entity::domain)
        .map(str::to_owned)
        .collect()
}

#[test]
fn new_session_starts_dirty_in_starting() {
    init_logging();
    let mut state = new_session();

    assert_eq!(state.state(), SessionState::Starting);
    assert_eq!(state.id().as_str(), "scrape-0");
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn opening_a_channel_moves_starting_to_running() {
    init_logging();
    let (mut state, effects) = update(new_session(), Msg::ChannelOpened(Channel::Push), 10);

    assert_eq!(state.state(), SessionState::Running);
    assert_eq!(
        effects,
        vec![Effect::StatusChanged {
            from: SessionState::Starting,
            to: SessionState::Running,
        }]
    );
    assert_eq!(state.channel(Channel::Push).status, ChannelStatus::Open);
    assert!(state.consume_dirty());

    // A second open is not another transition.
    let (state, effects) = update(state, Msg::ChannelOpened(Channel::Pull), 20);
    assert!(effects.is_empty());
    assert_eq!(state.state(), SessionState::Running);
}

#[test]
fn push_then_snapshot_merges_in_first_seen_order() {
    init_logging();
    let (state, _) = apply(
        new_session(),
        vec![
            (0, Msg::ChannelOpened(Channel::Push)),
            (100, Msg::EntitiesAdded(batch(&["a.com", "b.com"]))),
            (5_000, Msg::SnapshotReceived(batch(&["a.com", "c.com"]))),
        ],
    );

    assert_eq!(result_domains(&state), vec!["a.com", "b.com", "c.com"]);
    let view = state.view();
    assert_eq!(view.stats.total, 3);
    assert_eq!(view.progress.total, 3);
    let snapshot = view.stats.last_snapshot.unwrap();
    assert_eq!((snapshot.listed, snapshot.added, snapshot.stale), (2, 1, 1));
    assert!(view
        .log
        .iter()
        .any(|entry| entry.message == "+2 companies via live update (2 total)"));
    assert!(view
        .log
        .iter()
        .any(|entry| entry.message == "+1 companies via poll (3 total)"));
}

#[test]
fn push_error_with_polling_alive_stays_running() {
    init_logging();
    let mut msgs = vec![
        (0, Msg::ChannelOpened(Channel::Pull)),
        (
            10,
            Msg::ChannelFailed {
                channel: Channel::Push,
                error: "connection refused".to_string(),
            },
        ),
    ];
    for round in 1..=6u64 {
        let at = round * 5_000;
        msgs.push((at, Msg::SnapshotReceived(batch(&[&format!("c{round}.com")]))));
        msgs.push((at + 1_000, Msg::Tick));
        msgs.push((at + 4_999, Msg::Tick));
    }

    let (state, effects) = apply(new_session(), msgs);

    assert_eq!(state.state(), SessionState::Running);
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::ReleaseChannels { .. })));
    assert_eq!(state.results().len(), 6);
    assert_eq!(state.channel(Channel::Push).status, ChannelStatus::Errored);
    let warned = state
        .log()
        .entries()
        .any(|entry| entry.level == LogLevel::Warn && entry.message.contains("connection refused"));
    assert!(warned);
}

#[test]
fn sustained_silence_after_push_closes_escalates_to_error() {
    init_logging();
    let (state, effects) = apply(
        new_session(),
        vec![
            (0, Msg::ChannelOpened(Channel::Push)),
            (1_000, Msg::EntitiesAdded(batch(&["kept.com"]))),
            (2_000, Msg::ChannelClosed(Channel::Push)),
            (
                4_000,
                Msg::ChannelFailed {
                    channel: Channel::Pull,
                    error: "http status 502".to_string(),
                },
            ),
            (7_000, Msg::Tick),
        ],
    );
    // Exactly at the grace boundary nothing happens yet.
    assert_eq!(state.state(), SessionState::Running);
    assert_eq!(effects.len(), 1, "only the Starting -> Running change so far");

    let (state, effects) = update(state, Msg::Tick, 7_001);
    assert_eq!(state.state(), SessionState::Error);
    assert_eq!(
        effects,
        vec![
            Effect::StatusChanged {
                from: SessionState::Running,
                to: SessionState::Error,
            },
            Effect::ReleaseChannels {
                reason: ReleaseReason::SilenceTimeout,
            },
        ]
    );
    // Partial results survive the failure.
    assert_eq!(result_domains(&state), vec!["kept.com"]);
    assert_eq!(state.log().latest().unwrap().level, LogLevel::Error);
}

#[test]
fn outstanding_poll_on_healthy_channel_is_not_silence() {
    init_logging();
    let (state, effects) = apply(
        new_session(),
        vec![
            (
                0,
                Msg::ChannelFailed {
                    channel: Channel::Push,
                    error: "connection refused".to_string(),
                },
            ),
            (0, Msg::PullIssued),
            (100, Msg::ChannelOpened(Channel::Pull)),
            (100, Msg::SnapshotReceived(batch(&["a.com"]))),
            (5_000, Msg::PullIssued),
            // The response is slower than the grace window.
            (10_999, Msg::Tick),
            (11_000, Msg::SnapshotReceived(batch(&["a.com", "b.com"]))),
            (16_000, Msg::Tick),
        ],
    );
    assert_eq!(state.state(), SessionState::Running);
    assert_eq!(effects.len(), 1, "only the Starting -> Running change");
    assert_eq!(result_domains(&state), vec!["a.com", "b.com"]);

    // Nothing outstanding any more: the grace window counts from the last response.
    let (state, _) = update(state, Msg::Tick, 16_001);
    assert_eq!(state.state(), SessionState::Error);
}

#[test]
fn retries_of_a_failing_poll_do_not_hold_off_silence() {
    init_logging();
    let (state, _) = apply(
        new_session(),
        vec![
            (0, Msg::ChannelOpened(Channel::Push)),
            (2_000, Msg::ChannelClosed(Channel::Push)),
            (
                4_000,
                Msg::ChannelFailed {
                    channel: Channel::Pull,
                    error: "http status 502".to_string(),
                },
            ),
            (5_000, Msg::PullIssued),
            (7_001, Msg::Tick),
        ],
    );
    assert_eq!(state.state(), SessionState::Error);
    assert_eq!(state.channel(Channel::Pull).status, ChannelStatus::Errored);
}

#[test]
fn silence_rule_waits_for_push_to_end() {
    init_logging();
    let (state, _) = apply(
        new_session(),
        vec![
            (0, Msg::ChannelOpened(Channel::Push)),
            (60_000, Msg::Tick),
            (120_000, Msg::Tick),
        ],
    );
    assert_eq!(state.state(), SessionState::Running);
}

#[test]
fn session_that_never_opens_fails_after_grace() {
    init_logging();
    let (state, _) = apply(
        new_session(),
        vec![
            (
                50,
                Msg::ChannelFailed {
                    channel: Channel::Push,
                    error: "dns".to_string(),
                },
            ),
            (3_000, Msg::Tick),
            (5_051, Msg::Tick),
        ],
    );
    assert_eq!(state.state(), SessionState::Error);
}

#[test]
fn scraping_complete_finishes_session_and_releases_channels() {
    init_logging();
    let (state, effects) = apply(
        new_session(),
        vec![
            (0, Msg::ChannelOpened(Channel::Push)),
            (10, Msg::EntitiesAdded(batch(&["a.com"]))),
            (20, Msg::Lifecycle(LifecycleSignal::ScrapingComplete)),
        ],
    );

    assert_eq!(state.state(), SessionState::Completed);
    assert!(effects.contains(&Effect::ReleaseChannels {
        reason: ReleaseReason::Completed
    }));
    assert_eq!(state.channel(Channel::Push).status, ChannelStatus::Closed);
    assert_eq!(state.log().latest().unwrap().level, LogLevel::Success);

    // Late deliveries after completion are discarded.
    let (state, effects) = update(state, Msg::SnapshotReceived(batch(&["late.com"])), 30);
    assert!(effects.is_empty());
    assert_eq!(result_domains(&state), vec!["a.com"]);
}

#[test]
fn combined_run_completes_only_on_combined_marker() {
    init_logging();
    let (state, _) = apply(
        new_session(),
        vec![
            (
                0,
                Msg::Lifecycle(LifecycleSignal::Started {
                    message: Some("Scraping YC and Antler".to_string()),
                    all_portfolios: true,
                }),
            ),
            (
                10,
                Msg::Lifecycle(LifecycleSignal::Completed {
                    message: Some("YC done".to_string()),
                    all_portfolios: false,
                }),
            ),
        ],
    );
    assert_eq!(state.state(), SessionState::Running);

    let (state, _) = update(
        state,
        Msg::Lifecycle(LifecycleSignal::Completed {
            message: None,
            all_portfolios: true,
        }),
        20,
    );
    assert_eq!(state.state(), SessionState::Completed);
}

#[test]
fn single_portfolio_complete_finishes_session() {
    init_logging();
    let (state, _) = apply(
        new_session(),
        vec![
            (
                0,
                Msg::Lifecycle(LifecycleSignal::Started {
                    message: None,
                    all_portfolios: false,
                }),
            ),
            (
                10,
                Msg::Lifecycle(LifecycleSignal::Completed {
                    message: None,
                    all_portfolios: false,
                }),
            ),
        ],
    );
    assert_eq!(state.state(), SessionState::Completed);
}

#[test]
fn scraper_error_signal_is_logged_without_transition() {
    init_logging();
    let (state, effects) = apply(
        new_session(),
        vec![
            (0, Msg::ChannelOpened(Channel::Push)),
            (
                5,
                Msg::Lifecycle(LifecycleSignal::Failed {
                    message: Some("Antler page timed out".to_string()),
                }),
            ),
        ],
    );
    assert_eq!(state.state(), SessionState::Running);
    assert_eq!(effects.len(), 1);
    let latest = state.log().latest().unwrap();
    assert_eq!(latest.level, LogLevel::Error);
    assert_eq!(latest.message, "Antler page timed out");
}

#[test]
fn close_is_terminal_and_idempotent_from_any_state() {
    init_logging();
    for prelude in [
        vec![],
        vec![(0, Msg::ChannelOpened(Channel::Push))],
        vec![(0, Msg::Lifecycle(LifecycleSignal::ScrapingComplete))],
    ] {
        let (state, _) = apply(new_session(), prelude);
        let before = state.state();

        let (state, effects) = update(state, Msg::CloseRequested, 100);
        assert_eq!(state.state(), SessionState::Closed);
        assert_eq!(
            effects,
            vec![
                Effect::StatusChanged {
                    from: before,
                    to: SessionState::Closed,
                },
                Effect::ReleaseChannels {
                    reason: ReleaseReason::Closed,
                },
            ]
        );

        let (state, effects) = update(state, Msg::CloseRequested, 200);
        assert!(effects.is_empty());
        let (state, effects) = update(state, Msg::EntitiesAdded(batch(&["late.com"])), 300);
        assert!(effects.is_empty());
        assert!(state.results().is_empty());
    }
}

#[test]
fn entities_without_domain_warn_and_are_skipped() {
    init_logging();
    let (state, _) = apply(
        new_session(),
        vec![(
            0,
            Msg::EntitiesAdded(vec![Entity::with_domain("ok.com"), Entity::default()]),
        )],
    );

    assert_eq!(state.results().len(), 1);
    let latest = state.log().latest().unwrap();
    assert_eq!(latest.level, LogLevel::Warn);
    assert_eq!(latest.message, "Dropped 1 companies without a domain");
}

#[test]
fn malformed_payload_is_warned_and_counts_as_activity() {
    init_logging();
    let (state, _) = apply(
        new_session(),
        vec![(
            42,
            Msg::MalformedPayload {
                channel: Channel::Push,
                error: "expected value at line 1".to_string(),
            },
        )],
    );

    assert_eq!(state.channel(Channel::Push).last_activity_ms, Some(42));
    assert_eq!(state.log().latest().unwrap().level, LogLevel::Warn);
}

#[test]
fn progress_reports_and_sources_feed_stats() {
    init_logging();
    let (state, _) = apply(
        new_session(),
        vec![
            (
                0,
                Msg::Progress(ProgressReport {
                    portfolio: Some("YC".to_string()),
                    companies: Some(120),
                    attempts: Some(4),
                    total: Some(120),
                }),
            ),
            (
                10,
                Msg::Progress(ProgressReport {
                    portfolio: Some("YC".to_string()),
                    companies: None,
                    attempts: Some(5),
                    total: None,
                }),
            ),
            (
                20,
                Msg::EntitiesAdded(vec![
                    Entity::with_domain("a.com").with_field("source", "YC"),
                    Entity::with_domain("b.com").with_field("source", "Antler"),
                    Entity::with_domain("c.com").with_field("source", "YC"),
                    Entity::with_domain("d.com"),
                ]),
            ),
            (30, Msg::Screenshot("iVBORw0KGgo=".to_string())),
        ],
    );

    let stats = state.stats();
    let yc = stats.reported["yc"];
    assert_eq!((yc.companies, yc.attempts), (120, 5));
    assert_eq!(stats.reported_total, Some(120));
    assert_eq!(stats.per_source["YC"], 2);
    assert_eq!(stats.per_source["Antler"], 1);
    assert_eq!(stats.per_source["unknown"], 1);
    assert_eq!(state.screenshot(), Some("iVBORw0KGgo="));
    assert_eq!(
        state.log().entries().nth(1).unwrap().message,
        "YC: 120 companies after 4 attempts, 120 total"
    );
}

#[test]
fn throughput_follows_merges() {
    init_logging();
    let (state, _) = apply(
        new_session(),
        vec![
            (0, Msg::SnapshotReceived(Vec::new())),
            (
                60_000,
                Msg::SnapshotReceived(
                    (0..30).map(|i| Entity::with_domain(format!("c{i}.com"))).collect(),
                ),
            ),
        ],
    );

    let view = state.view();
    assert_eq!(view.progress.total, 30);
    assert_eq!(view.progress.rate_per_minute, 30.0);
}
