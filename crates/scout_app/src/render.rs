use chrono::{DateTime, Local, Utc};
use scout_core::{ChannelState, ChannelStatus, Entity, LogEntry, SessionState, SessionView};

/// Turns successive session views into terminal lines, printing each log
/// entry and each company once.
#[derive(Debug, Default)]
pub struct Renderer {
    printed_log: u64,
    printed_entities: usize,
    last_state: Option<SessionState>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines for everything that is new in `view` since the previous call.
    pub fn render(&mut self, view: &SessionView) -> Vec<String> {
        let mut lines = Vec::new();

        let unseen = view.log_appended.saturating_sub(self.printed_log);
        let unseen = usize::try_from(unseen).unwrap_or(usize::MAX).min(view.log.len());
        let skip = view.log.len() - unseen;
        lines.extend(view.log[skip..].iter().map(log_line));
        self.printed_log = view.log_appended;

        if view.entities.len() > self.printed_entities {
            lines.extend(
                view.entities[self.printed_entities..]
                    .iter()
                    .map(|entity| format!("  + {}", entity_line(entity))),
            );
            self.printed_entities = view.entities.len();
        }

        if self.last_state != Some(view.session.state) || !lines.is_empty() {
            lines.push(status_line(view));
            self.last_state = Some(view.session.state);
        }
        lines
    }
}

pub fn status_line(view: &SessionView) -> String {
    format!(
        "[{}] {} | {} companies | {:.1}/min | live {} | poll {}",
        view.session.id,
        view.session.state,
        view.progress.total,
        view.progress.rate_per_minute,
        channel_label(view.push),
        channel_label(view.pull),
    )
}

/// End-of-session report: per-source counts and the first `limit` companies.
pub fn summary(view: &SessionView, limit: usize) -> Vec<String> {
    let mut lines = vec![format!(
        "Session {} ended {} with {} companies",
        view.session.id,
        view.session.state,
        view.entities.len()
    )];
    for (source, count) in &view.stats.per_source {
        lines.push(format!("  {source}: {count}"));
    }
    if let Some(total) = view.stats.reported_total {
        lines.push(format!("  scraper reported {total} in total"));
    }
    lines.extend(entity_list(&view.entities, limit));
    lines
}

/// Numbered list of the first `limit` entities plus an overflow note.
pub fn entity_list(entities: &[Entity], limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = entities
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, entity)| format!("{:>4}. {}", i + 1, entity_line(entity)))
        .collect();
    if entities.len() > limit {
        lines.push(format!("      ... and {} more", entities.len() - limit));
    }
    lines
}

fn entity_line(entity: &Entity) -> String {
    let domain = entity.domain().unwrap_or("?");
    let mut line = match entity.name() {
        Some(name) if !name.trim().is_empty() => format!("{name} ({domain})"),
        _ => domain.to_string(),
    };
    if let Some(source) = entity.source() {
        line.push_str(&format!(" [{source}]"));
    }
    line
}

fn log_line(entry: &LogEntry) -> String {
    let at = i64::try_from(entry.at_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    format!("{at} {:<7} {}", entry.level.to_string(), entry.message)
}

fn channel_label(channel: ChannelState) -> &'static str {
    match channel.status {
        ChannelStatus::Connecting => "connecting",
        ChannelStatus::Open => "open",
        ChannelStatus::Closed => "closed",
        ChannelStatus::Errored => "errored",
    }
}
