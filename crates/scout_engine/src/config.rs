use std::time::Duration;

use scout_core::{SessionId, SessionSettings};

use crate::PullSettings;

/// Endpoints and timing for every session the controller opens.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Base of the HTTP API, e.g. `http://localhost:8000`.
    pub api_base_url: String,
    /// Base of the WebSocket API, e.g. `ws://localhost:8000`.
    pub ws_base_url: String,
    pub poll_interval: Duration,
    /// Quiet period tolerated after the push channel ends.
    pub silence_grace: Duration,
    /// How often the session re-evaluates the silence rule.
    pub silence_check_interval: Duration,
    pub pull: PullSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            ws_base_url: "ws://localhost:8000".to_string(),
            poll_interval: Duration::from_secs(5),
            silence_grace: Duration::from_secs(5),
            silence_check_interval: Duration::from_secs(1),
            pull: PullSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Full-result search endpoint used by both the poll and one-shot paths.
    pub fn search_url(&self) -> String {
        format!(
            "{}/companies/search/free-text",
            self.api_base_url.trim_end_matches('/')
        )
    }

    pub fn push_url(&self, session_id: &SessionId) -> String {
        push_url(&self.ws_base_url, session_id)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            silence_grace_ms: duration_ms(self.silence_grace),
        }
    }
}

pub(crate) fn push_url(ws_base_url: &str, session_id: &SessionId) -> String {
    format!(
        "{}/api/ws/portfolio-scraping/{}",
        ws_base_url.trim_end_matches('/'),
        session_id
    )
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
