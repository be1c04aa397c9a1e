//! JSON shapes exchanged with the scraping backend.

use scout_core::{Entity, LifecycleSignal, Msg, ProgressReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ParseError;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum PushMessage {
    CompaniesAdded {
        #[serde(default)]
        companies: Vec<Entity>,
    },
    ScrapingComplete,
    Progress(ProgressFields),
    Screenshot {
        screenshot: String,
    },
    Start {
        message: Option<String>,
    },
    StartBoth {
        message: Option<String>,
    },
    Complete {
        message: Option<String>,
    },
    CompleteBoth {
        message: Option<String>,
    },
    Error {
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// The scraper names the same counters differently per portfolio.
#[derive(Debug, Deserialize)]
struct ProgressFields {
    portfolio: Option<String>,
    source: Option<String>,
    companies_found: Option<u64>,
    yc_companies: Option<u64>,
    antler_companies: Option<u64>,
    scroll_attempt: Option<u64>,
    load_more_attempt: Option<u64>,
    total_companies: Option<u64>,
}

impl From<ProgressFields> for ProgressReport {
    fn from(fields: ProgressFields) -> Self {
        let inferred = if fields.yc_companies.is_some() {
            Some("YC".to_string())
        } else if fields.antler_companies.is_some() {
            Some("Antler".to_string())
        } else {
            None
        };
        ProgressReport {
            portfolio: fields.portfolio.or(fields.source).or(inferred),
            companies: fields
                .companies_found
                .or(fields.yc_companies)
                .or(fields.antler_companies),
            attempts: fields.scroll_attempt.or(fields.load_more_attempt),
            total: fields.total_companies,
        }
    }
}

/// Decode one push text frame into a session message.
pub fn decode_push(text: &str) -> Result<Msg, ParseError> {
    let value: Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let msg = match serde_json::from_value::<PushMessage>(value)? {
        PushMessage::CompaniesAdded { companies } => Msg::EntitiesAdded(companies),
        PushMessage::ScrapingComplete => Msg::Lifecycle(LifecycleSignal::ScrapingComplete),
        PushMessage::Progress(fields) => Msg::Progress(fields.into()),
        PushMessage::Screenshot { screenshot } => Msg::Screenshot(screenshot),
        PushMessage::Start { message } => Msg::Lifecycle(LifecycleSignal::Started {
            message,
            all_portfolios: false,
        }),
        PushMessage::StartBoth { message } => Msg::Lifecycle(LifecycleSignal::Started {
            message,
            all_portfolios: true,
        }),
        PushMessage::Complete { message } => Msg::Lifecycle(LifecycleSignal::Completed {
            message,
            all_portfolios: false,
        }),
        PushMessage::CompleteBoth { message } => Msg::Lifecycle(LifecycleSignal::Completed {
            message,
            all_portfolios: true,
        }),
        PushMessage::Error { message } => Msg::Lifecycle(LifecycleSignal::Failed { message }),
        PushMessage::Unknown => Msg::Ignored { kind },
    };
    Ok(msg)
}

/// Pull responses come either as a bare list or wrapped in `companies`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotBody {
    Bare(Vec<Entity>),
    Wrapped { companies: Vec<Entity> },
}

pub fn decode_snapshot(body: &[u8]) -> Result<Vec<Entity>, ParseError> {
    let entities = match serde_json::from_slice::<SnapshotBody>(body)? {
        SnapshotBody::Bare(entities) => entities,
        SnapshotBody::Wrapped { companies } => companies,
    };
    Ok(entities)
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub query: &'a str,
    pub session_id: Option<&'a str>,
}
