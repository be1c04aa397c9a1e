use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field that carries the dedup key of every entity.
pub const DOMAIN_FIELD: &str = "domain";
/// Optional field naming the portfolio an entity was discovered through.
pub const SOURCE_FIELD: &str = "source";

/// A discovered company record.
///
/// Only `domain` is interpreted; every other field is carried through as-is so
/// the renderer sees exactly what the backend sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Entity with only a domain, mostly useful for tests and fixtures.
    pub fn with_domain(domain: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(DOMAIN_FIELD.to_string(), Value::String(domain.into()));
        Self(fields)
    }

    /// Builder-style setter for an arbitrary pass-through field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn domain(&self) -> Option<&str> {
        self.0.get(DOMAIN_FIELD).and_then(Value::as_str)
    }

    /// Normalized dedup key, `None` when the domain is missing or blank.
    pub fn key(&self) -> Option<DomainKey> {
        self.domain().and_then(normalize_domain)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn source(&self) -> Option<&str> {
        self.0.get(SOURCE_FIELD).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl TryFrom<Value> for Entity {
    type Error = Value;

    /// Accepts JSON objects only; anything else is handed back unchanged.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(other),
        }
    }
}

/// Case-insensitive, whitespace-trimmed domain used as the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainKey(String);

impl DomainKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a raw domain for dedupe: trim surrounding whitespace and lowercase.
/// Blank input has no key.
pub fn normalize_domain(raw: &str) -> Option<DomainKey> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(DomainKey(trimmed.to_lowercase()))
}
