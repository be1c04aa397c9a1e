use std::collections::VecDeque;
use std::fmt;

use crate::Millis;

/// Maximum number of entries kept in a session's event log.
pub const LOG_CAPACITY: usize = 50;

/// Severity chosen by whoever records the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at_ms: Millis,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(at_ms: Millis, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            at_ms,
            level,
            message: message.into(),
        }
    }
}

/// Bounded, newest-last trace of human-readable session events.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    appended: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            appended: 0,
        }
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.appended += 1;
    }

    pub fn record(&mut self, at_ms: Millis, level: LogLevel, message: impl Into<String>) {
        self.append(LogEntry::new(at_ms, level, message));
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of entries ever appended, including evicted ones. Lets a
    /// reader tell which retained entries it has not seen yet.
    pub fn appended(&self) -> u64 {
        self.appended
    }
}
