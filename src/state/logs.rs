/// Diagnostic log store
///
/// An append-only record of what the studio did, kept across restarts.
/// Each entry is mirrored to the console via `tracing` and the newest
/// `MAX_LOGS` entries are written through to the local store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::store::{KvStore, LOGS_KEY};

/// Retention cap, oldest entries are dropped beyond it
pub const MAX_LOGS: usize = 1000;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        };
        f.write_str(tag)
    }
}

/// A metadata value. Serialized as the plain JSON value.
///
/// JSON has no NaN or infinity, so non-finite floats are kept as text.
/// `Null` reads back entries written before that conversion existed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Text(value)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Integer(value)
    }
}

impl From<u32> for MetaValue {
    fn from(value: u32) -> Self {
        MetaValue::Integer(i64::from(value))
    }
}

impl From<usize> for MetaValue {
    fn from(value: usize) -> Self {
        MetaValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f32> for MetaValue {
    fn from(value: f32) -> Self {
        MetaValue::from(f64::from(value))
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            MetaValue::Float(value)
        } else {
            MetaValue::Text(value.to_string())
        }
    }
}

pub type Metadata = BTreeMap<String, MetaValue>;

/// Build metadata from key/value pairs
pub fn metadata<const N: usize>(pairs: [(&str, MetaValue); N]) -> Metadata {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl LogEntry {
    /// One console line: `[LEVEL] message {metadata}`
    pub fn console_line(&self) -> String {
        match &self.metadata {
            Some(metadata) => {
                let rendered = serde_json::to_string(metadata).unwrap_or_default();
                format!("[{}] {} {}", self.level, self.message, rendered)
            }
            None => format!("[{}] {}", self.level, self.message),
        }
    }
}

/// Process-scoped log store, constructed once and shared by handle
pub struct LogStore {
    store: Rc<dyn KvStore>,
    entries: RefCell<Vec<LogEntry>>,
}

impl LogStore {
    /// Create the log store, restoring any previously persisted entries.
    /// Missing or corrupt data starts an empty log.
    pub fn load(store: Rc<dyn KvStore>) -> Self {
        let mut entries = match store.get(LOGS_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<LogEntry>>(&json) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!("Failed to parse persisted logs: {}", err);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!("Failed to load logs from store: {}", err);
                Vec::new()
            }
        };
        trim(&mut entries);

        Self {
            store,
            entries: RefCell::new(entries),
        }
    }

    pub fn info(&self, message: impl Into<String>, metadata: Option<Metadata>) {
        self.append(LogLevel::Info, message.into(), metadata);
    }

    pub fn warn(&self, message: impl Into<String>, metadata: Option<Metadata>) {
        self.append(LogLevel::Warn, message.into(), metadata);
    }

    pub fn error(&self, message: impl Into<String>, metadata: Option<Metadata>) {
        self.append(LogLevel::Error, message.into(), metadata);
    }

    pub fn debug(&self, message: impl Into<String>, metadata: Option<Metadata>) {
        self.append(LogLevel::Debug, message.into(), metadata);
    }

    fn append(&self, level: LogLevel, message: String, metadata: Option<Metadata>) {
        let entry = LogEntry {
            level,
            message,
            timestamp: Utc::now(),
            metadata,
        };
        mirror(&entry);

        let mut entries = self.entries.borrow_mut();
        entries.push(entry);
        trim(&mut entries);
        self.persist(&entries);
    }

    fn persist(&self, entries: &[LogEntry]) {
        // Failures go to the console only, logging them here would recurse
        let result = serde_json::to_string(entries)
            .map_err(crate::error::StoreError::from)
            .and_then(|json| self.store.set(LOGS_KEY, &json));
        if let Err(err) = result {
            tracing::warn!("Failed to save logs to store: {}", err);
        }
    }

    /// Snapshot of the current entries, oldest first
    pub fn logs(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear_logs(&self) {
        self.entries.borrow_mut().clear();
        if let Err(err) = self.store.remove(LOGS_KEY) {
            tracing::warn!("Failed to clear logs from store: {}", err);
        }
    }

    /// Pretty JSON of every current entry
    pub fn export_logs(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.entries.borrow())
    }
}

fn trim(entries: &mut Vec<LogEntry>) {
    if entries.len() > MAX_LOGS {
        let excess = entries.len() - MAX_LOGS;
        entries.drain(..excess);
    }
}

fn mirror(entry: &LogEntry) {
    let line = entry.console_line();
    match entry.level {
        LogLevel::Info => tracing::info!(target: "bando_fi::diagnostics", "{}", line),
        LogLevel::Warn => tracing::warn!(target: "bando_fi::diagnostics", "{}", line),
        LogLevel::Error => tracing::error!(target: "bando_fi::diagnostics", "{}", line),
        LogLevel::Debug => tracing::debug!(target: "bando_fi::diagnostics", "{}", line),
    }
}
