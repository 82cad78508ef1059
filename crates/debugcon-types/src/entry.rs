use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::value::Value;

/// The fixed method vocabulary a call site may use.
///
/// Unknown names fold to `Log` rather than erroring: debug output must never
/// be the reason the host program fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Method {
    Log,
    Info,
    Warn,
    Error,
    Assert,
    Alert,
    Group,
    GroupCollapsed,
    GroupEnd,
    GroupSummary,
    Table,
    Trace,
    Clear,
    Count,
    CountReset,
    Time,
    TimeEnd,
    TimeLog,
    Profile,
    ProfileEnd,
    EndOutput,
}

impl Method {
    /// Map a raw method name to the vocabulary; unknown names become `Log`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "log" => Method::Log,
            "info" => Method::Info,
            "warn" => Method::Warn,
            "error" => Method::Error,
            "assert" => Method::Assert,
            "alert" => Method::Alert,
            "group" => Method::Group,
            "groupCollapsed" => Method::GroupCollapsed,
            "groupEnd" => Method::GroupEnd,
            "groupSummary" => Method::GroupSummary,
            "table" => Method::Table,
            "trace" => Method::Trace,
            "clear" => Method::Clear,
            "count" => Method::Count,
            "countReset" => Method::CountReset,
            "time" => Method::Time,
            "timeEnd" => Method::TimeEnd,
            "timeLog" => Method::TimeLog,
            "profile" => Method::Profile,
            "profileEnd" => Method::ProfileEnd,
            "endOutput" => Method::EndOutput,
            _ => Method::Log,
        }
    }

    /// Wire name (camelCase, matching the browser console vocabulary)
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Log => "log",
            Method::Info => "info",
            Method::Warn => "warn",
            Method::Error => "error",
            Method::Assert => "assert",
            Method::Alert => "alert",
            Method::Group => "group",
            Method::GroupCollapsed => "groupCollapsed",
            Method::GroupEnd => "groupEnd",
            Method::GroupSummary => "groupSummary",
            Method::Table => "table",
            Method::Trace => "trace",
            Method::Clear => "clear",
            Method::Count => "count",
            Method::CountReset => "countReset",
            Method::Time => "time",
            Method::TimeEnd => "timeEnd",
            Method::TimeLog => "timeLog",
            Method::Profile => "profile",
            Method::ProfileEnd => "profileEnd",
            Method::EndOutput => "endOutput",
        }
    }

    /// Methods that open a group frame
    pub fn opens_group(&self) -> bool {
        matches!(self, Method::Group | Method::GroupCollapsed)
    }

    /// Methods rendered by the tabular renderer
    pub fn is_tabular(&self) -> bool {
        matches!(self, Method::Table | Method::Trace | Method::ProfileEnd)
    }

    /// Error-severity methods, targeted by the `*_ERRORS` clear flags
    pub fn is_error_severity(&self) -> bool {
        matches!(self, Method::Error | Method::Warn)
    }
}

/// Per-entry metadata bag.
///
/// Open string-keyed map with typed accessors for the well-known keys. Wire
/// sinks serialize the whole bag; the core only interprets the typed subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(flatten)]
    entries: BTreeMap<String, JsonValue>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.entries.iter()
    }

    pub fn channel(&self) -> Option<&str> {
        self.entries.get("channel").and_then(|v| v.as_str())
    }

    pub fn set_channel(&mut self, name: &str) {
        self.set("channel", name);
    }

    pub fn file(&self) -> Option<&str> {
        self.entries.get("file").and_then(|v| v.as_str())
    }

    pub fn line(&self) -> Option<u64> {
        self.entries.get("line").and_then(|v| v.as_u64())
    }

    pub fn set_source(&mut self, file: &str, line: u64) {
        self.set("file", file);
        self.set("line", line);
    }

    pub fn icon(&self) -> Option<&str> {
        self.entries.get("icon").and_then(|v| v.as_str())
    }

    /// Alert severity ("error", "warn", ...)
    pub fn level(&self) -> Option<&str> {
        self.entries.get("level").and_then(|v| v.as_str())
    }

    /// Broker-sink payload disposition: "raw" needs crating, anything else
    /// is pre-rendered
    pub fn format(&self) -> Option<&str> {
        self.entries.get("format").and_then(|v| v.as_str())
    }

    /// Original method name when the call site used one outside the
    /// vocabulary (preserved for wire sinks)
    pub fn method_raw(&self) -> Option<&str> {
        self.entries.get("methodRaw").and_then(|v| v.as_str())
    }
}

/// A single captured console call.
///
/// Immutable once stored, except for meta normalization performed before
/// first dispatch (channel stamping, source location).
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub method: Method,
    pub args: Vec<Value>,
    pub meta: Meta,
}

impl LogEntry {
    pub fn new(method: Method, args: Vec<Value>) -> Self {
        Self {
            method,
            args,
            meta: Meta::new(),
        }
    }

    pub fn with_meta(method: Method, args: Vec<Value>, meta: Meta) -> Self {
        Self { method, args, meta }
    }

    /// Build from a raw method name, folding unknown names to `log` and
    /// recording the original under `methodRaw`.
    pub fn from_name(name: &str, args: Vec<Value>) -> Self {
        let method = Method::from_name(name);
        let mut entry = Self::new(method, args);
        if method == Method::Log && name != "log" {
            entry.meta.set("methodRaw", name);
        }
        entry
    }

    /// Channel this entry was captured on; entries are stamped during
    /// capture, so a missing channel means "root".
    pub fn channel_name(&self) -> Option<&str> {
        self.meta.channel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_method_folds_to_log() {
        let entry = LogEntry::from_name("fancyCustomThing", vec![Value::Int(1)]);
        assert_eq!(entry.method, Method::Log);
        assert_eq!(entry.meta.method_raw(), Some("fancyCustomThing"));
    }

    #[test]
    fn known_method_has_no_raw_name() {
        let entry = LogEntry::from_name("warn", vec![]);
        assert_eq!(entry.method, Method::Warn);
        assert_eq!(entry.meta.method_raw(), None);
    }

    #[test]
    fn method_wire_names_round_trip() {
        for name in ["log", "groupCollapsed", "table", "endOutput", "timeLog"] {
            let method = Method::from_name(name);
            assert_eq!(method.as_str(), name);
        }
    }

    #[test]
    fn meta_serializes_flat() {
        let mut meta = Meta::new();
        meta.set_channel("general.db");
        meta.set("line", 42u64);

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["channel"], "general.db");
        assert_eq!(json["line"], 42);
    }
}
