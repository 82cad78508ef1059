use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Instant;

use debugcon_types::{ClearFlags, LogEntry, Meta, Method, Value};

use crate::bus::EVENT_LOG_ENTRY;
use crate::context::{ContextShared, GroupFrame};

/// Per-channel presentation knobs. Unset fields inherit from the nearest
/// configured ancestor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelConfig {
    pub icon: Option<String>,
    pub show_in_tree: Option<bool>,
    pub sort_order: Option<i32>,
}

impl ChannelConfig {
    pub fn is_empty(&self) -> bool {
        *self == ChannelConfig::default()
    }

    /// Fill unset fields from `other`, keeping anything already set
    pub fn merge_missing(&mut self, other: &ChannelConfig) {
        if self.icon.is_none() {
            self.icon = other.icon.clone();
        }
        if self.show_in_tree.is_none() {
            self.show_in_tree = other.show_in_tree;
        }
        if self.sort_order.is_none() {
            self.sort_order = other.sort_order;
        }
    }
}

/// Resolved channel description published to sinks (the HTML sink encodes
/// the whole tree into a data attribute)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChannelInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub show_in_tree: bool,
    pub sort_order: i32,
}

pub(crate) struct ChannelData {
    pub(crate) name: String,
    pub(crate) config: RefCell<ChannelConfig>,
    /// Channels can be muted; group bookkeeping still runs so depth stays
    /// balanced, but entries are dropped
    pub(crate) enabled: Cell<bool>,
    pub(crate) alerts: RefCell<Vec<LogEntry>>,
    pub(crate) log: RefCell<Vec<LogEntry>>,
    pub(crate) summaries: RefCell<BTreeMap<i32, Vec<LogEntry>>>,
}

impl ChannelData {
    pub(crate) fn new(name: String, config: ChannelConfig) -> Self {
        Self {
            name,
            config: RefCell::new(config),
            enabled: Cell::new(true),
            alerts: RefCell::new(Vec::new()),
            log: RefCell::new(Vec::new()),
            summaries: RefCell::new(BTreeMap::new()),
        }
    }

    fn is_descendant_or_self(&self, ancestor: &str) -> bool {
        self.name == ancestor || self.name.starts_with(&format!("{}.", ancestor))
    }
}

/// Handle to one named channel of a `DebugContext`. Cheap to clone; all
/// clones alias the same containers.
#[derive(Clone)]
pub struct Channel {
    pub(crate) shared: Rc<ContextShared>,
    pub(crate) data: Rc<ChannelData>,
}

impl Channel {
    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.data.enabled.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.data.enabled.get()
    }

    // ── capture vocabulary ──────────────────────────────────────────

    pub fn log(&self, args: Vec<Value>) {
        self.capture(LogEntry::new(Method::Log, args));
    }

    pub fn info(&self, args: Vec<Value>) {
        self.capture(LogEntry::new(Method::Info, args));
    }

    pub fn warn(&self, args: Vec<Value>) {
        self.capture(LogEntry::new(Method::Warn, args));
    }

    pub fn error(&self, args: Vec<Value>) {
        self.capture(LogEntry::new(Method::Error, args));
    }

    /// No-op when the assertion holds; logs an `assert` entry otherwise
    pub fn assert(&self, condition: bool, args: Vec<Value>) {
        if condition {
            return;
        }
        let args = if args.is_empty() {
            vec![Value::Str("Assertion failed".to_string())]
        } else {
            args
        };
        self.capture(LogEntry::new(Method::Assert, args));
    }

    /// Banner-level notice, stored in the alerts container and rendered
    /// before everything else
    pub fn alert(&self, message: &str, level: &str) {
        let mut entry = LogEntry::new(Method::Alert, vec![Value::Str(message.to_string())]);
        entry.meta.set("level", level);
        self.capture(entry);
    }

    pub fn table(&self, caption: Option<&str>, data: Value) {
        let mut entry = LogEntry::new(Method::Table, vec![data]);
        if let Some(caption) = caption {
            entry.meta.set("caption", caption);
        }
        self.capture(entry);
    }

    /// Backtrace display; `frames` is rendered through the tabular layout
    pub fn trace(&self, frames: Value) {
        self.capture(LogEntry::new(Method::Trace, vec![frames]));
    }

    /// Generic entry path for callers outside the convenience vocabulary
    /// (raw method names fold per `Method::from_name`)
    pub fn log_entry(&self, entry: LogEntry) {
        self.capture(entry);
    }

    // ── groups & summaries ──────────────────────────────────────────

    pub fn group(&self, label: &str) {
        self.open_group(Method::Group, label);
    }

    pub fn group_collapsed(&self, label: &str) {
        self.open_group(Method::GroupCollapsed, label);
    }

    fn open_group(&self, method: Method, label: &str) {
        let active = self.shared.active_priority();
        self.shared
            .group_stacks
            .borrow_mut()
            .entry(active)
            .or_default()
            .push(GroupFrame {
                channel: self.data.name.clone(),
                collecting: self.data.enabled.get(),
            });
        self.capture(LogEntry::new(
            method,
            vec![Value::Str(label.to_string())],
        ));
    }

    /// Close the innermost open group. Popping past depth zero is a no-op;
    /// when no group is open inside an active summary, closes the summary
    /// instead.
    pub fn group_end(&self) {
        let active = self.shared.active_priority();
        let popped = {
            let mut stacks = self.shared.group_stacks.borrow_mut();
            stacks.get_mut(&active).and_then(Vec::pop)
        };

        if popped.is_some() {
            self.capture(LogEntry::new(Method::GroupEnd, Vec::new()));
        } else if active.is_some() {
            self.shared.priority_stack.borrow_mut().pop();
        }
    }

    /// Open (or switch to) the summary buffer of the given priority.
    /// Re-entrant: the active priority is never pushed twice in a row.
    /// Entries captured while a summary is open go to its buffer instead of
    /// the main log; buffers merge at render time by descending priority.
    pub fn group_summary(&self, priority: i32) {
        let mut stack = self.shared.priority_stack.borrow_mut();
        if stack.last() == Some(&priority) {
            return;
        }
        stack.push(priority);
    }

    // ── counters & timers ───────────────────────────────────────────

    pub fn count(&self, label: &str) -> u64 {
        let key = (self.data.name.clone(), label.to_string());
        let n = {
            let mut counters = self.shared.counters.borrow_mut();
            let slot = counters.entry(key).or_insert(0);
            *slot += 1;
            *slot
        };
        self.capture(LogEntry::new(
            Method::Count,
            vec![Value::Str(format!("{}: {}", label, n))],
        ));
        n
    }

    pub fn count_reset(&self, label: &str) {
        let key = (self.data.name.clone(), label.to_string());
        self.shared.counters.borrow_mut().remove(&key);
        self.capture(LogEntry::new(
            Method::CountReset,
            vec![Value::Str(format!("{}: 0", label))],
        ));
    }

    pub fn time(&self, label: &str) {
        let key = (self.data.name.clone(), label.to_string());
        self.shared.timers.borrow_mut().insert(key, Instant::now());
    }

    /// Log elapsed time and keep the timer running
    pub fn time_log(&self, label: &str) {
        if let Some(elapsed) = self.elapsed_ms(label) {
            self.capture(LogEntry::new(
                Method::TimeLog,
                vec![Value::Str(format!("{}: {:.3} ms", label, elapsed))],
            ));
        }
    }

    /// Log elapsed time and drop the timer
    pub fn time_end(&self, label: &str) {
        let key = (self.data.name.clone(), label.to_string());
        let started = self.shared.timers.borrow_mut().remove(&key);
        if let Some(started) = started {
            let elapsed = started.elapsed().as_secs_f64() * 1000.0;
            self.capture(LogEntry::new(
                Method::TimeEnd,
                vec![Value::Str(format!("{}: {:.3} ms", label, elapsed))],
            ));
        }
    }

    fn elapsed_ms(&self, label: &str) -> Option<f64> {
        let key = (self.data.name.clone(), label.to_string());
        self.shared
            .timers
            .borrow()
            .get(&key)
            .map(|started| started.elapsed().as_secs_f64() * 1000.0)
    }

    // ── clear ───────────────────────────────────────────────────────

    /// Empty the flagged containers on this channel and its descendants.
    /// Never touches ancestors or unrelated siblings. Emits a `clear`
    /// entry documenting the operation unless `SILENT` is set.
    pub fn clear(&self, flags: ClearFlags) {
        let targets: Vec<Rc<ChannelData>> = {
            let channels = self.shared.channels.borrow();
            channels
                .values()
                .filter(|data| data.is_descendant_or_self(&self.data.name))
                .map(Rc::clone)
                .collect()
        };

        for data in &targets {
            if flags.contains(ClearFlags::ALERTS) {
                data.alerts.borrow_mut().clear();
            }
            if flags.contains(ClearFlags::LOG) {
                data.log.borrow_mut().clear();
            } else if flags.contains(ClearFlags::LOG_ERRORS) {
                data.log
                    .borrow_mut()
                    .retain(|entry| !entry.method.is_error_severity());
            }
            if flags.contains(ClearFlags::SUMMARY) {
                data.summaries.borrow_mut().clear();
            } else if flags.contains(ClearFlags::SUMMARY_ERRORS) {
                for buffer in data.summaries.borrow_mut().values_mut() {
                    buffer.retain(|entry| !entry.method.is_error_severity());
                }
            }
        }

        if flags.contains(ClearFlags::SILENT) {
            return;
        }
        let mut meta = Meta::new();
        meta.set(
            "flags",
            serde_json::Value::from(
                flags
                    .names()
                    .into_iter()
                    .map(serde_json::Value::from)
                    .collect::<Vec<_>>(),
            ),
        );
        let message = format!("Cleared {} ({})", flags, self.data.name);
        self.capture(LogEntry::with_meta(
            Method::Clear,
            vec![Value::Str(message)],
            meta,
        ));
    }

    // ── capture pipeline ────────────────────────────────────────────

    /// Normalize meta, publish through the bus, then store. A subscriber
    /// that marks the publish handled suppresses storage entirely.
    fn capture(&self, mut entry: LogEntry) {
        if entry.meta.channel().is_none() {
            entry.meta.set_channel(&self.data.name);
        }
        let channel = entry.meta.channel().unwrap_or(&self.data.name).to_string();

        let outcome = self
            .shared
            .bus
            .publish(EVENT_LOG_ENTRY, &mut entry, &channel);
        if outcome.handled {
            return;
        }
        if !self.data.enabled.get() {
            return;
        }
        self.store(entry);
    }

    fn store(&self, mut entry: LogEntry) {
        entry.meta.set("seq", self.shared.next_seq());

        if self.shared.options.error_to_alert && entry.method.is_error_severity() {
            let mut mirrored = entry.clone();
            mirrored.meta.set("fromError", true);
            self.data.alerts.borrow_mut().push(mirrored);
        }

        match entry.method {
            Method::Alert => self.data.alerts.borrow_mut().push(entry),
            _ => match self.shared.active_priority() {
                Some(priority) => {
                    // Marked so sinks that render summary and log as
                    // separate sections can tell them apart
                    entry.meta.set("summary", priority);
                    self.data
                        .summaries
                        .borrow_mut()
                        .entry(priority)
                        .or_default()
                        .push(entry);
                }
                None => self.data.log.borrow_mut().push(entry),
            },
        }
    }

    // ── introspection (used by the dispatcher and tests) ────────────

    pub fn log_len(&self) -> usize {
        self.data.log.borrow().len()
    }

    pub fn alerts_len(&self) -> usize {
        self.data.alerts.borrow().len()
    }

    pub fn summary_len(&self, priority: i32) -> usize {
        self.data
            .summaries
            .borrow()
            .get(&priority)
            .map_or(0, Vec::len)
    }
}
