use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use debugcon_abstract::{AbstractOptions, Abstracter};

use crate::bus::EventBus;
use crate::channel::{Channel, ChannelConfig, ChannelData, ChannelInfo};

/// Context-wide configuration
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Name of the root channel (the unique channel with no parent)
    pub root_channel: String,
    /// Mirror warn/error captures into the capturing channel's alerts
    pub error_to_alert: bool,
    pub abstracter: AbstractOptions,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            root_channel: "general".to_string(),
            error_to_alert: false,
            abstracter: AbstractOptions::default(),
        }
    }
}

/// One open group frame. `collecting` records whether the channel was
/// accepting entries when the frame opened.
#[derive(Debug, Clone)]
pub(crate) struct GroupFrame {
    pub(crate) channel: String,
    pub(crate) collecting: bool,
}

pub(crate) struct ContextShared {
    pub(crate) options: ContextOptions,
    pub(crate) channels: RefCell<HashMap<String, Rc<ChannelData>>>,
    pub(crate) bus: EventBus,
    pub(crate) abstracter: Abstracter,
    /// Currently-open summary priorities; top of stack is active
    pub(crate) priority_stack: RefCell<Vec<i32>>,
    /// Group stacks keyed by summary priority; `None` is the main timeline
    pub(crate) group_stacks: RefCell<HashMap<Option<i32>, Vec<GroupFrame>>>,
    pub(crate) counters: RefCell<HashMap<(String, String), u64>>,
    pub(crate) timers: RefCell<HashMap<(String, String), Instant>>,
    /// Global capture sequence; stamps entry meta so merged render walks
    /// stay chronological across channels
    pub(crate) seq: Cell<u64>,
}

impl ContextShared {
    pub(crate) fn next_seq(&self) -> u64 {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        seq
    }

    pub(crate) fn active_priority(&self) -> Option<i32> {
        self.priority_stack.borrow().last().copied()
    }
}

/// The shared console context.
///
/// Replaces the original design's implicit global root instance: every
/// channel and sink is constructed through (and holds) this context, and
/// channel lookup goes through its registry. Cloning is cheap and aliases
/// the same console.
#[derive(Clone)]
pub struct DebugContext {
    pub(crate) shared: Rc<ContextShared>,
}

impl Default for DebugContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugContext {
    pub fn new() -> Self {
        Self::with_options(ContextOptions::default())
    }

    pub fn with_options(options: ContextOptions) -> Self {
        let abstracter = Abstracter::new(options.abstracter.clone());
        let ctx = Self {
            shared: Rc::new(ContextShared {
                options,
                channels: RefCell::new(HashMap::new()),
                bus: EventBus::new(),
                abstracter,
                priority_stack: RefCell::new(Vec::new()),
                group_stacks: RefCell::new(HashMap::new()),
                counters: RefCell::new(HashMap::new()),
                timers: RefCell::new(HashMap::new()),
                seq: Cell::new(0),
            }),
        };
        // Root exists from the start; everything else is lazy
        ctx.channel(&ctx.shared.options.root_channel.clone());
        ctx
    }

    pub fn root_channel_name(&self) -> String {
        self.shared.options.root_channel.clone()
    }

    pub fn root(&self) -> Channel {
        self.channel(&self.root_channel_name())
    }

    /// Lookup-or-create by name. Idempotent: the same name always returns a
    /// handle to the same channel.
    ///
    /// Names are normalized under the root: `"db"` becomes `"general.db"`
    /// unless it already names the root or a dotted path below it. Missing
    /// intermediate ancestors are created so the tree is always complete.
    pub fn channel(&self, name: &str) -> Channel {
        self.channel_with(name, ChannelConfig::default())
    }

    pub fn channel_with(&self, name: &str, config: ChannelConfig) -> Channel {
        let full = self.normalize_name(name);

        // Ancestors first, so config inheritance has a complete chain
        let mut prefix = String::new();
        for part in full.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(part);
            if prefix != full {
                self.ensure_channel(&prefix, ChannelConfig::default());
            }
        }
        let data = self.ensure_channel(&full, config);
        Channel {
            shared: Rc::clone(&self.shared),
            data,
        }
    }

    fn ensure_channel(&self, full_name: &str, config: ChannelConfig) -> Rc<ChannelData> {
        let mut channels = self.shared.channels.borrow_mut();
        if let Some(existing) = channels.get(full_name) {
            if !config.is_empty() {
                existing.config.borrow_mut().merge_missing(&config);
            }
            return Rc::clone(existing);
        }
        let data = Rc::new(ChannelData::new(full_name.to_string(), config));
        channels.insert(full_name.to_string(), Rc::clone(&data));
        data
    }

    fn normalize_name(&self, name: &str) -> String {
        let root = &self.shared.options.root_channel;
        if name == root || name.starts_with(&format!("{}.", root)) {
            name.to_string()
        } else {
            format!("{}.{}", root, name)
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }

    pub fn abstracter(&self) -> &Abstracter {
        &self.shared.abstracter
    }

    /// Depth of the currently active group stack (main timeline, or the
    /// active summary's own stack while one is open)
    pub fn group_depth(&self) -> usize {
        let active = self.shared.active_priority();
        self.shared
            .group_stacks
            .borrow()
            .get(&active)
            .map_or(0, Vec::len)
    }

    /// Snapshot of the channel tree for sinks that publish it (sorted by
    /// sort order, then name)
    pub fn channel_tree(&self) -> Vec<ChannelInfo> {
        let channels = self.shared.channels.borrow();
        let mut infos: Vec<ChannelInfo> = channels
            .values()
            .map(|data| {
                let effective = self.effective_config(&data.name);
                ChannelInfo {
                    name: data.name.clone(),
                    icon: effective.icon,
                    show_in_tree: effective.show_in_tree.unwrap_or(true),
                    sort_order: effective.sort_order.unwrap_or(0),
                }
            })
            .collect();
        infos.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.name.cmp(&b.name)));
        infos
    }

    /// Channel config with unset knobs inherited from the nearest
    /// configured ancestor
    pub fn effective_config(&self, name: &str) -> ChannelConfig {
        let channels = self.shared.channels.borrow();
        let mut effective = channels
            .get(name)
            .map(|data| data.config.borrow().clone())
            .unwrap_or_default();

        let mut rest = name;
        while let Some(idx) = rest.rfind('.') {
            rest = &rest[..idx];
            if let Some(ancestor) = channels.get(rest) {
                effective.merge_missing(&ancestor.config.borrow());
            }
        }
        effective
    }

    pub(crate) fn channel_data(&self) -> Vec<Rc<ChannelData>> {
        let channels = self.shared.channels.borrow();
        let mut data: Vec<Rc<ChannelData>> = channels.values().map(Rc::clone).collect();
        data.sort_by(|a, b| a.name.cmp(&b.name));
        data
    }
}
