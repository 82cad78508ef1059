//! ConsoleWorld pattern for declarative integration test setup.
//!
//! Provides a fluent interface for:
//! - Building a console with a known channel tree
//! - Seeding entries across channels and summary buffers
//! - Rendering into a collecting sink and inspecting the result
//!
//! # Example
//! ```no_run
//! use debugcon_testing::ConsoleWorld;
//!
//! let world = ConsoleWorld::new()
//!     .logged("general.db", "query ran")
//!     .logged("general", "done");
//!
//! let rendered = world.render().unwrap();
//! assert_eq!(rendered.len(), 2);
//! ```

use anyhow::Result;

use debugcon_core::{ContextOptions, DebugContext, Dispatcher, RenderCtx, Sink};
use debugcon_types::{LogEntry, Value};

/// Sink that keeps every dispatched entry for inspection.
#[derive(Default)]
pub struct CollectingSink {
    channel: Option<String>,
    pub entries: Vec<LogEntry>,
}

impl CollectingSink {
    pub fn scoped(channel: &str) -> Self {
        Self {
            channel: Some(channel.to_string()),
            entries: Vec::new(),
        }
    }
}

impl Sink for CollectingSink {
    fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    fn render_entry(
        &mut self,
        entry: &LogEntry,
        _ctx: &RenderCtx<'_>,
    ) -> debugcon_types::Result<()> {
        self.entries.push(entry.clone());
        Ok(())
    }
}

/// Declarative console builder for integration tests.
pub struct ConsoleWorld {
    ctx: DebugContext,
}

impl Default for ConsoleWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleWorld {
    pub fn new() -> Self {
        Self {
            ctx: DebugContext::new(),
        }
    }

    pub fn with_options(options: ContextOptions) -> Self {
        Self {
            ctx: DebugContext::with_options(options),
        }
    }

    /// The console under test; use it directly for anything the fluent
    /// helpers do not cover.
    pub fn ctx(&self) -> &DebugContext {
        &self.ctx
    }

    /// Pre-create a channel (and its ancestors) without logging anything.
    pub fn with_channel(self, name: &str) -> Self {
        self.ctx.channel(name);
        self
    }

    pub fn logged(self, channel: &str, text: &str) -> Self {
        self.ctx.channel(channel).log(vec![Value::Str(text.into())]);
        self
    }

    pub fn errored(self, channel: &str, text: &str) -> Self {
        self.ctx
            .channel(channel)
            .error(vec![Value::Str(text.into())]);
        self
    }

    pub fn alerted(self, message: &str, level: &str) -> Self {
        self.ctx.root().alert(message, level);
        self
    }

    /// Open a group, run `body` inside it, close it.
    pub fn grouped(self, channel: &str, label: &str, body: impl FnOnce(&DebugContext)) -> Self {
        let ch = self.ctx.channel(channel);
        ch.group(label);
        body(&self.ctx);
        ch.group_end();
        self
    }

    /// Buffer `body`'s output in the summary at `priority`.
    pub fn summarized(self, priority: i32, body: impl FnOnce(&DebugContext)) -> Self {
        let root = self.ctx.root();
        root.group_summary(priority);
        body(&self.ctx);
        root.group_end();
        self
    }

    /// Render everything into a fresh collecting sink.
    pub fn render(&self) -> Result<Vec<LogEntry>> {
        let mut sink = CollectingSink::default();
        Dispatcher::output(&self.ctx, &mut sink)?;
        Ok(sink.entries)
    }

    /// Render through a caller-supplied sink.
    pub fn render_into(&self, sink: &mut dyn Sink) -> Result<()> {
        Dispatcher::output(&self.ctx, sink)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_renders_seeded_entries_in_order() {
        let world = ConsoleWorld::new()
            .logged("general", "first")
            .logged("general.db", "second");

        let rendered = world.render().unwrap();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].args[0].as_str(), Some("first"));
        assert_eq!(rendered[1].channel_name(), Some("general.db"));
    }

    #[test]
    fn grouped_helper_balances_group_end() {
        let world = ConsoleWorld::new().grouped("general", "outer", |ctx| {
            ctx.root().log(vec![Value::Str("inner".into())]);
        });

        assert_eq!(world.ctx().group_depth(), 0);
        let rendered = world.render().unwrap();
        let methods: Vec<&str> = rendered.iter().map(|e| e.method.as_str()).collect();
        assert_eq!(methods, vec!["group", "log", "groupEnd"]);
    }
}
