use std::collections::BTreeMap;

use debugcon_abstract::Abstracter;
use debugcon_types::{LogEntry, Method, Result};

use crate::bus::{EVENT_OUTPUT_BEGIN, EVENT_OUTPUT_END, EVENT_OUTPUT_ENTRY};
use crate::channel::ChannelInfo;
use crate::context::DebugContext;

/// Snapshot of console-wide state handed to a sink at the start of a render
#[derive(Debug, Clone)]
pub struct OutputState {
    pub root_channel: String,
    pub channels: Vec<ChannelInfo>,
}

/// Per-render services shared by every sink
pub struct RenderCtx<'a> {
    pub abstracter: &'a Abstracter,
    pub root_channel: &'a str,
}

/// The render contract every output adapter implements.
///
/// A sink must never error on a malformed or excluded abstraction; it
/// renders the best available placeholder and keeps going. `Err` is
/// reserved for transport failures (closed stream, header refused).
pub trait Sink {
    /// Channel this sink is scoped to; `None` renders everything
    fn channel(&self) -> Option<&str> {
        None
    }

    fn begin(&mut self, _state: &OutputState, _ctx: &RenderCtx<'_>) -> Result<()> {
        Ok(())
    }

    fn render_entry(&mut self, entry: &LogEntry, ctx: &RenderCtx<'_>) -> Result<()>;

    fn finish(&mut self, _ctx: &RenderCtx<'_>) -> Result<()> {
        Ok(())
    }
}

/// Dotted-prefix visibility test: a sink scoped to `general.db` renders
/// entries from `general.db` and below, nothing else; a root-scoped sink
/// renders everything.
pub fn channel_visible(sink_channel: Option<&str>, root: &str, entry_channel: &str) -> bool {
    match sink_channel {
        None => true,
        Some(scope) if scope == root => true,
        Some(scope) => {
            entry_channel == scope || entry_channel.starts_with(&format!("{}.", scope))
        }
    }
}

/// Walks stored entries through the bus and into a sink.
///
/// Render order is fixed: alerts (storage order), then summaries merged by
/// descending priority (each internally chronological), then the main log.
/// Containers are snapshotted before iteration, so re-entrant captures or
/// clears triggered by a subscriber or sink land in the next render.
pub struct Dispatcher;

impl Dispatcher {
    pub fn output(ctx: &DebugContext, sink: &mut dyn Sink) -> Result<()> {
        let root = ctx.root_channel_name();
        let state = OutputState {
            root_channel: root.clone(),
            channels: ctx.channel_tree(),
        };
        let render_ctx = RenderCtx {
            abstracter: ctx.abstracter(),
            root_channel: &root,
        };

        let (alerts, summaries, log) = Self::snapshot(ctx);

        Self::publish_marker(ctx, EVENT_OUTPUT_BEGIN, &root);
        sink.begin(&state, &render_ctx)?;

        for entry in alerts {
            Self::dispatch_entry(ctx, sink, &render_ctx, entry, &root)?;
        }
        // BTreeMap iterates ascending; summaries merge highest-priority first
        for (_, buffer) in summaries.into_iter().rev() {
            for entry in buffer {
                Self::dispatch_entry(ctx, sink, &render_ctx, entry, &root)?;
            }
        }
        for entry in log {
            Self::dispatch_entry(ctx, sink, &render_ctx, entry, &root)?;
        }

        sink.finish(&render_ctx)?;
        Self::publish_marker(ctx, EVENT_OUTPUT_END, &root);
        Ok(())
    }

    /// Clone every container out of its cell, ordered by global capture
    /// sequence so multi-channel streams interleave chronologically
    fn snapshot(
        ctx: &DebugContext,
    ) -> (Vec<LogEntry>, BTreeMap<i32, Vec<LogEntry>>, Vec<LogEntry>) {
        let mut alerts = Vec::new();
        let mut summaries: BTreeMap<i32, Vec<LogEntry>> = BTreeMap::new();
        let mut log = Vec::new();

        for data in ctx.channel_data() {
            alerts.extend(data.alerts.borrow().iter().cloned());
            log.extend(data.log.borrow().iter().cloned());
            for (priority, buffer) in data.summaries.borrow().iter() {
                summaries
                    .entry(*priority)
                    .or_default()
                    .extend(buffer.iter().cloned());
            }
        }

        alerts.sort_by_key(entry_seq);
        log.sort_by_key(entry_seq);
        for buffer in summaries.values_mut() {
            buffer.sort_by_key(entry_seq);
        }
        (alerts, summaries, log)
    }

    fn dispatch_entry(
        ctx: &DebugContext,
        sink: &mut dyn Sink,
        render_ctx: &RenderCtx<'_>,
        mut entry: LogEntry,
        root: &str,
    ) -> Result<()> {
        let channel = entry.channel_name().unwrap_or(root).to_string();
        if !channel_visible(sink.channel(), root, &channel) {
            return Ok(());
        }

        let outcome = ctx
            .bus()
            .publish(EVENT_OUTPUT_ENTRY, &mut entry, &channel);
        if outcome.handled {
            // A handled publish replaces the default render: with a result
            // the rewritten payload is rendered in the entry's place,
            // without one the entry is dropped.
            if let Some(result) = outcome.result {
                let replacement = LogEntry::with_meta(entry.method, vec![result], entry.meta);
                sink.render_entry(&replacement, render_ctx)?;
            }
            return Ok(());
        }
        sink.render_entry(&entry, render_ctx)
    }

    fn publish_marker(ctx: &DebugContext, event: &'static str, root: &str) {
        let mut marker = LogEntry::new(Method::Log, Vec::new());
        ctx.bus().publish(event, &mut marker, root);
    }
}

fn entry_seq(entry: &LogEntry) -> u64 {
    entry.meta.get("seq").and_then(|v| v.as_u64()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use debugcon_types::{ClearFlags, Value};

    /// Test sink that records `method:first-arg` per rendered entry
    #[derive(Default)]
    struct RecordingSink {
        channel: Option<String>,
        rendered: Vec<String>,
    }

    impl RecordingSink {
        fn scoped(channel: &str) -> Self {
            Self {
                channel: Some(channel.to_string()),
                rendered: Vec::new(),
            }
        }
    }

    impl Sink for RecordingSink {
        fn channel(&self) -> Option<&str> {
            self.channel.as_deref()
        }

        fn render_entry(&mut self, entry: &LogEntry, _ctx: &RenderCtx<'_>) -> Result<()> {
            let first = entry
                .args
                .first()
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            self.rendered.push(format!("{}:{}", entry.method.as_str(), first));
            Ok(())
        }
    }

    #[test]
    fn renders_alerts_then_summaries_then_log() {
        let ctx = DebugContext::new();
        let ch = ctx.root();

        ch.log(vec![Value::Str("main 1".into())]);
        ch.group_summary(0);
        ch.log(vec![Value::Str("sum p0".into())]);
        ch.group_end();
        ch.group_summary(1);
        ch.log(vec![Value::Str("sum p1".into())]);
        ch.group_end();
        ch.alert("boom", "error");
        ch.log(vec![Value::Str("main 2".into())]);

        let mut sink = RecordingSink::default();
        Dispatcher::output(&ctx, &mut sink).unwrap();

        assert_eq!(
            sink.rendered,
            vec![
                "alert:boom",
                "log:sum p1",
                "log:sum p0",
                "log:main 1",
                "log:main 2",
            ]
        );
    }

    #[test]
    fn summary_priority_order_ignores_capture_order() {
        let ctx = DebugContext::new();
        let ch = ctx.root();

        // Priority 0 built before priority 1; render still puts 1 first
        ch.group_summary(0);
        ch.log(vec![Value::Str("zero".into())]);
        ch.group_end();
        ch.group_summary(1);
        ch.log(vec![Value::Str("one".into())]);
        ch.group_end();

        let mut sink = RecordingSink::default();
        Dispatcher::output(&ctx, &mut sink).unwrap();
        assert_eq!(sink.rendered, vec!["log:one", "log:zero"]);
    }

    #[test]
    fn scoped_sink_filters_by_dotted_prefix() {
        let ctx = DebugContext::new();
        ctx.channel("general.db").log(vec![Value::Str("db".into())]);
        ctx.channel("general.db.slow")
            .log(vec![Value::Str("slow".into())]);
        ctx.channel("general.http")
            .log(vec![Value::Str("http".into())]);
        ctx.root().log(vec![Value::Str("root".into())]);

        let mut scoped = RecordingSink::scoped("general.db");
        Dispatcher::output(&ctx, &mut scoped).unwrap();
        assert_eq!(scoped.rendered, vec!["log:db", "log:slow"]);

        let mut root_sink = RecordingSink::scoped("general");
        Dispatcher::output(&ctx, &mut root_sink).unwrap();
        assert_eq!(root_sink.rendered.len(), 4);
    }

    #[test]
    fn output_subscriber_can_drop_or_rewrite() {
        let ctx = DebugContext::new();
        let ch = ctx.root();
        ch.log(vec![Value::Str("visible".into())]);
        ch.log(vec![Value::Str("secret".into())]);
        ch.log(vec![Value::Str("rewrite me".into())]);

        ctx.bus()
            .subscribe(EVENT_OUTPUT_ENTRY, None, 0, |entry, outcome| {
                match entry.args.first().and_then(Value::as_str) {
                    Some("secret") => outcome.handle(),
                    Some("rewrite me") => {
                        outcome.handle_with(Value::Str("rewritten".into()))
                    }
                    _ => {}
                }
            });

        let mut sink = RecordingSink::default();
        Dispatcher::output(&ctx, &mut sink).unwrap();
        assert_eq!(sink.rendered, vec!["log:visible", "log:rewritten"]);
    }

    #[test]
    fn reentrant_capture_during_render_is_deferred() {
        let ctx = DebugContext::new();
        ctx.root().log(vec![Value::Str("first".into())]);

        {
            let ctx2 = ctx.clone();
            ctx.bus()
                .subscribe(EVENT_OUTPUT_ENTRY, None, 0, move |_, _| {
                    // Logging while a render walks the same container must
                    // not corrupt the walk
                    ctx2.root().log(vec![Value::Str("echo".into())]);
                });
        }

        let mut sink = RecordingSink::default();
        Dispatcher::output(&ctx, &mut sink).unwrap();
        assert_eq!(sink.rendered, vec!["log:first"]);

        // The deferred entry shows up on the next render (plus its own echo)
        let mut sink2 = RecordingSink::default();
        Dispatcher::output(&ctx, &mut sink2).unwrap();
        assert_eq!(sink2.rendered[0], "log:first");
        assert!(sink2.rendered.contains(&"log:echo".to_string()));
    }

    #[test]
    fn clear_during_render_does_not_break_iteration() {
        let ctx = DebugContext::new();
        ctx.root().log(vec![Value::Str("a".into())]);
        ctx.root().log(vec![Value::Str("b".into())]);

        {
            let ctx2 = ctx.clone();
            ctx.bus()
                .subscribe(EVENT_OUTPUT_ENTRY, None, 0, move |_, _| {
                    ctx2.root().clear(ClearFlags::LOG | ClearFlags::SILENT);
                });
        }

        let mut sink = RecordingSink::default();
        Dispatcher::output(&ctx, &mut sink).unwrap();
        assert_eq!(sink.rendered, vec!["log:a", "log:b"]);
        assert_eq!(ctx.root().log_len(), 0);
    }
}
