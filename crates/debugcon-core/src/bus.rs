use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use debugcon_types::{LogEntry, Value};

/// Published when an entry is captured, before it is stored
pub const EVENT_LOG_ENTRY: &str = "log.entry";
/// Published per entry at render time, before the sink sees it
pub const EVENT_OUTPUT_ENTRY: &str = "output.entry";
pub const EVENT_OUTPUT_BEGIN: &str = "output.begin";
pub const EVENT_OUTPUT_END: &str = "output.end";

/// Result of one publish.
///
/// A subscriber that sets `handled` short-circuits the publish: no further
/// subscriber runs and the dispatcher uses `result` in place of its default
/// handling. At capture time a handled outcome suppresses storage; at
/// render time it suppresses the sink call.
#[derive(Debug, Default)]
pub struct Outcome {
    pub handled: bool,
    pub result: Option<Value>,
}

impl Outcome {
    pub fn handle(&mut self) {
        self.handled = true;
    }

    pub fn handle_with(&mut self, result: Value) {
        self.handled = true;
        self.result = Some(result);
    }
}

type SubscriberFn = dyn FnMut(&mut LogEntry, &mut Outcome);

struct Registration {
    id: u64,
    /// Channel the subscriber is bound to; `None` subscribes globally
    channel: Option<String>,
    priority: i32,
    callback: Rc<RefCell<SubscriberFn>>,
}

/// Ordered synchronous publish/subscribe with ancestor bubbling.
///
/// Dispatch order for a publish on channel `a.b.c`: subscribers bound to
/// `a.b.c`, then `a.b`, then `a` (child to root), then unbound subscribers.
/// Within each scope, descending priority, ties in registration order.
#[derive(Default)]
pub struct EventBus {
    subscribers: RefCell<HashMap<&'static str, Vec<Registration>>>,
    next_id: RefCell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(
        &self,
        event: &'static str,
        channel: Option<&str>,
        priority: i32,
        callback: F,
    ) -> u64
    where
        F: FnMut(&mut LogEntry, &mut Outcome) + 'static,
    {
        let mut next = self.next_id.borrow_mut();
        let id = *next;
        *next += 1;

        self.subscribers
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(Registration {
                id,
                channel: channel.map(str::to_string),
                priority,
                callback: Rc::new(RefCell::new(callback)),
            });
        id
    }

    pub fn unsubscribe(&self, event: &'static str, id: u64) {
        if let Some(regs) = self.subscribers.borrow_mut().get_mut(event) {
            regs.retain(|reg| reg.id != id);
        }
    }

    /// Run all matching subscribers to completion on the calling stack.
    ///
    /// The subscriber list is snapshotted before any callback runs, so a
    /// callback may subscribe, unsubscribe, or publish again without
    /// corrupting this dispatch. A subscriber re-entering itself is skipped
    /// for the nested publish.
    pub fn publish(&self, event: &'static str, entry: &mut LogEntry, channel: &str) -> Outcome {
        let mut outcome = Outcome::default();

        let batches = self.matching(event, channel);
        for callback in batches {
            if outcome.handled {
                break;
            }
            if let Ok(mut cb) = callback.try_borrow_mut() {
                cb(entry, &mut outcome);
            }
        }
        outcome
    }

    fn matching(&self, event: &'static str, channel: &str) -> Vec<Rc<RefCell<SubscriberFn>>> {
        let subscribers = self.subscribers.borrow();
        let Some(regs) = subscribers.get(event) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for scope in ancestor_chain(channel) {
            collect_scope(regs, Some(scope), &mut out);
        }
        collect_scope(regs, None, &mut out);
        out
    }
}

/// `"a.b.c"` → `["a.b.c", "a.b", "a"]`
fn ancestor_chain(channel: &str) -> Vec<&str> {
    let mut chain = vec![channel];
    let mut rest = channel;
    while let Some(idx) = rest.rfind('.') {
        rest = &rest[..idx];
        chain.push(rest);
    }
    chain
}

fn collect_scope(
    regs: &[Registration],
    scope: Option<&str>,
    out: &mut Vec<Rc<RefCell<SubscriberFn>>>,
) {
    let mut matched: Vec<&Registration> = regs
        .iter()
        .filter(|reg| reg.channel.as_deref() == scope)
        .collect();
    // Stable sort keeps registration order within equal priorities
    matched.sort_by_key(|reg| std::cmp::Reverse(reg.priority));
    out.extend(matched.into_iter().map(|reg| Rc::clone(&reg.callback)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use debugcon_types::Method;

    fn entry() -> LogEntry {
        LogEntry::new(Method::Log, vec![Value::Str("hello".into())])
    }

    #[test]
    fn priority_then_registration_order() {
        let bus = EventBus::new();
        let calls = Rc::new(RefCell::new(Vec::new()));

        for (label, priority) in [("low", -1), ("first", 5), ("second", 5), ("top", 10)] {
            let calls = Rc::clone(&calls);
            bus.subscribe(EVENT_LOG_ENTRY, None, priority, move |_, _| {
                calls.borrow_mut().push(label);
            });
        }

        bus.publish(EVENT_LOG_ENTRY, &mut entry(), "general");
        assert_eq!(*calls.borrow(), vec!["top", "first", "second", "low"]);
    }

    #[test]
    fn bubbles_child_to_root_then_global() {
        let bus = EventBus::new();
        let calls = Rc::new(RefCell::new(Vec::new()));

        for scope in [
            Some("general"),
            Some("general.foo"),
            None,
            Some("general.foo.bar"),
        ] {
            let calls = Rc::clone(&calls);
            bus.subscribe(EVENT_LOG_ENTRY, scope, 0, move |_, _| {
                calls.borrow_mut().push(scope.unwrap_or("<global>"));
            });
        }

        bus.publish(EVENT_LOG_ENTRY, &mut entry(), "general.foo.bar");
        assert_eq!(
            *calls.borrow(),
            vec!["general.foo.bar", "general.foo", "general", "<global>"]
        );
    }

    #[test]
    fn handled_outcome_short_circuits_ancestors() {
        let bus = EventBus::new();
        let parent_ran = Rc::new(RefCell::new(false));

        bus.subscribe(EVENT_LOG_ENTRY, Some("general.foo"), 0, |_, outcome| {
            outcome.handle_with(Value::Str("rewritten".into()));
        });
        {
            let parent_ran = Rc::clone(&parent_ran);
            bus.subscribe(EVENT_LOG_ENTRY, Some("general"), 0, move |_, _| {
                *parent_ran.borrow_mut() = true;
            });
        }

        let outcome = bus.publish(EVENT_LOG_ENTRY, &mut entry(), "general.foo");
        assert!(outcome.handled);
        assert_eq!(outcome.result.as_ref().and_then(Value::as_str), Some("rewritten"));
        assert!(!*parent_ran.borrow());
    }

    #[test]
    fn subscriber_may_mutate_entry() {
        let bus = EventBus::new();
        bus.subscribe(EVENT_OUTPUT_ENTRY, None, 0, |entry, _| {
            entry.meta.set("redacted", true);
        });

        let mut e = entry();
        bus.publish(EVENT_OUTPUT_ENTRY, &mut e, "general");
        assert_eq!(e.meta.get("redacted"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn unsubscribe_removes_callback() {
        let bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let id = {
            let count = Rc::clone(&count);
            bus.subscribe(EVENT_LOG_ENTRY, None, 0, move |_, _| {
                *count.borrow_mut() += 1;
            })
        };

        bus.publish(EVENT_LOG_ENTRY, &mut entry(), "general");
        bus.unsubscribe(EVENT_LOG_ENTRY, id);
        bus.publish(EVENT_LOG_ENTRY, &mut entry(), "general");
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn reentrant_publish_does_not_deadlock() {
        let bus = Rc::new(EventBus::new());
        let inner_calls = Rc::new(RefCell::new(0));

        {
            let inner_calls = Rc::clone(&inner_calls);
            bus.subscribe(EVENT_OUTPUT_ENTRY, None, 0, move |_, _| {
                *inner_calls.borrow_mut() += 1;
            });
        }
        {
            let bus2 = Rc::clone(&bus);
            bus.subscribe(EVENT_LOG_ENTRY, None, 0, move |_, _| {
                bus2.publish(EVENT_OUTPUT_ENTRY, &mut entry(), "general");
            });
        }

        bus.publish(EVENT_LOG_ENTRY, &mut entry(), "general");
        assert_eq!(*inner_calls.borrow(), 1);
    }
}
