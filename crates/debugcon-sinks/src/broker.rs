use serde_json::{Value as JsonValue, json};

use debugcon_core::{OutputState, RenderCtx, Sink};
use debugcon_types::{LogEntry, Method, Result};

/// One published console message: the wire shape is the JSON triple
/// `[method, args, meta]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerMessage {
    pub method: String,
    pub args: Vec<JsonValue>,
    pub meta: JsonValue,
}

impl BrokerMessage {
    pub fn to_json(&self) -> JsonValue {
        json!([self.method, self.args, self.meta])
    }
}

/// Transport half of the pub/sub sink. Implementations own session and
/// topic; the sink only hands them fully-formed messages.
pub trait Broker {
    fn publish(&mut self, message: &BrokerMessage) -> Result<()>;
}

/// Streams entries to a message broker as they are dispatched.
///
/// The stream opens with a `meta` message describing the process and its
/// channel tree, carries one message per entry, and closes with
/// `endOutput`. Entries are published in their raw crated form (the full
/// tagged abstraction, order-preserving maps included) unless the entry
/// already carries a pre-rendered payload.
pub struct BrokerSink<B: Broker> {
    broker: B,
    channel: Option<String>,
    root_channel: String,
}

impl<B: Broker> BrokerSink<B> {
    pub fn new(broker: B) -> Self {
        Self {
            broker,
            channel: None,
            root_channel: String::new(),
        }
    }

    pub fn scoped(mut self, channel: &str) -> Self {
        self.channel = Some(channel.to_string());
        self
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    fn meta_json(entry: &LogEntry) -> JsonValue {
        serde_json::to_value(&entry.meta).unwrap_or_else(|_| json!({}))
    }
}

impl<B: Broker> Sink for BrokerSink<B> {
    fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    fn begin(&mut self, state: &OutputState, _ctx: &RenderCtx<'_>) -> Result<()> {
        self.root_channel = state.root_channel.clone();
        let message = BrokerMessage {
            method: "meta".to_string(),
            args: Vec::new(),
            meta: json!({
                "processId": std::process::id(),
                "rootChannel": state.root_channel,
                "channels": state.channels,
            }),
        };
        self.broker.publish(&message)
    }

    fn render_entry(&mut self, entry: &LogEntry, ctx: &RenderCtx<'_>) -> Result<()> {
        // Unknown call-site names were folded to `log` at capture; the wire
        // carries the original so the client can still show it
        let method = entry
            .meta
            .method_raw()
            .unwrap_or(entry.method.as_str())
            .to_string();

        let mut meta = Self::meta_json(entry);
        let args: Vec<JsonValue> = if entry.meta.format().is_some_and(|f| f != "raw") {
            // Pre-rendered payload (a subscriber already formatted it);
            // project to plain JSON and pass through untouched
            entry
                .args
                .iter()
                .map(|v| ctx.abstracter.abstract_value(v).to_json())
                .collect()
        } else {
            let abstractions = ctx.abstracter.abstract_args(&entry.args);
            if let JsonValue::Object(map) = &mut meta {
                // Clients that decode maps into plain objects lose integer
                // key order; ship it explicitly per argument position
                let key_order = key_order_index(&abstractions);
                if !key_order.is_empty() {
                    map.insert("keyOrder".to_string(), json!(key_order));
                }
                map.insert("format".to_string(), json!("raw"));
            }
            abstractions
                .iter()
                .map(|a| serde_json::to_value(a).unwrap_or_else(|_| a.to_json()))
                .collect()
        };

        let message = BrokerMessage { method, args, meta };
        self.broker.publish(&message)
    }

    fn finish(&mut self, _ctx: &RenderCtx<'_>) -> Result<()> {
        let message = BrokerMessage {
            method: Method::EndOutput.as_str().to_string(),
            args: Vec::new(),
            meta: json!({ "rootChannel": self.root_channel }),
        };
        self.broker.publish(&message)
    }
}

/// Argument position → key array, for arguments whose map keys are out of
/// natural integer order
fn key_order_index(
    args: &[debugcon_abstract::Abstraction],
) -> serde_json::Map<String, JsonValue> {
    use debugcon_abstract::AbsKind;
    let mut index = serde_json::Map::new();
    for (i, abs) in args.iter().enumerate() {
        if !abs.map_keys_non_monotonic() {
            continue;
        }
        if let AbsKind::Map(entries) = &abs.kind {
            let keys: Vec<JsonValue> = entries
                .iter()
                .map(|(key, _)| serde_json::to_value(key).unwrap_or(JsonValue::Null))
                .collect();
            index.insert(i.to_string(), json!(keys));
        }
    }
    index
}
