use serde_json::{Value as JsonValue, json};

use debugcon_core::{OutputState, RenderCtx, Sink};
use debugcon_types::{LogEntry, Method, Result};

use crate::chunk::{BudgetStatus, DEFAULT_CHUNK_SIZE, MessageBudget, chunk_payload};
use crate::table;

const PROTOCOL_URI: &str = "http://meta.wildfirehq.org/Protocol/JsonStream/0.2";
const PLUGIN_URI: &str =
    "http://meta.firephp.org/Wildfire/Plugin/FirePHP/Library-FirePHPCore/0.3";
const STRUCTURE_URI: &str =
    "http://meta.firephp.org/Wildfire/Structure/FirePHP/FirebugConsole/0.1";

/// Header-name index may not exceed five digits, so the message count is
/// capped just below it.
const MESSAGE_CAP: u64 = 99_999;

/// Wildfire-protocol header sink: every entry becomes one or more
/// `X-Wf-1-1-1-<n>` headers carrying a JSON `[meta, body]` pair, chunked at
/// the historical frame size with `\` continuation markers.
pub struct FirephpSink {
    channel: Option<String>,
    root_channel: String,
    headers: Vec<(String, String)>,
    index: u64,
    budget: MessageBudget,
}

impl Default for FirephpSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FirephpSink {
    pub fn new() -> Self {
        Self {
            channel: None,
            root_channel: String::new(),
            headers: Vec::new(),
            index: 0,
            budget: MessageBudget::new(MESSAGE_CAP),
        }
    }

    pub fn scoped(mut self, channel: &str) -> Self {
        self.channel = Some(channel.to_string());
        self
    }

    /// All response headers produced so far, setup headers included
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn message_type(method: Method) -> &'static str {
        match method {
            Method::Info => "INFO",
            Method::Warn => "WARN",
            Method::Error | Method::Alert | Method::Assert => "ERROR",
            Method::Group | Method::GroupCollapsed => "GROUP_START",
            Method::GroupEnd => "GROUP_END",
            Method::Trace => "TRACE",
            method if method.is_tabular() => "TABLE",
            _ => "LOG",
        }
    }

    /// Emit one protocol message, chunking the encoded JSON across headers
    /// when it exceeds the frame size
    fn push_message(&mut self, payload: &str) {
        match self.budget.consume() {
            BudgetStatus::Ok => {}
            BudgetStatus::JustExhausted => {
                let warning = json!([
                    {"Type": "WARN"},
                    "message limit reached; further output dropped"
                ])
                .to_string();
                self.push_frames(&warning);
                return;
            }
            BudgetStatus::Exhausted => return,
        }
        self.push_frames(payload);
    }

    fn push_frames(&mut self, payload: &str) {
        let chunks = chunk_payload(payload, DEFAULT_CHUNK_SIZE);
        let total = payload.len();
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            self.index += 1;
            let name = format!("X-Wf-1-1-1-{}", self.index);
            let value = match (i, last) {
                (0, 0) => format!("{}|{}|", total, chunk),
                (0, _) => format!("{}|{}|\\", total, chunk),
                (i, last) if i == last => format!("|{}|", chunk),
                _ => format!("|{}|\\", chunk),
            };
            self.headers.push((name, value));
        }
    }

    fn meta_object(&self, entry: &LogEntry, label: Option<&str>) -> JsonValue {
        let mut meta = serde_json::Map::new();
        meta.insert(
            "Type".to_string(),
            json!(Self::message_type(entry.method)),
        );
        if let Some(file) = entry.meta.file() {
            meta.insert("File".to_string(), json!(file));
        }
        if let Some(line) = entry.meta.line() {
            meta.insert("Line".to_string(), json!(line));
        }
        if let Some(label) = label {
            meta.insert("Label".to_string(), json!(label));
        }
        if entry.method == Method::GroupCollapsed {
            meta.insert("Collapsed".to_string(), json!("true"));
        }
        JsonValue::Object(meta)
    }

    fn entry_label(&self, entry: &LogEntry) -> Option<String> {
        match entry.channel_name() {
            Some(name) if name != self.root_channel => Some(name.to_string()),
            _ => None,
        }
    }
}

impl Sink for FirephpSink {
    fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    fn begin(&mut self, state: &OutputState, _ctx: &RenderCtx<'_>) -> Result<()> {
        self.root_channel = state.root_channel.clone();
        self.headers
            .push(("X-Wf-Protocol-1".to_string(), PROTOCOL_URI.to_string()));
        self.headers
            .push(("X-Wf-1-Plugin-1".to_string(), PLUGIN_URI.to_string()));
        self.headers
            .push(("X-Wf-1-Structure-1".to_string(), STRUCTURE_URI.to_string()));
        Ok(())
    }

    fn render_entry(&mut self, entry: &LogEntry, ctx: &RenderCtx<'_>) -> Result<()> {
        let args = ctx.abstracter.abstract_args(&entry.args);

        let (label, body): (Option<String>, JsonValue) = if entry.method.is_tabular() {
            // Tables travel as an array of arrays, header row first
            match args.first().and_then(table::build) {
                Some(layout) => {
                    let mut grid: Vec<JsonValue> = Vec::with_capacity(layout.rows.len() + 1);
                    let mut header: Vec<JsonValue> = vec![json!("")];
                    header.extend(layout.columns.iter().map(|c| json!(c)));
                    grid.push(json!(header));
                    for row in &layout.rows {
                        let mut cells: Vec<JsonValue> = vec![json!(row.key)];
                        cells.extend(row.cells.iter().map(|cell| cell.to_json()));
                        grid.push(json!(cells));
                    }
                    let caption = entry
                        .meta
                        .get("caption")
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                        .or_else(|| self.entry_label(entry));
                    (caption, json!(grid))
                }
                None => (
                    self.entry_label(entry),
                    args_body(&args),
                ),
            }
        } else if entry.method == Method::GroupEnd {
            (None, JsonValue::Null)
        } else {
            (self.entry_label(entry), args_body(&args))
        };

        let payload = json!([self.meta_object(entry, label.as_deref()), body]).to_string();
        self.push_message(&payload);
        Ok(())
    }

    fn finish(&mut self, _ctx: &RenderCtx<'_>) -> Result<()> {
        self.headers
            .push(("X-Wf-1-Index".to_string(), self.index.to_string()));
        Ok(())
    }
}

fn args_body(args: &[debugcon_abstract::Abstraction]) -> JsonValue {
    match args {
        [] => JsonValue::Null,
        [one] => one.to_json(),
        many => json!(many.iter().map(|a| a.to_json()).collect::<Vec<_>>()),
    }
}
