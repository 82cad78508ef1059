use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value as JsonValue, json};

use debugcon_core::{OutputState, RenderCtx, Sink};
use debugcon_types::{LogEntry, Method, Result};

/// Response header the payload travels in
pub const HEADER_NAME: &str = "X-ChromeLogger-Data";

/// Servers commonly refuse headers past this size; rather than emit a
/// header that kills the response, the whole payload is replaced by a
/// single warning row.
const MAX_HEADER_BYTES: usize = 250_000;

const VERSION: &str = "1.0";

/// Header sink speaking the ChromeLogger wire format: one JSON document,
/// base64-encoded, in a single response header.
///
/// Rows are `[args, backtrace, type]`. The whole payload is bracketed in a
/// synthetic collapsed group labeled with the root channel; summary entries
/// get their own nested bracket so they stay visually separate from the log.
pub struct ChromeLoggerSink {
    channel: Option<String>,
    root_channel: String,
    rows: Vec<JsonValue>,
    in_summary: bool,
    header: Option<(&'static str, String)>,
}

impl Default for ChromeLoggerSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromeLoggerSink {
    pub fn new() -> Self {
        Self {
            channel: None,
            root_channel: String::new(),
            rows: Vec::new(),
            in_summary: false,
            header: None,
        }
    }

    pub fn scoped(mut self, channel: &str) -> Self {
        self.channel = Some(channel.to_string());
        self
    }

    /// `(name, value)` pair for the response; available after `finish`
    pub fn header(&self) -> Option<(&'static str, &str)> {
        self.header
            .as_ref()
            .map(|(name, value)| (*name, value.as_str()))
    }

    fn row_type(method: Method) -> &'static str {
        match method {
            Method::Info => "info",
            Method::Warn => "warn",
            Method::Error | Method::Alert | Method::Assert => "error",
            Method::Group => "group",
            Method::GroupCollapsed => "groupCollapsed",
            Method::GroupEnd => "groupEnd",
            method if method.is_tabular() => "table",
            _ => "",
        }
    }

    fn backtrace(entry: &LogEntry) -> JsonValue {
        match (entry.meta.file(), entry.meta.line()) {
            (Some(file), Some(line)) => json!(format!("{}: {}", file, line)),
            (Some(file), None) => json!(file),
            _ => JsonValue::Null,
        }
    }

    fn push_row(&mut self, args: Vec<JsonValue>, backtrace: JsonValue, kind: &str) {
        self.rows.push(json!([args, backtrace, kind]));
    }
}

impl Sink for ChromeLoggerSink {
    fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    fn begin(&mut self, state: &OutputState, _ctx: &RenderCtx<'_>) -> Result<()> {
        self.root_channel = state.root_channel.clone();
        self.push_row(
            vec![json!(state.root_channel)],
            JsonValue::Null,
            "groupCollapsed",
        );
        Ok(())
    }

    fn render_entry(&mut self, entry: &LogEntry, ctx: &RenderCtx<'_>) -> Result<()> {
        let is_summary = entry.meta.contains("summary");
        if is_summary && !self.in_summary {
            self.push_row(vec![json!("Summary")], JsonValue::Null, "groupCollapsed");
            self.in_summary = true;
        } else if !is_summary && self.in_summary {
            self.push_row(Vec::new(), JsonValue::Null, "groupEnd");
            self.in_summary = false;
        }

        let mut args: Vec<JsonValue> = Vec::new();
        match entry.channel_name() {
            Some(name) if name != self.root_channel => args.push(json!(name)),
            _ => {}
        }
        for abs in ctx.abstracter.abstract_args(&entry.args) {
            args.push(abs.to_json());
        }

        self.push_row(args, Self::backtrace(entry), Self::row_type(entry.method));
        Ok(())
    }

    fn finish(&mut self, _ctx: &RenderCtx<'_>) -> Result<()> {
        if self.in_summary {
            self.push_row(Vec::new(), JsonValue::Null, "groupEnd");
            self.in_summary = false;
        }
        // Close the payload-level bracket opened in begin
        self.push_row(Vec::new(), JsonValue::Null, "groupEnd");

        let encoded = encode(&self.rows);
        let value = if encoded.len() > MAX_HEADER_BYTES {
            encode(&[json!([
                ["output exceeds the header size limit and was dropped"],
                JsonValue::Null,
                "warn"
            ])])
        } else {
            encoded
        };
        self.header = Some((HEADER_NAME, value));
        Ok(())
    }
}

fn encode(rows: &[JsonValue]) -> String {
    let document = json!({
        "version": VERSION,
        "columns": ["log", "backtrace", "type"],
        "rows": rows,
    });
    BASE64.encode(document.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(value: &str) -> JsonValue {
        let bytes = BASE64.decode(value).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn row_types_cover_group_methods() {
        assert_eq!(ChromeLoggerSink::row_type(Method::Log), "");
        assert_eq!(ChromeLoggerSink::row_type(Method::GroupCollapsed), "groupCollapsed");
        assert_eq!(ChromeLoggerSink::row_type(Method::Trace), "table");
        assert_eq!(ChromeLoggerSink::row_type(Method::Alert), "error");
    }

    #[test]
    fn encode_produces_versioned_document() {
        let doc = decode(&encode(&[json!([["hi"], JsonValue::Null, ""])]));
        assert_eq!(doc["version"], "1.0");
        assert_eq!(doc["columns"], json!(["log", "backtrace", "type"]));
        assert_eq!(doc["rows"][0][0][0], "hi");
    }

    #[test]
    fn oversize_payload_collapses_to_warning() {
        let mut sink = ChromeLoggerSink::new();
        let big = "x".repeat(MAX_HEADER_BYTES);
        sink.push_row(vec![json!(big)], JsonValue::Null, "");

        let ctx_abstracter = debugcon_abstract::Abstracter::default();
        let render_ctx = RenderCtx {
            abstracter: &ctx_abstracter,
            root_channel: "general",
        };
        sink.finish(&render_ctx).unwrap();

        let (name, value) = sink.header().unwrap();
        assert_eq!(name, HEADER_NAME);
        assert!(value.len() < MAX_HEADER_BYTES);
        let doc = decode(value);
        assert_eq!(doc["rows"][0][2], "warn");
    }
}
