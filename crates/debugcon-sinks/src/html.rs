use debugcon_abstract::{AbsKind, Abstraction};
use debugcon_core::{OutputState, RenderCtx, Sink};
use debugcon_types::{LogEntry, Method, Result};

use crate::render::visibility_name;
use crate::substitution;
use crate::table;

/// Inline-markup sink: emits one self-contained fragment whose container
/// element carries the machine-readable channel tree, followed by the
/// summary list and the main log list.
pub struct HtmlSink {
    channel: Option<String>,
    root_channel: String,
    channels_json: String,
    alerts: String,
    summary: String,
    log: String,
    summary_depth: usize,
    log_depth: usize,
    output: Option<String>,
}

impl Default for HtmlSink {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlSink {
    pub fn new() -> Self {
        Self {
            channel: None,
            root_channel: String::new(),
            channels_json: String::from("[]"),
            alerts: String::new(),
            summary: String::new(),
            log: String::new(),
            summary_depth: 0,
            log_depth: 0,
            output: None,
        }
    }

    pub fn scoped(mut self, channel: &str) -> Self {
        self.channel = Some(channel.to_string());
        self
    }

    /// The rendered fragment; available after `finish`
    pub fn html(&self) -> Option<&str> {
        self.output.as_deref()
    }

    fn is_summary_entry(entry: &LogEntry) -> bool {
        entry.meta.contains("summary")
    }

    fn channel_attr(&self, entry: &LogEntry) -> String {
        match entry.channel_name() {
            Some(name) if name != self.root_channel => {
                format!(" data-channel=\"{}\"", escape(name))
            }
            _ => String::new(),
        }
    }

    fn entry_body(&self, entry: &LogEntry, ctx: &RenderCtx<'_>) -> String {
        let args = ctx.abstracter.abstract_args(&entry.args);
        if substitution::applies(&args) {
            let template = match &args[0].kind {
                AbsKind::Str(value) => value.clone(),
                _ => String::new(),
            };
            let result = substitution::substitute(&template, &args[1..]);
            let mut body = format!("<span class=\"t_string\">{}</span>", escape(&result.text));
            for arg in &args[1 + result.consumed..] {
                body.push_str(", ");
                body.push_str(&render_value(arg));
            }
            return body;
        }
        args.iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_list_entry(&mut self, entry: &LogEntry, ctx: &RenderCtx<'_>) {
        let to_summary = Self::is_summary_entry(entry);
        let channel_attr = self.channel_attr(entry);

        let fragment = match entry.method {
            Method::GroupEnd => {
                let depth = if to_summary {
                    &mut self.summary_depth
                } else {
                    &mut self.log_depth
                };
                if *depth > 0 {
                    *depth -= 1;
                    "</ul></li>\n".to_string()
                } else {
                    String::new()
                }
            }
            Method::Group | Method::GroupCollapsed => {
                let collapsed = if entry.method == Method::GroupCollapsed {
                    " collapsed"
                } else {
                    ""
                };
                let body = self.entry_body(entry, ctx);
                if to_summary {
                    self.summary_depth += 1;
                } else {
                    self.log_depth += 1;
                }
                format!(
                    "<li class=\"m_group{}\"{}><span class=\"group-label\">{}</span><ul class=\"group-body\">\n",
                    collapsed, channel_attr, body
                )
            }
            method if method.is_tabular() => {
                let args = ctx.abstracter.abstract_args(&entry.args);
                let table_html = args
                    .first()
                    .and_then(table::build)
                    .map(|layout| render_table(&layout, entry))
                    .unwrap_or_else(|| self.entry_body(entry, ctx));
                format!(
                    "<li class=\"m_{}\"{}>{}</li>\n",
                    method.as_str(),
                    channel_attr,
                    table_html
                )
            }
            method => {
                let body = self.entry_body(entry, ctx);
                format!(
                    "<li class=\"m_{}\"{}>{}</li>\n",
                    method.as_str(),
                    channel_attr,
                    body
                )
            }
        };

        if to_summary {
            self.summary.push_str(&fragment);
        } else {
            self.log.push_str(&fragment);
        }
    }
}

impl Sink for HtmlSink {
    fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    fn begin(&mut self, state: &OutputState, _ctx: &RenderCtx<'_>) -> Result<()> {
        self.root_channel = state.root_channel.clone();
        self.channels_json =
            serde_json::to_string(&state.channels).unwrap_or_else(|_| "[]".to_string());
        Ok(())
    }

    fn render_entry(&mut self, entry: &LogEntry, ctx: &RenderCtx<'_>) -> Result<()> {
        if entry.method == Method::Alert {
            let level = entry.meta.level().unwrap_or("error");
            let body = self.entry_body(entry, ctx);
            self.alerts.push_str(&format!(
                "<div class=\"alert level-{}\"{}>{}</div>\n",
                escape(level),
                self.channel_attr(entry),
                body
            ));
            return Ok(());
        }
        self.render_list_entry(entry, ctx);
        Ok(())
    }

    fn finish(&mut self, _ctx: &RenderCtx<'_>) -> Result<()> {
        // Close any groups left open at the end of the stream
        while self.summary_depth > 0 {
            self.summary.push_str("</ul></li>\n");
            self.summary_depth -= 1;
        }
        while self.log_depth > 0 {
            self.log.push_str("</ul></li>\n");
            self.log_depth -= 1;
        }

        self.output = Some(format!(
            "<div class=\"debug\" data-channel-root=\"{}\" data-channels='{}'>\n{}<ul class=\"debug-summary\">\n{}</ul>\n<ul class=\"debug-log\">\n{}</ul>\n</div>\n",
            escape(&self.root_channel),
            escape_attr_json(&self.channels_json),
            self.alerts,
            self.summary,
            self.log
        ));
        Ok(())
    }
}

fn render_value(abs: &Abstraction) -> String {
    if abs.is_recursion {
        return "<span class=\"t_recursion\">*RECURSION*</span>".to_string();
    }
    if abs.is_excluded {
        let label = match &abs.kind {
            AbsKind::Object(obj) => format!("*EXCLUDED* {}", obj.class_name),
            _ => "*EXCLUDED*".to_string(),
        };
        return format!("<span class=\"t_excluded\">{}</span>", escape(&label));
    }
    let extra_class = abs
        .type_more
        .as_deref()
        .map(|more| format!(" t_{}", more))
        .unwrap_or_default();
    match &abs.kind {
        AbsKind::Array(items) => {
            let mut out = format!(
                "<span class=\"t_array{}\">array({})<ul class=\"array-inner\">",
                extra_class,
                items.len()
            );
            for item in items {
                out.push_str("<li>");
                out.push_str(&render_value(item));
                out.push_str("</li>");
            }
            out.push_str("</ul></span>");
            out
        }
        AbsKind::Map(entries) => {
            let mut out = format!(
                "<span class=\"t_array{}\">array({})<ul class=\"array-inner\">",
                extra_class,
                entries.len()
            );
            for (key, item) in entries {
                out.push_str(&format!(
                    "<li><span class=\"t_key\">{}</span> =&gt; {}</li>",
                    escape(&key.to_string()),
                    render_value(item)
                ));
            }
            out.push_str("</ul></span>");
            out
        }
        AbsKind::Object(obj) => {
            let mut out = format!(
                "<span class=\"t_object{}\"><span class=\"classname\">{}</span><ul class=\"object-inner\">",
                extra_class,
                escape(&obj.class_name)
            );
            for prop in &obj.properties {
                out.push_str(&format!(
                    "<li class=\"property {}\"><span class=\"property-name\">{}</span> = {}</li>",
                    visibility_name(prop.visibility),
                    escape(&prop.name),
                    render_value(&prop.value)
                ));
            }
            for method in &obj.methods {
                out.push_str(&format!(
                    "<li class=\"method {}\">{}()</li>",
                    visibility_name(method.visibility),
                    escape(&method.name)
                ));
            }
            out.push_str("</ul></span>");
            out
        }
        _ => format!(
            "<span class=\"t_{}{}\">{}</span>",
            abs.type_name(),
            extra_class,
            escape(&crate::render::inline(abs))
        ),
    }
}

fn render_table(layout: &table::TableLayout, entry: &LogEntry) -> String {
    let mut out = String::from("<table class=\"table-log\">");
    if let Some(caption) = entry.meta.get("caption").and_then(|v| v.as_str()) {
        out.push_str(&format!("<caption>{}</caption>", escape(caption)));
    }
    out.push_str("<thead><tr><th></th>");
    for column in &layout.columns {
        out.push_str(&format!("<th>{}</th>", escape(column)));
    }
    out.push_str("</tr></thead><tbody>");
    for row in &layout.rows {
        out.push_str(&format!("<tr><th>{}</th>", escape(&row.key)));
        for cell in &row.cells {
            out.push_str(&format!("<td>{}</td>", render_value(cell)));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// The channel tree rides in a single-quoted attribute; only the quote
/// itself needs escaping beyond normal text
fn escape_attr_json(json: &str) -> String {
    json.replace('\'', "&#39;")
}
