use owo_colors::OwoColorize;
use std::io::Write;

use debugcon_abstract::Abstraction;
use debugcon_core::{RenderCtx, Sink};
use debugcon_types::{Error, LogEntry, Method, Result};

use crate::render::{expanded, inline};
use crate::substitution;
use crate::table;

/// When ANSI escapes are emitted. `Auto` turns color on only when the
/// destination is a real terminal-backed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorPolicy {
    On,
    Off,
    #[default]
    Auto,
}

impl ColorPolicy {
    fn resolve(self, is_tty: bool) -> bool {
        match self {
            ColorPolicy::On => true,
            ColorPolicy::Off => false,
            ColorPolicy::Auto => is_tty,
        }
    }
}

/// Line-oriented sink: one line per entry, indentation = 4 spaces per open
/// group, fixed glyph prefix per method.
///
/// The sink owns its writer exclusively: it is flushed on finish, on target
/// change, and on drop, never left half-written.
pub struct TextSink<W: Write> {
    writer: W,
    color: bool,
    depth: usize,
    channel: Option<String>,
}

impl TextSink<std::io::Stdout> {
    pub fn stdout(policy: ColorPolicy) -> Self {
        use is_terminal::IsTerminal;
        let stdout = std::io::stdout();
        let color = policy.resolve(stdout.is_terminal());
        Self::new(stdout, color)
    }
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W, enable_color: bool) -> Self {
        Self {
            writer,
            color: enable_color,
            depth: 0,
            channel: None,
        }
    }

    /// Restrict rendering to one channel subtree
    pub fn scoped(mut self, channel: &str) -> Self {
        self.channel = Some(channel.to_string());
        self
    }

    /// Swap the destination, flushing the old one first
    pub fn set_target(&mut self, writer: W) -> Result<()> {
        self.writer.flush()?;
        self.writer = writer;
        Ok(())
    }

    fn indent(&self) -> String {
        "    ".repeat(self.depth)
    }

    fn write_line(&mut self, prefix: &str, body: &str, method: Method) -> Result<()> {
        let line = format!("{}{}{}", self.indent(), prefix, body);
        let styled = if self.color {
            match method {
                Method::Error | Method::Alert => format!("{}", line.red()),
                Method::Warn => format!("{}", line.yellow()),
                Method::Info => format!("{}", line.cyan()),
                Method::Group | Method::GroupCollapsed => format!("{}", line.bold()),
                Method::Clear => format!("{}", line.dimmed()),
                _ => line,
            }
        } else {
            line
        };
        writeln!(self.writer, "{}", styled).map_err(Error::Io)
    }

    fn entry_text(&self, entry: &LogEntry, ctx: &RenderCtx<'_>) -> String {
        let args = ctx.abstracter.abstract_args(&entry.args);
        if substitution::applies(&args) {
            let template = match &args[0].kind {
                debugcon_abstract::AbsKind::Str(value) => value.clone(),
                _ => String::new(),
            };
            let result = substitution::substitute(&template, &args[1..]);
            let mut text = result.text;
            // Unconsumed args are appended, same as the browser console
            for arg in &args[1 + result.consumed..] {
                text.push_str(", ");
                text.push_str(&inline(arg));
            }
            return text;
        }
        if args.len() == 1 && matches!(
            args[0].kind,
            debugcon_abstract::AbsKind::Array(_)
                | debugcon_abstract::AbsKind::Map(_)
                | debugcon_abstract::AbsKind::Object(_)
        ) {
            return expanded(&args[0], 0);
        }
        args.iter().map(inline).collect::<Vec<_>>().join(", ")
    }

    fn render_table(&mut self, entry: &LogEntry, ctx: &RenderCtx<'_>) -> Result<()> {
        let args = ctx.abstracter.abstract_args(&entry.args);
        let Some(layout) = args.first().and_then(table::build) else {
            let text = self.entry_text(entry, ctx);
            return self.write_line(glyph(entry.method), &text, entry.method);
        };

        if let Some(caption) = entry.meta.get("caption").and_then(|v| v.as_str()) {
            self.write_line("", caption, entry.method)?;
        }

        // Fixed-width grid: row-key column first, then the layout columns
        let cells: Vec<Vec<String>> = layout
            .rows
            .iter()
            .map(|row| {
                let mut line = vec![row.key.clone()];
                line.extend(row.cells.iter().map(inline));
                line
            })
            .collect();
        let mut headers = vec![String::new()];
        headers.extend(layout.columns.iter().cloned());

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let header_line = format_row(&headers, &widths);
        self.write_line("", &header_line, Method::Log)?;
        let rule: usize = widths.iter().sum::<usize>() + 3 * (widths.len() - 1);
        self.write_line("", &"-".repeat(rule), Method::Log)?;
        for row in &cells {
            let line = format_row(row, &widths);
            self.write_line("", &line, Method::Log)?;
        }
        Ok(())
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

fn glyph(method: Method) -> &'static str {
    match method {
        Method::Error => "⦻ ",
        Method::Warn => "⚠ ",
        Method::Info => "ℹ ",
        Method::Assert => "≈ ",
        Method::Group | Method::GroupCollapsed => "▸ ",
        Method::Clear => "⌦ ",
        Method::Count | Method::CountReset => "✚ ",
        Method::Time | Method::TimeEnd | Method::TimeLog => "⏱ ",
        _ => "",
    }
}

impl<W: Write> Sink for TextSink<W> {
    fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    fn render_entry(&mut self, entry: &LogEntry, ctx: &RenderCtx<'_>) -> Result<()> {
        match entry.method {
            Method::GroupEnd => {
                self.depth = self.depth.saturating_sub(1);
                Ok(())
            }
            Method::Group | Method::GroupCollapsed => {
                let text = self.entry_text(entry, ctx);
                self.write_line(glyph(entry.method), &text, entry.method)?;
                self.depth += 1;
                Ok(())
            }
            Method::Alert => {
                let level = entry.meta.level().unwrap_or("error");
                let text = self.entry_text(entry, ctx);
                let body = format!("[Alert {}] {}", level, text);
                self.write_line("", &body, Method::Alert)
            }
            method if method.is_tabular() => self.render_table(entry, ctx),
            method => {
                let text = self.entry_text(entry, ctx);
                self.write_line(glyph(method), &text, method)
            }
        }
    }

    fn finish(&mut self, _ctx: &RenderCtx<'_>) -> Result<()> {
        self.writer.flush().map_err(Error::Io)
    }
}

impl<W: Write> Drop for TextSink<W> {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_policy_follows_terminal() {
        assert!(ColorPolicy::On.resolve(false));
        assert!(!ColorPolicy::Off.resolve(true));
        assert!(ColorPolicy::Auto.resolve(true));
        assert!(!ColorPolicy::Auto.resolve(false));
    }

    #[test]
    fn format_row_pads_and_trims() {
        let line = format_row(
            &["a".to_string(), "bb".to_string()],
            &[3, 4],
        );
        assert_eq!(line, "a   | bb");
    }
}
