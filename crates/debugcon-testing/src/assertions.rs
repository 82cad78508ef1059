//! Custom assertions for rendered-output validation.
//!
//! Provides high-level assertions that make tests more readable:
//! - Method-sequence validation
//! - Channel stamping checks
//! - Group balance verification

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;

use debugcon_types::{LogEntry, Method};

/// Assert that the rendered entries carry exactly this method sequence.
pub fn assert_method_sequence(entries: &[LogEntry], expected: &[&str]) -> Result<()> {
    let actual: Vec<&str> = entries.iter().map(|e| e.method.as_str()).collect();
    if actual != expected {
        anyhow::bail!("Expected methods {:?}, got {:?}", expected, actual);
    }
    Ok(())
}

/// Assert that every entry is stamped with a channel at or below `prefix`.
pub fn assert_channels_under(entries: &[LogEntry], prefix: &str) -> Result<()> {
    for (i, entry) in entries.iter().enumerate() {
        let channel = entry
            .channel_name()
            .with_context(|| format!("Entry {} missing channel stamp", i))?;
        let under = channel == prefix || channel.starts_with(&format!("{}.", prefix));
        if !under {
            anyhow::bail!(
                "Entry {} on channel {} but expected under {}",
                i,
                channel,
                prefix
            );
        }
    }
    Ok(())
}

/// Assert that group openers and closers balance out across the stream.
pub fn assert_groups_balanced(entries: &[LogEntry]) -> Result<()> {
    let mut depth: i64 = 0;
    for (i, entry) in entries.iter().enumerate() {
        if entry.method.opens_group() {
            depth += 1;
        } else if entry.method == Method::GroupEnd {
            depth -= 1;
        }
        if depth < 0 {
            anyhow::bail!("Entry {} closes a group that was never opened", i);
        }
    }
    if depth != 0 {
        anyhow::bail!("{} group(s) left open at end of stream", depth);
    }
    Ok(())
}

/// Assert that a meta key holds the expected JSON value.
pub fn assert_meta(entry: &LogEntry, key: &str, expected: &JsonValue) -> Result<()> {
    let actual = entry
        .meta
        .get(key)
        .with_context(|| format!("Entry missing meta key {:?}", key))?;
    if actual != expected {
        anyhow::bail!("Meta {:?}: expected {}, got {}", key, expected, actual);
    }
    Ok(())
}
