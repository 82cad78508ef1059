use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use debugcon_types::Value;

use crate::abstraction::{AbsKind, Abstraction, MethodAbs, ObjectAbs, PropertyAbs};

static NUMERIC_STRING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?\d+$").unwrap());

/// "Looks like a timestamp" policy.
///
/// The window heuristic is deliberately a knob: annotating every integer
/// near the current epoch second is useful for real timestamps and noisy
/// for everything else. Default matches the historical 90-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPolicy {
    Off,
    Window { days: i64 },
}

impl Default for TimestampPolicy {
    fn default() -> Self {
        TimestampPolicy::Window { days: 90 }
    }
}

#[derive(Debug, Clone)]
pub struct AbstractOptions {
    /// Collect method signatures from inspectable objects
    pub collect_methods: bool,
    pub timestamp: TimestampPolicy,
    /// Structural depth cap; values below it degrade to a placeholder string
    pub max_depth: Option<usize>,
}

impl Default for AbstractOptions {
    fn default() -> Self {
        Self {
            collect_methods: true,
            timestamp: TimestampPolicy::default(),
            max_depth: None,
        }
    }
}

/// Walks runtime values into canonical `Abstraction` snapshots.
///
/// `abstract_value` is side-effect-free on its input and never fails: the
/// worst a value can do is degrade to a descriptive string.
#[derive(Debug, Clone, Default)]
pub struct Abstracter {
    options: AbstractOptions,
}

impl Abstracter {
    pub fn new(options: AbstractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AbstractOptions {
        &self.options
    }

    pub fn abstract_value(&self, value: &Value) -> Abstraction {
        let mut visited = HashSet::new();
        self.walk(value, &mut visited, 0, Utc::now())
    }

    /// Abstract every argument of a call in one shared walk context.
    ///
    /// Identity is tracked across arguments: the same array passed twice in
    /// one call abstracts once and recurs the second time.
    pub fn abstract_args(&self, args: &[Value]) -> Vec<Abstraction> {
        let mut visited = HashSet::new();
        let now = Utc::now();
        args.iter()
            .map(|arg| self.walk(arg, &mut visited, 0, now))
            .collect()
    }

    fn walk(
        &self,
        value: &Value,
        visited: &mut HashSet<usize>,
        depth: usize,
        now: DateTime<Utc>,
    ) -> Abstraction {
        if let Some(max) = self.options.max_depth
            && depth >= max
        {
            return Abstraction::string(format!("*MAX DEPTH* ({})", value.type_name()));
        }

        // Identity check before any recursion. Visited entries persist for
        // the whole walk, so a value reached twice (cycle or shared branch)
        // abstracts exactly once.
        if let Some(id) = value.identity() {
            if visited.contains(&id) {
                return Abstraction::recursion();
            }
            visited.insert(id);
        }

        match value {
            Value::Null => Abstraction::of(AbsKind::Null),
            Value::Undefined => Abstraction::of(AbsKind::Undefined),
            Value::Bool(b) => Abstraction::of(AbsKind::Bool(*b)),
            Value::Int(i) => {
                let mut abs = Abstraction::of(AbsKind::Int(*i));
                // Timestamp-looking ints keep their int type tag; the
                // refinement and formatted date ride alongside as
                // annotations, and every sink renders both from them.
                if let Some(hint) = self.timestamp_hint(*i, now) {
                    abs.type_more = Some("timestamp".to_string());
                    abs.date_hint = Some(hint);
                }
                abs
            }
            Value::Float(f) => Abstraction::of(AbsKind::Float(*f)),
            Value::Str(s) => {
                let mut abs = Abstraction::string(s.clone());
                if NUMERIC_STRING.is_match(s) {
                    abs.type_more = Some("numeric".to_string());
                    if let Ok(secs) = s.parse::<i64>()
                        && let Some(hint) = self.timestamp_hint(secs, now)
                    {
                        abs.date_hint = Some(hint);
                        abs.type_more = Some("timestamp".to_string());
                    }
                }
                abs
            }
            Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Abstraction::string(text.to_string()),
                // Not valid UTF-8: carried base64-encoded, marked so sinks
                // whose encodings require text can flag the transformation
                Err(_) => {
                    let mut abs = Abstraction::string(BASE64.encode(bytes));
                    abs.type_more = Some("base64".to_string());
                    abs
                }
            },
            Value::Array(items) => {
                let children = items
                    .borrow()
                    .iter()
                    .map(|item| self.walk(item, visited, depth + 1, now))
                    .collect();
                Abstraction::of(AbsKind::Array(children))
            }
            Value::Map(map) => {
                let children = map
                    .borrow()
                    .iter()
                    .map(|(key, item)| (key.clone(), self.walk(item, visited, depth + 1, now)))
                    .collect();
                Abstraction::of(AbsKind::Map(children))
            }
            Value::Object(obj) => {
                if obj.is_excluded() {
                    return Abstraction::excluded(obj.class_name());
                }
                let properties = obj
                    .properties()
                    .into_iter()
                    .map(|prop| PropertyAbs {
                        name: prop.name,
                        value: self.walk(&prop.value, visited, depth + 1, now),
                        visibility: prop.visibility,
                        declared_in: prop.declared_in,
                    })
                    .collect();
                let methods = if self.options.collect_methods {
                    obj.methods()
                        .into_iter()
                        .map(|sig| MethodAbs {
                            name: sig.name,
                            params: sig.params,
                            visibility: sig.visibility,
                            return_hint: sig.return_hint,
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                Abstraction::of(AbsKind::Object(ObjectAbs {
                    class_name: obj.class_name().to_string(),
                    properties,
                    methods,
                }))
            }
            Value::Callable(name) => Abstraction::of(AbsKind::Callable(name.clone())),
            Value::Resource { kind, id } => {
                Abstraction::of(AbsKind::Resource(format!("{} #{}", kind, id)))
            }
        }
    }

    fn timestamp_hint(&self, secs: i64, now: DateTime<Utc>) -> Option<String> {
        let TimestampPolicy::Window { days } = self.options.timestamp else {
            return None;
        };
        let candidate = DateTime::<Utc>::from_timestamp(secs, 0)?;
        let window = Duration::days(days);
        if candidate > now - window && candidate < now + window {
            Some(candidate.format("%Y-%m-%d %H:%M:%S").to_string())
        } else {
            None
        }
    }
}
