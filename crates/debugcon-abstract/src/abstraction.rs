use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use debugcon_types::{MapKey, ParamSig, Visibility};

// NOTE: Abstraction Design Goals
//
// 1. Snapshot, not reference: composite children are already-abstracted
//    copies. No sink ever touches the live value, so a value mutated after
//    capture renders as it was at capture time, on every sink.
// 2. Compute once, render many: the same tree feeds the inline-markup,
//    text, and wire sinks. Per-sink re-walks would re-derive cycle handling
//    per format, which is exactly the bug class this type exists to kill.
// 3. Non-throwing: there is no error variant. Whatever cannot be
//    represented degrades to a descriptive string before it gets here.

/// Canonical, recursion-safe snapshot of one captured value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Abstraction {
    #[serde(flatten)]
    pub kind: AbsKind,
    /// Refinement of the type tag ("timestamp", "numeric", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_more: Option<String>,
    /// Human-readable date when the timestamp heuristic fired. An
    /// annotation only: the kind keeps the value's real type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_hint: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_recursion: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_excluded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum AbsKind {
    Null,
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Abstraction>),
    Map(Vec<(MapKey, Abstraction)>),
    Object(ObjectAbs),
    Callable(String),
    Resource(String),
    Recursion,
    /// Escape hatch for subscribers that rewrite entries with their own
    /// pre-rendered payloads
    Custom(String),
}

/// Snapshot of an inspectable object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectAbs {
    pub class_name: String,
    pub properties: Vec<PropertyAbs>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodAbs>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyAbs {
    pub name: String,
    pub value: Abstraction,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_in: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodAbs {
    pub name: String,
    pub params: Vec<ParamSig>,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_hint: Option<String>,
}

impl Abstraction {
    pub fn of(kind: AbsKind) -> Self {
        Self {
            kind,
            type_more: None,
            date_hint: None,
            is_recursion: false,
            is_excluded: false,
        }
    }

    pub fn recursion() -> Self {
        Self {
            kind: AbsKind::Recursion,
            type_more: None,
            date_hint: None,
            is_recursion: true,
            is_excluded: false,
        }
    }

    /// Type-name stub for an object excluded from inspection
    pub fn excluded(class_name: &str) -> Self {
        Self {
            kind: AbsKind::Object(ObjectAbs {
                class_name: class_name.to_string(),
                properties: Vec::new(),
                methods: Vec::new(),
            }),
            type_more: None,
            date_hint: None,
            is_recursion: false,
            is_excluded: true,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::of(AbsKind::Str(value.into()))
    }

    pub fn custom(label: impl Into<String>) -> Self {
        Self::of(AbsKind::Custom(label.into()))
    }

    /// Type tag name, the vocabulary shared by every sink
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            AbsKind::Null => "null",
            AbsKind::Undefined => "undefined",
            AbsKind::Bool(_) => "bool",
            AbsKind::Int(_) => "int",
            AbsKind::Float(_) => "float",
            AbsKind::Str(_) => "string",
            AbsKind::Array(_) | AbsKind::Map(_) => "array",
            AbsKind::Object(_) => "object",
            AbsKind::Callable(_) => "callable",
            AbsKind::Resource(_) => "resource",
            AbsKind::Recursion => "recursion",
            AbsKind::Custom(_) => "custom",
        }
    }

    /// Plain-JSON projection used by the wire sinks.
    ///
    /// Scalars become JSON scalars, maps become objects, objects become an
    /// object with a `___class_name` marker. Recursion and exclusion render
    /// as their placeholder strings; non-finite floats become strings since
    /// JSON cannot carry them.
    pub fn to_json(&self) -> JsonValue {
        if self.is_recursion {
            return json!("*RECURSION*");
        }
        if self.is_excluded {
            if let AbsKind::Object(obj) = &self.kind {
                return json!(format!("*EXCLUDED* {}", obj.class_name));
            }
            return json!("*EXCLUDED*");
        }
        match &self.kind {
            AbsKind::Null => JsonValue::Null,
            AbsKind::Undefined => json!("undefined"),
            AbsKind::Bool(b) => json!(b),
            AbsKind::Int(i) => json!(i),
            AbsKind::Float(f) => {
                if f.is_nan() {
                    json!("NaN")
                } else if f.is_infinite() {
                    json!(if *f > 0.0 { "INF" } else { "-INF" })
                } else {
                    json!(f)
                }
            }
            AbsKind::Str(value) => json!(value),
            AbsKind::Array(items) => {
                JsonValue::Array(items.iter().map(Abstraction::to_json).collect())
            }
            AbsKind::Map(entries) => {
                let map: serde_json::Map<String, JsonValue> = entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect();
                JsonValue::Object(map)
            }
            AbsKind::Object(obj) => {
                let mut map = serde_json::Map::new();
                map.insert("___class_name".to_string(), json!(obj.class_name));
                for prop in &obj.properties {
                    map.insert(prop.name.clone(), prop.value.to_json());
                }
                JsonValue::Object(map)
            }
            AbsKind::Callable(name) => json!(format!("callable: {}", name)),
            AbsKind::Resource(desc) => json!(format!("Resource: {}", desc)),
            AbsKind::Recursion => json!("*RECURSION*"),
            AbsKind::Custom(label) => json!(label),
        }
    }

    /// Integer keys of a map abstraction are non-monotonic when any key is
    /// smaller than one before it; wire encodings that sort keys need an
    /// explicit order array to reconstruct this.
    pub fn map_keys_non_monotonic(&self) -> bool {
        if let AbsKind::Map(entries) = &self.kind {
            let mut last: Option<i64> = None;
            for (key, _) in entries {
                if let MapKey::Int(i) = key {
                    if let Some(prev) = last
                        && *i < prev
                    {
                        return true;
                    }
                    last = Some(*i);
                }
            }
        }
        false
    }
}
