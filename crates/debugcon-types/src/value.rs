use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

// NOTE: Value Model Design Goals
//
// 1. Identity: composite values live behind `Rc` so two references to the
//    same array/map/object compare by pointer. Cycle detection in the
//    abstraction engine keys its visited set on that identity.
// 2. Capability over reflection: rich object introspection is opt-in via
//    the `Inspect` trait. Anything that does not implement it reaches the
//    console as an opaque `Resource` or a rendered string.
// 3. Single-threaded by contract: capture and render run on one thread, so
//    `Rc<RefCell<..>>` is the right sharing primitive here, not `Arc`.

/// A runtime value handed to the console at a call site.
#[derive(Clone)]
pub enum Value {
    Null,
    /// Explicit "no value", distinct from `Null` (e.g. a missing table cell)
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Raw bytes, possibly not valid UTF-8; wire sinks that cannot carry
    /// arbitrary bytes transport these base64-encoded
    Bytes(Vec<u8>),
    Array(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<ValueMap>>),
    Object(Rc<dyn Inspect>),
    /// Function/closure reference, identified by name only
    Callable(String),
    /// Opaque handle (file descriptor, socket, ...) identified but not walked
    Resource { kind: String, id: u64 },
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn map(map: ValueMap) -> Self {
        Value::Map(Rc::new(RefCell::new(map)))
    }

    pub fn object(obj: Rc<dyn Inspect>) -> Self {
        Value::Object(obj)
    }

    /// Pointer identity for composite values; scalars have none.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(rc) => Some(Rc::as_ptr(rc) as *const u8 as usize),
            Value::Map(rc) => Some(Rc::as_ptr(rc) as *const u8 as usize),
            Value::Object(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Map(_) | Value::Object(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Type name used by placeholder rendering and the table type column
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bytes(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "array",
            Value::Object(_) => "object",
            Value::Callable(_) => "callable",
            Value::Resource { .. } => "resource",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Undefined => write!(f, "Undefined"),
            Value::Bool(v) => write!(f, "Bool({})", v),
            Value::Int(v) => write!(f, "Int({})", v),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Str(v) => write!(f, "Str({:?})", v),
            Value::Bytes(v) => write!(f, "Bytes(len={})", v.len()),
            Value::Array(items) => write!(f, "Array(len={})", items.borrow().len()),
            Value::Map(map) => write!(f, "Map(len={})", map.borrow().len()),
            Value::Object(obj) => write!(f, "Object({})", obj.class_name()),
            Value::Callable(name) => write!(f, "Callable({})", name),
            Value::Resource { kind, id } => write!(f, "Resource({} #{})", kind, id),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::array(v)
    }
}

/// Key of a `ValueMap` entry. Integer and string keys coexist, as they do in
/// the loosely-typed structures the console is asked to inspect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapKey {
    Int(i64),
    Str(String),
}

impl MapKey {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MapKey::Int(i) => Some(*i),
            MapKey::Str(_) => None,
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Int(i) => write!(f, "{}", i),
            MapKey::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for MapKey {
    fn from(v: i64) -> Self {
        MapKey::Int(v)
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> Self {
        MapKey::Str(v.to_string())
    }
}

/// Insertion-ordered key→value pairs. Order is significant: wire sinks must
/// be able to report when integer keys are out of natural order.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: Vec<(MapKey, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Replacement keeps the key's original position.
    pub fn insert(&mut self, key: impl Into<MapKey>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(MapKey, Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &MapKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(MapKey, Value)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (MapKey, Value)>>(iter: T) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Property visibility as reported by an `Inspect` implementor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
    /// Synthesized accessor (the original's `__get`-style members)
    Magic,
    /// Value injected purely for debug display
    Debug,
}

/// One named property of an inspectable object
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub value: Value,
    pub visibility: Visibility,
    /// Ancestor type that declared the property, when inherited
    pub declared_in: Option<String>,
}

impl Property {
    pub fn public(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            visibility: Visibility::Public,
            declared_in: None,
        }
    }
}

/// Parameter of an inspectable method signature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamSig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Method signature of an inspectable object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<ParamSig>,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_hint: Option<String>,
}

/// Capability trait for values that surface a rich object abstraction.
///
/// Types that do not implement this reach the console only as opaque
/// stubs; there is no runtime reflection fallback.
pub trait Inspect {
    fn class_name(&self) -> &str;

    fn properties(&self) -> Vec<Property>;

    fn methods(&self) -> Vec<MethodSig> {
        Vec::new()
    }

    /// Known-huge objects opt out of inspection entirely; the abstraction
    /// engine emits a type-name stub and sinks render a placeholder.
    fn is_excluded(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_preserves_insertion_order() {
        let mut map = ValueMap::new();
        map.insert("b", 1i64);
        map.insert("a", 2i64);
        map.insert(10i64, 3i64);

        let keys: Vec<String> = map.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "a", "10"]);
    }

    #[test]
    fn map_replace_keeps_position() {
        let mut map = ValueMap::new();
        map.insert("x", 1i64);
        map.insert("y", 2i64);
        map.insert("x", 9i64);

        let keys: Vec<String> = map.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["x", "y"]);
        match map.get(&MapKey::from("x")) {
            Some(Value::Int(9)) => {}
            other => panic!("Unexpected value: {:?}", other),
        }
    }

    #[test]
    fn identity_is_shared_across_clones() {
        let arr = Value::array(vec![Value::Int(1)]);
        let alias = arr.clone();
        assert_eq!(arr.identity(), alias.identity());
        assert!(arr.identity().is_some());

        let other = Value::array(vec![Value::Int(1)]);
        assert_ne!(arr.identity(), other.identity());
    }

    #[test]
    fn scalars_have_no_identity() {
        assert_eq!(Value::Int(5).identity(), None);
        assert_eq!(Value::Str("x".into()).identity(), None);
    }
}
