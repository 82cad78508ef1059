//! Value builders for abstraction and sink tests.
//!
//! Provides utilities to:
//! - Build cyclic and shared composite values
//! - Construct inspectable objects without a real domain type
//! - Generate tabular data in the shapes the table normalizer accepts

use std::rc::Rc;

use debugcon_types::{Inspect, MethodSig, Property, Value, ValueMap, Visibility};

/// Minimal `Inspect` implementor with scripted contents.
pub struct TestObject {
    class_name: String,
    properties: Vec<Property>,
    methods: Vec<MethodSig>,
    excluded: bool,
}

impl TestObject {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            properties: Vec::new(),
            methods: Vec::new(),
            excluded: false,
        }
    }

    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.push(Property::public(name, value));
        self
    }

    pub fn with_hidden_property(
        mut self,
        name: &str,
        value: impl Into<Value>,
        visibility: Visibility,
    ) -> Self {
        self.properties.push(Property {
            name: name.to_string(),
            value: value.into(),
            visibility,
            declared_in: None,
        });
        self
    }

    pub fn with_method(mut self, name: &str) -> Self {
        self.methods.push(MethodSig {
            name: name.to_string(),
            params: Vec::new(),
            visibility: Visibility::Public,
            return_hint: None,
        });
        self
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    pub fn into_value(self) -> Value {
        Value::object(Rc::new(self))
    }
}

impl Inspect for TestObject {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn properties(&self) -> Vec<Property> {
        self.properties.clone()
    }

    fn methods(&self) -> Vec<MethodSig> {
        self.methods.clone()
    }

    fn is_excluded(&self) -> bool {
        self.excluded
    }
}

/// Array that contains itself as its last element.
pub fn cyclic_array() -> Value {
    let arr = Value::array(vec![Value::Int(1)]);
    if let Value::Array(rc) = &arr {
        rc.borrow_mut().push(arr.clone());
    }
    arr
}

/// Two branches of one array aliasing the same inner array.
pub fn shared_branch_array() -> Value {
    let inner = Value::array(vec![Value::Str("shared".into())]);
    Value::array(vec![inner.clone(), inner])
}

/// Array nested `depth` levels deep, innermost element an integer.
pub fn nested_array(depth: usize) -> Value {
    let mut value = Value::Int(0);
    for _ in 0..depth {
        value = Value::array(vec![value]);
    }
    value
}

/// Map whose integer keys are out of natural order.
pub fn shuffled_key_map() -> Value {
    let mut map = ValueMap::new();
    map.insert(2i64, "two");
    map.insert(0i64, "zero");
    map.insert(1i64, "one");
    Value::map(map)
}

/// Row data for table tests: a list of uniform string-keyed maps.
pub fn table_rows(rows: &[&[(&str, i64)]]) -> Value {
    let rows = rows
        .iter()
        .map(|pairs| {
            let mut map = ValueMap::new();
            for (key, value) in *pairs {
                map.insert(*key, *value);
            }
            Value::map(map)
        })
        .collect();
    Value::array(rows)
}
