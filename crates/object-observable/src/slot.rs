use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::node::Observable;

/// A value held in an observable graph: either plain JSON or a wrapped node.
///
/// Primitives are always `Json`. Composites are `Node` once wrapped; they stay
/// `Json` only inside a graph built with `recursive: false`.
#[derive(Debug, Clone)]
pub enum Slot {
    Json(Value),
    Node(Observable),
}

impl Slot {
    pub fn is_observable(&self) -> bool {
        matches!(self, Slot::Node(_))
    }

    pub fn as_node(&self) -> Option<&Observable> {
        match self {
            Slot::Node(node) => Some(node),
            Slot::Json(_) => None,
        }
    }

    pub fn into_node(self) -> Option<Observable> {
        match self {
            Slot::Node(node) => Some(node),
            Slot::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Slot::Json(value) => Some(value),
            Slot::Node(_) => None,
        }
    }

    /// Objects and arrays, wrapped or not.
    pub fn is_composite(&self) -> bool {
        match self {
            Slot::Json(value) => value.is_object() || value.is_array(),
            Slot::Node(_) => true,
        }
    }

    /// Plain JSON view with all wrapping removed.
    pub fn to_json(&self) -> Value {
        match self {
            Slot::Json(value) => value.clone(),
            Slot::Node(node) => node.to_json(),
        }
    }

    /// Reads `key` from a node or from a raw JSON composite.
    pub fn get(&self, key: &str) -> Option<Slot> {
        match self {
            Slot::Node(node) => node.get(key),
            Slot::Json(Value::Object(map)) => map.get(key).cloned().map(Slot::Json),
            Slot::Json(Value::Array(items)) => {
                if key == "length" {
                    return Some(Slot::Json(Value::from(items.len())));
                }
                crate::path::parse_index(key)
                    .and_then(|i| items.get(i))
                    .cloned()
                    .map(Slot::Json)
            }
            Slot::Json(_) => None,
        }
    }
}

impl PartialEq for Slot {
    /// Nodes compare by identity, JSON by value.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Slot::Json(a), Slot::Json(b)) => a == b,
            (Slot::Node(a), Slot::Node(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq<Value> for Slot {
    fn eq(&self, other: &Value) -> bool {
        match self {
            Slot::Json(value) => value == other,
            Slot::Node(node) => node.to_json() == *other,
        }
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Slot::Json(value) => value.serialize(serializer),
            Slot::Node(node) => node.serialize(serializer),
        }
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::Json(value)
    }
}

impl From<Observable> for Slot {
    fn from(node: Observable) -> Self {
        Slot::Node(node)
    }
}

impl From<&Observable> for Slot {
    fn from(node: &Observable) -> Self {
        Slot::Node(node.clone())
    }
}

impl From<bool> for Slot {
    fn from(b: bool) -> Self {
        Slot::Json(Value::Bool(b))
    }
}

impl From<i64> for Slot {
    fn from(n: i64) -> Self {
        Slot::Json(Value::from(n))
    }
}

impl From<f64> for Slot {
    fn from(n: f64) -> Self {
        Slot::Json(Value::from(n))
    }
}

impl From<&str> for Slot {
    fn from(s: &str) -> Self {
        Slot::Json(Value::from(s))
    }
}

impl From<String> for Slot {
    fn from(s: String) -> Self {
        Slot::Json(Value::String(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_json_lookup() {
        let slot = Slot::from(json!({"a": [10, 20]}));
        let arr = slot.get("a").unwrap();
        assert_eq!(arr.get("1").unwrap(), json!(20));
        assert_eq!(arr.get("length").unwrap(), json!(2));
        assert!(arr.get("2").is_none());
        assert!(Slot::from(1i64).get("a").is_none());
    }

    #[test]
    fn composites() {
        assert!(Slot::from(json!([])).is_composite());
        assert!(!Slot::from(json!(null)).is_composite());
        assert!(!Slot::from("x").is_observable());
    }

    #[test]
    fn node_equality_is_identity() {
        let a = Observable::new();
        let b = Observable::new();
        assert_eq!(Slot::from(&a), Slot::from(&a));
        assert_ne!(Slot::from(&a), Slot::from(&b));
        assert_eq!(Slot::from(&a), json!({}));
    }
}
