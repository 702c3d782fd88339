//! Adapters for values that mutate through method calls.
//!
//! Some values change state by calling methods rather than by assigning
//! keys; a date's setters are the canonical case. An adapter describes which
//! methods mutate and which semantic field each one changes, so a node over
//! such a value can turn a method call into a `set` change record.

use std::fmt;

use serde_json::Value;

use crate::error::AdapterError;

/// A mutable value driven by named methods.
pub trait MutableValue: fmt::Debug {
    /// Short name used in logs, e.g. `"Date"`.
    fn type_name(&self) -> &'static str;

    /// Mutating methods paired with the field each one changes.
    fn mutators(&self) -> &'static [(&'static str, &'static str)];

    /// Runs `method`. Read-only methods leave the value untouched.
    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, AdapterError>;

    /// JSON view of the current state.
    fn snapshot(&self) -> Value;

    fn box_clone(&self) -> Box<dyn MutableValue>;

    /// Field changed by `method`, or `None` when it does not mutate.
    fn field_for(&self, method: &str) -> Option<&'static str> {
        self.mutators()
            .iter()
            .find(|(name, _)| *name == method)
            .map(|(_, field)| *field)
    }
}

impl Clone for Box<dyn MutableValue> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Reads argument `index` as an integer; fractional numbers truncate.
pub fn int_arg(method: &str, args: &[Value], index: usize) -> Result<i64, AdapterError> {
    opt_int_arg(method, args, index)?.ok_or_else(|| AdapterError::InvalidArgument {
        method: method.to_string(),
        index,
    })
}

/// Like [`int_arg`] but a missing argument is `None`.
pub fn opt_int_arg(method: &str, args: &[Value], index: usize) -> Result<Option<i64>, AdapterError> {
    let Some(arg) = args.get(index) else {
        return Ok(None);
    };
    let invalid = || AdapterError::InvalidArgument {
        method: method.to_string(),
        index,
    };
    if let Some(n) = arg.as_i64() {
        return Ok(Some(n));
    }
    match arg.as_f64() {
        Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(Some(f.trunc() as i64)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone)]
    struct Counter(i64);

    impl MutableValue for Counter {
        fn type_name(&self) -> &'static str {
            "Counter"
        }

        fn mutators(&self) -> &'static [(&'static str, &'static str)] {
            &[("incr", "count")]
        }

        fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, AdapterError> {
            match method {
                "incr" => {
                    self.0 += opt_int_arg(method, args, 0)?.unwrap_or(1);
                    Ok(json!(self.0))
                }
                "get" => Ok(json!(self.0)),
                _ => Err(AdapterError::UnknownMethod(method.to_string())),
            }
        }

        fn snapshot(&self) -> Value {
            json!(self.0)
        }

        fn box_clone(&self) -> Box<dyn MutableValue> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn field_lookup_uses_mutator_table() {
        let c = Counter(0);
        assert_eq!(c.field_for("incr"), Some("count"));
        assert_eq!(c.field_for("get"), None);
    }

    #[test]
    fn boxed_clone_is_independent() {
        let mut a: Box<dyn MutableValue> = Box::new(Counter(1));
        let b = a.clone();
        a.call("incr", &[]).unwrap();
        assert_eq!(a.snapshot(), json!(2));
        assert_eq!(b.snapshot(), json!(1));
    }

    #[test]
    fn integer_arguments() {
        let args = [json!(3), json!(2.9), json!("x")];
        assert_eq!(int_arg("m", &args, 0), Ok(3));
        assert_eq!(int_arg("m", &args, 1), Ok(2));
        assert!(int_arg("m", &args, 2).is_err());
        assert!(int_arg("m", &args, 3).is_err());
        assert_eq!(opt_int_arg("m", &args, 3), Ok(None));
    }
}
