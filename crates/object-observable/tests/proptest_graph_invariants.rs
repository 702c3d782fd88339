//! Property-based invariants for wrapped graphs:
//!
//! 1. Wrapping does not change the serialized shape.
//! 2. Wrapping a node again returns the same node.
//! 3. Array operations agree with a plain `Vec` model.
//! 4. Every top-level write yields exactly one record with `path == key`.

use std::cell::RefCell;
use std::rc::Rc;

use object_observable::{create, observe, turn, ChangeRecord, Options, Slot};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// ── Helpers ─────────────────────────────────────────────────────────────

fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,4}", inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn composite_strategy() -> impl Strategy<Value = Value> {
    json_strategy().prop_filter("composite", |v| v.is_object() || v.is_array())
}

#[derive(Debug, Clone)]
enum ArrayOp {
    Push(i64),
    Pop,
    Insert(usize, i64),
    Remove(usize),
    Shift,
    Unshift(i64),
    Truncate(usize),
}

fn array_op_strategy() -> impl Strategy<Value = ArrayOp> {
    prop_oneof![
        any::<i64>().prop_map(ArrayOp::Push),
        Just(ArrayOp::Pop),
        (0usize..8, any::<i64>()).prop_map(|(i, v)| ArrayOp::Insert(i, v)),
        (0usize..8).prop_map(ArrayOp::Remove),
        Just(ArrayOp::Shift),
        any::<i64>().prop_map(ArrayOp::Unshift),
        (0usize..8).prop_map(ArrayOp::Truncate),
    ]
}

fn collect(node: &Slot) -> Rc<RefCell<Vec<Vec<ChangeRecord>>>> {
    let batches = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&batches);
    observe(node, move |batch| sink.borrow_mut().push(batch.to_vec())).unwrap();
    batches
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn wrapping_preserves_shape(value in json_strategy()) {
        let wrapped = create(value.clone(), Options::default());
        prop_assert_eq!(wrapped.to_json(), value.clone());
        prop_assert_eq!(
            serde_json::to_string(&wrapped).unwrap(),
            serde_json::to_string(&value).unwrap()
        );
    }

    #[test]
    fn non_recursive_wrapping_preserves_shape(value in composite_strategy()) {
        let wrapped = create(value.clone(), Options::default().with_recursive(false));
        prop_assert!(wrapped.is_observable());
        prop_assert_eq!(wrapped.to_json(), value);
    }

    #[test]
    fn wrapping_is_idempotent(value in json_strategy()) {
        let once = create(value, Options::default());
        let twice = create(once.clone(), Options::default());
        prop_assert_eq!(once.is_observable(), twice.is_observable());
        prop_assert!(once == twice);
    }

    #[test]
    fn array_ops_match_vec_model(
        start in prop::collection::vec(any::<i64>(), 0..6),
        ops in prop::collection::vec(array_op_strategy(), 0..24),
    ) {
        let wrapped = create(json!(start.clone()), Options::default());
        let node = wrapped.as_node().unwrap();
        let mut model = start;
        for op in ops {
            match op {
                ArrayOp::Push(v) => {
                    model.push(v);
                    node.push(v);
                }
                ArrayOp::Pop => {
                    let expected = model.pop();
                    let got = node.pop().map(|s| s.to_json());
                    prop_assert_eq!(got, expected.map(Value::from));
                }
                ArrayOp::Insert(i, v) => {
                    let i = i.min(model.len());
                    model.insert(i, v);
                    node.insert(i, v);
                }
                ArrayOp::Remove(i) => {
                    let expected = (i < model.len()).then(|| model.remove(i));
                    let got = node.remove(i).map(|s| s.to_json());
                    prop_assert_eq!(got, expected.map(Value::from));
                }
                ArrayOp::Shift => {
                    let expected = (!model.is_empty()).then(|| model.remove(0));
                    let got = node.shift().map(|s| s.to_json());
                    prop_assert_eq!(got, expected.map(Value::from));
                }
                ArrayOp::Unshift(v) => {
                    model.insert(0, v);
                    prop_assert_eq!(node.unshift(v), model.len());
                }
                ArrayOp::Truncate(n) => {
                    if n <= model.len() {
                        model.truncate(n);
                        node.set("length", Value::from(n));
                    }
                }
            }
            prop_assert_eq!(node.len(), model.len());
        }
        object_observable::run_microtasks();
        prop_assert_eq!(wrapped.to_json(), json!(model));
    }

    #[test]
    fn top_level_writes_yield_one_record_each(
        keys in prop::collection::vec("[a-z]{1,3}", 1..8),
    ) {
        let wrapped = create(json!({}), Options::default());
        let batches = collect(&wrapped);
        let node = wrapped.as_node().unwrap();
        turn(|| {
            for (n, key) in keys.iter().enumerate() {
                node.set(key, n as i64);
            }
        });
        let batches = batches.borrow();
        prop_assert_eq!(batches.len(), 1);
        let paths: Vec<String> = batches[0].iter().filter_map(|r| r.path.clone()).collect();
        prop_assert_eq!(paths, keys.clone());
    }
}
