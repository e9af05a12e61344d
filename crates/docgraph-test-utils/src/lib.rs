//! Testing utilities for docgraph workspace
//!
//! Shared documents, edit builders and proptest strategies.

#![allow(missing_docs)]

use docgraph_document::{DocPath, Edit, EditValue, Document};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Fruit/car sample document
pub fn fruit_car() -> Value {
    json!({
        "fruit": {"name": "Apple", "color": "Red", "weight": "150g"},
        "car": {"model": "Model S", "year": 2022, "brand": "Tesla"}
    })
}

/// Fruit/car sample as pretty-printed JSON text
pub fn fruit_car_text() -> String {
    serde_json::to_string_pretty(&fruit_car()).unwrap()
}

/// Replacement value for `{Root}.fruit` in the fruit/car scenario
pub fn orange() -> Value {
    json!({"name": "Orange", "color": "Orange", "weight": "200g"})
}

/// Mixed document with nested arrays, empties and every scalar kind
pub fn nested_sample() -> Value {
    json!({
        "id": 7,
        "title": "sample",
        "active": true,
        "deleted": null,
        "tags": ["a", "b", "c"],
        "owner": {"name": "Ada", "roles": [{"name": "admin"}, {"name": "dev"}]},
        "empty_object": {},
        "empty_list": []
    })
}

/// Object with `width` scalar children
pub fn wide_object(width: usize) -> Value {
    Value::Object((0..width).map(|i| (format!("k{i}"), json!(i))).collect())
}

pub fn create_document() -> Document {
    Document::new(fruit_car())
}

pub fn create_edit(target: &str, value: Value) -> Edit {
    Edit::parse(target, EditValue::Typed(value)).unwrap()
}

pub fn create_text_edit(target: &str, text: &str) -> Edit {
    Edit::parse(target, EditValue::Text(text.to_string())).unwrap()
}

pub fn path(display: &str) -> DocPath {
    display.parse().unwrap()
}

/// Number of values in `value`, the value itself included
pub fn count_values(value: &Value) -> usize {
    let mut count = 0;
    let mut stack = vec![value];
    while let Some(next) = stack.pop() {
        count += 1;
        match next {
            Value::Object(map) => stack.extend(map.values()),
            Value::Array(items) => stack.extend(items.iter()),
            _ => {}
        }
    }
    count
}

/// Arbitrary JSON documents, up to a few levels deep
pub fn arb_document() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 .\\[\\]]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z0-9.\\[\\]]{0,6}", inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}
