use proptest::prelude::*;
use serde_json::{json, Value};

/// Plain tokens: no separators, no surrounding whitespace, never "true"/"false".
pub fn token_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,12}".prop_filter("boolean words normalize differently", |s| {
        s != "true" && s != "false"
    })
}

/// Free text that may contain spaces.
pub fn text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,24}"
}

/// Scalar JSON values as they arrive from the host.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        text_strategy().prop_map(Value::String),
        prop_oneof![Just("true"), Just("FALSE"), Just("Y"), Just("N")]
            .prop_map(|s| Value::String(s.to_string())),
    ]
}

/// Nested JSON documents built from scalars.
pub fn json_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}
