//! Proptest generators for property-based testing.

use proptest::prelude::*;
use pruv_core::{Chain, EntryBuilder, Keypair};
use serde_json::{json, Value};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a reasonable timestamp.
fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// Generate a capability string such as `file.read`.
pub fn capability() -> impl Strategy<Value = String> {
    "[a-z]{2,8}\\.[a-z]{2,8}"
}

/// Generate a declared scope of 1 to 5 distinct capabilities.
pub fn scope() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(capability(), 1..=5).prop_map(|set| set.into_iter().collect())
}

/// One planned action and whether it falls inside the scope it was built for.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub action: String,
    pub action_scope: String,
    pub in_scope: bool,
}

/// Generate a scope plus a sequence of actions against it, mixing in-scope
/// and out-of-scope capabilities.
pub fn scope_and_actions(
    max_actions: usize,
) -> impl Strategy<Value = (Vec<String>, Vec<PlannedAction>)> {
    scope().prop_flat_map(move |scope| {
        let pick = {
            let scope = scope.clone();
            prop_oneof![
                prop::sample::select(scope).prop_map(|s| (s, true)),
                capability().prop_map(|s| (s, false)),
            ]
        };
        let actions = prop::collection::vec(("[a-z_]{3,12}", pick), 0..=max_actions);
        (Just(scope), actions)
    })
    .prop_map(|(scope, raw)| {
        let actions = raw
            .into_iter()
            .map(|(action, (action_scope, _))| PlannedAction {
                in_scope: scope.contains(&action_scope),
                action,
                action_scope,
            })
            .collect();
        (scope, actions)
    })
}

/// Generate an arbitrary JSON state, nested a few levels deep.
pub fn json_state() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        ".{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Generate an intact chain of 1 to `max_len` entries with random states.
pub fn chain(max_len: usize) -> impl Strategy<Value = Chain> {
    (prop::collection::vec(json_state(), 1..=max_len), timestamp()).prop_map(|(states, start)| {
        let mut chain = Chain::new();
        for (i, state) in states.into_iter().enumerate() {
            chain.append(
                EntryBuilder::new(if i == 0 { "create" } else { "update" })
                    .y_state(state)
                    .timestamp(start + i as i64),
            );
        }
        chain
    })
}
