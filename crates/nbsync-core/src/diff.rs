// ── Field-level diff ──
//
// Compares a desired payload against the object the API returned and keeps
// only the fields that actually need writing.

use std::collections::BTreeSet;

use nbsync_api::{Object, id_of};
use serde_json::Value;

/// Fields of `desired` whose value differs from `existing`.
///
/// - `null` in `desired` is never diffed (absence never forces a clear).
/// - A key missing from `existing` always counts as a change.
/// - `tags` compare as sets of ids.
/// - Nested references in `existing` compare by `id`, choice fields by `value`.
/// - Numbers compare numerically (`2` equals `2.0`).
pub fn compute_diff(existing: &Object, desired: &Object) -> Object {
    let mut changes = Object::new();
    for (key, want) in desired {
        if want.is_null() {
            continue;
        }
        let differs = match existing.get(key) {
            None => true,
            Some(have) if key == "tags" => !tag_sets_equal(have, want),
            Some(have) => !values_equal(have, want),
        };
        if differs {
            changes.insert(key.clone(), want.clone());
        }
    }
    changes
}

/// Semantic equality between an existing API value and a desired value.
pub fn values_equal(existing: &Value, desired: &Value) -> bool {
    match (existing, desired) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Object(have), want) if !want.is_object() => {
            if have.contains_key("id") {
                id_of(existing).is_some() && id_of(existing) == id_of(want)
            } else if let Some(value) = have.get("value") {
                values_equal(value, want)
            } else {
                false
            }
        }
        (Value::Array(have), Value::Array(want)) => arrays_equal(have, want),
        _ => existing == desired,
    }
}

fn arrays_equal(have: &[Value], want: &[Value]) -> bool {
    if let (Some(a), Some(b)) = (id_set(have), id_set(want)) {
        return a == b;
    }
    have.len() == want.len() && have.iter().zip(want).all(|(h, w)| values_equal(h, w))
}

/// All elements as ids, or `None` if any element is not an id reference.
fn id_set(values: &[Value]) -> Option<BTreeSet<u64>> {
    values
        .iter()
        .map(|v| match v {
            Value::Number(_) | Value::Object(_) => id_of(v),
            _ => None,
        })
        .collect()
}

fn tag_sets_equal(have: &Value, want: &Value) -> bool {
    let ids = |v: &Value| -> BTreeSet<u64> {
        v.as_array()
            .map(|tags| tags.iter().filter_map(id_of).collect())
            .unwrap_or_default()
    };
    ids(have) == ids(want)
}
