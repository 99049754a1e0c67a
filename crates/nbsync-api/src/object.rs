// Open key/value records returned by the API.

use serde_json::Value;

/// A remote object as returned by the API. Relations appear either as bare
/// numeric ids or as nested objects carrying an `id` field.
pub type Object = serde_json::Map<String, Value>;

/// Extract a numeric id from a bare number, a numeric string, or a nested
/// `{ "id": ... }` reference. Zero and negative values are not ids.
pub fn id_of(value: &Value) -> Option<u64> {
    let id = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(f64_to_u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Object(map) => map.get("id").and_then(id_of),
        _ => None,
    }?;
    (id > 0).then_some(id)
}

/// The `id` field of an object, if present and non-zero.
pub fn object_id(object: &Object) -> Option<u64> {
    object.get("id").and_then(id_of)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn f64_to_u64(f: f64) -> u64 {
    f as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_of_accepts_every_reference_shape() {
        assert_eq!(id_of(&json!(42)), Some(42));
        assert_eq!(id_of(&json!(42.0)), Some(42));
        assert_eq!(id_of(&json!("42")), Some(42));
        assert_eq!(id_of(&json!({"id": 42, "name": "x"})), Some(42));
        assert_eq!(id_of(&json!({"id": {"id": 7}})), Some(7));
    }

    #[test]
    fn id_of_rejects_non_ids() {
        assert_eq!(id_of(&json!(0)), None);
        assert_eq!(id_of(&json!(null)), None);
        assert_eq!(id_of(&json!(1.5)), None);
        assert_eq!(id_of(&json!("abc")), None);
        assert_eq!(id_of(&json!({"name": "x"})), None);
    }
}
