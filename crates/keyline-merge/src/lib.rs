//! JSON merge patch for keyline.
//!
//! Implements RFC 7396: a patch document describes a partial update where
//! omitted members stay untouched, `null` members are removed, nested
//! objects merge recursively and everything else (scalars, arrays) replaces
//! the target wholesale. An empty string is an ordinary value, not a
//! deletion.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from applying a merge patch to raw documents.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The document being patched is not valid JSON.
    #[error("invalid original document: {0}")]
    InvalidDocument(#[source] serde_json::Error),

    /// The patch is not valid JSON.
    #[error("invalid merge patch: {0}")]
    InvalidPatch(#[source] serde_json::Error),

    #[error("failed to encode merged document: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type MergeResult<T> = Result<T, MergeError>;

/// Apply `patch` to `target` in place.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_members) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(target_members) = target else {
        return;
    };
    for (name, value) in patch_members {
        if value.is_null() {
            target_members.remove(name);
            continue;
        }
        let slot = target_members.entry(name.clone()).or_insert(Value::Null);
        merge_patch(slot, value);
    }
}

/// Byte-level merge: parse both documents, merge, and re-encode.
pub fn merge_patch_bytes(original: &[u8], patch: &[u8]) -> MergeResult<Vec<u8>> {
    let mut doc: Value = serde_json::from_slice(original).map_err(MergeError::InvalidDocument)?;
    let patch: Value = serde_json::from_slice(patch).map_err(MergeError::InvalidPatch)?;
    merge_patch(&mut doc, &patch);
    serde_json::to_vec(&doc).map_err(MergeError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn merged(original: &Value, patch: &Value) -> Value {
        let mut doc = original.clone();
        merge_patch(&mut doc, patch);
        doc
    }

    fn apply(original: Value, patch: Value) -> Value {
        merged(&original, &patch)
    }

    // -----------------------------------------------------------------------
    // RFC 7396 appendix A
    // -----------------------------------------------------------------------

    #[test]
    fn rfc_examples() {
        let cases = [
            (json!({"a":"b"}), json!({"a":"c"}), json!({"a":"c"})),
            (json!({"a":"b"}), json!({"b":"c"}), json!({"a":"b","b":"c"})),
            (json!({"a":"b"}), json!({"a":null}), json!({})),
            (json!({"a":"b","b":"c"}), json!({"a":null}), json!({"b":"c"})),
            (json!({"a":["b"]}), json!({"a":"c"}), json!({"a":"c"})),
            (json!({"a":"c"}), json!({"a":["b"]}), json!({"a":["b"]})),
            (
                json!({"a":{"b":"c"}}),
                json!({"a":{"b":"d","c":null}}),
                json!({"a":{"b":"d"}}),
            ),
            (json!({"a":[{"b":"c"}]}), json!({"a":[1]}), json!({"a":[1]})),
            (json!(["a","b"]), json!(["c","d"]), json!(["c","d"])),
            (json!({"a":"b"}), json!(["c"]), json!(["c"])),
            (json!({"a":"foo"}), json!(null), json!(null)),
            (json!({"a":"foo"}), json!("bar"), json!("bar")),
            (json!({"e":null}), json!({"a":1}), json!({"e":null,"a":1})),
            (json!([1,2]), json!({"a":"b","c":null}), json!({"a":"b"})),
            (json!({}), json!({"a":{"bb":{"ccc":null}}}), json!({"a":{"bb":{}}})),
        ];
        for (original, patch, expected) in cases {
            assert_eq!(apply(original.clone(), patch.clone()), expected, "{original} + {patch}");
        }
    }

    #[test]
    fn empty_string_overwrites() {
        let result = apply(json!({"bar":"baz"}), json!({"bar":"","create_time":22}));
        assert_eq!(result, json!({"bar":"","create_time":22}));
    }

    #[test]
    fn arrays_are_not_merged_elementwise() {
        let result = apply(json!({"nodes":[1,2,3]}), json!({"nodes":[4]}));
        assert_eq!(result, json!({"nodes":[4]}));
    }

    #[test]
    fn bytes_roundtrip() {
        let out = merge_patch_bytes(br#"{"bar":"baz"}"#, br#"{"foo":"f"}"#).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value, json!({"bar":"baz","foo":"f"}));
    }

    #[test]
    fn bytes_reject_malformed_inputs() {
        assert!(matches!(
            merge_patch_bytes(b"{not json", b"{}"),
            Err(MergeError::InvalidDocument(_))
        ));
        assert!(matches!(
            merge_patch_bytes(b"{}", b"{\"a\":"),
            Err(MergeError::InvalidPatch(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z]{0,4}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
                prop::collection::btree_map("[a-d]", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn patch_is_idempotent(original in arb_json(), patch in arb_json()) {
            let once = merged(&original, &patch);
            let twice = merged(&once, &patch);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn empty_object_patch_preserves_objects(
            original in prop::collection::btree_map("[a-d]", arb_json(), 0..4)
        ) {
            let original = Value::Object(original.into_iter().collect());
            prop_assert_eq!(merged(&original, &json!({})), original);
        }
    }
}
