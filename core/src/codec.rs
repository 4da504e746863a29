//! JSON encoding and lenient decoding of service payloads.
//!
//! Decoding never insists on an exact schema match: unknown fields are
//! ignored by serde's default behavior, every DTO defaults its missing
//! fields, `null` members count as missing, and [`lenient_vec`] decodes list
//! entries one by one so a single unexpected entry is dropped instead of
//! failing the whole document.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, UrlscanError};

pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(UrlscanError::Encoding)
}

/// Decode a response body received with `status`.
///
/// Object members set to `null` are treated as absent, so `#[serde(default)]`
/// fields take their default instead of failing.
pub fn decode<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    let tree = decode_tree(status, body)?;
    from_tree(tree).map_err(|source| UrlscanError::Decode { status, source })
}

/// Parse a response body into an untouched JSON tree.
pub fn decode_tree(status: u16, body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|source| UrlscanError::Decode { status, source })
}

/// Decode `value` into `T` with `null` object members removed first.
pub fn from_tree<T: DeserializeOwned>(mut value: Value) -> serde_json::Result<T> {
    strip_nulls(&mut value);
    T::deserialize(value)
}

/// Remove every object member whose value is `null`, at any depth.
///
/// Array elements are left in place; list decoding drops them as entries
/// that do not fit.
pub fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(members) => {
            members.retain(|_, member| !member.is_null());
            members.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

/// Decode every element of a JSON array that fits `T`, skipping the rest.
///
/// Non-array values yield an empty list.
pub fn lenient_vec<T: DeserializeOwned>(value: &Value) -> Vec<T> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match from_tree(item.clone()) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                tracing::debug!(index, error = %err, "skipping undecodable list entry");
                None
            }
        })
        .collect()
}

/// `deserialize_with` adapter that decodes a list through [`lenient_vec`].
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_vec(&value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Entry {
        name: String,
        #[serde(default)]
        count: u32,
    }

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        #[serde(deserialize_with = "lenient_list")]
        entries: Vec<Entry>,
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let entry: Entry = decode(200, r#"{"name":"a","count":2,"extra":{"nested":true}}"#).unwrap();
        assert_eq!(entry, Entry { name: "a".to_string(), count: 2 });
    }

    #[test]
    fn decode_failure_reports_status() {
        let err = decode::<Entry>(503, "Service Unavailable").unwrap_err();
        assert!(matches!(err, UrlscanError::Decode { status: 503, .. }));
    }

    #[test]
    fn lenient_vec_skips_bad_entries() {
        let value: Value = serde_json::from_str(
            r#"[{"name":"a"},{"name":42},"junk",{"name":"b","count":7}]"#,
        )
        .unwrap();
        let entries: Vec<Entry> = lenient_vec(&value);
        assert_eq!(
            entries,
            vec![
                Entry { name: "a".to_string(), count: 0 },
                Entry { name: "b".to_string(), count: 7 },
            ]
        );
    }

    #[test]
    fn lenient_vec_of_non_array_is_empty() {
        let entries: Vec<Entry> = lenient_vec(&Value::Null);
        assert!(entries.is_empty());
    }

    #[test]
    fn decode_treats_null_members_as_missing() {
        let entry: Entry = decode(200, r#"{"name":"a","count":null}"#).unwrap();
        assert_eq!(entry, Entry { name: "a".to_string(), count: 0 });

        let nested: Vec<Entry> = decode::<Wrapper>(200, r#"{"entries":[{"name":"b","count":null}]}"#)
            .unwrap()
            .entries;
        assert_eq!(nested, vec![Entry { name: "b".to_string(), count: 0 }]);
    }

    #[test]
    fn decode_tree_keeps_nulls() {
        let tree = decode_tree(200, r#"{"page":{"ptr":null}}"#).unwrap();
        assert_eq!(tree.pointer("/page/ptr"), Some(&Value::Null));
    }

    #[test]
    fn lenient_list_drops_null_and_bad_entries() {
        let wrapper: Wrapper =
            decode(200, r#"{"entries":[null,{"name":"a","count":null},{"count":3}]}"#).unwrap();
        assert_eq!(wrapper.entries, vec![Entry { name: "a".to_string(), count: 0 }]);
    }

    #[test]
    fn encode_produces_json() {
        let body = encode(&serde_json::json!({"url": "https://example.com"})).unwrap();
        assert_eq!(body, r#"{"url":"https://example.com"}"#);
    }
}
