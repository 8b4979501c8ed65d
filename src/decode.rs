//! Result Decoder
//!
//! Turns raw response bodies into typed entities. Single entities may arrive
//! bare or nested one level under an envelope key; lists arrive under their
//! plural key. Unknown fields are ignored, and a body that does not fit the
//! expected shape is reported as [`Error::Decode`] with the raw payload.

use crate::error::{Error, Result};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

pub(crate) fn parse_object(body: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::decode(
            serde_json::Error::custom("expected a JSON object"),
            body,
        )),
        Err(e) => Err(Error::decode(e, body)),
    }
}

/// Decode one entity, unwrapping `envelope` when the body carries it.
pub fn decode_entity<T: DeserializeOwned>(body: &str, envelope: &str) -> Result<T> {
    let mut map = parse_object(body)?;

    let target = match map.remove(envelope) {
        Some(inner @ Value::Object(_)) => inner,
        Some(other) => {
            // Not an envelope, just a field that happens to share the name.
            map.insert(envelope.to_string(), other);
            Value::Object(map)
        }
        None => Value::Object(map),
    };

    serde_json::from_value(target).map_err(|e| Error::decode(e, body))
}

pub(crate) fn list_from_object<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    key: &str,
    body: &str,
) -> Result<Vec<T>> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(items) => serde_json::from_value(items).map_err(|e| Error::decode(e, body)),
    }
}

/// Decode the list stored under `key`. A missing key is an empty list.
pub fn decode_list<T: DeserializeOwned>(body: &str, key: &str) -> Result<Vec<T>> {
    let mut map = parse_object(body)?;
    list_from_object(&mut map, key, body)
}

/// Decode either `{ key: [...] }` or a single bare entity.
pub fn decode_many<T: DeserializeOwned>(body: &str, key: &str) -> Result<Vec<T>> {
    let mut map = parse_object(body)?;
    if map.contains_key(key) {
        list_from_object(&mut map, key, body)
    } else {
        serde_json::from_value(Value::Object(map))
            .map(|entity| vec![entity])
            .map_err(|e| Error::decode(e, body))
    }
}

/// Deserialize `null` as the type's default. Use with `#[serde(default)]`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Wire formats for timestamps. All values are UTC without an offset marker.
///
/// A present string in any other format fails decoding; `null` or an absent
/// field (with `#[serde(default)]`) decodes as `None`.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    fn deserialize_with<'de, D>(
        deserializer: D,
        format: &str,
    ) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => NaiveDateTime::parse_from_str(&raw, format)
                .map(|naive| Some(naive.and_utc()))
                .map_err(|e| D::Error::custom(format!("invalid timestamp {raw:?}: {e}"))),
        }
    }

    fn serialize_with<S>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
        format: &str,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(format).to_string()),
            None => serializer.serialize_none(),
        }
    }

    /// `1970-01-01T00:00:00.000000`, used by workflows and executions.
    pub mod mistral {
        use super::*;

        pub const PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
        pub const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserialize_with(deserializer, PARSE_FORMAT)
        }

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serialize_with(value, serializer, WRITE_FORMAT)
        }
    }

    /// `1970-01-01 00:00:00`, used by cron triggers.
    pub mod plain {
        use super::*;

        pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserialize_with(deserializer, FORMAT)
        }

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serialize_with(value, serializer, FORMAT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
        #[serde(default, deserialize_with = "null_as_default")]
        name: String,
        #[serde(default, with = "timestamp::mistral")]
        created_at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_decode_bare_entity() {
        let item: Item = decode_entity(r#"{"id": "1", "name": "flow"}"#, "item").unwrap();
        assert_eq!(item.id, "1");
        assert_eq!(item.name, "flow");
        assert_eq!(item.created_at, None);
    }

    #[test]
    fn test_decode_enveloped_entity() {
        let item: Item =
            decode_entity(r#"{"item": {"id": "1", "name": "flow"}}"#, "item").unwrap();
        assert_eq!(item.id, "1");
    }

    #[test]
    fn test_non_object_envelope_field_is_data() {
        #[derive(Deserialize)]
        struct Named {
            item: String,
        }
        let named: Named = decode_entity(r#"{"item": "plain"}"#, "item").unwrap();
        assert_eq!(named.item, "plain");
    }

    #[test]
    fn test_unknown_fields_ignored_and_null_defaults() {
        let item: Item =
            decode_entity(r#"{"id": "1", "name": null, "future": [1, 2]}"#, "item").unwrap();
        assert_eq!(item.name, "");
    }

    #[test]
    fn test_timestamp_parses_fixed_format() {
        let item: Item =
            decode_entity(r#"{"id": "1", "created_at": "1970-01-01T00:00:00.000000"}"#, "item")
                .unwrap();
        assert_eq!(item.created_at, Some(Utc.timestamp_opt(0, 0).unwrap()));
    }

    #[test]
    fn test_bad_timestamp_is_decode_error_with_payload() {
        let body = r#"{"id": "1", "created_at": "not-a-date"}"#;
        match decode_entity::<Item>(body, "item") {
            Err(Error::Decode { payload, .. }) => assert_eq!(payload, body),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        assert!(matches!(
            decode_entity::<Item>("{not json", "item"),
            Err(Error::Decode { .. })
        ));
        assert!(matches!(
            decode_list::<Item>("[1, 2]", "items"),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_list_missing_key_is_empty() {
        let items: Vec<Item> = decode_list(r#"{"next": null}"#, "items").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_decode_many_accepts_both_forms() {
        let list: Vec<Item> =
            decode_many(r#"{"items": [{"id": "1"}, {"id": "2"}]}"#, "items").unwrap();
        assert_eq!(list.len(), 2);

        let single: Vec<Item> = decode_many(r#"{"id": "3"}"#, "items").unwrap();
        assert_eq!(single[0].id, "3");
    }

    #[test]
    fn test_missing_required_field_fails() {
        assert!(decode_entity::<Item>(r#"{"name": "flow"}"#, "item").is_err());
    }
}
