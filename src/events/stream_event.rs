//! # Change Stream Wire Format
//!
//! Serde model of the batches delivered by the change stream and decoding of
//! the typed attribute envelope into [`AttributeValue`]s.
//!
//! ```json
//! {
//!   "Records": [{
//!     "eventID": "1",
//!     "eventName": "MODIFY",
//!     "dynamodb": {
//!       "Keys": { "partitionKey": { "S": "user/u1" }, "sortKey": { "S": "profile" } },
//!       "OldImage": { "email": { "NULL": true } },
//!       "NewImage": { "email": { "S": "a@b.com" } },
//!       "SequenceNumber": "111"
//!     }
//!   }]
//! }
//! ```

use crate::constants::key_attributes;
use crate::error::{DispatchError, Result};
use crate::models::{AttributeValue, ChangeRecord, EventKind, Image, Number};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};

/// A batch of change records in delivery order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<StreamRecord>,
}

impl StreamBatch {
    pub fn new(records: Vec<StreamRecord>) -> Self {
        Self { records }
    }

    /// Parse the upstream JSON payload.
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<ChangeRecord> for StreamBatch {
    fn from_iter<I: IntoIterator<Item = ChangeRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|r| StreamRecord::from(&r)).collect())
    }
}

/// One undecoded change record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    #[serde(rename = "eventID", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(rename = "eventName")]
    pub event_name: String,
    pub dynamodb: StreamRecordBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamRecordBody {
    pub keys: JsonMap<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_image: Option<JsonMap<String, JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<JsonMap<String, JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<String>,
}

impl StreamRecord {
    /// Decode event kind, keys and both images.
    ///
    /// Any failure here is an upstream contract violation and fails the
    /// whole batch.
    pub fn decode(&self) -> Result<ChangeRecord> {
        let event_kind: EventKind = self.event_name.parse()?;
        let partition_key = self.key_string(key_attributes::PARTITION_KEY)?;
        let sort_key = self.key_string(key_attributes::SORT_KEY)?;

        let old_image = match &self.dynamodb.old_image {
            Some(image) => decode_image(image)?,
            None => Image::new(),
        };
        let new_image = match &self.dynamodb.new_image {
            Some(image) => decode_image(image)?,
            None => Image::new(),
        };

        Ok(ChangeRecord {
            event_kind,
            partition_key,
            sort_key,
            old_image,
            new_image,
            event_id: self.event_id.clone(),
            sequence_number: self.dynamodb.sequence_number.clone(),
        })
    }

    fn key_string(&self, name: &str) -> Result<String> {
        let raw = self.dynamodb.keys.get(name).ok_or_else(|| {
            DispatchError::malformed_key(
                self.raw_key_text(key_attributes::PARTITION_KEY),
                self.raw_key_text(key_attributes::SORT_KEY),
                format!("record keys have no `{name}` attribute"),
            )
        })?;

        match decode_value(name, raw)? {
            AttributeValue::String(value) => Ok(value),
            other => Err(DispatchError::malformed_key(
                self.raw_key_text(key_attributes::PARTITION_KEY),
                self.raw_key_text(key_attributes::SORT_KEY),
                format!("`{name}` must be a string, got {}", other.type_tag()),
            )),
        }
    }

    fn raw_key_text(&self, name: &str) -> String {
        self.dynamodb
            .keys
            .get(name)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}

impl From<&ChangeRecord> for StreamRecord {
    fn from(record: &ChangeRecord) -> Self {
        let mut keys = JsonMap::new();
        keys.insert(
            key_attributes::PARTITION_KEY.to_string(),
            AttributeValue::from(record.partition_key.as_str()).to_wire(),
        );
        keys.insert(
            key_attributes::SORT_KEY.to_string(),
            AttributeValue::from(record.sort_key.as_str()).to_wire(),
        );

        let encode = |image: &Image| -> JsonMap<String, JsonValue> {
            image
                .iter()
                .map(|(name, value)| (name.clone(), value.to_wire()))
                .collect()
        };

        Self {
            event_id: record.event_id.clone(),
            event_name: record.event_kind.wire_name().to_string(),
            dynamodb: StreamRecordBody {
                keys,
                old_image: (!record.old_image.is_empty()).then(|| encode(&record.old_image)),
                new_image: (!record.new_image.is_empty()).then(|| encode(&record.new_image)),
                sequence_number: record.sequence_number.clone(),
            },
        }
    }
}

/// Decode a whole image, one attribute per entry.
pub fn decode_image(image: &JsonMap<String, JsonValue>) -> Result<Image> {
    image
        .iter()
        .map(|(name, value)| Ok::<_, DispatchError>((name.clone(), decode_value(name, value)?)))
        .collect()
}

/// Decode a single typed envelope such as `{"S": "text"}`.
///
/// `path` names the attribute (and nested position) for error messages.
pub fn decode_value(path: &str, value: &JsonValue) -> Result<AttributeValue> {
    let envelope = value
        .as_object()
        .ok_or_else(|| DispatchError::image_decode(path, "expected a typed envelope object"))?;

    let mut entries = envelope.iter();
    let (tag, inner) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(DispatchError::image_decode(
                path,
                format!("expected exactly one type tag, found {}", envelope.len()),
            ))
        }
    };

    match tag.as_str() {
        "NULL" => Ok(AttributeValue::Null),
        "BOOL" => inner
            .as_bool()
            .map(AttributeValue::Bool)
            .ok_or_else(|| DispatchError::image_decode(path, "BOOL value is not a boolean")),
        "S" => Ok(AttributeValue::String(expect_str(path, tag, inner)?.to_string())),
        "N" => Ok(AttributeValue::Number(parse_number(path, expect_str(path, tag, inner)?)?)),
        "B" => Ok(AttributeValue::Binary(expect_str(path, tag, inner)?.to_string())),
        "L" => {
            let items = inner
                .as_array()
                .ok_or_else(|| DispatchError::image_decode(path, "L value is not an array"))?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| decode_value(&format!("{path}[{i}]"), item))
                .collect::<Result<Vec<_>>>()
                .map(AttributeValue::List)
        }
        "M" => {
            let entries = inner
                .as_object()
                .ok_or_else(|| DispatchError::image_decode(path, "M value is not an object"))?;
            entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), decode_value(&format!("{path}.{key}"), item)?)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(AttributeValue::Map)
        }
        "SS" => Ok(AttributeValue::StringSet(
            string_items(path, tag, inner)?
                .into_iter()
                .map(str::to_string)
                .collect(),
        )),
        "NS" => string_items(path, tag, inner)?
            .into_iter()
            .map(|text| parse_number(path, text))
            .collect::<Result<BTreeSet<_>>>()
            .map(AttributeValue::NumberSet),
        "BS" => Ok(AttributeValue::BinarySet(
            string_items(path, tag, inner)?
                .into_iter()
                .map(str::to_string)
                .collect(),
        )),
        other => Err(DispatchError::image_decode(
            path,
            format!("unknown type tag `{other}`"),
        )),
    }
}

fn expect_str<'a>(path: &str, tag: &str, inner: &'a JsonValue) -> Result<&'a str> {
    inner
        .as_str()
        .ok_or_else(|| DispatchError::image_decode(path, format!("{tag} value is not a string")))
}

fn string_items<'a>(path: &str, tag: &str, inner: &'a JsonValue) -> Result<Vec<&'a str>> {
    let items = inner
        .as_array()
        .ok_or_else(|| DispatchError::image_decode(path, format!("{tag} value is not an array")))?;
    items.iter().map(|item| expect_str(path, tag, item)).collect()
}

fn parse_number(path: &str, text: &str) -> Result<Number> {
    Number::parse(text)
        .ok_or_else(|| DispatchError::image_decode(path, format!("invalid number `{text}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn modify_payload() -> JsonValue {
        json!({
            "Records": [{
                "eventID": "evt-1",
                "eventName": "MODIFY",
                "dynamodb": {
                    "Keys": {
                        "partitionKey": { "S": "user/u1" },
                        "sortKey": { "S": "profile" }
                    },
                    "OldImage": {
                        "postCount": { "N": "2" }
                    },
                    "NewImage": {
                        "postCount": { "N": "3" },
                        "email": { "S": "a@b.com" },
                        "tags": { "L": [{ "S": "x" }, { "NULL": true }] },
                        "settings": { "M": { "private": { "BOOL": true } } },
                        "langs": { "SS": ["en", "de"] },
                        "scores": { "NS": ["1", "2.0"] }
                    },
                    "SequenceNumber": "111"
                }
            }]
        })
    }

    #[test]
    fn test_decode_modify_record() {
        let batch = StreamBatch::from_json(&modify_payload().to_string()).unwrap();
        assert_eq!(batch.len(), 1);

        let record = batch.records[0].decode().unwrap();
        assert_eq!(record.event_kind, EventKind::Modified);
        assert_eq!(record.partition_key, "user/u1");
        assert_eq!(record.sort_key, "profile");
        assert_eq!(record.event_id.as_deref(), Some("evt-1"));
        assert_eq!(record.sequence_number.as_deref(), Some("111"));
        assert_eq!(record.old_image["postCount"], AttributeValue::from(2));
        assert_eq!(record.new_image["email"], AttributeValue::from("a@b.com"));
        assert_eq!(
            record.new_image["tags"],
            AttributeValue::List(vec![AttributeValue::from("x"), AttributeValue::Null])
        );

        let mut settings = Image::new();
        settings.insert("private".into(), AttributeValue::from(true));
        assert_eq!(record.new_image["settings"], AttributeValue::Map(settings));

        match &record.new_image["scores"] {
            AttributeValue::NumberSet(set) => {
                assert!(set.contains(&Number::parse("2").unwrap()));
                assert_eq!(set.len(), 2);
            }
            other => panic!("expected number set, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_images_decode_empty() {
        let payload = json!({
            "Records": [{
                "eventName": "INSERT",
                "dynamodb": {
                    "Keys": { "partitionKey": { "S": "comment/c1" }, "sortKey": { "S": "-" } }
                }
            }]
        });
        let batch = StreamBatch::from_json(&payload.to_string()).unwrap();
        let record = batch.records[0].decode().unwrap();
        assert_eq!(record.event_kind, EventKind::Created);
        assert!(record.old_image.is_empty());
        assert!(record.new_image.is_empty());
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(
            decode_value("a", &json!({ "X": "1" })),
            Err(DispatchError::ImageDecode { .. })
        ));
        assert!(matches!(
            decode_value("a", &json!({ "N": "one" })),
            Err(DispatchError::ImageDecode { .. })
        ));
        assert!(matches!(
            decode_value("a", &json!({ "S": "x", "N": "1" })),
            Err(DispatchError::ImageDecode { .. })
        ));
        assert!(matches!(
            decode_value("a", &json!("bare")),
            Err(DispatchError::ImageDecode { .. })
        ));

        let err = decode_value("a", &json!({ "L": [{ "S": "ok" }, { "N": 5 }] })).unwrap_err();
        assert_eq!(
            err,
            DispatchError::image_decode("a[1]", "N value is not a string")
        );
    }

    #[test]
    fn test_non_string_key_is_malformed() {
        let payload = json!({
            "Records": [{
                "eventName": "INSERT",
                "dynamodb": {
                    "Keys": { "partitionKey": { "N": "1" }, "sortKey": { "S": "-" } }
                }
            }]
        });
        let batch = StreamBatch::from_json(&payload.to_string()).unwrap();
        assert!(matches!(
            batch.records[0].decode(),
            Err(DispatchError::MalformedKey { .. })
        ));
    }

    #[test]
    fn test_unknown_event_name() {
        let payload = json!({
            "Records": [{
                "eventName": "TRUNCATE",
                "dynamodb": { "Keys": {} }
            }]
        });
        let batch = StreamBatch::from_json(&payload.to_string()).unwrap();
        assert_eq!(
            batch.records[0].decode().unwrap_err(),
            DispatchError::UnknownEventKind("TRUNCATE".into())
        );
    }

    #[test]
    fn test_change_record_conversion_preserves_content() {
        let mut new_image = Image::new();
        new_image.insert("text".into(), AttributeValue::from("hello"));
        let record = ChangeRecord::created("comment/c1", "-", new_image).with_event_id("e1");

        let decoded = StreamRecord::from(&record).decode().unwrap();
        assert_eq!(decoded, record);
    }
}
