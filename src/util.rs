use std::iter::repeat;
use std::path::{Path, PathBuf};

use base64::engine::GeneralPurpose;
use bson::Bson;
use serde_json::Value;

pub fn find_first_subpath<P: AsRef<Path>, F: Fn(&Path) -> bool>(
    root: impl AsRef<Path>,
    subpaths: &[P],
    search: F,
) -> Option<PathBuf> {
    subpaths
        .iter()
        .zip(repeat(root.as_ref()))
        .map(|(b, a)| a.join(b))
        .find(|it: &PathBuf| search(&it))
}

pub fn base64_engine() -> GeneralPurpose {
    base64::engine::GeneralPurpose::new(
        &base64::alphabet::URL_SAFE,
        base64::engine::GeneralPurposeConfig::new(),
    )
}

/// Parses the leading integer of `value` the way query strings are read by
/// browsers' `parseInt`: surrounding whitespace and trailing garbage are
/// ignored, nothing parsable yields `None`. Values past the `i64` range
/// saturate.
pub fn parse_leading_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // only digits are left, so parsing can only fail on overflow
    let parsed: i64 = digits[..end].parse().unwrap_or(i64::MAX);

    Some(if negative { -parsed } else { parsed })
}

/// Converts a stored document into the JSON clients expect: object ids become
/// hex strings and dates become RFC 3339 strings.
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(date) => date
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or(Value::Null),
        Bson::Document(doc) => Value::Object(
            doc.into_iter()
                .map(|(key, value)| (key, bson_to_json(value)))
                .collect(),
        ),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

/// Serde helpers for `_id` fields which arrive as hex strings from clients
/// and as native object ids from MongoDB.
pub mod object_id {
    use bson::oid::ObjectId;
    use bson::Bson;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<ObjectId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Bson>::deserialize(deserializer)? {
            Some(Bson::ObjectId(id)) => Ok(Some(id)),
            Some(Bson::String(hex)) => ObjectId::parse_str(&hex)
                .map(Some)
                .map_err(serde::de::Error::custom),
            Some(Bson::Null) | None => Ok(None),
            Some(other) => Err(serde::de::Error::custom(format!(
                "expected an object id, found {}",
                other
            ))),
        }
    }
}

/// Serde helpers storing a `DateTime<Utc>` as a native BSON date. Clients
/// send RFC 3339 strings, which are accepted as well.
pub mod bson_date_time {
    use bson::Bson;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        bson::DateTime::from_chrono(*date).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Bson::deserialize(deserializer)? {
            Bson::DateTime(date) => Ok(date.to_chrono()),
            Bson::String(text) => DateTime::parse_from_rfc3339(&text)
                .map(|it| it.with_timezone(&Utc))
                .map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(format!(
                "expected a date, found {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use bson::oid::ObjectId;
    use serde_json::json;

    #[test]
    fn leading_int_matches_lenient_parsing() {
        assert_eq!(parse_leading_int("6"), Some(6));
        assert_eq!(parse_leading_int(" 12abc"), Some(12));
        assert_eq!(parse_leading_int("5.7"), Some(5));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
    }

    #[test]
    fn oversized_int_saturates() {
        assert_eq!(parse_leading_int("99999999999999999999"), Some(i64::MAX));
        assert_eq!(parse_leading_int("-99999999999999999999"), Some(-i64::MAX));
    }

    #[test]
    fn object_ids_become_hex_strings() {
        let id = ObjectId::new();
        let value = bson_to_json(Bson::Document(doc! {
            "_id": id,
            "seats": 4_i64,
            "tags": ["oil", "canvas"],
        }));

        assert_eq!(
            value,
            json!({ "_id": id.to_hex(), "seats": 4, "tags": ["oil", "canvas"] })
        );
    }
}
