//! Lenient timestamp (de)serialization.
//!
//! The backend emits creation timestamps either as ISO-8601 (with or without
//! an offset) or in the RFC 2822 form produced by its JSON encoder. Both are
//! normalized to a naive UTC timestamp.

use chrono::{DateTime, NaiveDateTime};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parses a timestamp string in any of the accepted server formats.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.naive_utc());
    }
    // RFC 2822 parsing rejects the "GMT" zone name some encoders emit.
    if let Some(stripped) = raw.strip_suffix(" GMT")
        && let Ok(dt) = NaiveDateTime::parse_from_str(stripped, "%a, %d %b %Y %H:%M:%S")
    {
        return Some(dt);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Serde adapter for `Option<NaiveDateTime>` fields.
pub mod option {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{ISO_FORMAT, parse_timestamp};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&dt.format(ISO_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_timestamp))
    }
}
