//! Design document data model.
//!
//! Documents are immutable value objects created by the backend. The client
//! only ever reads them, selects them for display and follows `parent_id`
//! references between them.

use std::num::NonZeroU32;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request payload for `POST /generate_design`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRequest {
    pub requirements: String,
    pub assumptions: Map<String, Value>,
    pub constraints: Vec<String>,
}

/// Request payload for `POST /update_design`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionRequest {
    pub design_id: String,
    pub user_edits: String,
}

/// A generated system design together with its versioning metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    pub id: String,
    pub version: NonZeroU32,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub requirements: String,
    #[serde(default)]
    pub assumptions: Map<String, Value>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub design: DesignContent,
}

impl DesignDocument {
    /// Whether this document revises an earlier one.
    pub fn is_revision(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Whether `self` names `other` as its parent.
    pub fn is_revision_of(&self, other: &DesignDocument) -> bool {
        self.parent_id.as_deref() == Some(other.id.as_str())
    }

    /// Shape checks serde cannot express.
    pub fn check(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("design id is empty".to_string());
        }
        if self.parent_id.as_deref() == Some(self.id.as_str()) {
            return Err(format!("design {} names itself as parent", self.id));
        }
        Ok(())
    }
}

impl AsRef<DesignDocument> for DesignDocument {
    fn as_ref(&self) -> &DesignDocument {
        self
    }
}

/// The generated content of a design. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Component>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_estimations: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tradeoffs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_functional_requirements: Option<Map<String, Value>>,
    /// Sections this client does not model, kept for redisplay.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DesignContent {
    /// True when none of the known sections is present.
    pub fn is_empty(&self) -> bool {
        self.components.is_none()
            && self.capacity_estimations.is_none()
            && self.tradeoffs.is_none()
            && self.architecture_patterns.is_none()
            && self.non_functional_requirements.is_none()
    }

    /// Names of sections outside the known schema.
    pub fn unknown_sections(&self) -> impl Iterator<Item = &str> {
        self.extra.keys().map(String::as_str)
    }
}

/// A single architectural component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub responsibilities: Vec<String>,
}

fn null_as_empty<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps arrive either as RFC 3339 or as naive ISO-8601 wall-clock
/// time without an offset. Naive values are read in the local zone, so they
/// display unchanged. A wall-clock time skipped by a DST jump falls back to UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = raw.parse::<NaiveDateTime>().ok()?;
    Some(
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map_or_else(|| naive.and_utc(), |local| local.with_timezone(&Utc)),
    )
}

mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}
