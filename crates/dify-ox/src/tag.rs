use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

use crate::error::DifyRequestError;

/// What a tag can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TagType {
    App,
    /// Datasets.
    Knowledge,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: TagType,
    /// Sent as a string by some server versions.
    #[serde(default, deserialize_with = "lenient_count")]
    pub binding_count: u64,
}

/// Body of `POST console/api/tags`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateTagRequest<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub tag_type: TagType,
}

/// Body of `POST console/api/tag-bindings/create`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagBindingRequest {
    pub tag_ids: Vec<String>,
    /// App or dataset id.
    pub target_id: String,
    #[serde(rename = "type")]
    pub tag_type: TagType,
}

impl TagBindingRequest {
    pub fn new(
        tag_ids: impl IntoIterator<Item = impl Into<String>>,
        target_id: impl Into<String>,
        tag_type: TagType,
    ) -> Self {
        Self {
            tag_ids: tag_ids.into_iter().map(Into::into).collect(),
            target_id: target_id.into(),
            tag_type,
        }
    }

    pub fn validate(&self) -> Result<(), DifyRequestError> {
        if self.tag_ids.is_empty() || self.tag_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(DifyRequestError::caller("tag_ids must be non-empty ids"));
        }
        if self.target_id.trim().is_empty() {
            return Err(DifyRequestError::caller("target_id must not be empty"));
        }
        Ok(())
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid count {n}"))),
        Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!("invalid count {other}"))),
    }
}
