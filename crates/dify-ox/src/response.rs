use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::Metadata;

/// Page of results as returned by list endpoints. Passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Pagination<T> {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
    #[serde(default)]
    pub data: Vec<T>,
}

impl<T> Pagination<T> {
    pub fn has_more(&self) -> bool {
        self.has_more.unwrap_or(false)
    }
}

fn first_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// `{"result": "success"}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationResult {
    #[serde(default = "success")]
    pub result: String,
}

impl OperationResult {
    pub fn is_success(&self) -> bool {
        self.result == "success"
    }
}

impl Default for OperationResult {
    fn default() -> Self {
        Self { result: success() }
    }
}

fn success() -> String {
    "success".to_string()
}

/// Result of a chat message sent with `response_mode = blocking`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// App mode, e.g. `chat`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub answer: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
