use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{error::DecodeError, sse::DATA_PREFIX};

/// Discriminator of a streamed event, as written in its `event` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Message,
    AgentMessage,
    AgentThought,
    MessageFile,
    MessageEnd,
    MessageReplace,
    TtsMessage,
    TtsMessageEnd,
    Error,
    Ping,
    WorkflowStarted,
    NodeStarted,
    NodeFinished,
    WorkflowFinished,
}

/// One decoded record of a chat, completion or workflow stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    Message(MessageChunk),
    /// Emitted instead of `Message` when the app runs in agent mode.
    AgentMessage(MessageChunk),
    AgentThought(AgentThought),
    MessageFile(MessageFile),
    MessageEnd(MessageEnd),
    MessageReplace(MessageReplace),
    TtsMessage(TtsAudio),
    TtsMessageEnd(TtsAudio),
    Error(ErrorEvent),
    Ping,
    WorkflowStarted(WorkflowEvent<WorkflowStartedData>),
    NodeStarted(WorkflowEvent<NodeStartedData>),
    NodeFinished(WorkflowEvent<NodeFinishedData>),
    WorkflowFinished(WorkflowEvent<WorkflowFinishedData>),
}

impl StreamEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Message(_) => EventKind::Message,
            Self::AgentMessage(_) => EventKind::AgentMessage,
            Self::AgentThought(_) => EventKind::AgentThought,
            Self::MessageFile(_) => EventKind::MessageFile,
            Self::MessageEnd(_) => EventKind::MessageEnd,
            Self::MessageReplace(_) => EventKind::MessageReplace,
            Self::TtsMessage(_) => EventKind::TtsMessage,
            Self::TtsMessageEnd(_) => EventKind::TtsMessageEnd,
            Self::Error(_) => EventKind::Error,
            Self::Ping => EventKind::Ping,
            Self::WorkflowStarted(_) => EventKind::WorkflowStarted,
            Self::NodeStarted(_) => EventKind::NodeStarted,
            Self::NodeFinished(_) => EventKind::NodeFinished,
            Self::WorkflowFinished(_) => EventKind::WorkflowFinished,
        }
    }

    /// Task id to pass to the stop endpoints, when the event carries one.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Message(e) | Self::AgentMessage(e) => e.task_id.as_deref(),
            Self::AgentThought(e) => Some(&e.task_id),
            Self::MessageFile(e) => e.task_id.as_deref(),
            Self::MessageEnd(e) => e.task_id.as_deref(),
            Self::MessageReplace(e) => Some(&e.task_id),
            Self::TtsMessage(e) | Self::TtsMessageEnd(e) => e.task_id.as_deref(),
            Self::Error(e) => e.task_id.as_deref(),
            Self::Ping => None,
            Self::WorkflowStarted(e) => e.task_id.as_deref(),
            Self::NodeStarted(e) => e.task_id.as_deref(),
            Self::NodeFinished(e) => e.task_id.as_deref(),
            Self::WorkflowFinished(e) => e.task_id.as_deref(),
        }
    }

    /// Message-end, workflow-finished and error events close the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::MessageEnd(_) | Self::WorkflowFinished(_) | Self::Error(_)
        )
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Self::Ping)
    }

    /// Answer fragment of `message`/`agent_message` events.
    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Message(e) | Self::AgentMessage(e) => Some(&e.answer),
            _ => None,
        }
    }
}

/// A piece of a progressively generated answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub answer: String,
    pub created_at: i64,
}

/// One step of tool-augmented reasoning in agent mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentThought {
    pub id: String,
    pub task_id: String,
    pub message_id: String,
    pub conversation_id: String,
    /// Position of the thought within the message, starting at 1.
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_files: Option<Vec<String>>,
    pub created_at: i64,
}

/// A file produced while generating the answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageFile {
    pub id: String,
    #[serde(rename = "type")]
    pub file_type: String,
    /// `user` or `assistant`.
    pub belongs_to: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// Successful end of a chat or completion stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageEnd {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retriever_resources: Vec<RetrieverResource>,
    /// Metadata keys this crate does not model yet.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Token and cost accounting of one generation. Prices are decimal strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    #[serde(default, deserialize_with = "decimal_string", skip_serializing_if = "Option::is_none")]
    pub prompt_unit_price: Option<String>,
    #[serde(default, deserialize_with = "decimal_string", skip_serializing_if = "Option::is_none")]
    pub prompt_price_unit: Option<String>,
    #[serde(default, deserialize_with = "decimal_string", skip_serializing_if = "Option::is_none")]
    pub prompt_price: Option<String>,
    #[serde(default, deserialize_with = "decimal_string", skip_serializing_if = "Option::is_none")]
    pub completion_unit_price: Option<String>,
    #[serde(default, deserialize_with = "decimal_string", skip_serializing_if = "Option::is_none")]
    pub completion_price_unit: Option<String>,
    #[serde(default, deserialize_with = "decimal_string", skip_serializing_if = "Option::is_none")]
    pub completion_price: Option<String>,
    #[serde(default, deserialize_with = "decimal_string", skip_serializing_if = "Option::is_none")]
    pub total_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
}

/// A knowledge-base segment the answer drew on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrieverResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Replaces all answer text received so far, e.g. after moderation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageReplace {
    pub task_id: String,
    pub message_id: String,
    pub conversation_id: String,
    pub answer: String,
    pub created_at: i64,
}

/// Base64 speech fragment. The `tts_message_end` marker carries an empty `audio`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TtsAudio {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub audio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// Application-level failure reported by the server inside the stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// HTTP-equivalent status code.
    pub status: u16,
    pub code: String,
    pub message: String,
}

/// Common envelope of workflow and node lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowEvent<D> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub workflow_run_id: String,
    pub data: D,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    PartialSucceeded,
    Failed,
    Exception,
    Stopped,
    /// A status this client does not know yet.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStartedData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeStartedData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Execution order of the node within the run.
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predecessor_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeFinishedData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predecessor_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Map<String, Value>>,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_metadata: Option<ExecutionMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, deserialize_with = "decimal_string", skip_serializing_if = "Option::is_none")]
    pub total_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowFinishedData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
}

/// Prices arrive as decimal strings, but some deployments send bare numbers.
fn decimal_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a decimal string or number, got {other}"
        ))),
    }
}

/// Join the `data:` lines of a record into its payload text.
pub fn record_payload(record: &str) -> String {
    record
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode one SSE record (`data: {...}`) into a typed event.
pub fn decode(record: &str) -> Result<StreamEvent, DecodeError> {
    decode_payload(&record_payload(record))
}

/// Decode the JSON payload of a record into a typed event.
///
/// Unknown fields are ignored. Unknown tags and missing required fields are errors.
pub fn decode_payload(payload: &str) -> Result<StreamEvent, DecodeError> {
    let value: Value = serde_json::from_str(payload).map_err(DecodeError::InvalidJson)?;

    let tag = match value.as_object().map(|obj| obj.get("event")) {
        None => return Err(DecodeError::NotAnObject),
        Some(None | Some(Value::Null)) => return Err(DecodeError::MissingTag),
        Some(Some(Value::String(tag))) => tag.clone(),
        Some(Some(other)) => return Err(DecodeError::UnknownTag(other.to_string())),
    };

    if EventKind::from_str(&tag).is_err() {
        return Err(DecodeError::UnknownTag(tag));
    }

    serde_json::from_value(value).map_err(|source| DecodeError::InvalidPayload { tag, source })
}
