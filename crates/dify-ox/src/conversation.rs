use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::RetrieverResource;

/// A conversation held server-side for one end user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationList {
    #[serde(default)]
    pub data: Vec<Conversation>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortBy {
    #[serde(rename = "created_at")]
    CreatedAt,
    #[serde(rename = "-created_at")]
    CreatedAtDesc,
    #[serde(rename = "updated_at")]
    UpdatedAt,
    #[default]
    #[serde(rename = "-updated_at")]
    UpdatedAtDesc,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::CreatedAtDesc => "-created_at",
            Self::UpdatedAt => "updated_at",
            Self::UpdatedAtDesc => "-updated_at",
        }
    }
}

/// Query of `GET v1/conversations`.
#[derive(Debug, Clone, Builder)]
pub struct ConversationListQuery {
    #[builder(into)]
    pub user: String,
    /// Id of the last conversation of the previous page.
    #[builder(into)]
    pub last_id: Option<String>,
    pub limit: Option<u32>,
    pub sort_by: Option<SortBy>,
}

impl ConversationListQuery {
    pub(crate) fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("user".to_string(), self.user.clone())];
        if let Some(ref last_id) = self.last_id {
            params.push(("last_id".to_string(), last_id.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(sort_by) = self.sort_by {
            params.push(("sort_by".to_string(), sort_by.as_str().to_string()));
        }
        params
    }
}

/// A question/answer pair of a conversation's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub message_files: Vec<MessageFileRef>,
    #[serde(default)]
    pub agent_thoughts: Vec<MessageThought>,
    #[serde(default)]
    pub retriever_resources: Vec<RetrieverResource>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageFileRef {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub belongs_to: Option<String>,
}

/// Agent reasoning step as stored in message history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageThought {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageList {
    #[serde(default)]
    pub data: Vec<Message>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub limit: u32,
}

/// Query of `GET v1/messages`.
#[derive(Debug, Clone, Builder)]
pub struct MessageListQuery {
    #[builder(into)]
    pub conversation_id: String,
    #[builder(into)]
    pub user: String,
    /// Id of the first message of the current page, to page backwards.
    #[builder(into)]
    pub first_id: Option<String>,
    pub limit: Option<u32>,
}

impl MessageListQuery {
    pub(crate) fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("conversation_id".to_string(), self.conversation_id.clone()),
            ("user".to_string(), self.user.clone()),
        ];
        if let Some(ref first_id) = self.first_id {
            params.push(("first_id".to_string(), first_id.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

/// Body of `POST v1/conversations/{id}/name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Builder)]
pub struct RenameConversationRequest {
    /// Ignored by the server when `auto_generate` is set.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub auto_generate: bool,
    #[builder(into)]
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Like,
    Dislike,
}

/// Body of `POST v1/messages/{id}/feedbacks`. A `None` rating revokes earlier feedback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Builder)]
pub struct FeedbackRequest {
    pub rating: Option<Rating>,
    #[builder(into)]
    pub user: String,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversation_query_params_skip_unset() {
        let query = ConversationListQuery::builder()
            .user("test_user")
            .limit(2)
            .sort_by(SortBy::UpdatedAt)
            .build();
        assert_eq!(
            query.to_params(),
            vec![
                ("user".to_string(), "test_user".to_string()),
                ("limit".to_string(), "2".to_string()),
                ("sort_by".to_string(), "updated_at".to_string()),
            ]
        );
    }

    #[test]
    fn message_history_parses() {
        let list: MessageList = serde_json::from_value(json!({
            "data": [{
                "id": "msg_123",
                "conversation_id": "conv_123",
                "inputs": {},
                "query": "hello, this is a test question",
                "answer": "hello, this is a test answer",
                "created_at": 1_234_567_890,
                "feedback": {},
                "message_files": [],
                "agent_thoughts": [],
                "retriever_resources": []
            }],
            "has_more": false,
            "limit": 20
        }))
        .unwrap();

        assert_eq!(list.data.len(), 1);
        assert_eq!(list.data[0].feedback, Some(Feedback::default()));
        assert_eq!(list.limit, 20);
    }

    #[test]
    fn feedback_keeps_null_rating() {
        let revoke = FeedbackRequest::builder().user("u1").build();
        assert_eq!(serde_json::to_value(&revoke).unwrap(), json!({"rating": null, "user": "u1"}));

        let like = FeedbackRequest::builder()
            .rating(Rating::Like)
            .user("u1")
            .content("great answer")
            .build();
        assert_eq!(
            serde_json::to_value(&like).unwrap(),
            json!({"rating": "like", "user": "u1", "content": "great answer"})
        );
    }

    #[test]
    fn rename_request_shape() {
        let rename = RenameConversationRequest::builder()
            .auto_generate(true)
            .user("u1")
            .build();
        assert_eq!(
            serde_json::to_value(&rename).unwrap(),
            json!({"auto_generate": true, "user": "u1"})
        );
    }
}
