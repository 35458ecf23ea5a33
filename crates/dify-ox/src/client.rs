use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::{
    Dify,
    app::{ApiKey, ApiKeyList, App, AppListQuery, AppParameters, CreateAppRequest, ModelConfig},
    conversation::{
        Conversation, ConversationList, ConversationListQuery, FeedbackRequest, MessageList,
        MessageListQuery, RenameConversationRequest,
    },
    dataset::{CreateDatasetRequest, CreateDatasetResponse, DatasetList, DatasetListQuery},
    error::DifyRequestError,
    files::{FileUploadRequest, UploadSource, UploadedFile},
    internal::{Endpoint, HttpMethod},
    llm::LlmProviderList,
    request::{
        ChatPayload, CompletionPayload, ResponseMode, WorkflowPayload, require_id, require_key,
        wire_body,
    },
    response::{ChatCompletion, OperationResult, Pagination},
    stream::{self, EventStream},
    tag::{CreateTagRequest, Tag, TagBindingRequest, TagType},
};

const CONSOLE: &str = "console/api";
const CHAT_MESSAGES: &str = "v1/chat-messages";
const COMPLETION_MESSAGES: &str = "v1/completion-messages";
const WORKFLOWS_RUN: &str = "v1/workflows/run";
const WORKFLOW_TASKS: &str = "v1/workflows/tasks";
const PARAMETERS: &str = "v1/parameters";
const CONVERSATIONS: &str = "v1/conversations";
const MESSAGES: &str = "v1/messages";

fn console(path: &str) -> String {
    format!("{CONSOLE}/{path}")
}

/// Decode a 2xx body, reporting schema drift as [`DifyRequestError::UnexpectedResponse`].
fn parse<T: DeserializeOwned>(endpoint: &Endpoint, value: Value) -> Result<T, DifyRequestError> {
    serde_json::from_value(value).map_err(|e| {
        DifyRequestError::UnexpectedResponse(format!(
            "{:?} {}: {e}",
            endpoint.method, endpoint.path
        ))
    })
}

// Streaming

impl Dify {
    /// Send a chat message and stream the answer.
    ///
    /// Fails before any I/O when `api_key` is blank or the payload carries no
    /// input. The request itself is sent when the stream is first polled.
    pub fn chat(&self, api_key: &str, payload: &ChatPayload) -> Result<EventStream, DifyRequestError> {
        let key = require_key(api_key)?;
        payload.validate()?;
        let body = wire_body(payload, ResponseMode::Streaming)?;
        let endpoint = Endpoint::new(CHAT_MESSAGES, HttpMethod::Post).with_bearer(key);
        Ok(stream::drive(self.transport.clone(), endpoint, body))
    }

    /// Run a text-generation app and stream the output.
    pub fn completion(
        &self,
        api_key: &str,
        payload: &CompletionPayload,
    ) -> Result<EventStream, DifyRequestError> {
        let key = require_key(api_key)?;
        payload.validate()?;
        let body = wire_body(payload, ResponseMode::Streaming)?;
        let endpoint = Endpoint::new(COMPLETION_MESSAGES, HttpMethod::Post).with_bearer(key);
        Ok(stream::drive(self.transport.clone(), endpoint, body))
    }

    /// Run a workflow app and stream its workflow and node lifecycle events.
    pub fn run_workflow(
        &self,
        api_key: &str,
        payload: &WorkflowPayload,
    ) -> Result<EventStream, DifyRequestError> {
        let key = require_key(api_key)?;
        payload.validate()?;
        let body = wire_body(payload, ResponseMode::Streaming)?;
        let endpoint = Endpoint::new(WORKFLOWS_RUN, HttpMethod::Post).with_bearer(key);
        Ok(stream::drive(self.transport.clone(), endpoint, body))
    }

    /// Send a chat message and wait for the whole answer.
    pub async fn chat_blocking(
        &self,
        api_key: &str,
        payload: &ChatPayload,
    ) -> Result<ChatCompletion, DifyRequestError> {
        let key = require_key(api_key)?;
        payload.validate()?;
        let body = wire_body(payload, ResponseMode::Blocking)?;
        let endpoint = Endpoint::new(CHAT_MESSAGES, HttpMethod::Post).with_bearer(key);
        let value = self.transport.post(&endpoint, &body).await?;
        parse(&endpoint, value)
    }

    /// Stop a chat generation by the task id seen on its events.
    pub async fn stop_message(
        &self,
        api_key: &str,
        task_id: &str,
        user: &str,
    ) -> Result<OperationResult, DifyRequestError> {
        self.stop(api_key, CHAT_MESSAGES, task_id, user).await
    }

    pub async fn stop_completion(
        &self,
        api_key: &str,
        task_id: &str,
        user: &str,
    ) -> Result<OperationResult, DifyRequestError> {
        self.stop(api_key, COMPLETION_MESSAGES, task_id, user).await
    }

    pub async fn stop_workflow(
        &self,
        api_key: &str,
        task_id: &str,
        user: &str,
    ) -> Result<OperationResult, DifyRequestError> {
        self.stop(api_key, WORKFLOW_TASKS, task_id, user).await
    }

    async fn stop(
        &self,
        api_key: &str,
        base: &str,
        task_id: &str,
        user: &str,
    ) -> Result<OperationResult, DifyRequestError> {
        let key = require_key(api_key)?;
        let task_id = require_id("task id", task_id)?;
        let user = require_id("user", user)?;
        let endpoint =
            Endpoint::new(format!("{base}/{task_id}/stop"), HttpMethod::Post).with_bearer(key);
        let value = self.transport.post(&endpoint, &json!({ "user": user })).await?;
        parse(&endpoint, value)
    }
}

// Apps (console)

impl Dify {
    pub async fn list_apps(&self, query: &AppListQuery) -> Result<Pagination<App>, DifyRequestError> {
        let endpoint =
            Endpoint::new(console("apps"), HttpMethod::Get).with_query_params(query.to_params());
        let value = self.transport.get(&endpoint).await?;
        parse(&endpoint, value)
    }

    pub async fn get_app(&self, app_id: &str) -> Result<App, DifyRequestError> {
        let app_id = require_id("app id", app_id)?;
        let endpoint = Endpoint::new(console(&format!("apps/{app_id}")), HttpMethod::Get);
        let value = self.transport.get(&endpoint).await?;
        parse(&endpoint, value)
    }

    pub async fn create_app(&self, request: &CreateAppRequest) -> Result<App, DifyRequestError> {
        request.validate()?;
        let endpoint = Endpoint::new(console("apps"), HttpMethod::Post);
        let value = self
            .transport
            .post(&endpoint, &serde_json::to_value(request)?)
            .await?;
        parse(&endpoint, value)
    }

    pub async fn delete_app(&self, app_id: &str) -> Result<OperationResult, DifyRequestError> {
        let app_id = require_id("app id", app_id)?;
        self.delete(Endpoint::new(console(&format!("apps/{app_id}")), HttpMethod::Delete))
            .await
    }

    pub async fn update_model_config(
        &self,
        app_id: &str,
        config: &ModelConfig,
    ) -> Result<OperationResult, DifyRequestError> {
        let app_id = require_id("app id", app_id)?;
        let endpoint = Endpoint::new(
            console(&format!("apps/{app_id}/model-config")),
            HttpMethod::Post,
        );
        let value = self
            .transport
            .post(&endpoint, &serde_json::to_value(config)?)
            .await?;
        parse(&endpoint, value)
    }

    pub async fn get_api_keys(&self, app_id: &str) -> Result<Vec<ApiKey>, DifyRequestError> {
        let app_id = require_id("app id", app_id)?;
        let endpoint = Endpoint::new(console(&format!("apps/{app_id}/api-keys")), HttpMethod::Get);
        let value = self.transport.get(&endpoint).await?;
        parse::<ApiKeyList>(&endpoint, value).map(|list| list.data)
    }

    pub async fn create_api_key(&self, app_id: &str) -> Result<ApiKey, DifyRequestError> {
        let app_id = require_id("app id", app_id)?;
        let endpoint = Endpoint::new(console(&format!("apps/{app_id}/api-keys")), HttpMethod::Post);
        let value = self.transport.post(&endpoint, &json!({})).await?;
        parse(&endpoint, value)
    }

    pub async fn delete_api_key(
        &self,
        app_id: &str,
        key_id: &str,
    ) -> Result<OperationResult, DifyRequestError> {
        let app_id = require_id("app id", app_id)?;
        let key_id = require_id("api key id", key_id)?;
        self.delete(Endpoint::new(
            console(&format!("apps/{app_id}/api-keys/{key_id}")),
            HttpMethod::Delete,
        ))
        .await
    }

    /// Publish the draft workflow of a workflow or chatflow app.
    pub async fn publish_workflow(&self, app_id: &str) -> Result<OperationResult, DifyRequestError> {
        let app_id = require_id("app id", app_id)?;
        let endpoint = Endpoint::new(
            console(&format!("apps/{app_id}/workflows/publish")),
            HttpMethod::Post,
        );
        let value = self.transport.post(&endpoint, &json!({})).await?;
        parse(&endpoint, value)
    }

    /// Input form and feature settings of the app behind `api_key`.
    pub async fn get_parameters(&self, api_key: &str) -> Result<AppParameters, DifyRequestError> {
        let key = require_key(api_key)?;
        let endpoint = Endpoint::new(PARAMETERS, HttpMethod::Get).with_bearer(key);
        let value = self.transport.get(&endpoint).await?;
        parse(&endpoint, value)
    }
}

// Conversations (service API)

impl Dify {
    pub async fn list_conversations(
        &self,
        api_key: &str,
        query: &ConversationListQuery,
    ) -> Result<ConversationList, DifyRequestError> {
        let key = require_key(api_key)?;
        require_id("user", &query.user)?;
        let endpoint = Endpoint::new(CONVERSATIONS, HttpMethod::Get)
            .with_query_params(query.to_params())
            .with_bearer(key);
        let value = self.transport.get(&endpoint).await?;
        parse(&endpoint, value)
    }

    pub async fn list_messages(
        &self,
        api_key: &str,
        query: &MessageListQuery,
    ) -> Result<MessageList, DifyRequestError> {
        let key = require_key(api_key)?;
        require_id("conversation id", &query.conversation_id)?;
        require_id("user", &query.user)?;
        let endpoint = Endpoint::new(MESSAGES, HttpMethod::Get)
            .with_query_params(query.to_params())
            .with_bearer(key);
        let value = self.transport.get(&endpoint).await?;
        parse(&endpoint, value)
    }

    pub async fn delete_conversation(
        &self,
        api_key: &str,
        conversation_id: &str,
        user: &str,
    ) -> Result<OperationResult, DifyRequestError> {
        let key = require_key(api_key)?;
        let conversation_id = require_id("conversation id", conversation_id)?;
        let user = require_id("user", user)?;
        self.delete(
            Endpoint::new(format!("{CONVERSATIONS}/{conversation_id}"), HttpMethod::Delete)
                .with_query_params(vec![("user".to_string(), user.to_string())])
                .with_bearer(key),
        )
        .await
    }

    pub async fn rename_conversation(
        &self,
        api_key: &str,
        conversation_id: &str,
        request: &RenameConversationRequest,
    ) -> Result<Conversation, DifyRequestError> {
        let key = require_key(api_key)?;
        let conversation_id = require_id("conversation id", conversation_id)?;
        if !request.auto_generate && request.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
            return Err(DifyRequestError::caller(
                "name is required unless auto_generate is set",
            ));
        }
        let endpoint = Endpoint::new(
            format!("{CONVERSATIONS}/{conversation_id}/name"),
            HttpMethod::Post,
        )
        .with_bearer(key);
        let value = self
            .transport
            .post(&endpoint, &serde_json::to_value(request)?)
            .await?;
        parse(&endpoint, value)
    }

    /// Like, dislike, or with `rating: None` revoke feedback on a message.
    pub async fn submit_feedback(
        &self,
        api_key: &str,
        message_id: &str,
        request: &FeedbackRequest,
    ) -> Result<OperationResult, DifyRequestError> {
        let key = require_key(api_key)?;
        let message_id = require_id("message id", message_id)?;
        let endpoint = Endpoint::new(format!("{MESSAGES}/{message_id}/feedbacks"), HttpMethod::Post)
            .with_bearer(key);
        let value = self
            .transport
            .post(&endpoint, &serde_json::to_value(request)?)
            .await?;
        parse(&endpoint, value)
    }
}

// Tags, datasets, models and files (console)

impl Dify {
    pub async fn list_tags(&self, tag_type: TagType) -> Result<Vec<Tag>, DifyRequestError> {
        let endpoint = Endpoint::new(console("tags"), HttpMethod::Get)
            .with_query_params(vec![("type".to_string(), tag_type.to_string())]);
        let value = self.transport.get(&endpoint).await?;
        parse(&endpoint, value)
    }

    pub async fn create_tag(&self, name: &str, tag_type: TagType) -> Result<Tag, DifyRequestError> {
        let name = require_id("tag name", name)?;
        let endpoint = Endpoint::new(console("tags"), HttpMethod::Post);
        let body = serde_json::to_value(CreateTagRequest { name, tag_type })?;
        let value = self.transport.post(&endpoint, &body).await?;
        parse(&endpoint, value)
    }

    pub async fn delete_tag(&self, tag_id: &str) -> Result<OperationResult, DifyRequestError> {
        let tag_id = require_id("tag id", tag_id)?;
        self.delete(Endpoint::new(console(&format!("tags/{tag_id}")), HttpMethod::Delete))
            .await
    }

    pub async fn bind_tags(
        &self,
        request: &TagBindingRequest,
    ) -> Result<OperationResult, DifyRequestError> {
        request.validate()?;
        let endpoint = Endpoint::new(console("tag-bindings/create"), HttpMethod::Post);
        let value = self
            .transport
            .post(&endpoint, &serde_json::to_value(request)?)
            .await?;
        // answers 200 with an empty body
        if value.is_null() {
            return Ok(OperationResult::default());
        }
        parse(&endpoint, value)
    }

    pub async fn list_datasets(&self, query: &DatasetListQuery) -> Result<DatasetList, DifyRequestError> {
        let endpoint =
            Endpoint::new(console("datasets"), HttpMethod::Get).with_query_params(query.to_params());
        let value = self.transport.get(&endpoint).await?;
        parse(&endpoint, value)
    }

    /// Create a dataset and start indexing the given documents.
    pub async fn create_dataset(
        &self,
        request: &CreateDatasetRequest,
    ) -> Result<CreateDatasetResponse, DifyRequestError> {
        request.validate()?;
        let endpoint = Endpoint::new(console("datasets/init"), HttpMethod::Post);
        let value = self
            .transport
            .post(&endpoint, &serde_json::to_value(request)?)
            .await?;
        parse(&endpoint, value)
    }

    pub async fn delete_dataset(&self, dataset_id: &str) -> Result<OperationResult, DifyRequestError> {
        let dataset_id = require_id("dataset id", dataset_id)?;
        self.delete(Endpoint::new(
            console(&format!("datasets/{dataset_id}")),
            HttpMethod::Delete,
        ))
        .await
    }

    /// LLM providers of the current workspace with their models.
    pub async fn list_llm_providers(&self) -> Result<LlmProviderList, DifyRequestError> {
        let endpoint = Endpoint::new(
            console("workspaces/current/models/model-types/llm"),
            HttpMethod::Get,
        );
        let value = self.transport.get(&endpoint).await?;
        parse(&endpoint, value)
    }

    pub async fn upload_file(
        &self,
        request: FileUploadRequest,
        source: UploadSource,
    ) -> Result<UploadedFile, DifyRequestError> {
        request.validate()?;
        let endpoint = Endpoint::new(console("files/upload"), HttpMethod::Post)
            .with_query_params(vec![("source".to_string(), source.to_string())]);
        let value = self.transport.upload(&endpoint, request.into_form()?).await?;
        parse(&endpoint, value)
    }

    /// `204 No Content` counts as success.
    async fn delete(&self, endpoint: Endpoint) -> Result<OperationResult, DifyRequestError> {
        match self.transport.delete(&endpoint).await? {
            None | Some(Value::Null) => Ok(OperationResult::default()),
            Some(value) => parse(&endpoint, value),
        }
    }
}
