use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DifyRequestError;

/// How the server should deliver the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Server-sent events, one record per event.
    #[default]
    Streaming,
    /// A single JSON document once generation is done. Not allowed for agent apps.
    Blocking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Document,
    #[default]
    Image,
    Audio,
    Video,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMethod {
    RemoteUrl,
    LocalFile,
}

/// A file attached to a chat, completion or workflow request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFile {
    #[serde(rename = "type", default)]
    pub file_type: FileType,
    pub transfer_method: TransferMethod,
    /// Required for [`TransferMethod::RemoteUrl`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Required for [`TransferMethod::LocalFile`]; the id returned by a file upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_file_id: Option<String>,
}

impl UploadFile {
    pub fn remote(file_type: FileType, url: impl Into<String>) -> Self {
        Self {
            file_type,
            transfer_method: TransferMethod::RemoteUrl,
            url: Some(url.into()),
            upload_file_id: None,
        }
    }

    pub fn local(file_type: FileType, upload_file_id: impl Into<String>) -> Self {
        Self {
            file_type,
            transfer_method: TransferMethod::LocalFile,
            url: None,
            upload_file_id: Some(upload_file_id.into()),
        }
    }

    pub fn validate(&self) -> Result<(), DifyRequestError> {
        let (field, value) = match self.transfer_method {
            TransferMethod::RemoteUrl => ("url", &self.url),
            TransferMethod::LocalFile => ("upload_file_id", &self.upload_file_id),
        };
        if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
            return Err(DifyRequestError::caller(format!(
                "{field} is required when transfer_method is {:?}",
                self.transfer_method
            )));
        }
        Ok(())
    }
}

/// Body of `POST v1/chat-messages`.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(builder_type(vis = "pub"), state_mod(vis = "pub"))]
pub struct ChatPayload {
    #[builder(into, default)]
    pub query: String,
    /// Values for the variables the app defines.
    #[builder(default)]
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[builder(default)]
    #[serde(default)]
    pub response_mode: ResponseMode,
    /// End-user identifier, unique within the app.
    #[builder(into)]
    pub user: String,
    /// Continue an existing conversation.
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<UploadFile>,
    #[builder(default = true)]
    #[serde(default = "default_true")]
    pub auto_generate_name: bool,
}

impl ChatPayload {
    pub fn validate(&self) -> Result<(), DifyRequestError> {
        require_input(&self.query, &self.inputs)?;
        validate_files(&self.files)
    }
}

/// Body of `POST v1/completion-messages`.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(builder_type(vis = "pub"), state_mod(vis = "pub"))]
pub struct CompletionPayload {
    #[builder(into, default)]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[builder(default)]
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[builder(default)]
    #[serde(default)]
    pub response_mode: ResponseMode,
    #[builder(into)]
    pub user: String,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<UploadFile>,
}

impl CompletionPayload {
    pub fn validate(&self) -> Result<(), DifyRequestError> {
        require_input(&self.query, &self.inputs)?;
        validate_files(&self.files)
    }
}

/// Body of `POST v1/workflows/run`.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(builder_type(vis = "pub"), state_mod(vis = "pub"))]
pub struct WorkflowPayload {
    #[builder(default)]
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[builder(default)]
    #[serde(default)]
    pub response_mode: ResponseMode,
    #[builder(into)]
    pub user: String,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<UploadFile>,
}

impl WorkflowPayload {
    /// Workflows take no free text, so empty `inputs` means empty input.
    pub fn validate(&self) -> Result<(), DifyRequestError> {
        require_input("", &self.inputs)?;
        validate_files(&self.files)
    }
}

fn default_true() -> bool {
    true
}

fn require_input(query: &str, inputs: &Map<String, Value>) -> Result<(), DifyRequestError> {
    if query.trim().is_empty() && inputs.is_empty() {
        return Err(DifyRequestError::caller(
            "query and inputs are both empty",
        ));
    }
    Ok(())
}

fn validate_files(files: &[UploadFile]) -> Result<(), DifyRequestError> {
    files.iter().try_for_each(UploadFile::validate)
}

/// Non-blank credential or [`DifyRequestError::AuthenticationMissing`].
pub(crate) fn require_key(api_key: &str) -> Result<&str, DifyRequestError> {
    let key = api_key.trim();
    if key.is_empty() {
        return Err(DifyRequestError::AuthenticationMissing);
    }
    Ok(key)
}

/// Non-blank identifier or a caller error naming it.
pub(crate) fn require_id<'a>(what: &str, id: &'a str) -> Result<&'a str, DifyRequestError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(DifyRequestError::caller(format!("{what} must not be empty")));
    }
    Ok(id)
}

/// Serialize `payload` with `response_mode` forced to `mode`.
pub(crate) fn wire_body<T: Serialize>(
    payload: &T,
    mode: ResponseMode,
) -> Result<Value, DifyRequestError> {
    let mut body = serde_json::to_value(payload)?;
    if let Value::Object(ref mut map) = body {
        map.insert("response_mode".to_string(), serde_json::to_value(mode)?);
    }
    Ok(body)
}
