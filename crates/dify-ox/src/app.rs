use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

use crate::{error::DifyRequestError, request::TransferMethod, tag::Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AppMode {
    Chat,
    AgentChat,
    /// Chatflow.
    AdvancedChat,
    Workflow,
    Completion,
}

/// An application as listed in the console.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct App {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AppMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_active_requests: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, alias = "app_config", skip_serializing_if = "Option::is_none")]
    pub model_config: Option<ModelConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_icon_as_answer_icon: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Model selection inside an app's model config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelSettings {
    pub provider: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    pub completion_params: Map<String, Value>,
}

/// Prompt and feature configuration of a chat or completion app.
///
/// Feature toggles (`speech_to_text`, `retriever_resource`, ...) are kept as raw
/// objects since their shapes change between server releases.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Builder)]
pub struct ModelConfig {
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_prompt: Option<String>,
    /// `simple` or `advanced`.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_type: Option<String>,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_statement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_questions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input_form: Option<Vec<Value>>,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_query_variable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_mode: Option<Value>,
    #[serde(flatten)]
    #[builder(default)]
    pub features: Map<String, Value>,
}

/// Query of `GET console/api/apps`.
#[derive(Debug, Clone, Builder)]
pub struct AppListQuery {
    #[builder(default = 1)]
    pub page: u32,
    #[builder(default = 100)]
    pub limit: u32,
    #[builder(into)]
    pub name: Option<String>,
    #[builder(default)]
    pub is_created_by_me: bool,
    pub mode: Option<AppMode>,
}

impl Default for AppListQuery {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AppListQuery {
    pub(crate) fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
            ("name".to_string(), self.name.clone().unwrap_or_default()),
            ("is_created_by_me".to_string(), self.is_created_by_me.to_string()),
        ];
        if let Some(mode) = self.mode {
            params.push(("mode".to_string(), mode.to_string()));
        }
        params
    }
}

/// Body of `POST console/api/apps`.
#[derive(Debug, Clone, Serialize, Builder)]
pub struct CreateAppRequest {
    #[builder(into)]
    pub name: String,
    pub mode: AppMode,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[builder(into, default = "emoji".to_string())]
    pub icon_type: String,
    #[builder(into, default = "🤖".to_string())]
    pub icon: String,
    #[builder(into, default = "#FFEAD5".to_string())]
    pub icon_background: String,
}

impl CreateAppRequest {
    pub fn validate(&self) -> Result<(), DifyRequestError> {
        if self.name.trim().is_empty() {
            return Err(DifyRequestError::caller("app name must not be empty"));
        }
        Ok(())
    }
}

/// App API key used to authorize the service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey {
    pub id: String,
    #[serde(rename = "type", default)]
    pub key_type: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiKeyList {
    #[serde(default)]
    pub data: Vec<ApiKey>,
}

/// Input controls, upload limits and opening text of an app, from `GET v1/parameters`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_statement: Option<String>,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
    #[serde(default)]
    pub suggested_questions_after_answer: Toggle,
    #[serde(default)]
    pub speech_to_text: Toggle,
    #[serde(default)]
    pub text_to_speech: Toggle,
    #[serde(default)]
    pub retriever_resource: Toggle,
    #[serde(default)]
    pub annotation_reply: Toggle,
    #[serde(default)]
    pub user_input_form: Vec<UserInputItem>,
    #[serde(default)]
    pub file_upload: FileUploadConfig,
    #[serde(default)]
    pub system_parameters: SystemParameters,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Toggle {
    #[serde(default)]
    pub enabled: bool,
}

/// One control of the app's input form, keyed by control kind on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum UserInputItem {
    #[serde(rename = "text-input")]
    TextInput(InputControl),
    #[serde(rename = "paragraph")]
    Paragraph(InputControl),
    #[serde(rename = "select")]
    Select(InputControl),
    #[serde(rename = "number")]
    Number(InputControl),
    #[serde(rename = "file")]
    File(InputControl),
    #[serde(rename = "file-list")]
    FileList(InputControl),
}

impl UserInputItem {
    pub fn control(&self) -> &InputControl {
        match self {
            Self::TextInput(c)
            | Self::Paragraph(c)
            | Self::Select(c)
            | Self::Number(c)
            | Self::File(c)
            | Self::FileList(c) => c,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InputControl {
    pub label: String,
    pub variable: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileUploadConfig {
    #[serde(default)]
    pub image: ImageUploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUploadConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_number_limits")]
    pub number_limits: u32,
    #[serde(default)]
    pub transfer_methods: Vec<TransferMethod>,
}

impl Default for ImageUploadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            number_limits: default_number_limits(),
            transfer_methods: Vec::new(),
        }
    }
}

fn default_number_limits() -> u32 {
    3
}

/// Upload size limits in megabytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemParameters {
    #[serde(default = "default_file_size_limit")]
    pub file_size_limit: u32,
    #[serde(default = "default_image_file_size_limit")]
    pub image_file_size_limit: u32,
    #[serde(default = "default_audio_file_size_limit")]
    pub audio_file_size_limit: u32,
    #[serde(default = "default_video_file_size_limit")]
    pub video_file_size_limit: u32,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            file_size_limit: default_file_size_limit(),
            image_file_size_limit: default_image_file_size_limit(),
            audio_file_size_limit: default_audio_file_size_limit(),
            video_file_size_limit: default_video_file_size_limit(),
        }
    }
}

fn default_file_size_limit() -> u32 {
    10
}

fn default_image_file_size_limit() -> u32 {
    5
}

fn default_audio_file_size_limit() -> u32 {
    10
}

fn default_video_file_size_limit() -> u32 {
    20
}
