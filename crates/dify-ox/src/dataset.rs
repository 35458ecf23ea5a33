use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::DifyRequestError, response::Pagination};

/// A knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `only_me`, `all_team_members` or `partial_members`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexing_technique: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

pub type DatasetList = Pagination<Dataset>;

/// Query of `GET console/api/datasets`.
#[derive(Debug, Clone, Builder)]
pub struct DatasetListQuery {
    #[builder(default = 1)]
    pub page: u32,
    #[builder(default = 30)]
    pub limit: u32,
    /// Include datasets the current member cannot edit.
    #[builder(default)]
    pub include_all: bool,
    #[builder(default)]
    pub tag_ids: Vec<String>,
}

impl Default for DatasetListQuery {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DatasetListQuery {
    pub(crate) fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
            ("include_all".to_string(), self.include_all.to_string()),
        ];
        if !self.tag_ids.is_empty() {
            params.push(("tag_ids".to_string(), self.tag_ids.join(",")));
        }
        params
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileInfoList {
    pub file_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InfoList {
    pub data_source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info_list: Option<FileInfoList>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub info_list: InfoList,
}

impl DataSource {
    /// Documents previously sent to the file upload endpoint.
    pub fn uploaded_files(file_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            source_type: "upload_file".to_string(),
            info_list: InfoList {
                data_source_type: "upload_file".to_string(),
                file_info_list: Some(FileInfoList {
                    file_ids: file_ids.into_iter().map(Into::into).collect(),
                }),
            },
        }
    }
}

/// Body of `POST console/api/datasets/init`: create a dataset from documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Builder)]
pub struct CreateDatasetRequest {
    pub data_source: DataSource,
    /// `high_quality` or `economy`.
    #[builder(into, default = "high_quality".to_string())]
    pub indexing_technique: String,
    /// Chunking rules; the server applies its automatic rules when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_rule: Option<Value>,
    #[builder(into, default = "text_model".to_string())]
    pub doc_form: String,
    #[builder(into, default = "English".to_string())]
    pub doc_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_model: Option<Value>,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model_provider: Option<String>,
}

impl CreateDatasetRequest {
    pub fn validate(&self) -> Result<(), DifyRequestError> {
        if let Some(ref files) = self.data_source.info_list.file_info_list {
            if files.file_ids.is_empty() {
                return Err(DifyRequestError::caller(
                    "data source lists no files",
                ));
            }
        }
        Ok(())
    }
}

/// A document being indexed into a dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_info: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexing_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateDatasetResponse {
    pub dataset: Dataset,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
}
