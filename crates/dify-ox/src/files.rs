use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::error::DifyRequestError;

/// Where an uploaded file will be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum UploadSource {
    #[default]
    Datasets,
    App,
}

/// A file to send to `POST console/api/files/upload`.
#[derive(Clone)]
pub struct FileUploadRequest {
    pub file_name: String,
    pub mime_type: String,
    pub content: Bytes,
}

impl FileUploadRequest {
    /// MIME type is guessed from the file name's extension.
    pub fn from_bytes(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();
        Self {
            file_name,
            mime_type,
            content: content.into(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        Ok(Self {
            file_name,
            mime_type,
            content: content.into(),
        })
    }

    pub fn validate(&self) -> Result<(), DifyRequestError> {
        if self.file_name.trim().is_empty() {
            return Err(DifyRequestError::caller("file name must not be empty"));
        }
        if self.content.is_empty() {
            return Err(DifyRequestError::caller(format!(
                "file {} is empty",
                self.file_name
            )));
        }
        Ok(())
    }

    pub(crate) fn into_form(self) -> Result<reqwest::multipart::Form, DifyRequestError> {
        let part = reqwest::multipart::Part::bytes(self.content.to_vec())
            .file_name(self.file_name)
            .mime_str(&self.mime_type)?;
        Ok(reqwest::multipart::Form::new().part("file", part))
    }
}

impl std::fmt::Debug for FileUploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUploadRequest")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("content", &format_args!("{} bytes", self.content.len()))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    /// Bytes.
    pub size: u64,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_mime_type_from_name() {
        let request = FileUploadRequest::from_bytes("handbook.pdf", b"%PDF-1.7".to_vec());
        assert_eq!(request.mime_type, "application/pdf");

        let request = FileUploadRequest::from_bytes("notes", b"plain".to_vec());
        assert_eq!(request.mime_type, "application/octet-stream");
    }

    #[test]
    fn empty_files_are_rejected() {
        let request = FileUploadRequest::from_bytes("empty.txt", Vec::new());
        assert!(matches!(request.validate(), Err(DifyRequestError::Caller(_))));

        let request = FileUploadRequest::from_bytes("", b"x".to_vec());
        assert!(request.validate().is_err());
    }

    #[test]
    fn debug_hides_content() {
        let request = FileUploadRequest::from_bytes("a.txt", b"secret body".to_vec());
        let debug = format!("{request:?}");
        assert!(debug.contains("11 bytes"));
        assert!(!debug.contains("secret body"));
    }

    #[test]
    fn upload_source_query_value() {
        assert_eq!(UploadSource::default().to_string(), "datasets");
        assert_eq!(UploadSource::App.as_ref(), "app");
    }
}
