#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::missing_docs_in_private_items
)]

//! Client for the Dify platform API.
//!
//! Console endpoints (apps, tags, datasets, models, files) are authorized with the
//! admin key from [`ClientConfig`]. Service endpoints (chat, completion, workflow
//! runs, conversations) take the app API key per call.
//!
//! Streaming calls return an [`EventStream`] of typed [`StreamEvent`]s that ends
//! right after `message_end`, `workflow_finished` or `error`.

pub mod app;
mod client;
pub mod config;
pub mod conversation;
pub mod dataset;
pub mod error;
pub mod event;
pub mod files;
mod internal;
pub mod llm;
pub mod request;
pub mod response;
pub mod sse;
mod stream;
pub mod tag;

use core::fmt;
use std::sync::Arc;

pub use config::ClientConfig;
pub use error::{DecodeError, DifyRequestError, ErrorKind};
pub use event::{EventKind, StreamEvent};
pub use internal::{ByteStream, Endpoint, HttpMethod, HttpTransport, Transport};
pub use request::{ChatPayload, CompletionPayload, ResponseMode, UploadFile, WorkflowPayload};
pub use response::{ChatCompletion, OperationResult, Pagination};
pub use stream::EventStream;

/// Dify API client. Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct Dify {
    transport: Arc<dyn Transport>,
}

impl Dify {
    /// Create a client for `base_url` with a console admin key.
    pub fn new(base_url: impl Into<String>, admin_key: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(base_url, admin_key))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self::with_transport(Arc::new(HttpTransport::new(config)))
    }

    /// Use a custom [`Transport`], e.g. a recording one in tests.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn load_from_env() -> Result<Self, std::env::VarError> {
        ClientConfig::load_from_env().map(Self::from_config)
    }
}

impl fmt::Debug for Dify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dify").finish_non_exhaustive()
    }
}
