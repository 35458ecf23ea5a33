#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use bytes::Bytes;
use dify_ox::{ByteStream, DifyRequestError, Endpoint, Transport};
use futures_util::{StreamExt, stream};
use serde_json::Value;

/// What the scripted transport answers to `stream`.
pub enum Script {
    Chunks(Vec<Vec<u8>>),
    /// Chunks, then a connection-level failure.
    ChunksThenFail(Vec<Vec<u8>>),
    /// Non-2xx initial status.
    Reject { status: u16, code: &'static str },
}

/// Transport that records every call and replays a canned response.
pub struct ScriptedTransport {
    script: Mutex<Option<Script>>,
    response: Value,
    calls: AtomicUsize,
    requests: Mutex<Vec<(Endpoint, Option<Value>)>>,
}

impl ScriptedTransport {
    pub fn streaming(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Some(script)),
            response: Value::Null,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(response: Value) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(None),
            response,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> (Endpoint, Option<Value>) {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was recorded")
    }

    fn record(&self, endpoint: &Endpoint, body: Option<&Value>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.clone(), body.cloned()));
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, endpoint: &Endpoint) -> Result<Value, DifyRequestError> {
        self.record(endpoint, None);
        Ok(self.response.clone())
    }

    async fn post(&self, endpoint: &Endpoint, body: &Value) -> Result<Value, DifyRequestError> {
        self.record(endpoint, Some(body));
        Ok(self.response.clone())
    }

    async fn delete(&self, endpoint: &Endpoint) -> Result<Option<Value>, DifyRequestError> {
        self.record(endpoint, None);
        Ok((!self.response.is_null()).then(|| self.response.clone()))
    }

    async fn upload(
        &self,
        endpoint: &Endpoint,
        _form: reqwest::multipart::Form,
    ) -> Result<Value, DifyRequestError> {
        self.record(endpoint, None);
        Ok(self.response.clone())
    }

    async fn stream(&self, endpoint: &Endpoint, body: &Value) -> Result<ByteStream, DifyRequestError> {
        self.record(endpoint, Some(body));

        let script = self
            .script
            .lock()
            .unwrap()
            .take()
            .expect("stream opened more than once");

        match script {
            Script::Chunks(chunks) => Ok(stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c)))).boxed()),
            Script::ChunksThenFail(chunks) => {
                let items = chunks
                    .into_iter()
                    .map(|c| Ok(Bytes::from(c)))
                    .chain(std::iter::once(Err(DifyRequestError::UnexpectedResponse(
                        "connection reset by peer".to_string(),
                    ))));
                Ok(stream::iter(items).boxed())
            }
            Script::Reject { status, code } => Err(DifyRequestError::Api {
                status,
                code: code.to_string(),
                message: "Access token is invalid".to_string(),
            }),
        }
    }
}

/// `data: <json>\n\n` as bytes.
pub fn record(json: &str) -> Vec<u8> {
    format!("data: {json}\n\n").into_bytes()
}
