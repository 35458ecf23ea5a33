use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::{Method, RequestBuilder as ReqwestRequestBuilder, Response};
use serde_json::Value;

use crate::{
    config::ClientConfig,
    error::{self, DifyRequestError},
};

/// Raw body chunks of a streaming response, in arrival order.
pub type ByteStream = BoxStream<'static, Result<Bytes, DifyRequestError>>;

/// HTTP method for API endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Represents an API endpoint with its configuration
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub method: HttpMethod,
    pub query_params: Option<Vec<(String, String)>>,
    /// App API key that replaces the configured admin key for this call.
    pub bearer: Option<String>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
            query_params: None,
            bearer: None,
        }
    }

    pub fn with_query_params(mut self, params: Vec<(String, String)>) -> Self {
        self.query_params = Some(params);
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("query_params", &self.query_params)
            .field("bearer", &self.bearer.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// The HTTP seam of the client.
///
/// Implementations inject bearer auth and turn non-2xx statuses into
/// [`DifyRequestError::Api`] after reading the error body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, endpoint: &Endpoint) -> Result<Value, DifyRequestError>;

    async fn post(&self, endpoint: &Endpoint, body: &Value) -> Result<Value, DifyRequestError>;

    /// `Ok(None)` when the server answers with an empty body.
    async fn delete(&self, endpoint: &Endpoint) -> Result<Option<Value>, DifyRequestError>;

    async fn upload(
        &self,
        endpoint: &Endpoint,
        form: reqwest::multipart::Form,
    ) -> Result<Value, DifyRequestError>;

    /// Opens a long-lived request and hands back its body chunks.
    /// Fails before returning when the initial status is not 2xx.
    async fn stream(&self, endpoint: &Endpoint, body: &Value)
    -> Result<ByteStream, DifyRequestError>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a reqwest RequestBuilder for the given endpoint
    fn build_request(
        &self,
        endpoint: &Endpoint,
        add_json_content_type: bool,
    ) -> Result<ReqwestRequestBuilder, DifyRequestError> {
        let url = self.config.url(&endpoint.path);
        let method: Method = endpoint.method.into();

        let token = endpoint
            .bearer
            .as_deref()
            .or(self.config.admin_key.as_deref())
            .filter(|token| !token.trim().is_empty())
            .ok_or(DifyRequestError::AuthenticationMissing)?;

        let mut req = self.config.client.request(method, &url).bearer_auth(token);

        if let Some(ref params) = endpoint.query_params {
            req = req.query(params);
        }

        if let Some(ref user_agent) = self.config.user_agent {
            req = req.header("user-agent", user_agent);
        }

        if let Some(timeout) = self.config.timeout {
            req = req.timeout(timeout);
        }

        if add_json_content_type && matches!(endpoint.method, HttpMethod::Post) {
            req = req.header("content-type", "application/json");
        }

        Ok(req)
    }

    async fn send(
        &self,
        endpoint: &Endpoint,
        req: ReqwestRequestBuilder,
    ) -> Result<Response, DifyRequestError> {
        #[cfg(feature = "leaky-bucket")]
        if let Some(ref limiter) = self.config.leaky_bucket {
            limiter.acquire_one().await;
        }

        log::debug!("{:?} {}", endpoint.method, endpoint.path);
        let res = req.send().await?;
        let status = res.status();

        if status.is_success() {
            Ok(res)
        } else {
            let bytes = res.bytes().await?;
            log::warn!(
                "{:?} {} failed with HTTP {}",
                endpoint.method,
                endpoint.path,
                status.as_u16()
            );
            Err(error::parse_error_response(status, &bytes))
        }
    }

    /// Read a successful response as JSON, treating an empty body as `None`
    async fn read_json(res: Response) -> Result<Option<Value>, DifyRequestError> {
        let status = res.status();
        let bytes = res.bytes().await?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            DifyRequestError::UnexpectedResponse(format!(
                "HTTP {} but failed to decode JSON: {}; body: {}",
                status.as_u16(),
                e,
                String::from_utf8_lossy(&bytes)
            ))
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, endpoint: &Endpoint) -> Result<Value, DifyRequestError> {
        let req = self.build_request(endpoint, false)?;
        let res = self.send(endpoint, req).await?;
        Ok(Self::read_json(res).await?.unwrap_or(Value::Null))
    }

    async fn post(&self, endpoint: &Endpoint, body: &Value) -> Result<Value, DifyRequestError> {
        let req = self.build_request(endpoint, true)?.json(body);
        let res = self.send(endpoint, req).await?;
        Ok(Self::read_json(res).await?.unwrap_or(Value::Null))
    }

    async fn delete(&self, endpoint: &Endpoint) -> Result<Option<Value>, DifyRequestError> {
        let req = self.build_request(endpoint, false)?;
        let res = self.send(endpoint, req).await?;
        Self::read_json(res).await
    }

    async fn upload(
        &self,
        endpoint: &Endpoint,
        form: reqwest::multipart::Form,
    ) -> Result<Value, DifyRequestError> {
        // multipart sets its own content-type with the boundary
        let req = self.build_request(endpoint, false)?.multipart(form);
        let res = self.send(endpoint, req).await?;
        Ok(Self::read_json(res).await?.unwrap_or(Value::Null))
    }

    async fn stream(
        &self,
        endpoint: &Endpoint,
        body: &Value,
    ) -> Result<ByteStream, DifyRequestError> {
        let req = self
            .build_request(endpoint, true)?
            .header("accept", "text/event-stream")
            .json(body);
        let res = self.send(endpoint, req).await?;

        Ok(res
            .bytes_stream()
            .map(|chunk| chunk.map_err(DifyRequestError::from))
            .boxed())
    }
}
