use bon::Builder;
use core::fmt;
use std::time::Duration;

#[cfg(feature = "leaky-bucket")]
use leaky_bucket::RateLimiter;
#[cfg(feature = "leaky-bucket")]
use std::sync::Arc;

pub const BASE_URL: &str = "https://api.dify.ai";

/// Connection settings handed to [`crate::HttpTransport`].
///
/// `admin_key` authorizes console endpoints. Service endpoints (chat, completion,
/// workflows, conversations) are authorized per call with an app API key instead.
#[derive(Clone, Builder)]
pub struct ClientConfig {
    #[builder(default = BASE_URL.to_string(), into)]
    pub base_url: String,
    #[builder(into)]
    pub admin_key: Option<String>,
    #[builder(into)]
    pub user_agent: Option<String>,
    /// Whole-request timeout. For streams it bounds the entire exchange.
    pub timeout: Option<Duration>,
    #[builder(default)]
    pub client: reqwest::Client,
    #[cfg(feature = "leaky-bucket")]
    pub leaky_bucket: Option<Arc<RateLimiter>>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, admin_key: impl Into<String>) -> Self {
        Self::builder()
            .base_url(base_url)
            .admin_key(admin_key)
            .build()
    }

    /// Reads `DIFY_ADMIN_KEY` and, when set, `DIFY_BASE_URL`.
    pub fn load_from_env() -> Result<Self, std::env::VarError> {
        let admin_key = std::env::var("DIFY_ADMIN_KEY")?;
        let base_url = std::env::var("DIFY_BASE_URL").unwrap_or_else(|_| BASE_URL.to_string());
        Ok(Self::new(base_url, admin_key))
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("admin_key", &self.admin_key.as_ref().map(|_| "[REDACTED]"))
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
