//! Composable per-adapter request policies.
//!
//! Policies inject outbound headers and rewrite each raw SSE `data:` payload
//! before it reaches the structured parser.
//!
//! ```rust
//! use rprovider::{BearerAuthPolicy, ReplaceTextPolicy, RequestPipeline, SecretString};
//!
//! let pipeline = RequestPipeline::new()
//!     .with_policy(BearerAuthPolicy::new(SecretString::new("bce-v3/abc")))
//!     .with_policy(ReplaceTextPolicy::qianfan_normal_finish());
//!
//! let headers = pipeline.headers().expect("headers should build");
//! assert!(headers.contains_key("authorization"));
//!
//! let patched = pipeline.rewrite(r#"{"finish_reason":"normal"}"#);
//! assert_eq!(patched, r#"{"finish_reason":null}"#);
//! ```

use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

use http::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};

use crate::{ProviderError, SecretString};

pub trait PipelinePolicy: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn apply_headers(&self, _headers: &mut HeaderMap) -> Result<(), ProviderError> {
        Ok(())
    }

    fn rewrite_payload<'a>(&self, payload: Cow<'a, str>) -> Cow<'a, str> {
        payload
    }
}

fn sensitive_value(value: &str, header: &str) -> Result<HeaderValue, ProviderError> {
    let mut value = HeaderValue::from_str(value).map_err(|_| {
        ProviderError::configuration(format!("invalid header value for '{header}'"))
    })?;
    value.set_sensitive(true);
    Ok(value)
}

#[derive(Debug)]
pub struct BearerAuthPolicy {
    api_key: SecretString,
}

impl BearerAuthPolicy {
    pub fn new(api_key: SecretString) -> Self {
        Self { api_key }
    }
}

impl PipelinePolicy for BearerAuthPolicy {
    fn name(&self) -> &'static str {
        "bearer_auth"
    }

    fn apply_headers(&self, headers: &mut HeaderMap) -> Result<(), ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::configuration("api key must not be empty"));
        }

        let value = sensitive_value(
            &format!("Bearer {}", self.api_key.expose()),
            AUTHORIZATION.as_str(),
        )?;
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Sends the key in a vendor-specific header, such as `x-api-key`.
#[derive(Debug)]
pub struct ApiKeyHeaderPolicy {
    header: HeaderName,
    api_key: SecretString,
}

impl ApiKeyHeaderPolicy {
    pub fn new(header: &str, api_key: SecretString) -> Result<Self, ProviderError> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|_| ProviderError::configuration(format!("invalid header name '{header}'")))?;
        Ok(Self { header, api_key })
    }
}

impl PipelinePolicy for ApiKeyHeaderPolicy {
    fn name(&self) -> &'static str {
        "api_key_header"
    }

    fn apply_headers(&self, headers: &mut HeaderMap) -> Result<(), ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::configuration("api key must not be empty"));
        }

        let value = sensitive_value(self.api_key.expose(), self.header.as_str())?;
        headers.insert(self.header.clone(), value);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StaticHeaderPolicy {
    name: HeaderName,
    value: HeaderValue,
}

impl StaticHeaderPolicy {
    pub fn new(name: &str, value: &str) -> Result<Self, ProviderError> {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ProviderError::configuration(format!("invalid header name '{name}'")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ProviderError::configuration(format!("invalid header value for '{name}'")))?;

        Ok(Self {
            name: header,
            value,
        })
    }
}

impl PipelinePolicy for StaticHeaderPolicy {
    fn name(&self) -> &'static str {
        "static_header"
    }

    fn apply_headers(&self, headers: &mut HeaderMap) -> Result<(), ProviderError> {
        headers.insert(self.name.clone(), self.value.clone());
        Ok(())
    }
}

/// Literal text substitution on raw SSE payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceTextPolicy {
    from: String,
    to: String,
}

impl ReplaceTextPolicy {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// QianFan marks ordinary mid-stream chunks with `"finish_reason":"normal"`.
    pub fn qianfan_normal_finish() -> Self {
        Self::new(r#""finish_reason":"normal""#, r#""finish_reason":null"#)
    }
}

impl PipelinePolicy for ReplaceTextPolicy {
    fn name(&self) -> &'static str {
        "replace_text"
    }

    fn rewrite_payload<'a>(&self, payload: Cow<'a, str>) -> Cow<'a, str> {
        if self.from.is_empty() || !payload.contains(self.from.as_str()) {
            return payload;
        }

        Cow::Owned(payload.replace(self.from.as_str(), &self.to))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestPipeline {
    policies: Vec<Arc<dyn PipelinePolicy>>,
}

impl RequestPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy<P>(mut self, policy: P) -> Self
    where
        P: PipelinePolicy + 'static,
    {
        self.policies.push(Arc::new(policy));
        self
    }

    pub fn push(&mut self, policy: Arc<dyn PipelinePolicy>) {
        self.policies.push(policy);
    }

    pub fn policy_names(&self) -> Vec<&'static str> {
        self.policies.iter().map(|policy| policy.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Folds every policy's headers, in order, into one map.
    pub fn headers(&self) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        for policy in &self.policies {
            policy.apply_headers(&mut headers)?;
        }
        Ok(headers)
    }

    pub fn rewrite<'a>(&self, payload: &'a str) -> Cow<'a, str> {
        self.policies
            .iter()
            .fold(Cow::Borrowed(payload), |current, policy| {
                policy.rewrite_payload(current)
            })
    }
}
