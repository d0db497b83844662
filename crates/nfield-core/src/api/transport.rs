//! HTTP transport for the Nfield API.
//!
//! The `Transport` trait is the only thing the session manager and the
//! endpoint wrappers depend on: send one request, get back a status code
//! and a parsed body. `HttpTransport` is the reqwest-backed implementation
//! bound to a base URL and a set of transport options.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Proxy, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use super::ApiError;
use crate::config::SessionConfig;

/// A single request against the API, relative to the transport's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Unencoded path segments, e.g. `["v1", "Surveys", "abc", "Settings"]`
    pub segments: Vec<String>,
    pub body: Option<Value>,
    pub headers: BTreeMap<String, String>,
}

impl ApiRequest {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            body: None,
            headers: BTreeMap::new(),
        }
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to serialize body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Path relative to the base URL, for logging and matching
    pub fn path(&self) -> String {
        self.segments.join("/")
    }
}

/// Status code plus body of an API response.
///
/// The body is the parsed JSON document, `Null` when the server sent
/// nothing, or a JSON string holding the raw text when it was not JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body into a typed model
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to decode response body: {}", e))
        })
    }

    /// Turn a non-2xx response into the matching `ApiError`
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.body_text()))
        }
    }

    pub fn body_text(&self) -> String {
        match &self.body {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    fn parse_body(text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

/// Sends requests to the API.
pub trait Transport: Send + Sync {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ApiError>>;
}

/// reqwest-backed transport bound to a base URL.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: &SessionConfig) -> Result<Self, ApiError> {
        let base_url = Self::parse_base_url(&config.server)?;
        let options = &config.transport;

        let mut builder = Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = options.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(ref user_agent) = options.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        if !options.default_headers.is_empty() {
            builder = builder.default_headers(Self::header_map(&options.default_headers)?);
        }
        if let Some(ref proxy) = options.proxy {
            let proxy = Proxy::all(proxy.as_str())
                .map_err(|e| ApiError::InvalidConfig(format!("Invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ApiError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn parse_base_url(server: &str) -> Result<Url, ApiError> {
        // Relative joins drop the last path segment unless it ends with '/'
        let normalized = if server.ends_with('/') {
            server.to_string()
        } else {
            format!("{}/", server)
        };
        let url = Url::parse(&normalized)
            .map_err(|e| ApiError::InvalidConfig(format!("Invalid server URL {}: {}", server, e)))?;
        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidConfig(format!(
                "Server URL cannot be used as a base: {}",
                server
            )));
        }
        Ok(url)
    }

    fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ApiError> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidConfig(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::InvalidConfig(format!("Invalid value for header {}: {}", name, e)))?;
            map.insert(name, value);
        }
        Ok(map)
    }

    fn url_for(&self, segments: &[String]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidConfig(format!("Server URL cannot be used as a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&request.segments)?;
        let path = request.path();
        debug!(method = %request.method, path = %path, "Sending Nfield request");

        let mut builder = self.client.request(request.method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!(status, path = %path, "Received Nfield response");

        Ok(ApiResponse::new(status, ApiResponse::parse_body(&text)))
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, ApiError>> {
        Box::pin(self.execute(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    fn transport_for(server: &str) -> HttpTransport {
        let config = SessionConfig::new(Credentials::default()).with_server(server);
        HttpTransport::new(&config).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let transport = transport_for("https://example.test/api");
        assert_eq!(transport.base_url().as_str(), "https://example.test/api/");
    }

    #[test]
    fn test_segments_join_under_base_path() {
        let transport = transport_for("https://example.test/api/");
        let url = transport
            .url_for(&["v1".to_string(), "SignIn".to_string()])
            .unwrap();
        assert_eq!(url.as_str(), "https://example.test/api/v1/SignIn");
    }

    #[test]
    fn test_segments_are_percent_encoded() {
        let transport = transport_for("https://example.test/");
        let url = transport
            .url_for(&["v1".to_string(), "DefaultTexts".to_string(), "a b/c".to_string()])
            .unwrap();
        assert_eq!(url.as_str(), "https://example.test/v1/DefaultTexts/a%20b%2Fc");
    }

    #[test]
    fn test_invalid_server_is_config_error() {
        let config = SessionConfig::new(Credentials::default()).with_server("not a url");
        assert!(matches!(
            HttpTransport::new(&config),
            Err(ApiError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_default_header_is_config_error() {
        let mut config = SessionConfig::new(Credentials::default());
        config
            .transport
            .default_headers
            .insert("bad header".to_string(), "x".to_string());
        assert!(matches!(
            HttpTransport::new(&config),
            Err(ApiError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_parse_body_variants() {
        assert_eq!(ApiResponse::parse_body(""), Value::Null);
        assert_eq!(ApiResponse::parse_body("3"), serde_json::json!(3));
        assert_eq!(
            ApiResponse::parse_body("not json"),
            Value::String("not json".to_string())
        );
    }

    #[test]
    fn test_error_for_status() {
        let ok = ApiResponse::new(204, Value::Null);
        assert!(ok.error_for_status().is_ok());

        let missing = ApiResponse::new(404, Value::String("gone".to_string()));
        assert!(matches!(
            missing.error_for_status(),
            Err(ApiError::NotFound(ref body)) if body == "gone"
        ));
    }

    #[test]
    fn test_request_path_and_body() {
        let request = ApiRequest::new(Method::PUT, ["v1", "Surveys", "s1", "Languages"])
            .json(&serde_json::json!({"Id": 1, "Name": "Dutch"}))
            .unwrap()
            .header("Authorization", "Basic t");
        assert_eq!(request.path(), "v1/Surveys/s1/Languages");
        assert_eq!(request.body.unwrap()["Name"], "Dutch");
        assert_eq!(request.headers["Authorization"], "Basic t");
    }
}
