use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::error::ClientError;
use crate::api::{DeleteBody, InsertBody, UpdateBody, WireQuery, WireResponse};

/// One finalized request, ready to be put on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum WireCall {
    Find { table: String, query: WireQuery },
    Count { table: String, query: WireQuery },
    Insert { table: String, body: InsertBody },
    Update { table: String, body: UpdateBody },
    Delete { table: String, body: DeleteBody },
}

impl WireCall {
    pub fn table(&self) -> &str {
        match self {
            WireCall::Find { table, .. }
            | WireCall::Count { table, .. }
            | WireCall::Insert { table, .. }
            | WireCall::Update { table, .. }
            | WireCall::Delete { table, .. } => table,
        }
    }

    /// HTTP method, route prefix and JSON body
    pub fn to_http(&self) -> Result<(Method, &'static str, Value), ClientError> {
        Ok(match self {
            WireCall::Find { query, .. } => (Method::POST, "find", serde_json::to_value(query)?),
            WireCall::Count { query, .. } => (Method::POST, "count", serde_json::to_value(query)?),
            WireCall::Insert { body, .. } => (Method::POST, "data", serde_json::to_value(body)?),
            WireCall::Update { body, .. } => (Method::PATCH, "data", serde_json::to_value(body)?),
            WireCall::Delete { body, .. } => (Method::DELETE, "data", serde_json::to_value(body)?),
        })
    }
}

/// Carries a call to the server and returns the `data` of a success envelope.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, call: WireCall) -> Result<Value, ClientError>;
}

/// reqwest-backed transport with an optional bearer token
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::Transport(format!("invalid base url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Transport(format!("invalid base url: {}", base_url)));
        }
        Ok(Self { client: reqwest::Client::new(), base_url, token: None })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join segments onto the base path, escaping each one
    fn join<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Transport(format!("invalid base url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn endpoint(&self, route: &str, table: &str) -> Result<Url, ClientError> {
        self.join(["api", route, table])
    }

    /// GET /health, returning the raw envelope
    pub async fn health(&self) -> Result<Value, ClientError> {
        let url = self.join(["health"])?;
        let response = self.client.get(url).send().await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, call: WireCall) -> Result<Value, ClientError> {
        let (method, route, body) = call.to_http()?;
        let url = self.endpoint(route, call.table())?;
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let envelope: WireResponse<Value> = response.json().await?;
        decode_envelope(envelope, Some(status.as_u16()))
    }
}

/// Unwrap a response envelope into its data or a typed failure
pub fn decode_envelope(envelope: WireResponse<Value>, status: Option<u16>) -> Result<Value, ClientError> {
    if envelope.success {
        return Ok(envelope.data.unwrap_or(Value::Null));
    }
    match envelope.error {
        Some(error) => Err(ClientError::Api {
            status,
            code: error.code,
            message: error.message,
            timestamp: error.timestamp,
        }),
        None => Err(ClientError::Decode("failure envelope without an error".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_route_urls() {
        let transport = HttpTransport::new("http://localhost:3000/").unwrap();
        let url = transport.endpoint("find", "therapy_sessions").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/find/therapy_sessions");

        let transport = HttpTransport::new("https://portal.example/v1").unwrap();
        assert_eq!(
            transport.endpoint("data", "mood_entries").unwrap().as_str(),
            "https://portal.example/v1/api/data/mood_entries"
        );
    }

    #[test]
    fn health_url_keeps_the_base_path() {
        let transport = HttpTransport::new("https://portal.example/v1").unwrap();
        assert_eq!(transport.join(["health"]).unwrap().as_str(), "https://portal.example/v1/health");

        let transport = HttpTransport::new("http://localhost:3000/").unwrap();
        assert_eq!(transport.join(["health"]).unwrap().as_str(), "http://localhost:3000/health");
    }

    #[test]
    fn table_names_are_escaped_as_one_segment() {
        let transport = HttpTransport::new("http://localhost:3000").unwrap();
        let url = transport.endpoint("find", "a/b?c").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/find/a%2Fb%3Fc");
    }

    #[test]
    fn maps_calls_to_methods() {
        let call = WireCall::Delete { table: "profiles".into(), body: DeleteBody::default() };
        let (method, route, body) = call.to_http().unwrap();
        assert_eq!(method, Method::DELETE);
        assert_eq!(route, "data");
        assert_eq!(body, json!({ "where": [] }));
    }

    #[test]
    fn failure_envelopes_become_api_errors() {
        let envelope: WireResponse<Value> = serde_json::from_value(json!({
            "success": false,
            "error": { "code": "ACCESS_DENIED", "message": "nope", "timestamp": "2024-01-01T00:00:00Z" }
        }))
        .unwrap();
        let err = decode_envelope(envelope, Some(403)).unwrap_err();
        assert_eq!(err.code(), Some("ACCESS_DENIED"));
        assert!(matches!(err, ClientError::Api { status: Some(403), .. }));
    }
}
