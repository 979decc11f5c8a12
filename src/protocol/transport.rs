use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{StatusCode, header::HeaderMap};
use thiserror::Error;

pub const CONTENT_TYPE: &str = "application/x-protobuf";
pub const CLIENT_VERSION_HEADER: &str = "x-cip-client-version";
pub const CLIENT_VERSION: &str = concat!("cip-rust/", env!("CARGO_PKG_VERSION"));
pub const INSTANCE_HEADER: &str = "x-cip-instance";
/// Session-affinity header. Echoed back once the server sets it.
pub const SESSION_HEADER: &str = "x-cip-session";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One POST to the service endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireRequest {
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl WireRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw answer to a [`WireRequest`]. Status classification is left to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    /// Value of [`SESSION_HEADER`], if the server sent one.
    pub session: Option<String>,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves encoded envelopes to the service and back.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

/// [`Transport`] over HTTPS with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let mut builder = self.client.post(&self.endpoint);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.body(request.body).send().await?;
        let session = session_header(response.status(), response.headers());
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!("POST {} -> {status} ({} bytes)", self.endpoint, body.len());

        Ok(WireResponse {
            status,
            session,
            body,
        })
    }
}

/// Session token from a successful response. Unreadable values are dropped.
fn session_header(status: StatusCode, headers: &HeaderMap) -> Option<String> {
    if !status.is_success() {
        return None;
    }
    let value = headers.get(SESSION_HEADER)?;
    match value.to_str() {
        Ok(v) => Some(v.to_string()),
        Err(e) => {
            warn!("ignoring unreadable {SESSION_HEADER} header: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let request = WireRequest {
            headers: vec![(INSTANCE_HEADER, "acme".into())],
            body: vec![],
        };
        assert_eq!(request.header("X-CIP-Instance"), Some("acme"));
        assert_eq!(request.header(SESSION_HEADER), None);
    }

    #[test]
    fn session_header_only_read_from_success() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, "node-a".parse().unwrap());

        assert_eq!(session_header(StatusCode::OK, &headers), Some("node-a".to_string()));
        assert_eq!(session_header(StatusCode::BAD_GATEWAY, &headers), None);
        assert_eq!(session_header(StatusCode::OK, &HeaderMap::new()), None);
    }

    #[test]
    fn unreadable_session_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            SESSION_HEADER,
            reqwest::header::HeaderValue::from_bytes(b"n\xffde").unwrap(),
        );

        assert_eq!(session_header(StatusCode::OK, &headers), None);
        assert_eq!(session_header(StatusCode::INTERNAL_SERVER_ERROR, &headers), None);
    }

    #[test]
    fn success_range() {
        let mut response = WireResponse {
            status: 200,
            ..Default::default()
        };
        assert!(response.is_success());
        response.status = 204;
        assert!(response.is_success());
        response.status = 401;
        assert!(!response.is_success());
    }
}
