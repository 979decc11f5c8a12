//! Scripted test doubles for the transport and token seams.
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use prost::Message;

use crate::{
    auth::{AccessToken, AuthError, Credentials, TokenSource},
    protocol::{
        NAMESPACE, Transport, TransportError, WireRequest, WireResponse,
        proto::{ColumnMetaData, ColumnValue, Frame, Rep, Row, Signature, TypedValue, WireMessage},
    },
    session::Session,
};

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<WireResponse>,
    requests: Vec<WireRequest>,
}

/// Replays queued responses in order and records every request.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: WireResponse) {
        self.script.lock().unwrap().responses.push_back(response);
    }

    pub fn respond(&self, kind: &str, message: impl Message) {
        self.push(ok(kind, message, None));
    }

    pub fn respond_with_session(&self, kind: &str, message: impl Message, session: &str) {
        self.push(ok(kind, message, Some(session)));
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.script.lock().unwrap().requests.clone()
    }

    /// Short kind names of every request sent so far.
    pub fn sent_kinds(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| {
                let envelope = WireMessage::decode(r.body.as_slice()).unwrap();
                envelope.name.rsplit('$').next().unwrap().to_string()
            })
            .collect()
    }

    /// Decodes the inner message of the `index`th request.
    pub fn sent<M: Message + Default>(&self, index: usize) -> M {
        let request = &self.requests()[index];
        let envelope = WireMessage::decode(request.body.as_slice()).unwrap();
        M::decode(envelope.wrapped_message.as_slice()).unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(request);
        Ok(script.responses.pop_front().unwrap_or(WireResponse {
            status: 500,
            session: None,
            body: b"no scripted response".to_vec(),
        }))
    }
}

fn ok(kind: &str, message: impl Message, session: Option<&str>) -> WireResponse {
    WireResponse {
        status: 200,
        session: session.map(str::to_string),
        body: WireMessage {
            name: format!("{NAMESPACE}.Responses${kind}"),
            wrapped_message: message.encode_to_vec(),
        }
        .encode_to_vec(),
    }
}

/// Hands out numbered tokens and counts how often it was asked.
#[derive(Debug, Clone)]
pub struct StaticTokens {
    fetches: Arc<AtomicUsize>,
    expires_in: Duration,
    fail: bool,
}

impl StaticTokens {
    pub fn new(expires_in: Duration) -> Self {
        Self {
            fetches: Arc::new(AtomicUsize::new(0)),
            expires_in,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Duration::ZERO)
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for StaticTokens {
    async fn fetch_token(&self, _credentials: &Credentials) -> Result<AccessToken, AuthError> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(AuthError::MissingToken);
        }
        Ok(AccessToken {
            token: format!("token-{n}"),
            expires_in: self.expires_in,
        })
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        instance: "acme".into(),
        client_id: "client".into(),
        client_secret: "secret".into(),
    }
}

pub fn session() -> Session<MockTransport, StaticTokens> {
    Session::new(
        MockTransport::new(),
        StaticTokens::new(Duration::from_secs(3600)),
        credentials(),
    )
}

pub fn signature(labels: &[&str]) -> Signature {
    Signature {
        columns: labels
            .iter()
            .map(|l| ColumnMetaData {
                label: l.to_string(),
                ..Default::default()
            })
            .collect(),
        sql: String::new(),
        parameters: vec![],
    }
}

/// A frame of `count` single-column integer rows numbered from `offset`.
pub fn frame(offset: u64, count: usize, done: bool) -> Frame {
    Frame {
        offset,
        done,
        rows: (0..count)
            .map(|i| Row {
                value: vec![ColumnValue {
                    scalar_value: Some(TypedValue {
                        r#type: Rep::Long as i32,
                        number_value: offset as i64 + i as i64,
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
            })
            .collect(),
    }
}
