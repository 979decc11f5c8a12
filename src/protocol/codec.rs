use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use log::{debug, trace};
use prost::Message;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::{
    Request, Response,
    proto::WireMessage,
    response::{
        CloseConnectionResponse, CloseStatementResponse, CommitResponse, CreateStatementResponse,
        ErrorResponse, ExecuteResponse, FetchResponse, OpenConnectionResponse, PrepareResponse,
        ResultSetResponse, RollbackResponse,
    },
};

/// Package of every message the service dispatches on.
pub const NAMESPACE: &str = "org.apache.calcite.avatica.proto";

/// Response kind carrying a server-side failure.
pub const ERROR_KIND: &str = "ErrorResponse";

/// Server-signalled failure, decoded from an [`ErrorResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("server error {code} (sql state '{sql_state}'): {message}")]
pub struct ProtocolError {
    pub message: String,
    pub sql_state: String,
    pub code: u32,
}

impl From<ErrorResponse> for ProtocolError {
    fn from(value: ErrorResponse) -> Self {
        let message = if value.error_message.is_empty() {
            value.exceptions.join("\n")
        } else {
            value.error_message
        };
        Self {
            message,
            sql_state: value.sql_state,
            code: value.error_code,
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to decode message: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("unknown message kind '{0}'")]
    UnknownKind(String),
    #[error(transparent)]
    Remote(#[from] ProtocolError),
}

type Decoder = fn(&[u8]) -> Result<Response, prost::DecodeError>;

/// Kind tables for both directions. Built once per [`WireCodec`].
#[derive(Debug)]
pub struct Schemas {
    requests: HashMap<&'static str, String>,
    responses: HashMap<&'static str, Decoder>,
}

impl Schemas {
    fn load() -> Self {
        let requests = Request::KINDS
            .iter()
            .map(|kind| (*kind, format!("{NAMESPACE}.Requests${kind}")))
            .collect();

        let mut responses: HashMap<&'static str, Decoder> = HashMap::new();
        responses.insert("OpenConnectionResponse", |b| {
            Ok(Response::OpenConnection(OpenConnectionResponse::decode(b)?))
        });
        responses.insert("CloseConnectionResponse", |b| {
            Ok(Response::CloseConnection(CloseConnectionResponse::decode(b)?))
        });
        responses.insert("CreateStatementResponse", |b| {
            Ok(Response::CreateStatement(CreateStatementResponse::decode(b)?))
        });
        responses.insert("CloseStatementResponse", |b| {
            Ok(Response::CloseStatement(CloseStatementResponse::decode(b)?))
        });
        responses.insert("PrepareResponse", |b| {
            Ok(Response::Prepare(PrepareResponse::decode(b)?))
        });
        responses.insert("ExecuteResponse", |b| {
            Ok(Response::Execute(ExecuteResponse::decode(b)?))
        });
        responses.insert("ResultSetResponse", |b| {
            Ok(Response::ResultSet(ResultSetResponse::decode(b)?))
        });
        responses.insert("FetchResponse", |b| {
            Ok(Response::Fetch(FetchResponse::decode(b)?))
        });
        responses.insert("CommitResponse", |b| {
            Ok(Response::Commit(CommitResponse::decode(b)?))
        });
        responses.insert("RollbackResponse", |b| {
            Ok(Response::Rollback(RollbackResponse::decode(b)?))
        });

        Self {
            requests,
            responses,
        }
    }

    /// Fully-qualified identifier the server dispatches `kind` on.
    pub fn request_name(&self, kind: &str) -> Result<&str, CodecError> {
        self.requests
            .get(kind)
            .map(String::as_str)
            .ok_or_else(|| CodecError::UnknownKind(kind.to_string()))
    }

    /// Wraps the serialized request in an envelope and serializes that.
    pub fn encode(&self, request: &Request) -> Result<Vec<u8>, CodecError> {
        let envelope = WireMessage {
            name: self.request_name(request.kind())?.to_string(),
            wrapped_message: request.encode_payload(),
        };
        trace!("encoded {} ({} bytes)", envelope.name, envelope.wrapped_message.len());
        Ok(envelope.encode_to_vec())
    }

    /// Unwraps an envelope and decodes the inner message by its kind.
    ///
    /// # Errors
    ///
    /// An [`ERROR_KIND`] envelope yields [`CodecError::Remote`]; it is never
    /// returned as a value.
    pub fn decode(&self, bytes: &[u8]) -> Result<Response, CodecError> {
        let envelope = WireMessage::decode(bytes)?;
        let kind = envelope.name.rsplit('$').next().unwrap_or_default();

        if kind == ERROR_KIND {
            let err = ErrorResponse::decode(envelope.wrapped_message.as_slice())?;
            debug!("server returned {ERROR_KIND}: {}", err.error_message);
            return Err(ProtocolError::from(err).into());
        }

        let decoder = self
            .responses
            .get(kind)
            .ok_or_else(|| CodecError::UnknownKind(envelope.name.clone()))?;
        Ok(decoder(envelope.wrapped_message.as_slice())?)
    }
}

/// Lazily-initialized wire codec. Share one behind an `Arc` across sessions.
#[derive(Debug, Default)]
pub struct WireCodec {
    schemas: OnceCell<Schemas>,
    loads: AtomicUsize,
}

impl WireCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kind tables, building them on the first call only. Concurrent
    /// first callers wait on the same initialization.
    pub async fn schemas(&self) -> &Schemas {
        self.schemas
            .get_or_init(|| async {
                self.loads.fetch_add(1, Ordering::SeqCst);
                debug!("loading wire schemas");
                Schemas::load()
            })
            .await
    }

    /// Number of times the kind tables were built.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}
