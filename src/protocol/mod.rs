//! Client-service communication protocol.
//!
//! This module defines the wire protocol spoken with the remote query service: the
//! protobuf message schemas, the envelope codec that wraps and unwraps them, and the
//! transport abstraction that carries encoded envelopes over HTTP.
//!
//! # Overview
//!
//! Every exchange is a single POST whose body is a [`WireMessage`](proto::WireMessage)
//! envelope. The envelope names the inner message with a fully-qualified identifier
//! (`org.apache.calcite.avatica.proto.Requests$<Kind>`) and carries the serialized
//! inner message as bytes. Responses come back the same way under
//! `...Responses$<Kind>`; the last `$` segment selects the decode schema.
//!
//! # Key Components
//!
//! - [`Request`] / [`Response`]: tagged unions over every message kind the client
//!   sends or understands.
//! - [`WireCodec`]: lazily-built kind tables plus envelope encode/decode. An
//!   `ErrorResponse` envelope is raised as a [`ProtocolError`], never returned.
//! - [`Transport`]: abstraction over the HTTP POST, implemented by [`HttpTransport`].
//!
//! # Binary Format
//!
//! Messages use protobuf encoding. Field tags in [`proto`], [`request`] and
//! [`response`] are the service's published schema; changing one breaks
//! compatibility with the server.
//!
//! # See Also
//!
//! - [`session`](crate::session): Sequences requests and applies header discipline.
mod codec;
pub mod proto;
pub mod request;
pub mod response;
mod transport;

pub use codec::{CodecError, ERROR_KIND, NAMESPACE, ProtocolError, Schemas, WireCodec};
pub use request::Request;
pub use response::Response;
pub use transport::{
    CLIENT_VERSION, CLIENT_VERSION_HEADER, CONTENT_TYPE, HttpTransport, INSTANCE_HEADER,
    SESSION_HEADER, Transport, TransportError, WireRequest, WireResponse,
};
