use std::fmt;

use super::proto::{Frame, RpcMetadata, Signature, StatementHandle};

#[derive(Clone, PartialEq, prost::Message)]
pub struct OpenConnectionResponse {
    #[prost(message, optional, tag = "1")]
    pub metadata: Option<RpcMetadata>,
    /// Set by servers that assign their own connection ids.
    #[prost(string, tag = "2")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CloseConnectionResponse {
    #[prost(message, optional, tag = "1")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateStatementResponse {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub statement_id: u32,
    #[prost(message, optional, tag = "3")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CloseStatementResponse {
    #[prost(message, optional, tag = "1")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrepareResponse {
    #[prost(message, optional, tag = "1")]
    pub statement: Option<StatementHandle>,
    #[prost(message, optional, tag = "2")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ResultSetResponse {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub statement_id: u32,
    #[prost(bool, tag = "3")]
    pub own_statement: bool,
    #[prost(message, optional, tag = "4")]
    pub signature: Option<Signature>,
    #[prost(message, optional, tag = "5")]
    pub first_frame: Option<Frame>,
    /// `u64::MAX` (-1 on the server) when the statement is a query.
    #[prost(uint64, tag = "6")]
    pub update_count: u64,
    #[prost(message, optional, tag = "7")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ExecuteResponse {
    #[prost(message, repeated, tag = "1")]
    pub results: Vec<ResultSetResponse>,
    #[prost(bool, tag = "2")]
    pub missing_statement: bool,
    #[prost(message, optional, tag = "3")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FetchResponse {
    #[prost(message, optional, tag = "1")]
    pub frame: Option<Frame>,
    #[prost(bool, tag = "2")]
    pub missing_statement: bool,
    #[prost(bool, tag = "3")]
    pub missing_results: bool,
    #[prost(message, optional, tag = "4")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CommitResponse {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RollbackResponse {}

/// The designated error kind. Never surfaces as a [`Response`]; the codec turns it
/// into a [`ProtocolError`](super::ProtocolError).
#[derive(Clone, PartialEq, prost::Message)]
pub struct ErrorResponse {
    #[prost(string, repeated, tag = "1")]
    pub exceptions: Vec<String>,
    #[prost(string, tag = "2")]
    pub error_message: String,
    #[prost(int32, tag = "3")]
    pub severity: i32,
    #[prost(uint32, tag = "4")]
    pub error_code: u32,
    #[prost(string, tag = "5")]
    pub sql_state: String,
    #[prost(message, optional, tag = "6")]
    pub metadata: Option<RpcMetadata>,
    #[prost(bool, tag = "7")]
    pub has_exceptions: bool,
}

/// Every successful response the client understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    OpenConnection(OpenConnectionResponse),
    CloseConnection(CloseConnectionResponse),
    CreateStatement(CreateStatementResponse),
    CloseStatement(CloseStatementResponse),
    Prepare(PrepareResponse),
    Execute(ExecuteResponse),
    ResultSet(ResultSetResponse),
    Fetch(FetchResponse),
    Commit(CommitResponse),
    Rollback(RollbackResponse),
}

impl Response {
    pub fn kind(&self) -> &'static str {
        match self {
            Response::OpenConnection(_) => "OpenConnectionResponse",
            Response::CloseConnection(_) => "CloseConnectionResponse",
            Response::CreateStatement(_) => "CreateStatementResponse",
            Response::CloseStatement(_) => "CloseStatementResponse",
            Response::Prepare(_) => "PrepareResponse",
            Response::Execute(_) => "ExecuteResponse",
            Response::ResultSet(_) => "ResultSetResponse",
            Response::Fetch(_) => "FetchResponse",
            Response::Commit(_) => "CommitResponse",
            Response::Rollback(_) => "RollbackResponse",
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
