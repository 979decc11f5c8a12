use super::proto::{ConnectionInfo, StatementHandle, TypedValue};

#[derive(Clone, PartialEq, prost::Message)]
pub struct OpenConnectionRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(map = "string, string", tag = "2")]
    pub info: ConnectionInfo,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CloseConnectionRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateStatementRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CloseStatementRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub statement_id: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrepareRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(string, tag = "2")]
    pub sql: String,
    #[prost(uint64, tag = "3")]
    pub max_row_count: u64,
    #[prost(int64, tag = "4")]
    pub max_rows_total: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrepareAndExecuteRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(string, tag = "2")]
    pub sql: String,
    #[prost(uint64, tag = "3")]
    pub max_row_count: u64,
    #[prost(uint32, tag = "4")]
    pub statement_id: u32,
    #[prost(int64, tag = "5")]
    pub max_rows_total: i64,
    #[prost(int32, tag = "6")]
    pub first_frame_max_size: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ExecuteRequest {
    #[prost(message, optional, tag = "1")]
    pub statement_handle: Option<StatementHandle>,
    #[prost(message, repeated, tag = "2")]
    pub parameter_values: Vec<TypedValue>,
    #[prost(uint64, tag = "3")]
    pub deprecated_first_frame_max_size: u64,
    #[prost(bool, tag = "4")]
    pub has_parameter_values: bool,
    #[prost(int32, tag = "5")]
    pub first_frame_max_size: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FetchRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub statement_id: u32,
    #[prost(uint64, tag = "3")]
    pub offset: u64,
    /// Superseded by `frame_max_size`; still read by older servers.
    #[prost(uint32, tag = "4")]
    pub fetch_max_row_count: u32,
    #[prost(int32, tag = "5")]
    pub frame_max_size: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CommitRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RollbackRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
}

/// Every request the client can send.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    OpenConnection(OpenConnectionRequest),
    CloseConnection(CloseConnectionRequest),
    CreateStatement(CreateStatementRequest),
    CloseStatement(CloseStatementRequest),
    Prepare(PrepareRequest),
    PrepareAndExecute(PrepareAndExecuteRequest),
    Execute(ExecuteRequest),
    Fetch(FetchRequest),
    Commit(CommitRequest),
    Rollback(RollbackRequest),
}

impl Request {
    /// Short kind name; the last `$` segment of the wire identifier.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::OpenConnection(_) => "OpenConnectionRequest",
            Request::CloseConnection(_) => "CloseConnectionRequest",
            Request::CreateStatement(_) => "CreateStatementRequest",
            Request::CloseStatement(_) => "CloseStatementRequest",
            Request::Prepare(_) => "PrepareRequest",
            Request::PrepareAndExecute(_) => "PrepareAndExecuteRequest",
            Request::Execute(_) => "ExecuteRequest",
            Request::Fetch(_) => "FetchRequest",
            Request::Commit(_) => "CommitRequest",
            Request::Rollback(_) => "RollbackRequest",
        }
    }

    /// Serializes the inner payload, without the envelope.
    pub fn encode_payload(&self) -> Vec<u8> {
        use prost::Message;

        match self {
            Request::OpenConnection(m) => m.encode_to_vec(),
            Request::CloseConnection(m) => m.encode_to_vec(),
            Request::CreateStatement(m) => m.encode_to_vec(),
            Request::CloseStatement(m) => m.encode_to_vec(),
            Request::Prepare(m) => m.encode_to_vec(),
            Request::PrepareAndExecute(m) => m.encode_to_vec(),
            Request::Execute(m) => m.encode_to_vec(),
            Request::Fetch(m) => m.encode_to_vec(),
            Request::Commit(m) => m.encode_to_vec(),
            Request::Rollback(m) => m.encode_to_vec(),
        }
    }

    pub(crate) const KINDS: [&'static str; 10] = [
        "OpenConnectionRequest",
        "CloseConnectionRequest",
        "CreateStatementRequest",
        "CloseStatementRequest",
        "PrepareRequest",
        "PrepareAndExecuteRequest",
        "ExecuteRequest",
        "FetchRequest",
        "CommitRequest",
        "RollbackRequest",
    ];
}
