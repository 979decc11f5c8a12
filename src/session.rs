//! Protocol session engine.
//!
//! A [`Session`] owns one logical connection to the query service: its connection
//! id, the sticky session token echoed for affinity, and the cached bearer token.
//! It turns logical operations into correctly sequenced, authenticated wire
//! requests and classifies the responses.
//!
//! # Lifecycle
//!
//! ```text
//! Unopened --open_connection--> Open --close_connection--> Unopened
//!                                |
//!                                +-- create_statement / execute / prepare
//!                                    fetch / close_statement / commit / rollback
//! ```
//!
//! Statement operations on an unopened session fail with [`Error::NotOpen`] before
//! any network call; opening twice fails with [`Error::AlreadyOpen`].
//!
//! # Request discipline
//!
//! Every call loads the codec's schema tables (once per codec), refreshes the bearer
//! token when it is missing or within [`EXPIRY_MARGIN`](crate::auth::EXPIRY_MARGIN)
//! of expiry, sends one POST carrying the client-version, instance, authorization
//! and (once seen) session headers, records any session header the server returns,
//! and decodes the envelope. Nothing is retried.
//!
//! # Concurrency
//!
//! All operations take `&mut self`, so one session never has two requests in
//! flight. Run independent sessions for parallel work; they may share a
//! [`WireCodec`] through an `Arc`.
use std::sync::Arc;

use log::{debug, info, trace, warn};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    auth::{Credentials, OAuthClient, TokenCache, TokenSource},
    config::Config,
    error::{Error, Result},
    frame::{Frame, RawFrame, ResultPages, normalize_frame},
    protocol::{
        CLIENT_VERSION, CLIENT_VERSION_HEADER, CONTENT_TYPE, HttpTransport, INSTANCE_HEADER,
        Request, Response, SESSION_HEADER, Transport, WireCodec, WireRequest,
        proto::{ConnectionInfo, Signature, StatementHandle},
        request::{
            CloseConnectionRequest, CloseStatementRequest, CommitRequest, CreateStatementRequest,
            ExecuteRequest, FetchRequest, OpenConnectionRequest, PrepareAndExecuteRequest,
            PrepareRequest, RollbackRequest,
        },
        response::{ExecuteResponse, ResultSetResponse},
    },
    row::Record,
    value::Value,
};

/// One result of an execute call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub statement_id: u32,
    /// The server created the statement for this result.
    pub own_statement: bool,
    pub signature: Option<Signature>,
    pub first_frame: Option<Frame>,
    /// Rows affected, for statements that are not queries.
    pub update_count: Option<u64>,
}

impl TryFrom<ResultSetResponse> for ResultSet {
    type Error = Error;

    fn try_from(value: ResultSetResponse) -> Result<Self> {
        let is_query = value
            .signature
            .as_ref()
            .is_some_and(|s| !s.columns.is_empty());
        Ok(Self {
            statement_id: value.statement_id,
            own_statement: value.own_statement,
            signature: value.signature,
            first_frame: normalize_frame(value.first_frame.map(RawFrame::from))?,
            update_count: (!is_query && value.update_count != u64::MAX)
                .then_some(value.update_count),
        })
    }
}

/// A statement prepared but not yet executed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub id: u32,
    pub signature: Option<Signature>,
    handle: StatementHandle,
}

/// Opaque SQL plus bound parameters, as produced by query templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub sql: String,
    pub parameters: Vec<Value>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.parameters.push(value.into());
        self
    }
}

/// Everything [`Session::run`] collected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
    pub update_count: Option<u64>,
}

pub struct Session<T = HttpTransport, S = OAuthClient> {
    transport: T,
    tokens: S,
    codec: Arc<WireCodec>,
    credentials: Credentials,
    token: TokenCache,
    connection_id: Option<String>,
    sticky_session: Option<String>,
}

impl Session {
    /// HTTP session for the configured instance.
    pub fn from_config(config: &Config) -> Self {
        Session::new(
            HttpTransport::new(&config.endpoint),
            OAuthClient::new(&config.token_url),
            config.credentials.clone(),
        )
    }
}

impl<T: Transport, S: TokenSource> Session<T, S> {
    pub fn new(transport: T, tokens: S, credentials: Credentials) -> Self {
        Self::with_codec(transport, tokens, credentials, Arc::new(WireCodec::new()))
    }

    pub fn with_codec(
        transport: T,
        tokens: S,
        credentials: Credentials,
        codec: Arc<WireCodec>,
    ) -> Self {
        Self {
            transport,
            tokens,
            codec,
            credentials,
            token: TokenCache::default(),
            connection_id: None,
            sticky_session: None,
        }
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.connection_id.is_some()
    }

    pub fn sticky_session(&self) -> Option<&str> {
        self.sticky_session.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn tokens(&self) -> &S {
        &self.tokens
    }

    /// Opens the connection and returns its id.
    pub async fn open_connection(&mut self, properties: ConnectionInfo) -> Result<String> {
        if let Some(id) = &self.connection_id {
            return Err(Error::AlreadyOpen(id.clone()));
        }

        let local_id = Uuid::new_v4().to_string();
        let response = self
            .call(Request::OpenConnection(OpenConnectionRequest {
                connection_id: local_id.clone(),
                info: properties,
            }))
            .await?;

        let resp = match response {
            Response::OpenConnection(resp) => resp,
            other => return Err(unexpected("OpenConnectionResponse", &other)),
        };
        let id = if resp.connection_id.is_empty() {
            local_id
        } else {
            resp.connection_id
        };
        info!("opened connection {id}");
        self.connection_id = Some(id.clone());
        Ok(id)
    }

    pub async fn create_statement(&mut self) -> Result<u32> {
        let connection_id = self.require_open()?;
        let response = self
            .call(Request::CreateStatement(CreateStatementRequest { connection_id }))
            .await?;

        match response {
            Response::CreateStatement(resp) => {
                debug!("created statement {}", resp.statement_id);
                Ok(resp.statement_id)
            }
            other => Err(unexpected("CreateStatementResponse", &other)),
        }
    }

    /// Prepares and executes `sql` in one round trip. Without a statement id, a
    /// statement is created first.
    pub async fn execute(
        &mut self,
        statement_id: Option<u32>,
        sql: &str,
        max_rows: u32,
    ) -> Result<Vec<ResultSet>> {
        let connection_id = self.require_open()?;
        let (statement_id, created) = match statement_id {
            Some(id) => (id, false),
            None => (self.create_statement().await?, true),
        };

        debug!("executing on statement {statement_id}: {sql}");
        let results = self
            .call(Request::PrepareAndExecute(PrepareAndExecuteRequest {
                connection_id,
                sql: sql.to_string(),
                max_row_count: max_rows.into(),
                statement_id,
                max_rows_total: -1,
                first_frame_max_size: frame_size(max_rows),
            }))
            .await
            .and_then(result_sets);

        // The caller never saw this id, so it cannot close the statement itself.
        if results.is_err() && created {
            if let Err(e) = self.close_statement(statement_id).await {
                warn!("failed to close statement {statement_id} after execute error: {e}");
            }
        }
        results
    }

    pub async fn prepare_and_execute(&mut self, sql: &str, max_rows: u32) -> Result<Vec<ResultSet>> {
        self.execute(None, sql, max_rows).await
    }

    /// Prepares `sql` without running it.
    pub async fn prepare(&mut self, sql: &str, max_rows: u32) -> Result<PreparedStatement> {
        let connection_id = self.require_open()?;
        let response = self
            .call(Request::Prepare(PrepareRequest {
                connection_id,
                sql: sql.to_string(),
                max_row_count: max_rows.into(),
                max_rows_total: -1,
            }))
            .await?;

        match response {
            Response::Prepare(resp) => {
                let handle = resp.statement.unwrap_or_default();
                debug!("prepared statement {}", handle.id);
                Ok(PreparedStatement {
                    id: handle.id,
                    signature: handle.signature.clone(),
                    handle,
                })
            }
            other => Err(unexpected("PrepareResponse", &other)),
        }
    }

    /// Binds `values` to a prepared statement and runs it.
    pub async fn execute_with_parameters(
        &mut self,
        statement: &PreparedStatement,
        values: &[Value],
        max_frame_size: u32,
    ) -> Result<Vec<ResultSet>> {
        self.require_open()?;
        let parameter_values = values.iter().map(Value::to_typed_value).collect::<Vec<_>>();
        let response = self
            .call(Request::Execute(ExecuteRequest {
                statement_handle: Some(statement.handle.clone()),
                has_parameter_values: !parameter_values.is_empty(),
                parameter_values,
                deprecated_first_frame_max_size: max_frame_size.into(),
                first_frame_max_size: frame_size(max_frame_size),
            }))
            .await?;
        result_sets(response)
    }

    /// Fetches the frame starting at `offset`. `None` means the server has no
    /// further data.
    pub async fn fetch(
        &mut self,
        statement_id: u32,
        offset: u64,
        max_rows: u32,
    ) -> Result<Option<Frame>> {
        let connection_id = self.require_open()?;
        let response = self
            .call(Request::Fetch(FetchRequest {
                connection_id,
                statement_id,
                offset,
                fetch_max_row_count: max_rows,
                frame_max_size: frame_size(max_rows),
            }))
            .await?;

        match response {
            Response::Fetch(resp) => {
                if resp.missing_statement || resp.missing_results {
                    warn!(
                        "statement {statement_id} reported missing (statement: {}, results: {})",
                        resp.missing_statement, resp.missing_results
                    );
                }
                Ok(normalize_frame(resp.frame.map(RawFrame::from))?)
            }
            other => Err(unexpected("FetchResponse", &other)),
        }
    }

    pub async fn close_statement(&mut self, statement_id: u32) -> Result<()> {
        let connection_id = self.require_open()?;
        let response = self
            .call(Request::CloseStatement(CloseStatementRequest {
                connection_id,
                statement_id,
            }))
            .await?;

        match response {
            Response::CloseStatement(_) => {
                debug!("closed statement {statement_id}");
                Ok(())
            }
            other => Err(unexpected("CloseStatementResponse", &other)),
        }
    }

    /// Closes the connection. The session is unopened afterwards even when the
    /// close request fails.
    pub async fn close_connection(&mut self) -> Result<()> {
        let connection_id = self.require_open()?;
        let result = self
            .call(Request::CloseConnection(CloseConnectionRequest {
                connection_id: connection_id.clone(),
            }))
            .await;

        self.connection_id = None;
        self.sticky_session = None;

        match result? {
            Response::CloseConnection(_) => {
                info!("closed connection {connection_id}");
                Ok(())
            }
            other => Err(unexpected("CloseConnectionResponse", &other)),
        }
    }

    pub async fn commit(&mut self) -> Result<()> {
        let connection_id = self.require_open()?;
        match self.call(Request::Commit(CommitRequest { connection_id })).await? {
            Response::Commit(_) => Ok(()),
            other => Err(unexpected("CommitResponse", &other)),
        }
    }

    pub async fn rollback(&mut self) -> Result<()> {
        let connection_id = self.require_open()?;
        match self
            .call(Request::Rollback(RollbackRequest { connection_id }))
            .await?
        {
            Response::Rollback(_) => Ok(()),
            other => Err(unexpected("RollbackResponse", &other)),
        }
    }

    /// Pages over `result`, fetching `max_rows` at a time.
    pub fn pages(&mut self, result: ResultSet, max_rows: u32) -> ResultPages<'_, T, S> {
        ResultPages::new(self, result, max_rows)
    }

    /// Runs `query` to completion and collects every row. The statement is closed
    /// on every path; the first error wins.
    pub async fn run(&mut self, query: &Query, max_rows: u32) -> Result<QueryOutput> {
        self.run_until(query, max_rows, || false).await
    }

    /// Like [`run`](Self::run), but checks `stop` after every page and returns the
    /// rows collected so far, without fetching further, once it reports `true`.
    pub async fn run_until<F>(
        &mut self,
        query: &Query,
        max_rows: u32,
        stop: F,
    ) -> Result<QueryOutput>
    where
        F: Fn() -> bool,
    {
        self.require_open()?;

        let (statement_id, results) = if query.parameters.is_empty() {
            let id = self.create_statement().await?;
            (id, self.execute(Some(id), &query.sql, max_rows).await)
        } else {
            let prepared = self.prepare(&query.sql, max_rows).await?;
            let results = self
                .execute_with_parameters(&prepared, &query.parameters, max_rows)
                .await;
            (prepared.id, results)
        };

        let output = match results {
            Ok(results) => self.collect_results(results, max_rows, &stop).await,
            Err(e) => Err(e),
        };
        let closed = self.close_statement(statement_id).await;

        let output = output?;
        closed?;
        Ok(output)
    }

    async fn collect_results<F>(
        &mut self,
        results: Vec<ResultSet>,
        max_rows: u32,
        stop: &F,
    ) -> Result<QueryOutput>
    where
        F: Fn() -> bool,
    {
        let mut output = QueryOutput::default();
        for result in results {
            if output.columns.is_empty() {
                output.columns = crate::row::column_labels(result.signature.as_ref());
            }
            if let Some(count) = result.update_count {
                *output.update_count.get_or_insert(0) += count;
            }

            let statement_id = result.statement_id;
            let mut pages = self.pages(result, max_rows);
            while let Some(page) = pages.next_page().await? {
                output.rows.extend(page);
                if stop() {
                    info!(
                        "stopped paging statement {statement_id} after {} rows",
                        output.rows.len()
                    );
                    return Ok(output);
                }
            }
        }
        Ok(output)
    }

    fn require_open(&self) -> Result<String> {
        self.connection_id.clone().ok_or(Error::NotOpen)
    }

    async fn ensure_token(&mut self) -> Result<String> {
        if let Some(token) = self.token.valid(Instant::now()) {
            return Ok(token.to_string());
        }

        debug!("refreshing access token");
        let fresh = self.tokens.fetch_token(&self.credentials).await?;
        let token = fresh.token.clone();
        self.token.store(fresh, Instant::now());
        Ok(token)
    }

    async fn call(&mut self, request: Request) -> Result<Response> {
        let codec = Arc::clone(&self.codec);
        let schemas = codec.schemas().await;
        let token = self.ensure_token().await?;
        let body = schemas.encode(&request)?;

        let mut headers = vec![
            ("content-type", CONTENT_TYPE.to_string()),
            (CLIENT_VERSION_HEADER, CLIENT_VERSION.to_string()),
            (INSTANCE_HEADER, self.credentials.instance.clone()),
            ("authorization", format!("Bearer {token}")),
        ];
        if let Some(session) = &self.sticky_session {
            headers.push((SESSION_HEADER, session.clone()));
        }

        trace!("sending {}", request.kind());
        let response = self.transport.send(WireRequest { headers, body }).await?;
        if !response.is_success() {
            if response.status == 401 {
                debug!("server rejected the bearer token, dropping it");
                self.token.clear();
            }
            return Err(Error::Transport {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }
        if let Some(session) = response.session {
            self.sticky_session = Some(session);
        }

        Ok(schemas.decode(&response.body)?)
    }
}

fn result_sets(response: Response) -> Result<Vec<ResultSet>> {
    match response {
        Response::Execute(ExecuteResponse { results, .. }) => {
            results.into_iter().map(ResultSet::try_from).collect()
        }
        Response::ResultSet(result) => Ok(vec![result.try_into()?]),
        other => Err(unexpected("ExecuteResponse", &other)),
    }
}

fn frame_size(max_rows: u32) -> i32 {
    i32::try_from(max_rows).unwrap_or(i32::MAX)
}

fn unexpected(expected: &'static str, actual: &Response) -> Error {
    Error::UnexpectedResponse {
        expected,
        actual: actual.kind(),
    }
}
