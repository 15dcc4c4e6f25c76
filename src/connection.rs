use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use reqwest::Url;

use crate::{
    decode,
    quote::{quote, quote_str},
    wire::{self, Endpoint},
    BatchStatement, ConnectOptions, Consistency, Dsn, Envelope, HttpTransport, Params,
    ReqwestTransport, Result, ResultSet, RqliteError, Statement, TransportError, Value,
};

/// Environment variable read by [`Connection::from_env`].
pub const DSN_ENV_VAR: &str = "RQLITE_DSN";

/// The driver method set shared by SQL connections.
///
/// Backends that cannot honour interactive transactions still implement
/// `begin_transaction`, `commit` and `rollback`, and fail them.
pub trait SqlConnection {
    type Statement<'a>: SqlStatement
    where
        Self: 'a;

    fn prepare(&self, sql: &str) -> Self::Statement<'_>;
    fn query(&self, sql: &str) -> Result<ResultSet>;
    fn exec(&self, sql: &str) -> Result<u64>;
    fn quote(&self, value: &Value) -> String;
    fn begin_transaction(&self) -> Result<()>;
    fn commit(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;
    fn last_insert_id(&self, name: Option<&str>) -> i64;
}

/// A reusable prepared statement.
pub trait SqlStatement {
    fn bind(&mut self, params: Params);
    fn execute(&mut self) -> Result<ResultSet>;
    fn row_count(&self) -> u64;
}

/// Logical database handle over the rqlite HTTP API.
///
/// A connection is `Send` but not `Sync`: it caches the last reported insert
/// id, so share it between threads by handing it over, not by reference.
pub struct Connection {
    transport: Arc<dyn HttpTransport>,
    url: Url,
    base_url: String,
    consistency: Consistency,
    last_insert_id: Cell<Option<i64>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url)
            .field("consistency", &self.consistency)
            .finish()
    }
}

impl Connection {
    /// Opens a connection from a DSN with default options.
    ///
    /// ```no_run
    /// use rqlite_http::Connection;
    ///
    /// let conn = Connection::open("rqlite:host=10.0.0.5;port=4002")?;
    /// assert_eq!(conn.base_url(), "http://10.0.0.5:4002");
    /// # Ok::<(), rqlite_http::RqliteError>(())
    /// ```
    pub fn open(dsn: &str) -> Result<Self> {
        Self::open_with_options(dsn, ConnectOptions::default())
    }

    pub fn open_with_options(dsn: &str, options: ConnectOptions) -> Result<Self> {
        let dsn = Dsn::parse(dsn)?;
        let transport = ReqwestTransport::for_dsn(&dsn, &options)?;
        Self::with_transport(dsn.base_url(options.scheme()), Arc::new(transport))
    }

    /// Opens a connection from the DSN in `RQLITE_DSN`.
    ///
    /// Returns a configuration error if the variable is missing or empty.
    pub fn from_env() -> Result<Self> {
        let dsn = std::env::var(DSN_ENV_VAR).map_err(|_| {
            RqliteError::Configuration(format!("missing {DSN_ENV_VAR} environment variable"))
        })?;
        if dsn.trim().is_empty() {
            return Err(RqliteError::Configuration(format!(
                "{DSN_ENV_VAR} is set but empty"
            )));
        }
        Self::open(dsn.trim())
    }

    /// Binds a connection to `base_url` (`scheme://host:port`) over an
    /// externally owned HTTP capability.
    pub fn with_transport(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        let url = wire::parse_base_url(&base_url)?;
        Ok(Self {
            transport,
            url,
            base_url,
            consistency: Consistency::default(),
            last_insert_id: Cell::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn consistency(&self) -> &Consistency {
        &self.consistency
    }

    /// Sets the read consistency for statements prepared from now on.
    pub fn set_consistency(&mut self, level: impl Into<Consistency>) {
        self.consistency = level.into();
    }

    /// The HTTP capability this connection posts through.
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    pub fn prepare(&self, sql: impl Into<String>) -> Statement<'_> {
        Statement::new(self, sql.into(), self.consistency.clone())
    }

    pub fn query(&self, sql: &str) -> Result<ResultSet> {
        self.prepare(sql).execute()
    }

    /// Executes `sql` and returns the number of affected rows.
    pub fn exec(&self, sql: &str) -> Result<u64> {
        let mut statement = self.prepare(sql);
        statement.execute()?;
        Ok(statement.row_count())
    }

    pub fn quote(&self, value: impl Into<Value>) -> String {
        quote(&value.into())
    }

    pub fn begin_transaction(&self) -> Result<()> {
        Err(RqliteError::Unsupported("BEGIN"))
    }

    pub fn commit(&self) -> Result<()> {
        Err(RqliteError::Unsupported("COMMIT"))
    }

    pub fn rollback(&self) -> Result<()> {
        Err(RqliteError::Unsupported("ROLLBACK"))
    }

    /// Applies `statements` atomically in one request to
    /// `/db/execute?transaction`.
    ///
    /// The first statement-level error fails the whole call.
    pub fn transaction_raw<I>(&self, statements: I) -> Result<Envelope>
    where
        I: IntoIterator,
        I::Item: Into<BatchStatement>,
    {
        self.run_batch(statements, true)
    }

    /// Like [`Connection::transaction_raw`] but without the `transaction`
    /// flag: the remote store applies each statement independently.
    pub fn execute_batch<I>(&self, statements: I) -> Result<Envelope>
    where
        I: IntoIterator,
        I::Item: Into<BatchStatement>,
    {
        self.run_batch(statements, false)
    }

    /// Returns the last insert id.
    ///
    /// With a table name, the value is read from `sqlite_sequence` in a
    /// separate query; any failure of that lookup yields 0. Without one, the
    /// id reported by the last statement executed on this connection is
    /// returned (0 if none).
    pub fn last_insert_id(&self, name: Option<&str>) -> i64 {
        let Some(table) = name else {
            return self.last_insert_id.get().unwrap_or(0);
        };

        match self.sequence_value(table) {
            Ok(seq) => seq.unwrap_or(0),
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(table, error = %_err, "sqlite_sequence lookup failed, returning 0");
                0
            }
        }
    }

    fn sequence_value(&self, table: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT seq FROM sqlite_sequence WHERE name = {}",
            quote_str(table)
        );
        let url = wire::statement_url(&self.url, Endpoint::Query, &self.consistency);
        let body = wire::statement_body(&sql, &Params::default())?;
        let envelope = self.post(&url, &body, 1, Some(&self.consistency))?;
        let result = decode::into_single_result(envelope)?;
        Ok(decode::first_scalar_i64(&result))
    }

    fn run_batch<I>(&self, statements: I, transaction: bool) -> Result<Envelope>
    where
        I: IntoIterator,
        I::Item: Into<BatchStatement>,
    {
        let statements: Vec<BatchStatement> = statements.into_iter().map(Into::into).collect();
        if statements.is_empty() {
            return Ok(Envelope::default());
        }

        let url = wire::batch_url(&self.url, transaction);
        let body = wire::batch_body(&statements)?;
        let response = self.post(&url, &body, statements.len(), None)?;
        let envelope = decode::check_envelope(response, statements.len())?;

        if let Some(id) = envelope.results.iter().rev().find_map(|r| r.last_insert_id) {
            self.record_last_insert_id(Some(id));
        }
        Ok(envelope)
    }

    /// One round trip: transport failure and non-2xx status surface before
    /// the body is decoded.
    pub(crate) fn post(
        &self,
        url: &str,
        body: &str,
        _statements: usize,
        _level: Option<&Consistency>,
    ) -> Result<Envelope> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            url,
            statements = _statements,
            level = _level.map(Consistency::as_str),
            "posting to rqlite"
        );

        let response = self.transport.post_json(url, body)?;
        if !response.is_success() {
            #[cfg(feature = "tracing")]
            tracing::debug!(status = response.status, "rqlite returned non-success status");
            return Err(TransportError::Status {
                status: response.status,
                body: response.body,
            }
            .into());
        }
        decode::parse_envelope(&response.body)
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    pub(crate) fn record_last_insert_id(&self, id: Option<i64>) {
        if id.is_some() {
            self.last_insert_id.set(id);
        }
    }
}

impl SqlConnection for Connection {
    type Statement<'a> = Statement<'a>
    where
        Self: 'a;

    fn prepare(&self, sql: &str) -> Statement<'_> {
        Connection::prepare(self, sql)
    }

    fn query(&self, sql: &str) -> Result<ResultSet> {
        Connection::query(self, sql)
    }

    fn exec(&self, sql: &str) -> Result<u64> {
        Connection::exec(self, sql)
    }

    fn quote(&self, value: &Value) -> String {
        quote(value)
    }

    fn begin_transaction(&self) -> Result<()> {
        Connection::begin_transaction(self)
    }

    fn commit(&self) -> Result<()> {
        Connection::commit(self)
    }

    fn rollback(&self) -> Result<()> {
        Connection::rollback(self)
    }

    fn last_insert_id(&self, name: Option<&str>) -> i64 {
        Connection::last_insert_id(self, name)
    }
}
