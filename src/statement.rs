use crate::{
    connection::SqlStatement,
    decode,
    wire::{self, Endpoint},
    Connection, Consistency, Params, Result, ResultSet, StatementResult,
};

/// SQL text plus bound parameters, executable any number of times.
///
/// Nothing is held on the server between executions; each
/// [`execute`](Statement::execute) is one self-contained request. The raw
/// result of the last successful execution is kept for
/// [`row_count`](Statement::row_count) and
/// [`last_insert_id`](Statement::last_insert_id).
#[derive(Debug)]
pub struct Statement<'c> {
    connection: &'c Connection,
    sql: String,
    params: Params,
    endpoint: Endpoint,
    consistency: Consistency,
    last_result: Option<StatementResult>,
}

impl<'c> Statement<'c> {
    pub(crate) fn new(connection: &'c Connection, sql: String, consistency: Consistency) -> Self {
        let endpoint = Endpoint::for_sql(&sql);
        Self {
            connection,
            sql,
            params: Params::default(),
            endpoint,
            consistency,
            last_result: None,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Consistency level captured when the statement was prepared.
    pub fn consistency(&self) -> &Consistency {
        &self.consistency
    }

    /// Whether the statement is sent to `/db/query` rather than `/db/execute`.
    pub fn is_read(&self) -> bool {
        self.endpoint == Endpoint::Query
    }

    /// Replaces the bound parameters and drops the cached result.
    pub fn bind(&mut self, params: impl Into<Params>) -> &mut Self {
        self.params = params.into();
        self.last_result = None;
        self
    }

    /// Sends the statement and materializes its result.
    pub fn execute(&mut self) -> Result<ResultSet> {
        self.last_result = None;

        let url = wire::statement_url(self.connection.url(), self.endpoint, &self.consistency);
        let body = wire::statement_body(&self.sql, &self.params)?;
        let envelope = self.connection.post(&url, &body, 1, Some(&self.consistency))?;
        let result = decode::into_single_result(envelope)?;
        let result_set = decode::decode_result_set(result.clone())?;

        self.connection.record_last_insert_id(result.last_insert_id);
        self.last_result = Some(result);
        Ok(result_set)
    }

    /// Whether a successful result is cached.
    pub fn is_executed(&self) -> bool {
        self.last_result.is_some()
    }

    /// `rows_affected` of the last execution, 0 if unavailable.
    pub fn row_count(&self) -> u64 {
        self.last_result
            .as_ref()
            .and_then(|result| result.rows_affected)
            .unwrap_or(0)
    }

    /// `last_insert_id` reported by the last execution, if any.
    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_result.as_ref()?.last_insert_id
    }

    pub fn last_result(&self) -> Option<&StatementResult> {
        self.last_result.as_ref()
    }
}

impl SqlStatement for Statement<'_> {
    fn bind(&mut self, params: Params) {
        Statement::bind(self, params);
    }

    fn execute(&mut self) -> Result<ResultSet> {
        Statement::execute(self)
    }

    fn row_count(&self) -> u64 {
        Statement::row_count(self)
    }
}
