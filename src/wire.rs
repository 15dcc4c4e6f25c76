//! Request framing for the `/db/query` and `/db/execute` endpoints.

use reqwest::Url;
use serde_json::{Map, Value as JsonValue};

use crate::{BatchStatement, Consistency, Params, Result, RqliteError, Value};

const QUERY_PATH: &str = "/db/query";
const EXECUTE_PATH: &str = "/db/execute";

const READ_KEYWORDS: [&str; 5] = ["SELECT", "WITH", "EXPLAIN", "PRAGMA", "VALUES"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Endpoint {
    Query,
    Execute,
}

impl Endpoint {
    pub(crate) fn path(self) -> &'static str {
        match self {
            Self::Query => QUERY_PATH,
            Self::Execute => EXECUTE_PATH,
        }
    }

    /// Routes read statements to `/db/query`, everything else to `/db/execute`.
    pub(crate) fn for_sql(sql: &str) -> Self {
        let keyword = leading_keyword(sql);
        if READ_KEYWORDS
            .iter()
            .any(|read| keyword.eq_ignore_ascii_case(read))
        {
            Self::Query
        } else {
            Self::Execute
        }
    }
}

fn leading_keyword(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map_or("", |(_, tail)| tail);
        } else {
            break;
        }
    }
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    &rest[..end]
}

pub(crate) fn parse_base_url(base_url: &str) -> Result<Url> {
    Url::parse(base_url)
        .map_err(|err| RqliteError::Configuration(format!("invalid base URL {base_url}: {err}")))
}

/// `<base>/db/{query,execute}?level=<consistency>`
pub(crate) fn statement_url(base: &Url, endpoint: Endpoint, consistency: &Consistency) -> String {
    let mut url = base.clone();
    url.set_path(endpoint.path());
    url.query_pairs_mut()
        .clear()
        .append_pair("level", consistency.as_str());
    url.into()
}

/// `<base>/db/execute`, with the bare `transaction` flag when requested.
pub(crate) fn batch_url(base: &Url, transaction: bool) -> String {
    let mut url = base.clone();
    url.set_path(EXECUTE_PATH);
    url.set_query(transaction.then_some("transaction"));
    url.into()
}

/// Body for a single statement.
///
/// Without parameters the statement is a bare string (`["sql"]`); with
/// parameters it is a nested array (`[["sql", p1, p2]]`), since the API reads
/// the top-level array as a list of statements.
pub(crate) fn statement_body(sql: &str, params: &Params) -> Result<String> {
    encode_body(&[encode_statement(sql, params)?])
}

pub(crate) fn batch_body(statements: &[BatchStatement]) -> Result<String> {
    let encoded = statements
        .iter()
        .map(|statement| encode_statement(&statement.sql, &statement.params))
        .collect::<Result<Vec<_>>>()?;
    encode_body(&encoded)
}

fn encode_body(statements: &[JsonValue]) -> Result<String> {
    serde_json::to_string(statements)
        .map_err(|err| RqliteError::Protocol(format!("could not encode request body: {err}")))
}

fn encode_statement(sql: &str, params: &Params) -> Result<JsonValue> {
    if params.is_empty() {
        return Ok(JsonValue::String(sql.to_owned()));
    }

    let mut statement = vec![JsonValue::String(sql.to_owned())];
    match params {
        Params::Positional(values) => {
            for value in values {
                statement.push(encode_value(value)?);
            }
        }
        Params::Named(values) => {
            let mut named = Map::with_capacity(values.len());
            for (name, value) in values {
                named.insert(normalize_named_parameter_name(name)?, encode_value(value)?);
            }
            statement.push(JsonValue::Object(named));
        }
    }
    Ok(JsonValue::Array(statement))
}

fn encode_value(value: &Value) -> Result<JsonValue> {
    match value {
        Value::Float(value) if !value.is_finite() => Err(RqliteError::Protocol(format!(
            "non-finite float parameter '{value}' is unsupported"
        ))),
        other => serde_json::to_value(other)
            .map_err(|err| RqliteError::Protocol(format!("could not encode parameter: {err}"))),
    }
}

fn normalize_named_parameter_name(name: &str) -> Result<String> {
    let normalized = name.trim_start_matches([':', '@', '$']);
    if normalized.is_empty() {
        return Err(RqliteError::Protocol(
            "named parameter name cannot be empty".to_owned(),
        ));
    }
    Ok(normalized.to_owned())
}
