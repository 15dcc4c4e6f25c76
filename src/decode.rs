use serde_json::Value as JsonValue;

use crate::{Envelope, Result, ResultSet, RqliteError, StatementResult, Value};

pub(crate) fn parse_envelope(body: &str) -> Result<Envelope> {
    serde_json::from_str::<Envelope>(body).map_err(|err| {
        RqliteError::Protocol(format!("invalid response envelope JSON: {err}; body: {body}"))
    })
}

/// Fails on the first statement-level error, then checks that one entry came
/// back per submitted statement.
pub(crate) fn check_envelope(envelope: Envelope, expected: usize) -> Result<Envelope> {
    if let Some(message) = envelope.error.as_deref().filter(|m| !m.is_empty()) {
        #[cfg(feature = "tracing")]
        tracing::debug!(error = message, "rqlite rejected the request");
        return Err(RqliteError::Execution {
            statement_index: None,
            message: message.to_owned(),
        });
    }

    if let Some((index, message)) = envelope
        .results
        .iter()
        .enumerate()
        .find_map(|(index, result)| result.error_message().map(|message| (index, message)))
    {
        #[cfg(feature = "tracing")]
        tracing::debug!(statement_index = index, error = message, "rqlite rejected a statement");
        return Err(RqliteError::Execution {
            statement_index: Some(index),
            message: message.to_owned(),
        });
    }

    if envelope.results.len() != expected {
        return Err(RqliteError::Protocol(format!(
            "result count mismatch: expected {expected}, got {}",
            envelope.results.len()
        )));
    }

    Ok(envelope)
}

/// Takes the single entry of a one-statement envelope.
pub(crate) fn into_single_result(envelope: Envelope) -> Result<StatementResult> {
    let envelope = check_envelope(envelope, 1)?;
    envelope
        .results
        .into_iter()
        .next()
        .ok_or_else(|| RqliteError::Protocol("missing statement result".to_owned()))
}

pub(crate) fn decode_result_set(result: StatementResult) -> Result<ResultSet> {
    let width = result.columns.len();
    let rows = result
        .values
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            if row.len() != width {
                return Err(RqliteError::Protocol(format!(
                    "row {index} has {} values for {width} columns",
                    row.len()
                )));
            }
            Ok(row.into_iter().map(decode_value).collect())
        })
        .collect::<Result<Vec<Vec<Value>>>>()?;

    Ok(ResultSet::new(
        result.columns,
        result.types,
        rows,
        result.rows_affected.unwrap_or(0),
        result.last_insert_id,
    ))
}

/// Maps a JSON cell onto a [`Value`].
///
/// Booleans become 0/1; arrays and objects are kept as their JSON text.
pub(crate) fn decode_value(value: JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(flag) => Value::Integer(flag.into()),
        JsonValue::Number(number) => number
            .as_i64()
            .map(Value::Integer)
            .or_else(|| number.as_f64().map(Value::Float))
            .unwrap_or_else(|| Value::Text(number.to_string())),
        JsonValue::String(text) => Value::Text(text),
        other => Value::Text(other.to_string()),
    }
}

/// First cell of the first row as an integer; text cells are parsed.
pub(crate) fn first_scalar_i64(result: &StatementResult) -> Option<i64> {
    match result.values.first()?.first()? {
        JsonValue::Number(number) => number.as_i64(),
        JsonValue::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
