use serde::Deserialize;

/// Decoded response body: one entry per submitted statement.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(default)]
    pub results: Vec<StatementResult>,
    /// Request-level failure reported outside `results`.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub time: Option<f64>,
}

/// Result entry for a single statement.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct StatementResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub last_insert_id: Option<i64>,
    #[serde(default)]
    pub rows_affected: Option<u64>,
    #[serde(default)]
    pub time: Option<f64>,
}

impl StatementResult {
    /// Non-empty `error` field, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|message| !message.is_empty())
    }
}
