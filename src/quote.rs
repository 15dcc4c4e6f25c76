use crate::Value;

/// Renders a value for inline SQL.
///
/// Integers and finite floats are emitted as bare numeric literals and null as
/// `NULL`; everything else goes through [`quote_str`].
pub fn quote(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_owned(),
        Value::Integer(value) => value.to_string(),
        Value::Float(value) if value.is_finite() => value.to_string(),
        Value::Float(value) => quote_str(&value.to_string()),
        Value::Text(value) => quote_str(value),
    }
}

/// Quotes text as a single-quoted SQL string literal.
///
/// Single quotes are doubled, then NUL, LF, CR, backslash and SUB (0x1A) are
/// written as C-style escapes: `\000`, `\n`, `\r`, `\\` and `\032`.
pub fn quote_str(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => quoted.push_str("''"),
            '\0' => quoted.push_str(r"\000"),
            '\n' => quoted.push_str(r"\n"),
            '\r' => quoted.push_str(r"\r"),
            '\\' => quoted.push_str(r"\\"),
            '\x1a' => quoted.push_str(r"\032"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('\'');
    quoted
}
