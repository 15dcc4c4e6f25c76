//! Connection string parsing.
//!
//! Grammar: `rqlite:[host=H][;port=P][;username=U][;password=W]`, every field
//! optional but in that order.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::{Result, RqliteError};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: &str = "4001";

const DSN_PATTERN: &str =
    r"^rqlite:(?:host=([^;]*))?(?:;port=([^;]*))?(?:;username=([^;]*))?(?:;password=([^;]*))?$";

fn dsn_regex() -> Result<&'static Regex> {
    static DSN_REGEX: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    DSN_REGEX
        .get_or_init(|| Regex::new(DSN_PATTERN))
        .as_ref()
        .map_err(|err| RqliteError::Configuration(format!("DSN pattern failed to compile: {err}")))
}

/// Parsed connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct Dsn {
    pub host: String,
    pub port: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dsn")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Dsn {
    /// Parses a connection string, applying the default host and port.
    ///
    /// Empty field values count as missing.
    pub fn parse(dsn: &str) -> Result<Self> {
        let captures = dsn_regex()?
            .captures(dsn)
            .ok_or_else(|| RqliteError::Configuration(format!("Invalid DSN {dsn}")))?;

        let field = |index: usize| {
            captures
                .get(index)
                .map(|m| m.as_str())
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };

        Ok(Self {
            host: field(1).unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: field(2).unwrap_or_else(|| DEFAULT_PORT.to_owned()),
            username: field(3),
            password: field(4),
        })
    }

    /// Basic-auth credentials, only when both halves are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }

    /// `scheme://host:port`
    pub fn base_url(&self, scheme: &str) -> String {
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

impl std::str::FromStr for Dsn {
    type Err = RqliteError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
