use std::fmt;

/// Configures how a connection reaches the remote API.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConnectOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Use `https` instead of `http` for the base URL.
    pub tls: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            tls: false,
        }
    }
}

impl ConnectOptions {
    pub(crate) fn scheme(&self) -> &'static str {
        if self.tls {
            "https"
        } else {
            "http"
        }
    }
}

/// Read consistency level sent as `level=` on every request.
///
/// Values other than the three documented levels are passed through to the
/// remote API as-is.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Consistency {
    /// Linearized read served by the leader.
    #[default]
    Strong,
    Weak,
    /// Local read, may be stale.
    None,
    Other(String),
}

impl Consistency {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Strong => "strong",
            Self::Weak => "weak",
            Self::None => "none",
            Self::Other(level) => level,
        }
    }
}

impl From<&str> for Consistency {
    fn from(level: &str) -> Self {
        match level {
            "strong" => Self::Strong,
            "weak" => Self::Weak,
            "none" => Self::None,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for Consistency {
    fn from(level: String) -> Self {
        Self::from(level.as_str())
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
