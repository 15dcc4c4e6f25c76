//! `rqlite-http` is a blocking SQL driver adapter for the rqlite HTTP API.
//!
//! A [`Connection`] is opened from a DSN such as
//! `rqlite:host=10.0.0.5;port=4002` and exposes the usual driver surface:
//! - [`Connection::prepare`] / [`Statement::execute`]
//! - [`Connection::query`] and [`Connection::exec`]
//! - [`Connection::quote`]
//! - [`Connection::transaction_raw`] for atomic batches
//!
//! Interactive transactions (`begin_transaction`, `commit`, `rollback`) are
//! not available over the HTTP API and always fail.

mod connection;
mod decode;
mod dsn;
mod error;
mod options;
mod params;
mod quote;
mod result_set;
mod statement;
mod transport;
mod types;
mod value;
mod wire;

pub use connection::{Connection, SqlConnection, SqlStatement, DSN_ENV_VAR};
pub use dsn::{Dsn, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{RqliteError, TransportError};
pub use options::{ConnectOptions, Consistency};
pub use params::{BatchStatement, Params};
pub use quote::{quote, quote_str};
pub use result_set::{ResultSet, Row};
pub use statement::Statement;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{Envelope, StatementResult};
pub use value::Value;

pub type Result<T> = std::result::Result<T, RqliteError>;
