//! Database access through the tunnel.
//!
//! - `SqlSession` / `Connector`: the seam between the pipeline and MySQL
//! - `SchemaInspector`: schema text and table names for the prompt
//! - `execute`: runs a synthesized statement

pub mod executor;
pub mod inspector;
pub mod mysql;

use crate::types::{Result, RowSet};
use async_trait::async_trait;
use std::net::SocketAddr;

pub use executor::execute;
pub use inspector::SchemaInspector;
pub use mysql::{MySqlConnector, MySqlSession};

/// An open database connection.
#[async_trait]
pub trait SqlSession: Send {
    /// Run SQL text as-is and collect every row.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ExecutionError` carrying the server's message
    async fn fetch(&mut self, sql: &str) -> Result<RowSet>;

    /// Close the connection gracefully.
    async fn close(self) -> Result<()>;
}

/// Opens sessions against a local tunnel endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: SqlSession;

    /// Connect to the database listening on `addr`.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConnectionError` if the handshake fails
    async fn connect(&self, addr: SocketAddr) -> Result<Self::Session>;

    /// Database (schema) name, used as the span namespace.
    fn database(&self) -> &str;
}
