//! askdb - ask a MySQL database questions in natural language.
//!
//! One question runs through: SSH tunnel, schema fetch, LLM prompt, SQL
//! extraction, execution, at most one corrective retry, tunnel close.

pub mod config;
pub mod db;
pub mod llm;
pub mod otel;
pub mod pipeline;
pub mod present;
pub mod tunnel;
pub mod types;

// Re-export main types
pub use config::{load_env_file, ConnectionDescriptor, ModelSettings, Settings};
pub use db::{MySqlConnector, SchemaInspector};
pub use llm::{extract_sql, LlmClient, SqlGenerator};
pub use pipeline::{Pipeline, PipelineEvent, Reporter};
pub use tunnel::SshTunnelProvider;
pub use types::{Answer, AskError, ExecutableQuery, Result, RowSet};

/// The production pipeline: russh tunnel, sqlx MySQL, HTTP model client.
pub type MySqlPipeline = Pipeline<SshTunnelProvider, MySqlConnector, LlmClient>;

/// Wire the production collaborators from settings.
///
/// # Errors
///
/// Returns `AskError::LlmError` if the HTTP client cannot be built
pub fn build_pipeline(settings: &Settings) -> Result<MySqlPipeline> {
    Ok(Pipeline::new(
        SshTunnelProvider::new(settings.connection.clone()),
        MySqlConnector::new(&settings.connection),
        LlmClient::new(&settings.model)?,
        SchemaInspector::new(settings.sample_rows),
    ))
}
