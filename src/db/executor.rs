//! Statement execution.
//!
//! No statement-type restriction: whatever the synthesizer produced runs
//! as-is, DML and DDL included.

use crate::db::SqlSession;
use crate::otel::spans::{db_query_span, record_db_metrics};
use crate::types::{AskError, ExecutableQuery, Result, RowSet};
use tracing::Instrument;

/// Run a terminated statement and return its rows.
///
/// # Errors
///
/// Returns `AskError::ExecutionError` with the server's message on failure;
/// other error kinds from the session are normalized into it
pub async fn execute<S: SqlSession>(
    session: &mut S,
    query: &ExecutableQuery,
    namespace: Option<&str>,
) -> Result<RowSet> {
    let span = db_query_span(query.as_str(), namespace);

    async {
        match session.fetch(query.as_str()).await {
            Ok(rows) => {
                record_db_metrics(rows.len());
                tracing::info!(rows = rows.len(), "Query executed");
                Ok(rows)
            }
            Err(AskError::ExecutionError(msg)) => {
                tracing::warn!(error = %msg, "Query failed");
                Err(AskError::ExecutionError(msg))
            }
            Err(other) => {
                tracing::warn!(error = %other, "Query failed");
                Err(AskError::execution(other.to_string()))
            }
        }
    }
    .instrument(span)
    .await
}
