//! Pipeline span helpers.
//!
//! Implements OpenTelemetry semantic conventions for the three external
//! calls a question makes: the SSH tunnel, the model API and MySQL.

use sqlparser::ast::{SetExpr, Statement, TableFactor};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use tracing::{field, span, Level, Span};

/// Span covering one whole question.
pub fn question_span(question_id: &str) -> Span {
    span!(
        Level::INFO,
        "question",
        otel.name = "ask",
        otel.kind = "internal",
        question.id = question_id,
        question.retried = field::Empty,
    )
}

/// Span for opening the SSH forward.
///
/// # Arguments
///
/// * `ssh_host` - Jump host
/// * `remote` - Forward target as `host:port`
pub fn tunnel_span(ssh_host: &str, remote: &str) -> Span {
    span!(
        Level::INFO,
        "tunnel",
        otel.name = %format!("ssh forward {}", remote),
        otel.kind = "client",
        server.address = ssh_host,
        tunnel.remote = remote,
        tunnel.local_port = field::Empty,
    )
}

/// Span for one model call.
pub fn llm_span(system: &str, model: &str) -> Span {
    span!(
        Level::INFO,
        "llm",
        otel.name = %format!("chat {}", model),
        otel.kind = "client",
        gen_ai.system = system,
        gen_ai.operation.name = "chat",
        gen_ai.request.model = model,
    )
}

/// Create database query span.
///
/// Operation and collection come from a best-effort parse of `query_text`;
/// anything the parser rejects is labelled `unknown`.
///
/// # Example
///
/// ```rust,ignore
/// let span = db_query_span("SELECT * FROM customers;", Some("shop"));
/// let rows = run(sql).instrument(span).await?;
/// ```
pub fn db_query_span(query_text: &str, namespace: Option<&str>) -> Span {
    let operation = operation_name(query_text);
    let collection = collection_name(query_text).unwrap_or_else(|| "unknown".to_string());

    let span = span!(
        Level::INFO,
        "db.query",
        otel.name = %format!("{} {}", operation, collection),
        otel.kind = "client",
        db.system.name = "mysql",
        db.operation.name = %operation,
        db.collection.name = %collection,
        db.query.text = query_text,
        db.namespace = field::Empty,
        db.response.returned_rows = field::Empty,
    );

    if let Some(ns) = namespace {
        span.record("db.namespace", ns);
    }

    span
}

/// Record rows returned on the current span.
pub fn record_db_metrics(rows_returned: usize) {
    Span::current().record("db.response.returned_rows", rows_returned);
}

/// First keyword of the statement, uppercased.
pub fn operation_name(sql: &str) -> String {
    sql.split(|c: char| c.is_whitespace() || c == ';' || c == '(')
        .find(|token| !token.is_empty())
        .map(|token| token.to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

/// Primary table of a `SELECT`, if it parses.
pub fn collection_name(sql: &str) -> Option<String> {
    let statements = Parser::parse_sql(&MySqlDialect {}, sql).ok()?;
    match statements.first()? {
        Statement::Query(query) => match query.body.as_ref() {
            SetExpr::Select(select) => match &select.from.first()?.relation {
                TableFactor::Table { name, .. } => Some(name.to_string()),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names() {
        assert_eq!(operation_name("select * from t;"), "SELECT");
        assert_eq!(operation_name("  \nDELETE FROM t"), "DELETE");
        assert_eq!(operation_name("(SELECT 1)"), "SELECT");
        assert_eq!(operation_name(";"), "UNKNOWN");
    }

    #[test]
    fn test_collection_name() {
        assert_eq!(
            collection_name("SELECT * FROM customers WHERE name LIKE '%John%';").as_deref(),
            Some("customers")
        );
        assert_eq!(collection_name("SHOW TABLES;"), None);
        assert_eq!(collection_name("this is not sql"), None);
    }

    #[test]
    fn test_db_span_creation() {
        let span = db_query_span("SELECT 1;", Some("shop"));
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "db.query");
        }
    }
}
