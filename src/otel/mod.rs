//! OpenTelemetry instrumentation for the question pipeline.
//!
//! Follows OpenTelemetry semantic conventions:
//! - https://opentelemetry.io/docs/specs/semconv/database/database-spans/
//! - https://opentelemetry.io/docs/specs/semconv/gen-ai/
//!
//! **Span naming**
//! - `db.query`: `{db.operation.name} {db.collection.name}`, e.g. `SELECT customers`
//! - `llm`: `chat {gen_ai.request.model}`
//! - `tunnel`: `ssh forward {remote}`
//!
//! **Required attributes**:
//! - `db.system.name`: Always `"mysql"`
//!
//! # Example
//!
//! ```rust,ignore
//! use askdb::otel::{db_query_span, record_db_metrics};
//!
//! let span = db_query_span("SELECT * FROM customers;", Some("shop"));
//! let _guard = span.entered();
//! record_db_metrics(rows.len());
//! ```

pub mod init;
pub mod spans;

pub use init::{init_telemetry, LogFormat, TelemetryGuard};
pub use spans::{db_query_span, llm_span, question_span, record_db_metrics, tunnel_span};
