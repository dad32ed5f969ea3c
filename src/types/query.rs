//! Per-question values flowing through the pipeline.
//!
//! Nothing here outlives a single question.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Candidate table list used when `SHOW TABLES` cannot be read.
pub const ALL_TABLES_SENTINEL: &str = "All database tables";

/// Schema description fetched fresh for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSnapshot {
    /// DDL plus sample rows for every table
    pub table_info: String,

    /// Table names in server order; empty when listing failed
    pub table_names: Vec<String>,
}

impl SchemaSnapshot {
    /// Candidate tables as rendered into the prompt.
    ///
    /// Falls back to [`ALL_TABLES_SENTINEL`] when no names were listed.
    pub fn candidate_tables(&self) -> String {
        if self.table_names.is_empty() {
            ALL_TABLES_SENTINEL.to_string()
        } else {
            self.table_names.join(", ")
        }
    }
}

/// Input of one synthesis attempt (initial or retry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    /// Natural-language question, or the composite follow-up on retry
    pub question: String,

    /// Full schema text
    pub table_info: String,

    /// Comma-joined candidate tables or the sentinel
    pub candidate_tables: String,
}

impl SynthesisRequest {
    /// Build the request for a question against a schema snapshot.
    pub fn new(question: impl Into<String>, schema: &SchemaSnapshot) -> Self {
        Self {
            question: question.into(),
            table_info: schema.table_info.clone(),
            candidate_tables: schema.candidate_tables(),
        }
    }
}

/// SQL text normalized to end in exactly one statement terminator.
///
/// The only way to obtain one is [`ExecutableQuery::new`], so every
/// statement handed to the executor is terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecutableQuery(String);

impl ExecutableQuery {
    /// Trim the text and append `;` unless it already ends with one.
    pub fn new(sql: impl AsRef<str>) -> Self {
        let mut sql = sql.as_ref().trim().to_string();
        if !sql.ends_with(';') {
            sql.push(';');
        }
        Self(sql)
    }

    /// SQL text including the terminator.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutableQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExecutableQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Rows returned by a statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    /// Column names in result order
    pub columns: Vec<String>,

    /// Row values, one `JsonValue` per column
    pub rows: Vec<Vec<JsonValue>>,
}

impl RowSet {
    /// Create a row set.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` if no rows were returned.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_objects(&self) -> Vec<Map<String, JsonValue>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<Map<String, JsonValue>>()
            })
            .collect()
    }
}

/// Plain-text rendering of a cell, `NULL` for nulls.
pub fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

/// Successful outcome of one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// Question as asked
    pub question: String,

    /// Every statement executed, in order (one or two)
    pub attempts: Vec<ExecutableQuery>,

    /// Rows of the last statement
    pub rows: RowSet,
}

impl Answer {
    /// Statement whose rows are reported.
    pub fn final_query(&self) -> Option<&ExecutableQuery> {
        self.attempts.last()
    }

    /// `true` if the corrective retry ran.
    pub fn was_retried(&self) -> bool {
        self.attempts.len() > 1
    }
}
