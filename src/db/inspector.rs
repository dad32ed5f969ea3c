//! Schema context for the prompt.
//!
//! The schema text is, per table, its `SHOW CREATE TABLE` DDL followed by a
//! comment block with a few example rows. Candidate table names come from
//! a separate `SHOW TABLES`; if that fails the snapshot carries no names and
//! the prompt falls back to the "all tables" sentinel.

use crate::db::SqlSession;
use crate::types::{cell_text, AskError, Result, RowSet, SchemaSnapshot};
use serde_json::Value as JsonValue;

/// Cells longer than this are cut in sample rows.
const MAX_SAMPLE_CELL_CHARS: usize = 100;

const LIST_TABLES_SQL: &str = "SELECT TABLE_NAME FROM information_schema.TABLES \
WHERE TABLE_SCHEMA = DATABASE() ORDER BY TABLE_NAME;";

const SHOW_TABLES_SQL: &str = "SHOW TABLES;";

/// Reads the schema of the connected database.
#[derive(Debug, Clone)]
pub struct SchemaInspector {
    sample_rows: usize,
}

impl SchemaInspector {
    /// # Arguments
    ///
    /// * `sample_rows` - Example rows per table (0 disables them)
    pub fn new(sample_rows: usize) -> Self {
        Self { sample_rows }
    }

    /// Fetch a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Returns `AskError::SchemaFetchError` if the table definitions cannot
    /// be read. Failure to list candidate tables is not an error.
    pub async fn snapshot<S: SqlSession>(&self, session: &mut S) -> Result<SchemaSnapshot> {
        let table_info = self.table_info(session).await?;
        let table_names = self.table_names(session).await;
        Ok(SchemaSnapshot {
            table_info,
            table_names,
        })
    }

    /// DDL and sample rows for every table, blank-line separated.
    pub async fn table_info<S: SqlSession>(&self, session: &mut S) -> Result<String> {
        let tables = session
            .fetch(LIST_TABLES_SQL)
            .await
            .map(|rows| first_column(&rows))
            .map_err(|e| AskError::SchemaFetchError(format!("cannot list tables: {}", e)))?;

        let mut sections = Vec::with_capacity(tables.len());
        for table in &tables {
            let ddl = session
                .fetch(&format!("SHOW CREATE TABLE {};", quote_identifier(table)))
                .await
                .map_err(|e| AskError::SchemaFetchError(format!("cannot describe {}: {}", table, e)))?;

            let ddl = ddl
                .rows
                .first()
                .and_then(|row| row.get(1))
                .map(cell_text)
                .ok_or_else(|| {
                    AskError::SchemaFetchError(format!("no definition returned for {}", table))
                })?;

            let mut section = ddl;
            if let Some(samples) = self.sample_block(session, table).await {
                section.push_str("\n\n");
                section.push_str(&samples);
            }
            sections.push(section);
        }

        tracing::debug!(tables = tables.len(), "Schema fetched");
        Ok(sections.join("\n\n"))
    }

    /// Table names from `SHOW TABLES`, empty on failure.
    pub async fn table_names<S: SqlSession>(&self, session: &mut S) -> Vec<String> {
        match session.fetch(SHOW_TABLES_SQL).await {
            Ok(rows) => first_column(&rows),
            Err(e) => {
                tracing::warn!(error = %e, "SHOW TABLES failed, using all tables");
                Vec::new()
            }
        }
    }

    async fn sample_block<S: SqlSession>(&self, session: &mut S, table: &str) -> Option<String> {
        if self.sample_rows == 0 {
            return None;
        }

        let sql = format!(
            "SELECT * FROM {} LIMIT {};",
            quote_identifier(table),
            self.sample_rows
        );
        match session.fetch(&sql).await {
            Ok(rows) => Some(format_samples(table, self.sample_rows, &rows)),
            Err(e) => {
                tracing::debug!(table, error = %e, "Skipping sample rows");
                None
            }
        }
    }
}

/// Backtick-quote an identifier, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn first_column(rows: &RowSet) -> Vec<String> {
    rows.rows
        .iter()
        .filter_map(|row| row.first())
        .filter(|value| !value.is_null())
        .map(cell_text)
        .collect()
}

fn format_samples(table: &str, limit: usize, rows: &RowSet) -> String {
    let mut out = format!("/*\n{} rows from {} table:\n", limit, table);
    out.push_str(&rows.columns.join("\t"));
    for row in &rows.rows {
        out.push('\n');
        out.push_str(&row.iter().map(sample_cell).collect::<Vec<_>>().join("\t"));
    }
    out.push_str("\n*/");
    out
}

fn sample_cell(value: &JsonValue) -> String {
    let text = cell_text(value);
    if text.chars().count() > MAX_SAMPLE_CELL_CHARS {
        text.chars().take(MAX_SAMPLE_CELL_CHARS).collect()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    /// Answers by exact SQL text; unknown SQL fails like MySQL would.
    struct Canned {
        responses: HashMap<String, Result<RowSet>>,
    }

    impl Canned {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
            }
        }

        fn on(mut self, sql: &str, response: Result<RowSet>) -> Self {
            self.responses.insert(sql.to_string(), response);
            self
        }
    }

    #[async_trait]
    impl SqlSession for Canned {
        async fn fetch(&mut self, sql: &str) -> Result<RowSet> {
            match self.responses.get(sql) {
                Some(Ok(rows)) => Ok(rows.clone()),
                Some(Err(e)) => Err(AskError::execution(e.to_string())),
                None => Err(AskError::execution(format!("unexpected: {}", sql))),
            }
        }

        async fn close(self) -> Result<()> {
            Ok(())
        }
    }

    fn customers_db() -> Canned {
        Canned::new()
            .on(
                LIST_TABLES_SQL,
                Ok(RowSet::new(vec!["TABLE_NAME".into()], vec![vec![json!("customers")]])),
            )
            .on(
                "SHOW CREATE TABLE `customers`;",
                Ok(RowSet::new(
                    vec!["Table".into(), "Create Table".into()],
                    vec![vec![
                        json!("customers"),
                        json!("CREATE TABLE `customers` (\n  `id` int,\n  `name` varchar(64)\n)"),
                    ]],
                )),
            )
            .on(
                "SELECT * FROM `customers` LIMIT 3;",
                Ok(RowSet::new(
                    vec!["id".into(), "name".into()],
                    vec![vec![json!(1), json!("John Smith")], vec![json!(2), JsonValue::Null]],
                )),
            )
    }

    #[tokio::test]
    async fn test_snapshot_with_samples() {
        let mut session = customers_db().on(
            SHOW_TABLES_SQL,
            Ok(RowSet::new(vec!["Tables_in_shop".into()], vec![vec![json!("customers")]])),
        );

        let snapshot = SchemaInspector::new(3).snapshot(&mut session).await.unwrap();
        assert_eq!(snapshot.table_names, vec!["customers"]);
        assert_eq!(
            snapshot.table_info,
            "CREATE TABLE `customers` (\n  `id` int,\n  `name` varchar(64)\n)\n\n\
/*\n3 rows from customers table:\nid\tname\n1\tJohn Smith\n2\tNULL\n*/"
        );
    }

    #[tokio::test]
    async fn test_show_tables_failure_falls_back_to_sentinel() {
        let mut session = customers_db().on(
            SHOW_TABLES_SQL,
            Err(AskError::execution("SHOW command denied to user")),
        );

        let snapshot = SchemaInspector::new(3).snapshot(&mut session).await.unwrap();
        assert!(snapshot.table_names.is_empty());
        assert_eq!(snapshot.candidate_tables(), "All database tables");
    }

    #[tokio::test]
    async fn test_sample_failure_keeps_ddl() {
        let mut session = customers_db()
            .on("SELECT * FROM `customers` LIMIT 2;", Err(AskError::execution("denied")))
            .on(SHOW_TABLES_SQL, Ok(RowSet::default()));

        let info = SchemaInspector::new(2).table_info(&mut session).await.unwrap();
        assert!(info.starts_with("CREATE TABLE `customers`"));
        assert!(!info.contains("rows from"));
    }

    #[tokio::test]
    async fn test_table_listing_failure_is_fatal() {
        let mut session = Canned::new();
        let err = SchemaInspector::new(3).snapshot(&mut session).await.unwrap_err();
        assert!(matches!(err, AskError::SchemaFetchError(_)));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("orders"), "`orders`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_sample_cells_are_truncated() {
        let long = "x".repeat(150);
        assert_eq!(sample_cell(&json!(long)).len(), MAX_SAMPLE_CELL_CHARS);
    }
}
