//! MySQL sessions over sqlx.
//!
//! Statements go through the text protocol (`raw_sql`) so anything the
//! server accepts runs unchanged, including statements MySQL refuses to
//! prepare.

use crate::config::ConnectionDescriptor;
use crate::db::{Connector, SqlSession};
use crate::types::{AskError, Result, RowSet};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlConnectOptions, MySqlRow};
use sqlx::{Column, Connection, MySqlConnection, Row, TypeInfo, ValueRef};
use std::net::SocketAddr;

/// Connects to MySQL with the descriptor's database credentials.
pub struct MySqlConnector {
    user: String,
    password: String,
    database: String,
}

impl MySqlConnector {
    pub fn new(descriptor: &ConnectionDescriptor) -> Self {
        Self {
            user: descriptor.db_user.clone(),
            password: descriptor.db_password.clone(),
            database: descriptor.db_name.clone(),
        }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    type Session = MySqlSession;

    async fn connect(&self, addr: SocketAddr) -> Result<MySqlSession> {
        let options = MySqlConnectOptions::new()
            .host(&addr.ip().to_string())
            .port(addr.port())
            .username(&self.user)
            .password(&self.password)
            .database(&self.database);

        let conn = MySqlConnection::connect_with(&options).await.map_err(|e| {
            AskError::ConnectionError(format!("{}@{}/{}: {}", self.user, addr, self.database, e))
        })?;

        tracing::debug!(addr = %addr, database = %self.database, "MySQL connected");
        Ok(MySqlSession { conn })
    }

    fn database(&self) -> &str {
        &self.database
    }
}

/// One MySQL connection, alive for one question.
pub struct MySqlSession {
    conn: MySqlConnection,
}

#[async_trait]
impl SqlSession for MySqlSession {
    async fn fetch(&mut self, sql: &str) -> Result<RowSet> {
        let rows = sqlx::Executor::fetch_all(&mut self.conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| AskError::execution(e.to_string()))?;
        Ok(to_row_set(&rows))
    }

    async fn close(self) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| AskError::ConnectionError(format!("close failed: {}", e)))
    }
}

fn to_row_set(rows: &[MySqlRow]) -> RowSet {
    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let values = rows
        .iter()
        .map(|row| (0..row.len()).map(|i| decode_cell(row, i)).collect())
        .collect();

    RowSet::new(columns, values)
}

/// Decode one cell by its MySQL type name.
///
/// Anything without a dedicated mapping is read as text; undecodable
/// values become a placeholder string rather than failing the row.
fn decode_cell(row: &MySqlRow, index: usize) -> JsonValue {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return JsonValue::Null,
        Ok(_) => {}
        Err(_) => return JsonValue::Null,
    }

    let type_name = row.columns()[index].type_info().name().to_ascii_uppercase();

    let value: std::result::Result<JsonValue, sqlx::Error> = match type_name.as_str() {
        "BOOLEAN" => row.try_get::<bool, _>(index).map(JsonValue::from),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get::<i64, _>(index).map(JsonValue::from)
        }
        t if t.ends_with("UNSIGNED") => row.try_get::<u64, _>(index).map(JsonValue::from),
        "FLOAT" | "DOUBLE" => row.try_get::<f64, _>(index).map(JsonValue::from),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .map(|d| JsonValue::String(d.to_string())),
        "DATETIME" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .map(|d| JsonValue::String(d.to_string())),
        "TIMESTAMP" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .map(|d| JsonValue::String(d.to_rfc3339())),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(index)
            .map(|t| JsonValue::String(t.to_string())),
        "JSON" => row.try_get::<JsonValue, _>(index),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| JsonValue::String(String::from_utf8_lossy(&bytes).into_owned())),
        _ => row.try_get::<String, _>(index).map(JsonValue::String),
    };

    // DECIMAL and other textual encodings
    value
        .or_else(|_| row.try_get_unchecked::<String, _>(index).map(JsonValue::String))
        .unwrap_or_else(|e| JsonValue::String(format!("<{}: {}>", type_name, e)))
}
