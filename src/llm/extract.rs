//! SQL extraction from free-text model replies.
//!
//! Two stages: take the first ```` ```sql ```` fenced block (case-insensitive,
//! may span lines), otherwise the whole reply. The candidate then has every
//! ```` ``` ```` and every literal lowercase `sql` removed, is trimmed, and is
//! terminated with `;`.
//!
//! The `sql` removal is blunt: a column such as `sql_id` becomes `_id`.
//! Callers see exactly what was executed through [`ExecutableQuery`].

use crate::types::ExecutableQuery;
use once_cell::sync::Lazy;
use regex::Regex;

static SQL_FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```sql\s*(.*?)\s*```").expect("static regex"));

/// Inner text of the first fenced `sql` block, trimmed.
pub fn fenced_block(text: &str) -> Option<&str> {
    SQL_FENCE_REGEX
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim())
}

/// Turn a raw model reply into an executable statement.
///
/// Never fails: a reply without a fence is used as-is.
pub fn extract_sql(raw: &str) -> ExecutableQuery {
    let candidate = fenced_block(raw).unwrap_or_else(|| raw.trim());
    let cleaned = candidate.replace("```", "").replace("sql", "");
    ExecutableQuery::new(cleaned.trim())
}
