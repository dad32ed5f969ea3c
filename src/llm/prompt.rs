//! Prompt templates for SQL synthesis.

use crate::types::SynthesisRequest;

/// Fixed instructions sent ahead of every question.
pub const INSTRUCTIONS: &str = "You are an expert MySQL query generator.\n\n\
Given the user's question and the database schema below, you MUST output a valid SQL query \
that can run directly on the connected MySQL database.\n\n\
RULES:\n\
- Do NOT explain or reason.\n\
- Do NOT include any text outside the SQL.\n\
- Always wrap your SQL in triple backticks like this:\n\
```sql\nSELECT * FROM table_name;\n```\n\
- Always use LIKE with wildcards for text searches when the user gives partial or approximate names.\n\
- Always use existing column names exactly as shown in the schema.\n\
- If unsure about column names, infer logically from the schema.\n\n";

/// Render the full prompt for one synthesis attempt.
pub fn render(request: &SynthesisRequest) -> String {
    format!(
        "{}Database schema:\n{}\n\nUser question:\n{}\n\nRelevant tables:\n{}\n",
        INSTRUCTIONS, request.table_info, request.question, request.candidate_tables
    )
}

/// Composite question for the corrective retry.
///
/// Order is fixed: error, rewrite instruction, schema, original question.
pub fn follow_up_question(error: &str, table_info: &str, question: &str) -> String {
    format!(
        "The previous query failed with error: {}. \
Rewrite the SQL correctly using only existing columns from this schema:\n{}\n\
Question: {}",
        error, table_info, question
    )
}
