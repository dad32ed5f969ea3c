//! Result rendering: boxed table, JSON array, or CSV.

use crate::types::{cell_text, AskError, Result, RowSet};
use serde_json::Value as JsonValue;

/// Cells wider than this are cut with an ellipsis in table output.
const MAX_COLUMN_WIDTH: usize = 40;

/// How rows are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Renders a [`RowSet`] in one [`OutputFormat`].
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render rows in the configured format.
    pub fn render(&self, rows: &RowSet) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(Self::render_table(rows)),
            OutputFormat::Json => Self::render_json(rows),
            OutputFormat::Csv => Self::render_csv(rows),
        }
    }

    fn truncate_value(value: &str, max_width: usize) -> String {
        if value.chars().count() <= max_width {
            value.to_string()
        } else if max_width <= 3 {
            value.chars().take(max_width).collect()
        } else {
            format!("{}...", value.chars().take(max_width - 3).collect::<String>())
        }
    }

    fn render_table(rows: &RowSet) -> String {
        if rows.columns.is_empty() {
            return format!("Query OK, {} rows returned\n", rows.len());
        }

        let cells: Vec<Vec<String>> = rows
            .rows
            .iter()
            .map(|row| {
                (0..rows.columns.len())
                    .map(|i| {
                        let text = row.get(i).map(cell_text).unwrap_or_else(|| "NULL".into());
                        Self::truncate_value(&text, MAX_COLUMN_WIDTH)
                    })
                    .collect()
            })
            .collect();

        let mut widths: Vec<usize> = rows
            .columns
            .iter()
            .map(|c| Self::truncate_value(c, MAX_COLUMN_WIDTH).chars().count())
            .collect();
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut output = String::new();
        Self::push_border(&mut output, &widths, ('┌', '┬', '┐'));
        let header: Vec<String> = rows
            .columns
            .iter()
            .map(|c| Self::truncate_value(c, MAX_COLUMN_WIDTH))
            .collect();
        Self::push_row(&mut output, &widths, &header);
        Self::push_border(&mut output, &widths, ('├', '┼', '┤'));
        for row in &cells {
            Self::push_row(&mut output, &widths, row);
        }
        Self::push_border(&mut output, &widths, ('└', '┴', '┘'));

        let label = if cells.len() == 1 { "row" } else { "rows" };
        output.push_str(&format!("({} {})\n", cells.len(), label));
        output
    }

    fn push_border(output: &mut String, widths: &[usize], (left, mid, right): (char, char, char)) {
        output.push(left);
        for (idx, width) in widths.iter().enumerate() {
            output.push_str(&"─".repeat(width + 2));
            output.push(if idx == widths.len() - 1 { right } else { mid });
        }
        output.push('\n');
    }

    fn push_row(output: &mut String, widths: &[usize], values: &[String]) {
        output.push('│');
        for (value, width) in values.iter().zip(widths) {
            // pad by chars, not bytes
            let pad = width.saturating_sub(value.chars().count());
            output.push(' ');
            output.push_str(value);
            output.push_str(&" ".repeat(pad));
            output.push_str(" │");
        }
        output.push('\n');
    }

    fn render_json(rows: &RowSet) -> Result<String> {
        let objects: Vec<JsonValue> = rows
            .to_objects()
            .into_iter()
            .map(JsonValue::Object)
            .collect();
        let mut json = serde_json::to_string_pretty(&objects)?;
        json.push('\n');
        Ok(json)
    }

    fn render_csv(rows: &RowSet) -> Result<String> {
        if rows.columns.is_empty() {
            return Ok(String::new());
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&rows.columns)?;
        for row in &rows.rows {
            let record: Vec<String> = row
                .iter()
                .map(|value| match value {
                    JsonValue::Null => String::new(),
                    other => cell_text(other),
                })
                .collect();
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AskError::FormatError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| AskError::FormatError(e.to_string()))
    }
}
