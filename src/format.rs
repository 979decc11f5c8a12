//! Output formatting for query results.
//!
//! Renders a [`QueryOutput`] as a bordered table, CSV or a JSON array of objects.
use std::{fmt, str::FromStr};

use clap::ValueEnum;

use crate::{row::Record, session::QueryOutput, value::Value};

/// Cells wider than this are truncated in table output.
const MAX_COLUMN_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{other}', expected table, csv or json")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Table => "table",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        })
    }
}

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

    pub fn format_output(&self, output: &QueryOutput) -> String {
        if output.rows.is_empty() && output.columns.is_empty() {
            return match output.update_count {
                Some(count) => format!("Query OK, {count} {} affected", plural(count as usize)),
                None => "Query OK".to_string(),
            };
        }

        match self.format {
            OutputFormat::Table => format_table(&output.columns, &output.rows),
            OutputFormat::Csv => format_csv(&output.columns, &output.rows),
            OutputFormat::Json => format_json(&output.rows),
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "row" } else { "rows" }
}

fn cell(record: &Record, column: &str) -> String {
    record
        .get(column)
        .map(Value::to_string)
        .unwrap_or_else(|| "NULL".to_string())
}

fn truncate(value: &str, max_width: usize) -> String {
    if value.chars().count() <= max_width {
        value.to_string()
    } else {
        let take = max_width.saturating_sub(3);
        format!("{}...", value.chars().take(take).collect::<String>())
    }
}

fn border(widths: &[usize], left: char, mid: char, right: char) -> String {
    let mut line = String::new();
    line.push(left);
    for (idx, width) in widths.iter().enumerate() {
        line.push_str(&"─".repeat(width + 2));
        line.push(if idx == widths.len() - 1 { right } else { mid });
    }
    line.push('\n');
    line
}

fn table_row(values: &[String], widths: &[usize]) -> String {
    let mut line = String::from("│");
    for (value, width) in values.iter().zip(widths) {
        let value = truncate(value, *width);
        let pad = width.saturating_sub(value.chars().count());
        line.push(' ');
        line.push_str(&value);
        line.push_str(&" ".repeat(pad));
        line.push_str(" │");
    }
    line.push('\n');
    line
}

fn format_table(columns: &[String], rows: &[Record]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| columns.iter().map(|c| cell(r, c)).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut output = border(&widths, '┌', '┬', '┐');
    output.push_str(&table_row(columns, &widths));
    output.push_str(&border(&widths, '├', '┼', '┤'));
    for row in &cells {
        output.push_str(&table_row(row, &widths));
    }
    output.push_str(&border(&widths, '└', '┴', '┘'));
    output.push_str(&format!("({} {})", rows.len(), plural(rows.len())));
    output
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn format_csv(columns: &[String], rows: &[Record]) -> String {
    let mut output = columns
        .iter()
        .map(|c| csv_field(c))
        .collect::<Vec<_>>()
        .join(",");
    output.push('\n');

    for row in rows {
        let values: Vec<String> = columns
            .iter()
            .map(|c| match row.get(c) {
                None | Some(Value::Null) => String::new(),
                Some(v) => csv_field(&v.to_string()),
            })
            .collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }
    output
}

fn format_json(rows: &[Record]) -> String {
    let array = serde_json::Value::Array(rows.iter().map(Record::to_json).collect());
    serde_json::to_string_pretty(&array).unwrap_or_else(|_| array.to_string())
}
