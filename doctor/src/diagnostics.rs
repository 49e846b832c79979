//! Fixed self-test run against a fresh session.

use std::io::Write;

use anyhow::{Context, Result};

use sdbl::engine::Session;
use sdbl::engine::table::{DataType, Field, Row, Schema, Value};

pub const AGE_THRESHOLD: i64 = 27;

pub fn sample_schema() -> Schema {
    vec![
        Field::new("id", DataType::Integer, true),
        Field::new("name", DataType::String, true),
        Field::new("age", DataType::Integer, true),
    ]
}

pub fn sample_rows() -> Vec<Row> {
    [(1, "Alice", 25), (2, "Bob", 30), (3, "Charlie", 35)]
        .into_iter()
        .map(|(id, name, age)| vec![Value::Int(id), Value::Str(name.to_string()), Value::Int(age)])
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticSummary {
    pub row_count: usize,
    pub filtered_count: usize,
}

/// Build the sample table, then print schema, rows, count, the
/// `age > 27` filter and the `name, age` projection. Results are shown,
/// not checked.
pub fn run_diagnostics(session: &dyn Session, out: &mut dyn Write) -> Result<DiagnosticSummary> {
    let table = session
        .create_table(sample_schema(), sample_rows())
        .context("create sample table")?;
    writeln!(out, "   Table created")?;

    writeln!(out, "\n   Schema:")?;
    write!(out, "{}", table.schema_tree())?;
    writeln!(out, "\n   Data:")?;
    write!(out, "{}", table.render())?;

    writeln!(out, "\n6. Testing operations...")?;
    let row_count = table.count();
    writeln!(out, "   Row count: {row_count}")?;

    writeln!(out, "\n   Filtered (age > {AGE_THRESHOLD}):")?;
    let filtered = table
        .filter_gt("age", AGE_THRESHOLD)
        .context("filter by age")?;
    write!(out, "{}", filtered.render())?;

    writeln!(out, "\n   Selected columns:")?;
    let selected = table.select(&["name", "age"]).context("select columns")?;
    write!(out, "{}", selected.render())?;

    Ok(DiagnosticSummary {
        row_count,
        filtered_count: filtered.count(),
    })
}
