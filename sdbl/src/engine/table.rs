//! Small typed tables returned by a session.

use std::fmt;

use super::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    String,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataType::Integer => "integer",
            DataType::String => "string",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: &str, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            nullable,
        }
    }
}

pub type Schema = Vec<Field>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
    Null,
}

impl Value {
    fn fits(&self, field: &Field) -> bool {
        match (self, field.data_type) {
            (Value::Null, _) => field.nullable,
            (Value::Int(_), DataType::Integer) | (Value::Str(_), DataType::String) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Null => f.write_str("NULL"),
        }
    }
}

pub type Row = Vec<Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    /// Check every row against `schema`.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self, EngineError> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(EngineError::RowArity {
                    row: i,
                    actual: row.len(),
                    expected: schema.len(),
                });
            }
            if let Some((field, _)) = schema
                .iter()
                .zip(row)
                .find(|(field, value)| !value.fits(field))
            {
                return Err(EngineError::TypeMismatch {
                    row: i,
                    column: field.name.clone(),
                    expected: field.data_type.to_string(),
                });
            }
        }
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Tree view of the schema:
    ///
    /// ```text
    /// root
    ///  |-- id: integer (nullable = true)
    /// ```
    pub fn schema_tree(&self) -> String {
        let mut out = String::from("root\n");
        for field in &self.schema {
            out.push_str(&format!(
                " |-- {}: {} (nullable = {})\n",
                field.name, field.data_type, field.nullable
            ));
        }
        out
    }

    /// Rows strictly greater than `threshold` in integer column `column`.
    /// Nulls never match.
    pub fn filter_gt(&self, column: &str, threshold: i64) -> Result<Table, EngineError> {
        let idx = self.column_index(column)?;
        if self.schema[idx].data_type != DataType::Integer {
            return Err(EngineError::NotNumeric(column.to_string()));
        }
        let rows = self
            .rows
            .iter()
            .filter(|row| matches!(row[idx], Value::Int(n) if n > threshold))
            .cloned()
            .collect();
        Ok(Table {
            schema: self.schema.clone(),
            rows,
        })
    }

    /// Project `columns`, in the given order.
    pub fn select(&self, columns: &[&str]) -> Result<Table, EngineError> {
        let indices = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Table {
            schema: indices.iter().map(|&i| self.schema[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Bordered text grid with right-aligned cells.
    pub fn render(&self) -> String {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();
        let widths: Vec<usize> = self
            .schema
            .iter()
            .enumerate()
            .map(|(i, field)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(field.name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let border = format!(
            "+{}+\n",
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("+")
        );
        let line = |values: Vec<&str>| {
            let padded: Vec<String> = values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{v:>w$}", w = *w))
                .collect();
            format!("|{}|\n", padded.join("|"))
        };

        let mut out = border.clone();
        out.push_str(&line(self.schema.iter().map(|f| f.name.as_str()).collect()));
        out.push_str(&border);
        for row in &cells {
            out.push_str(&line(row.iter().map(String::as_str).collect()));
        }
        out.push_str(&border);
        out
    }

    fn column_index(&self, column: &str) -> Result<usize, EngineError> {
        self.schema
            .iter()
            .position(|f| f.name == column)
            .ok_or_else(|| EngineError::UnknownColumn(column.to_string()))
    }
}
