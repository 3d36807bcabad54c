use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::ExecutionHandle;
use crate::executor::QueryError;

/// One decoded result row: column name to cell value, in header order.
///
/// `None` stands for SQL NULL or a cell the backend did not return.
pub type Row = IndexMap<String, Option<String>>;

/// A statement to run, together with where it runs and where its output goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    sql_text: String,
    database_name: String,
    result_location: String,
}

impl QueryRequest {
    pub fn new(
        sql_text: impl Into<String>,
        database_name: impl Into<String>,
        result_location: impl Into<String>,
    ) -> Self {
        Self {
            sql_text: sql_text.into(),
            database_name: database_name.into(),
            result_location: result_location.into(),
        }
    }

    pub fn sql_text(&self) -> &str {
        &self.sql_text
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Object-storage prefix the backend writes output artifacts to.
    pub fn result_location(&self) -> &str {
        &self.result_location
    }

    /// First line of the statement, truncated, for log fields.
    pub fn sql_preview(&self) -> String {
        let first = self.sql_text.trim().lines().next().unwrap_or_default();
        if first.chars().count() > 60 {
            let cut: String = first.chars().take(60).collect();
            format!("{cut}...")
        } else {
            first.to_string()
        }
    }
}

/// Raw tabular result as returned by the backend.
///
/// Row 0 is the header; the remaining rows are data, positionally aligned to
/// it. Cells are `None` when the backend sent no value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Convenience for tests and fixtures: every cell present.
    pub fn from_strings<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|c| Some(c.into())).collect())
                .collect(),
        }
    }

    /// Number of data rows, excluding the header.
    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Decode into row mappings keyed by the header.
    ///
    /// A set with only a header (or nothing at all) decodes to no rows.
    /// Short rows are padded with `None`, surplus cells are dropped, and a
    /// header cell without a value is named `_col{index}`.
    pub fn decode(&self) -> Vec<Row> {
        let Some((header, data)) = self.rows.split_first() else {
            return Vec::new();
        };

        let columns: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Some(name) if !name.is_empty() => name.clone(),
                _ => format!("_col{i}"),
            })
            .collect();

        let mut ragged = 0usize;
        let rows: Vec<Row> = data
            .iter()
            .map(|cells| {
                if cells.len() != columns.len() {
                    ragged += 1;
                }
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), cells.get(i).cloned().flatten()))
                    .collect()
            })
            .collect();

        debug!(
            columns = columns.len(),
            rows = rows.len(),
            ragged_rows = ragged,
            "Decoded result set"
        );

        rows
    }
}

/// Outcome of one executor call.
#[derive(Debug)]
pub struct QueryResult {
    pub request: QueryRequest,
    /// Handle assigned by the backend; `None` when submission never happened.
    pub handle: Option<ExecutionHandle>,
    pub outcome: Result<Vec<Row>, QueryError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl QueryResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Decoded rows, or an empty slice on failure.
    pub fn rows(&self) -> &[Row] {
        match &self.outcome {
            Ok(rows) => rows,
            Err(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&QueryError> {
        self.outcome.as_ref().err()
    }

    /// Human-readable failure reason.
    pub fn error_reason(&self) -> Option<String> {
        self.error().map(|e| e.to_string())
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Split into the `(rows, reason)` pair callers render from.
    pub fn into_parts(self) -> (Vec<Row>, Option<String>) {
        match self.outcome {
            Ok(rows) => (rows, None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        }
    }
}

/// Borrowed view of decoded rows that renders as a plain-text table.
pub struct RowTable<'a>(pub &'a [Row]);

impl fmt::Display for RowTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.0.first() else {
            return write!(f, "(empty result set)");
        };

        let columns: Vec<&String> = first.keys().collect();

        // Column widths start at the header length.
        let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
        for row in self.0 {
            for (i, cell) in row.values().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.as_deref().unwrap_or("NULL").len());
                }
            }
        }

        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{:<width$}", col, width = widths[i])?;
        }
        writeln!(f)?;

        for (i, w) in widths.iter().enumerate() {
            if i > 0 {
                write!(f, "-+-")?;
            }
            write!(f, "{}", "-".repeat(*w))?;
        }
        writeln!(f)?;

        for row in self.0 {
            for (i, cell) in row.values().enumerate().take(widths.len()) {
                if i > 0 {
                    write!(f, " | ")?;
                }
                write!(f, "{:<width$}", cell.as_deref().unwrap_or("NULL"), width = widths[i])?;
            }
            writeln!(f)?;
        }

        write!(f, "({} rows)", self.0.len())
    }
}
