use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Result, SpectraError};

/// A whitespace-delimited numeric table with a `#` column header.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    /// Values of column `index`, one per row.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[index]).collect()
    }

    pub fn has_columns(&self, names: &[&str]) -> bool {
        self.columns.len() == names.len() && self.columns.iter().zip(names).all(|(a, b)| a == b)
    }
}

/// Read a table. The first non-blank line must be the `#` header; later `#`
/// lines and blank lines are skipped.
pub fn read_table(path: &Path) -> Result<Table> {
    let file = File::open(path).map_err(|e| SpectraError::file(path, e))?;
    let reader = BufReader::new(file);

    let invalid = |reason: String| SpectraError::InvalidDataFile {
        path: path.to_path_buf(),
        reason,
    };

    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SpectraError::file(path, e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if columns.is_none() {
            let header = line
                .strip_prefix('#')
                .ok_or_else(|| invalid("missing '#' column header".into()))?;
            let names: Vec<String> = header.split_whitespace().map(str::to_string).collect();
            if names.is_empty() {
                return Err(invalid("empty column header".into()));
            }
            columns = Some(names);
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        let width = columns.as_ref().map_or(0, Vec::len);
        let row = line
            .split_whitespace()
            .map(|field| field.parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| invalid(format!("line {}: {e}", line_no + 1)))?;
        if row.len() != width {
            return Err(invalid(format!(
                "line {}: expected {} columns, found {}",
                line_no + 1,
                width,
                row.len()
            )));
        }
        rows.push(row);
    }

    let columns = columns.ok_or_else(|| invalid("file is empty".into()))?;
    Ok(Table { columns, rows })
}

/// Write `header` followed by one line per row.
pub fn write_table<I>(path: &Path, header: &str, rows: I) -> Result<()>
where
    I: IntoIterator<Item = String>,
{
    let file = File::create(path).map_err(|e| SpectraError::file(path, e))?;
    let mut writer = BufWriter::new(file);
    write_lines(&mut writer, header, rows).map_err(|e| SpectraError::file(path, e))
}

fn write_lines<W: Write>(
    writer: &mut W,
    header: &str,
    rows: impl IntoIterator<Item = String>,
) -> std::io::Result<()> {
    writeln!(writer, "{header}")?;
    for row in rows {
        writeln!(writer, "{row}")?;
    }
    writer.flush()
}
