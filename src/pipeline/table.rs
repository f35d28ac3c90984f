use std::fs;
use std::io;
use std::path::Path;

use csv::{ReaderBuilder, Terminator, WriterBuilder};
use serde_json::Value;

use crate::error::{PreprocessError, Result};

/// An uploaded export held in memory: ordered column names plus rows of cells.
///
/// Column names are kept exactly as they appeared in the file. Cells are
/// `serde_json::Value`s so that a missing field (`Null`) stays distinct from
/// text; every row is padded to the header width.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Decode ISO-8859-1 bytes and parse them as CSV with a header row.
    pub fn from_latin1_bytes(bytes: &[u8]) -> Result<Self> {
        let content = encoding_rs::mem::decode_latin1(bytes);
        Self::from_csv_str(&content)
    }

    pub fn from_csv_str(content: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result?;
            if record.len() > headers.len() {
                return Err(PreprocessError::RowTooLong {
                    row: index + 1,
                    found: record.len(),
                    expected: headers.len(),
                });
            }
            let row = record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Value::Null
                    } else {
                        Value::String(field.to_string())
                    }
                })
                .collect();
            rows.push(row);
        }

        Ok(Self::new(headers, rows))
    }

    pub fn read_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_latin1_bytes(&bytes)
    }

    /// Serialize back to CSV: header row first, no index column.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(cell_to_field))?;
        }

        writer
            .into_inner()
            .map_err(|e| PreprocessError::Io(io::Error::new(e.error().kind(), e.error().to_string())))
    }

    pub fn write_path(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_csv_bytes()?)?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by name, ignoring case and surrounding whitespace in the
    /// file's header. Returns the column index and its real name.
    pub fn find_column(&self, name: &str) -> Result<(usize, &str)> {
        let wanted = name.trim().to_uppercase();
        self.headers
            .iter()
            .enumerate()
            .find(|(_, header)| header.trim().to_uppercase() == wanted)
            .map(|(index, header)| (index, header.as_str()))
            .ok_or_else(|| PreprocessError::ColumnNotFound(name.to_string()))
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Replace every cell of a column with `f(cell)`. Row count and order are
    /// unchanged.
    pub fn map_column<F>(&mut self, column: usize, f: F)
    where
        F: Fn(&Value) -> String,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(column) {
                *cell = Value::String(f(cell));
            }
        }
    }
}

fn cell_to_field(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_csv() {
        let table = Table::from_csv_str("Name,State\nAlice,nsw\nBob,\n").unwrap();

        assert_eq!(table.headers(), ["Name", "State"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, 1), Some(&json!("nsw")));
        assert_eq!(table.cell(1, 1), Some(&Value::Null));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = Table::from_csv_str("a,b,c\n1\n").unwrap();
        assert_eq!(table.rows()[0], vec![json!("1"), Value::Null, Value::Null]);
    }

    #[test]
    fn test_long_rows_are_rejected() {
        let err = Table::from_csv_str("a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, PreprocessError::RowTooLong { row: 1, found: 3, expected: 2 }));
    }

    #[test]
    fn test_latin1_decoding() {
        // "Café" with 0xE9 as a single Latin-1 byte
        let bytes = b"Name,SOFTVEND\nCaf\xe9,MAXSOFT\n";
        let table = Table::from_latin1_bytes(bytes).unwrap();
        assert_eq!(table.cell(0, 0), Some(&json!("Café")));
    }

    #[test]
    fn test_find_column_ignores_case_and_whitespace() {
        let table = Table::from_csv_str(" softVend ,pcode\nMAXSOFT,2000\n").unwrap();

        let (index, name) = table.find_column("SOFTVEND").unwrap();
        assert_eq!(index, 0);
        assert_eq!(name, " softVend ");

        let (index, name) = table.find_column("PCode").unwrap();
        assert_eq!(index, 1);
        assert_eq!(name, "pcode");
    }

    #[test]
    fn test_find_column_missing() {
        let table = Table::from_csv_str("a,b\n1,2\n").unwrap();
        let err = table.find_column("SOFTVEND").unwrap_err();
        assert!(matches!(err, PreprocessError::ColumnNotFound(ref c) if c == "SOFTVEND"));
    }

    #[test]
    fn test_map_column_preserves_rows() {
        let mut table = Table::from_csv_str("a,b\n1,x\n2,y\n3,\n").unwrap();
        table.map_column(1, |v| v.as_str().unwrap_or("").to_uppercase());

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.cell(0, 0), Some(&json!("1")));
        assert_eq!(table.cell(0, 1), Some(&json!("X")));
        assert_eq!(table.cell(2, 1), Some(&json!("")));
    }

    #[test]
    fn test_write_round_trips_header_and_quoting() {
        let input = "Name,Address\n\"Smith, J\",1 High St\nJones,\n";
        let table = Table::from_csv_str(input).unwrap();
        let output = String::from_utf8(table.to_csv_bytes().unwrap()).unwrap();
        assert_eq!(output, input);
    }
}
