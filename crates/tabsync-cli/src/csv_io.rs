//! CSV reading and writing per `csv_format`

use anyhow::{Context, Result};
use std::path::Path;
use tabsync_core::{CsvFormat, Record, ResultRecord, TableSchema};

const BOM: char = '\u{feff}';

/// Read a CSV file into records keyed by column name
///
/// Files without a header row are read positionally against the table's
/// data columns. Cells listed in `null_values` become `None`.
pub fn read_records(path: &Path, format: &CsvFormat, table: &TableSchema) -> Result<Vec<Record>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = String::from_utf8(bytes)
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
    let text = text.strip_prefix(BOM).unwrap_or(&text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(format.has_header)
        .flexible(true)
        .from_reader(text.as_bytes());

    let names: Vec<String> = if format.has_header {
        reader
            .headers()
            .with_context(|| format!("reading header of {}", path.display()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect()
    } else {
        table.data_columns().map(|c| c.name.clone()).collect()
    };

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("{}: malformed row {}", path.display(), line + 1))?;
        let mut record = Record::new();
        for (name, cell) in names.iter().zip(row.iter()) {
            let value = (!format.is_null(cell)).then(|| cell.to_string());
            record.set(name.as_str(), value);
        }
        records.push(record);
    }

    tracing::debug!(path = %path.display(), rows = records.len(), "read csv");
    Ok(records)
}

/// Write result rows with the given columns
///
/// `None` is written as the first configured null value.
pub fn write_records(
    path: &Path,
    format: &CsvFormat,
    columns: &[&str],
    rows: &[ResultRecord],
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(format.delimiter)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    if format.has_header {
        writer.write_record(columns)?;
    }

    let null = format.null_values.first().map(String::as_str).unwrap_or("");
    for row in rows {
        writer.write_record(columns.iter().map(|c| row.get(c).unwrap_or(null)))?;
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabsync_core::{ColumnSpec, Outcome};

    fn accounts() -> TableSchema {
        TableSchema::from_columns(
            "current_data",
            vec![
                ColumnSpec::new("id", "INTEGER"),
                ColumnSpec::new("user_id", "TEXT"),
                ColumnSpec::new("name", "TEXT"),
            ],
        )
    }

    #[test]
    fn reads_header_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current.csv");
        std::fs::write(&path, "\u{feff}user_id,name\nA001,\"Smith, J\"\nA002,\n").unwrap();

        let rows = read_records(&path, &CsvFormat::default(), &accounts()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("user_id"), Some("A001"));
        assert_eq!(rows[0].get("name"), Some("Smith, J"));
        assert_eq!(rows[1].get("name"), None);
    }

    #[test]
    fn reads_headerless_tab_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current.tsv");
        std::fs::write(&path, "A001\tNULL\n").unwrap();

        let format = CsvFormat {
            delimiter: b'\t',
            has_header: false,
            null_values: vec!["NULL".to_string()],
            ..CsvFormat::default()
        };
        let rows = read_records(&path, &format, &accounts()).unwrap();
        assert_eq!(rows[0].get("user_id"), Some("A001"));
        assert_eq!(rows[0].get("name"), None);
        assert!(rows[0].contains("name"));
    }

    #[test]
    fn rejects_non_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sjis.csv");
        std::fs::write(&path, [0x82u8, 0xa0, b'\n']).unwrap();

        let err = read_records(&path, &CsvFormat::default(), &accounts()).unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn writes_selected_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rows = vec![ResultRecord::new(
            Outcome::Add,
            Record::new()
                .with("syokuin_no", "E001")
                .with("name", "O'Brien, Pat")
                .with("sync_action", "ADD"),
        )];

        write_records(&path, &CsvFormat::default(), &["syokuin_no", "name", "dept", "sync_action"], &rows)
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "syokuin_no,name,dept,sync_action\nE001,\"O'Brien, Pat\",,ADD\n"
        );
    }
}
