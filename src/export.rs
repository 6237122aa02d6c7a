use std::fs;
use std::io::Error;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::CedError;
use crate::table::Table;

pub const FALLBACK_EXPORT_NAME: &str = "edited_data.csv";

// Serializes the whole table, not the rendered subset. Header row first,
// then one record per row in column order, rfc 4180 quoting throughout.
// A table without columns serializes to an empty string.
pub fn serialize(table: &Table) -> Result<String, CedError> {
    if table.column_count() == 0 {
        return Ok(String::new());
    }
    let mut buf = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new().from_writer(&mut buf);
        writer.write_record(table.column_names())?;
        for row in 0..table.row_count() {
            writer.write_record(table.record(row)?)?;
        }
        writer.flush()?;
    }
    into_string(buf)
}

// One record as a single csv line without the record terminator. Used for
// copying a row to the clipboard.
pub fn csv_line(values: &[&str]) -> Result<String, CedError> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new().from_writer(&mut buf);
        writer.write_record(values)?;
        writer.flush()?;
    }
    let mut line = into_string(buf)?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

pub fn export_file_name(original: Option<&str>) -> String {
    match original {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => FALLBACK_EXPORT_NAME.to_string(),
    }
}

// The download collaborator: hand it the serialized text and a suggested
// file name and it persists the file, returning where it ended up.
pub fn write_download(dir: &Path, file_name: &str, text: &str) -> Result<PathBuf, CedError> {
    let path = dir.join(file_name);
    fs::write(&path, text)?;
    info!("Wrote {} bytes to {}", text.len(), path.display());
    Ok(path)
}

fn into_string(bytes: Vec<u8>) -> Result<String, CedError> {
    String::from_utf8(bytes).map_err(|e| CedError::IoError(Error::other(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn sample() -> Table {
        Table::load(vec![
            Column::new("name", vec!["Al".into(), "Bo".into(), "Cy".into()]),
            Column::new("age", vec!["30".into(), "25".into(), "40".into()]),
        ])
        .unwrap()
    }

    // Parse with the same conventions the serializer writes.
    fn parse(text: &str) -> Table {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());
        let names: Vec<String> = reader
            .headers()
            .unwrap()
            .iter()
            .map(|h| h.to_string())
            .collect();
        let mut data: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for record in reader.records() {
            for (idx, value) in record.unwrap().iter().enumerate() {
                data[idx].push(value.to_string());
            }
        }
        let columns = names
            .into_iter()
            .zip(data)
            .map(|(name, data)| Column::new(name, data))
            .collect();
        Table::load(columns).unwrap()
    }

    #[test]
    fn edited_table_serializes_in_row_order() {
        let mut table = sample();
        table.set_cell(1, "age", "26".to_string()).unwrap();
        let text = serialize(&table).unwrap();
        assert_eq!(text, "name,age\nAl,30\nBo,26\nCy,40\n");
    }

    #[test]
    fn round_trip_preserves_columns_and_values() {
        let table = Table::load(vec![
            Column::new(
                "note",
                vec!["plain".into(), "a,b".into(), "say \"hi\"".into(), "two\nlines".into()],
            ),
            Column::new("n", vec!["007".into(), "".into(), " pad ".into(), "x".into()]),
        ])
        .unwrap();

        let parsed = parse(&serialize(&table).unwrap());
        assert_eq!(parsed.column_names(), table.column_names());
        assert_eq!(parsed.row_count(), table.row_count());
        for row in 0..table.row_count() {
            assert_eq!(parsed.record(row).unwrap(), table.record(row).unwrap());
        }
    }

    #[test]
    fn empty_table_serializes_headerless() {
        assert_eq!(serialize(&Table::empty()).unwrap(), "");
    }

    #[test]
    fn zero_rows_keep_the_header() {
        let table = Table::load(vec![
            Column::new("a", Vec::new()),
            Column::new("b", Vec::new()),
        ])
        .unwrap();
        assert_eq!(serialize(&table).unwrap(), "a,b\n");
    }

    #[test]
    fn export_name_falls_back() {
        assert_eq!(export_file_name(Some("data.csv")), "data.csv");
        assert_eq!(export_file_name(Some("")), FALLBACK_EXPORT_NAME);
        assert_eq!(export_file_name(None), FALLBACK_EXPORT_NAME);
    }

    #[test]
    fn csv_line_has_no_terminator() {
        let line = csv_line(&["Al", "a,b", "q\"q"]).unwrap();
        assert_eq!(line, "Al,\"a,b\",\"q\"\"q\"");
    }

    #[test]
    fn download_writes_the_suggested_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_download(dir.path(), "out.csv", "a,b\n1,2\n").unwrap();
        assert_eq!(path, dir.path().join("out.csv"));
        assert_eq!(fs::read_to_string(path).unwrap(), "a,b\n1,2\n");
    }
}
