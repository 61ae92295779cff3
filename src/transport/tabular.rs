use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use crate::data::{RawTable, Table};
use crate::errors::PipelineError;

/// Load a CSV file with a header row into an untyped table.
///
/// Short rows are padded with empty cells; surplus cells are discarded.
/// Empty (whitespace-only) cells load as `None`.
pub fn load_table(path: &Path) -> Result<RawTable, PipelineError> {
    let file = File::open(path).map_err(|err| load_error(path, err))?;
    read_table(BufReader::new(file)).map_err(|err| match err {
        PipelineError::Load { reason, .. } => PipelineError::Load {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    })
}

/// Read CSV text from any reader. Errors carry an empty path.
pub fn read_table<R: Read>(reader: R) -> Result<RawTable, PipelineError> {
    let mut csv_reader = ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);
    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|err| load_error(Path::new(""), err))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|header| header.trim().is_empty()) {
        return Err(load_error(Path::new(""), "missing header row"));
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|err| load_error(Path::new(""), err))?;
        let mut row: Vec<Option<String>> = record
            .iter()
            .take(headers.len())
            .map(|cell| {
                let trimmed = cell.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect();
        row.resize(headers.len(), None);
        rows.push(row);
    }
    Ok(RawTable { headers, rows })
}

/// Write a table as CSV (header plus rows), creating parent directories.
pub fn write_table(table: &Table, path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_table_to(table, file)
}

/// Write a table as CSV into any writer.
pub fn write_table_to<W: Write>(table: &Table, writer: W) -> Result<(), PipelineError> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(&table.columns)?;
    for row in &table.rows {
        csv_writer.write_record(row.iter().map(|cell| cell.render()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn load_error(path: &Path, reason: impl ToString) -> PipelineError {
    PipelineError::Load {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Cell;
    use tempfile::tempdir;

    #[test]
    fn reads_quoted_headers_and_pads_short_rows() {
        let text = "\"starttime\",\"stoptime\",\"bikeid\"\n\"2014-01-01 00:00:06\",\"2014-01-01 00:10:00\"\n,x,9\n";
        let table = read_table(text.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["starttime", "stoptime", "bikeid"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2], None);
        assert_eq!(table.rows[1][0], None);
        assert_eq!(table.rows[1][2].as_deref(), Some("9"));
    }

    #[test]
    fn load_reports_missing_file_as_load_error() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("absent.csv");
        match load_table(&missing) {
            Err(PipelineError::Load { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected load error, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_empty_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(load_table(&path), Err(PipelineError::Load { .. })));
    }

    #[test]
    fn load_rejects_invalid_utf8() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("binary.csv");
        std::fs::write(&path, b"a,b\n\xff\xfe,1\n").unwrap();
        match load_table(&path) {
            Err(PipelineError::Load { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected load error, got {other:?}"),
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("out/nested/stations.csv");
        let table = Table {
            columns: vec!["station".into(), "duration_sec_sum".into()],
            rows: vec![
                vec![Cell::Text("A, East".into()), Cell::Number(5.0)],
                vec![Cell::Text("B".into()), Cell::Number(2.5)],
            ],
        };
        write_table(&table, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "station,duration_sec_sum\n\"A, East\",5\nB,2.5\n");
    }
}
