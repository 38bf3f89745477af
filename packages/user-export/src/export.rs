//! CSV export of flattened entries.
//!
//! Rows have a variable number of columns: the three identity columns are
//! followed by one column per permission.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::entry::FlattenedEntry;
use crate::error::{ExportError, Result};

/// Header row of every export.
pub const HEADER: [&str; 4] = ["user email", "user id", "org id", "permissions"];

/// Writes entries as comma-delimited rows.
pub struct CsvExporter<W: Write> {
    writer: W,
    rows: usize,
}

impl CsvExporter<BufWriter<File>> {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> CsvExporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, rows: 0 }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        write_record(&mut self.writer, HEADER)
    }

    pub fn write_entry(&mut self, entry: &FlattenedEntry) -> io::Result<()> {
        write_record(&mut self.writer, entry.fields())?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows written so far (the header is not counted).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Write the header and every entry to a new file at `path`.
///
/// Returns the number of data rows written.
pub fn export_to_file<I>(path: &Path, entries: I) -> Result<usize>
where
    I: IntoIterator<Item = FlattenedEntry>,
{
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut exporter = CsvExporter::create(path).map_err(io_err)?;
    exporter.write_header().map_err(io_err)?;
    for entry in entries {
        exporter.write_entry(&entry).map_err(io_err)?;
    }

    let rows = exporter.rows();
    exporter.finish().map_err(io_err)?;
    Ok(rows)
}

fn write_record<'a, W, I>(writer: &mut W, fields: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a str>,
{
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        write_field(writer, field)?;
    }
    writer.write_all(b"\n")
}

fn write_field<W: Write>(writer: &mut W, field: &str) -> io::Result<()> {
    if !needs_quotes(field) {
        return writer.write_all(field.as_bytes());
    }

    writer.write_all(b"\"")?;
    writer.write_all(field.replace('"', "\"\"").as_bytes())?;
    writer.write_all(b"\"")
}

fn needs_quotes(field: &str) -> bool {
    field.starts_with([' ', '\t']) || field.contains([',', '"', '\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(email: &str, org: &str, permissions: &[&str]) -> FlattenedEntry {
        FlattenedEntry {
            user_email: email.into(),
            user_id: "u-1".into(),
            org_id: org.into(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn render(entries: &[FlattenedEntry]) -> String {
        let mut exporter = CsvExporter::new(Vec::new());
        exporter.write_header().unwrap();
        for e in entries {
            exporter.write_entry(e).unwrap();
        }
        String::from_utf8(exporter.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_header_and_trailing_permissions() {
        let out = render(&[
            entry("a@example.com", "org-1", &["read"]),
            entry("a@example.com", "org-2", &["read", "admin"]),
            entry("a@example.com", "org-3", &[]),
        ]);

        assert_eq!(
            out,
            "user email,user id,org id,permissions\n\
             a@example.com,u-1,org-1,read\n\
             a@example.com,u-1,org-2,read,admin\n\
             a@example.com,u-1,org-3\n"
        );
    }

    #[test]
    fn test_quotes_fields_that_need_it() {
        let out = render(&[entry("Smith, Jo <jo@example.com>", "org \"x\"", &[" lead"])]);

        let row = out.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "\"Smith, Jo <jo@example.com>\",u-1,\"org \"\"x\"\"\",\" lead\""
        );
    }

    #[test]
    fn test_counts_rows_not_header() {
        let mut exporter = CsvExporter::new(Vec::new());
        exporter.write_header().unwrap();
        assert_eq!(exporter.rows(), 0);
        exporter.write_entry(&entry("a@example.com", "o", &[])).unwrap();
        assert_eq!(exporter.rows(), 1);
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.csv");

        let rows = export_to_file(&path, vec![entry("a@example.com", "org-1", &["read"])]).unwrap();

        assert_eq!(rows, 1);
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "user email,user id,org id,permissions\na@example.com,u-1,org-1,read\n"
        );
    }

    #[test]
    fn test_unwritable_destination_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("result.csv");

        let err = export_to_file(&path, Vec::new()).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }), "got {:?}", err);
    }
}
