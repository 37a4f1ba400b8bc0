//! Append-only CSV store of extraction records
//!
//! One row per document: `filename`, one column per query field, then
//! `error`. Rows are flushed as they are written so an interrupted batch
//! loses at most the document in flight.

use crate::error::ExtractorError;
use papersift_domain::{ExtractionQuery, ExtractionRecord};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FILENAME_COLUMN: &str = "filename";
const ERROR_COLUMN: &str = "error";

/// CSV file of extraction records, keyed by filename
pub struct ResultStore {
    path: PathBuf,
    query: ExtractionQuery,
    processed: HashSet<String>,
    writer: csv::Writer<File>,
}

impl ResultStore {
    /// Open the store at `path`, creating it with a header if absent
    ///
    /// An existing file must carry the header this query produces.
    pub fn open(path: impl Into<PathBuf>, query: &ExtractionQuery) -> Result<Self, ExtractorError> {
        let path = path.into();
        let header = header_for(query);

        let exists = path.exists() && fs::metadata(&path)?.len() > 0;
        let processed = if exists {
            read_processed(&path, &header)?
        } else {
            HashSet::new()
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if !exists {
            writer.write_record(&header)?;
            writer.flush()?;
            debug!("Created result store {}", path.display());
        } else {
            info!(
                "Found {} processed documents in {}",
                processed.len(),
                path.display()
            );
        }

        Ok(Self {
            path,
            query: query.clone(),
            processed,
            writer,
        })
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a record for `filename` is already stored
    pub fn is_processed(&self, filename: &str) -> bool {
        self.processed.contains(filename)
    }

    /// Filenames already stored
    pub fn processed_files(&self) -> &HashSet<String> {
        &self.processed
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.processed.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    /// Append a record unless its filename is already present
    ///
    /// Returns `true` if a row was written.
    pub fn append(&mut self, record: &ExtractionRecord) -> Result<bool, ExtractorError> {
        let filename = record.filename();
        if self.is_processed(filename) {
            debug!("Skipping {}: already in result store", filename);
            return Ok(false);
        }

        let row = self.row_for(record);
        self.writer.write_record(&row)?;
        self.writer.flush()?;
        self.processed.insert(filename.to_string());
        Ok(true)
    }

    fn row_for(&self, record: &ExtractionRecord) -> Vec<String> {
        let mut row = Vec::with_capacity(self.query.field_count() + 2);
        row.push(record.filename().to_string());
        for name in self.query.field_names() {
            row.push(record.value(name).unwrap_or_default().to_string());
        }
        row.push(record.error().unwrap_or_default().to_string());
        row
    }
}

fn header_for(query: &ExtractionQuery) -> Vec<String> {
    let mut header = Vec::with_capacity(query.field_count() + 2);
    header.push(FILENAME_COLUMN.to_string());
    header.extend(query.field_names().iter().cloned());
    header.push(ERROR_COLUMN.to_string());
    header
}

fn read_processed(path: &Path, expected: &[String]) -> Result<HashSet<String>, ExtractorError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if found != expected {
        return Err(ExtractorError::Store(format!(
            "{} has header {:?}, expected {:?}",
            path.display(),
            found,
            expected
        )));
    }

    let column = found
        .iter()
        .position(|name| name == FILENAME_COLUMN)
        .ok_or_else(|| {
            ExtractorError::Store(format!("{} has no filename column", path.display()))
        })?;

    let mut processed = HashSet::new();
    for row in reader.records() {
        let row = row?;
        if let Some(filename) = row.get(column) {
            if !filename.is_empty() {
                processed.insert(filename.to_string());
            }
        }
    }
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn query() -> ExtractionQuery {
        ExtractionQuery::new("q", ["a", "b"])
    }

    fn success(filename: &str) -> ExtractionRecord {
        ExtractionRecord::from_values(
            filename,
            &query(),
            vec![Some("one, with comma".to_string()), None],
        )
    }

    #[test]
    fn test_creates_file_with_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");

        let store = ResultStore::open(&path, &query()).unwrap();
        assert!(store.is_empty());
        drop(store);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "filename,a,b,error\n");
    }

    #[test]
    fn test_append_writes_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");

        let mut store = ResultStore::open(&path, &query()).unwrap();
        assert!(store.append(&success("paper1.pdf")).unwrap());
        assert!(store
            .append(&ExtractionRecord::failure("paper2.pdf", "boom"))
            .unwrap());
        assert_eq!(store.len(), 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[1], "paper1.pdf,\"one, with comma\",,");
        assert_eq!(lines[2], "paper2.pdf,,,boom");
    }

    #[test]
    fn test_duplicate_filename_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");

        let mut store = ResultStore::open(&path, &query()).unwrap();
        assert!(store.append(&success("paper1.pdf")).unwrap());
        assert!(!store.append(&success("paper1.pdf")).unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reopen_sees_processed_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("results.csv");

        {
            let mut store = ResultStore::open(&path, &query()).unwrap();
            store.append(&success("paper1.pdf")).unwrap();
        }

        let mut store = ResultStore::open(&path, &query()).unwrap();
        assert!(store.is_processed("paper1.pdf"));
        assert!(!store.is_processed("paper2.pdf"));
        assert!(store.append(&success("paper2.pdf")).unwrap());

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert_eq!(content.matches("filename").count(), 1);
    }

    #[test]
    fn test_header_mismatch_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        fs::write(&path, "filename,x,y,error\n").unwrap();

        let result = ResultStore::open(&path, &query());
        assert!(matches!(result, Err(ExtractorError::Store(_))));
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        fs::write(&path, "").unwrap();

        let store = ResultStore::open(&path, &query()).unwrap();
        drop(store);
        assert_eq!(fs::read_to_string(&path).unwrap(), "filename,a,b,error\n");
    }
}
