//! CSV file output

use crate::etl::Loader;

use eyre::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A record written as one CSV line.
///
/// Fields serialize in declaration order, which must match `HEADER`.
pub trait Row: Serialize {
    const HEADER: &'static [&'static str];
}

/// Append-only CSV file for a single row type
///
/// The header line is written on creation, so an output with no rows still
/// carries its column names.
pub struct CsvSink<R> {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: usize,
    _row: PhantomData<R>,
}

impl<R: Row> CsvSink<R> {
    /// Create (or truncate) the file and write the header
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        writer.write_record(R::HEADER)?;
        writer.flush()?;

        log::debug!("Opened {}", path.display());

        Ok(Self {
            path,
            writer,
            rows: 0,
            _row: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far, excluding the header
    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl<R: Row> Loader for CsvSink<R> {
    type Item = R;

    async fn load(&mut self, items: Vec<Self::Item>) -> Result<usize> {
        for item in &items {
            self.writer
                .serialize(item)
                .with_context(|| format!("Failed to write row to {}", self.path.display()))?;
        }
        self.writer.flush()?;
        self.rows += items.len();
        Ok(items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Sample {
        name: String,
        enabled: bool,
        count: Option<u32>,
    }

    impl Row for Sample {
        const HEADER: &'static [&'static str] = &["Name", "Enabled", "Count"];
    }

    #[tokio::test]
    async fn test_header_only_when_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.csv");
        let sink = CsvSink::<Sample>::create(&path).unwrap();
        assert_eq!(sink.rows(), 0);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Name,Enabled,Count\n");
    }

    #[tokio::test]
    async fn test_appends_batches() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rows.csv");
        let mut sink = CsvSink::create(&path).unwrap();

        sink.load(vec![Sample {
            name: "a, b".to_string(),
            enabled: true,
            count: Some(4),
        }])
        .await
        .unwrap();
        sink.load(vec![Sample {
            name: "c".to_string(),
            enabled: false,
            count: None,
        }])
        .await
        .unwrap();

        assert_eq!(sink.rows(), 2);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Name,Enabled,Count\n\"a, b\",true,4\nc,false,\n");
    }
}
