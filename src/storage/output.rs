//! Output file naming
//!
//! Each project produces one CSV per category, named
//! `{yyyy-MM-dd}-{project}-{category}.csv` inside the output directory.

use super::{CsvSink, Row};

use chrono::NaiveDate;
use eyre::{Context, Result};
use std::path::{Path, PathBuf};

/// The output files written for every project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Machines,
    Software,
    Databases,
    Websites,
    Dependencies,
}

impl Category {
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Machines => "machines",
            Self::Software => "machine-software",
            Self::Databases => "machine-databases",
            Self::Websites => "machine-websites",
            Self::Dependencies => "machine-dependencies",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_suffix())
    }
}

/// Directory that receives the CSV files of one run
#[derive(Debug, Clone)]
pub struct OutputDirectory {
    root: PathBuf,
    date: NaiveDate,
}

impl OutputDirectory {
    /// Create the directory if needed. `date` stamps every file name.
    pub fn create(root: impl AsRef<Path>, date: NaiveDate) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create output directory: {}", root.display()))?;
        Ok(Self { root, date })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a project's file for the given category
    pub fn path(&self, project: &str, category: Category) -> PathBuf {
        let project: String = project
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c => c,
            })
            .collect();
        self.root.join(format!(
            "{}-{}-{}.csv",
            self.date.format("%Y-%m-%d"),
            project,
            category.file_suffix()
        ))
    }

    /// Open the single writer for a project's category file
    pub fn sink<R: Row>(&self, project: &str, category: Category) -> Result<CsvSink<R>> {
        CsvSink::create(self.path(project, category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_file_naming() {
        let temp = TempDir::new().unwrap();
        let output = OutputDirectory::create(temp.path(), date()).unwrap();
        assert_eq!(
            output.path("Servers-Discovery", Category::Software),
            temp.path().join("2024-03-09-Servers-Discovery-machine-software.csv")
        );
        assert_eq!(
            output.path("p", Category::Dependencies),
            temp.path().join("2024-03-09-p-machine-dependencies.csv")
        );
    }

    #[test]
    fn test_project_name_cannot_escape_directory() {
        let temp = TempDir::new().unwrap();
        let output = OutputDirectory::create(temp.path(), date()).unwrap();
        let path = output.path("../evil", Category::Machines);
        assert_eq!(path.parent().unwrap(), temp.path());
    }

    #[test]
    fn test_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        let output = OutputDirectory::create(&nested, date()).unwrap();
        assert!(nested.is_dir());
        assert_eq!(output.root(), nested);
    }
}
