use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::aggregate::ReportRow;
use crate::report::{Report, ReportError};

/// Appends rows to one cumulative CSV file, shared by every run.
///
/// The header is written along with the first row of a missing or empty file. Each call renders
/// its text in memory first and hands it to the file in a single write, so a failed append never
/// touches the rows already in the file.
#[derive(Debug, Clone)]
pub struct CsvFileReporter {
    path: PathBuf,
}

impl CsvFileReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> ReportError {
        ReportError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn needs_header(&self) -> Result<bool, ReportError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => Ok(metadata.len() == 0),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[async_trait]
impl Report for CsvFileReporter {
    async fn append(&self, row: &ReportRow) -> Result<(), ReportError> {
        let mut text = String::new();
        if self.needs_header().await? {
            log::debug!("Starting report file '{}'", self.path.display());
            push_line(&mut text, &row.columns());
        }
        push_line(&mut text, &row.values());

        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(text.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;

        log::info!(
            "Appended report row for scenario {} to '{}'",
            row.scenario,
            self.path.display()
        );
        Ok(())
    }
}

fn push_line(text: &mut String, cells: &[String]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            text.push(',');
        }
        push_cell(text, cell);
    }
    text.push('\n');
}

fn push_cell(text: &mut String, cell: &str) {
    if cell.contains([',', '"', '\n', '\r']) {
        text.push('"');
        text.push_str(&cell.replace('"', "\"\""));
        text.push('"');
    } else {
        text.push_str(cell);
    }
}
