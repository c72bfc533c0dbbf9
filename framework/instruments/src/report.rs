mod csv_file_reporter;
mod summary_report;

use std::path::PathBuf;

use async_trait::async_trait;
use gateway_tunnel_core::prelude::HarnessError;

use crate::aggregate::ReportRow;

pub use csv_file_reporter::CsvFileReporter;
pub use summary_report::SummaryReportCollector;

/// Somewhere to persist the row of each passed scenario.
#[async_trait]
pub trait Report: Send + Sync {
    async fn append(&self, row: &ReportRow) -> Result<(), ReportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ReportError> for HarnessError {
    fn from(err: ReportError) -> Self {
        HarnessError::Persistence(err.to_string())
    }
}
