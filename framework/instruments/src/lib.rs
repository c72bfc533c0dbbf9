mod aggregate;
mod report;

use std::time::{Duration, Instant};

pub mod prelude {
    pub use crate::aggregate::ReportRow;
    pub use crate::report::{CsvFileReporter, Report, ReportError, SummaryReportCollector};
    pub use crate::OperationRecord;
}

/// Wall-clock timing of one operation, such as a single scenario.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    operation_id: String,
    started: Instant,
    elapsed: Option<Duration>,
    is_error: bool,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            started: Instant::now(),
            elapsed: None,
            is_error: false,
        }
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Stop the clock. Only the first call has an effect.
    pub fn finish(&mut self, is_error: bool) {
        if self.elapsed.is_none() {
            self.elapsed = Some(self.started.elapsed());
            self.is_error = is_error;
        }
    }

    /// `None` until the operation has finished.
    pub fn duration(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}
