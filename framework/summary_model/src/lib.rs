use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Summary of one suite run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuiteRunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner unless given on the command line. Also passed to the monitor and
    /// written to every report row, so the three outputs of a run can be joined.
    pub run_id: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The time the run finished, as a Unix timestamp in seconds
    pub finished_at: i64,
    /// The number of scenarios selected for the run
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Scenarios that never ran because the suite halted first
    pub skipped: usize,
    /// Whether a fatal failure halted the suite
    pub halted: bool,
    /// Passed scenarios whose report row could not be written
    ///
    /// These do not fail the run, but the report is missing their rows.
    pub persistence_failures: usize,
    /// The version of Gateway Tunnel that was used for this run
    pub gateway_tunnel_version: String,
}

impl SuiteRunSummary {
    /// Create a new run summary with nothing counted yet
    pub fn new(
        run_id: String,
        started_at: i64,
        total: usize,
        gateway_tunnel_version: String,
    ) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            total,
            passed: 0,
            failed: 0,
            skipped: 0,
            halted: false,
            persistence_failures: 0,
            gateway_tunnel_version,
        }
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(
    run_summary: &SuiteRunSummary,
    path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let mut line = Vec::new();
    store_run_summary(run_summary, &mut line)?;
    line.push(b'\n');

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    file.write_all(&line)?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(
    run_summary: &SuiteRunSummary,
    writer: &mut W,
) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(run_id: &str) -> SuiteRunSummary {
        let mut summary =
            SuiteRunSummary::new(run_id.to_string(), 1_700_000_000, 3, "0.1.0".to_string());
        summary.passed = 1;
        summary.failed = 1;
        summary.skipped = 1;
        summary.halted = true;
        summary
    }

    #[test]
    fn appends_one_line_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_summary.jsonl");

        append_run_summary(&summary("run-a"), &path).unwrap();
        append_run_summary(&summary("run-b"), &path).unwrap();

        let runs = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str::<SuiteRunSummary>(line).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0], summary("run-a"));
        assert_eq!(runs[1].run_id, "run-b");
    }

    #[test]
    fn stores_a_single_line() {
        let mut buffer = Vec::new();
        store_run_summary(&summary("run-a"), &mut buffer).unwrap();

        assert!(!buffer.contains(&b'\n'));
        assert!(String::from_utf8(buffer).unwrap().contains("\"halted\":true"));
    }
}
