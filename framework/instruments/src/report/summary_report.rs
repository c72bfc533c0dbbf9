mod outcomes_table;

use gateway_tunnel_core::prelude::ScenarioResult;
use tabled::settings::Style;
use tabled::Table;

use crate::report::summary_report::outcomes_table::OutcomeRow;
use crate::OperationRecord;

/// Collects the outcome of every scenario in a suite and prints them as a table at the end.
#[derive(Default)]
pub struct SummaryReportCollector {
    rows: Vec<OutcomeRow>,
}

impl SummaryReportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_outcome(&mut self, record: &OperationRecord, result: &ScenarioResult) {
        let outcome = if result.success {
            "passed"
        } else {
            "failed"
        };
        let detail = match (&result.error, &result.persistence_error) {
            (Some(e), _) | (None, Some(e)) => e.to_string(),
            (None, None) => String::new(),
        };

        self.push(OutcomeRow {
            index: 0,
            scenario: record.operation_id().to_string(),
            outcome,
            duration_ms: record
                .duration()
                .map(|duration| duration.as_micros() as f64 / 1000.0),
            session_id: result.session_id.clone().unwrap_or_default(),
            detail,
        });
    }

    pub fn add_skipped(&mut self, scenario: &str) {
        self.push(OutcomeRow {
            index: 0,
            scenario: scenario.to_string(),
            outcome: "skipped",
            duration_ms: None,
            session_id: String::new(),
            detail: String::new(),
        });
    }

    fn push(&mut self, mut row: OutcomeRow) {
        row.index = self.rows.len() + 1;
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let mut table = Table::new(&self.rows);
        table.with(Style::modern());
        table.to_string()
    }

    /// One line with the number of scenarios per outcome.
    pub fn totals(&self) -> String {
        let count = |outcome: &str| {
            self.rows
                .iter()
                .filter(|row| row.outcome == outcome)
                .count()
        };

        format!(
            "{} scenarios: {} passed, {} failed, {} skipped",
            self.rows.len(),
            count("passed"),
            count("failed"),
            count("skipped")
        )
    }

    pub fn finalize(&self) {
        println!("\nSummary of scenarios");
        println!("{}", self.render());
        println!("{}", self.totals());
    }
}

#[cfg(test)]
mod tests {
    use gateway_tunnel_core::prelude::HarnessError;

    use super::*;

    #[test]
    fn renders_one_line_per_scenario() {
        let mut summary = SummaryReportCollector::new();

        let mut record = OperationRecord::new("weather");
        record.finish(false);
        summary.add_outcome(&record, &ScenarioResult::passed("s-1"));

        let mut record = OperationRecord::new("stocks");
        record.finish(true);
        summary.add_outcome(
            &record,
            &ScenarioResult::failed(
                HarnessError::Content {
                    signatures: vec!["blank response".to_string()],
                },
                Some("s-2".to_string()),
            ),
        );
        summary.add_skipped("news");

        let rendered = summary.render();

        assert!(rendered.contains("weather"));
        assert!(rendered.contains("passed"));
        assert!(rendered.contains("content error: blank response"));
        assert!(rendered.contains("skipped"));
        assert!(rendered.contains("│ 3 "));
        assert_eq!(summary.totals(), "3 scenarios: 1 passed, 1 failed, 1 skipped");
    }

    #[test]
    fn empty_suite_totals_are_zero() {
        assert_eq!(
            SummaryReportCollector::new().totals(),
            "0 scenarios: 0 passed, 0 failed, 0 skipped"
        );
    }
}
