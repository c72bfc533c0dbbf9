use std::time::Duration;

use async_trait::async_trait;
use gateway_tunnel_core::prelude::{ScenarioResult, ScenarioSpec, SuiteFailedError};
use gateway_tunnel_instruments::prelude::{OperationRecord, SummaryReportCollector};

use crate::progress::start_progress;

/// Runs a single scenario from session creation through to persisting its results.
#[async_trait]
pub trait ScenarioExecutor: Send {
    async fn run_scenario(&mut self, scenario: &ScenarioSpec) -> ScenarioResult;
}

/// Where the suite is in its scenario list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteState {
    Idle,
    /// Executing the scenario at this index.
    Running(usize),
    /// The scenario at this index failed fatally, nothing after it runs.
    Halted(usize),
    Completed,
}

#[derive(Debug, Clone)]
pub struct SuiteOptions {
    pub inter_scenario_delay: Duration,
    pub show_progress: bool,
}

impl Default for SuiteOptions {
    fn default() -> Self {
        Self {
            inter_scenario_delay: Duration::from_secs(2),
            show_progress: false,
        }
    }
}

/// What happened to each scenario of a suite.
pub struct SuiteReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub persistence_failures: usize,
    pub final_state: SuiteState,
    pub summary: SummaryReportCollector,
}

impl SuiteReport {
    fn new(total: usize) -> Self {
        Self {
            total,
            passed: 0,
            failed: 0,
            skipped: 0,
            persistence_failures: 0,
            final_state: SuiteState::Idle,
            summary: SummaryReportCollector::new(),
        }
    }

    pub fn halted(&self) -> bool {
        matches!(self.final_state, SuiteState::Halted(_))
    }

    /// Only a suite that completed without a single failure succeeded.
    pub fn into_result(self) -> Result<(), SuiteFailedError> {
        match self.final_state {
            SuiteState::Completed if self.failed == 0 => Ok(()),
            SuiteState::Halted(index) => Err(SuiteFailedError::new(format!(
                "suite halted by scenario {} of {}, {} skipped",
                index + 1,
                self.total,
                self.skipped
            ))),
            _ => Err(SuiteFailedError::new(format!(
                "{} of {} scenarios failed",
                self.failed, self.total
            ))),
        }
    }
}

/// Run the scenarios one after another, halting at the first fatal failure.
pub async fn run_suite<E: ScenarioExecutor + ?Sized>(
    scenarios: &[ScenarioSpec],
    executor: &mut E,
    options: &SuiteOptions,
) -> SuiteReport {
    let mut report = SuiteReport::new(scenarios.len());
    let progress = start_progress(scenarios.len(), options.show_progress);

    let mut state = SuiteState::Idle;
    loop {
        state = match state {
            SuiteState::Idle if scenarios.is_empty() => SuiteState::Completed,
            SuiteState::Idle => SuiteState::Running(0),
            SuiteState::Running(index) => {
                let scenario = &scenarios[index];
                log::info!(
                    "Running scenario {}/{}: {}",
                    index + 1,
                    scenarios.len(),
                    scenario.name
                );
                progress.set_message(scenario.name.clone());

                let mut record = OperationRecord::new(scenario.name.as_str());
                let result = executor.run_scenario(scenario).await;
                record.finish(!result.success);
                progress.inc(1);

                if result.success {
                    report.passed += 1;
                    log::info!("Scenario {} passed", scenario.name);
                } else {
                    report.failed += 1;
                    log::error!(
                        "Scenario {} failed: {}",
                        scenario.name,
                        result
                            .error_description()
                            .unwrap_or_else(|| "unknown error".to_string())
                    );
                }
                if let Some(e) = &result.persistence_error {
                    report.persistence_failures += 1;
                    log::error!("Scenario {} passed but was not recorded: {e}", scenario.name);
                }
                report.summary.add_outcome(&record, &result);

                if result.fatal {
                    SuiteState::Halted(index)
                } else if index + 1 < scenarios.len() {
                    log::debug!(
                        "Waiting {:?} before the next scenario",
                        options.inter_scenario_delay
                    );
                    tokio::time::sleep(options.inter_scenario_delay).await;
                    SuiteState::Running(index + 1)
                } else {
                    SuiteState::Completed
                }
            }
            SuiteState::Halted(index) => {
                for scenario in &scenarios[index + 1..] {
                    log::warn!("Skipping scenario {} after a fatal failure", scenario.name);
                    report.skipped += 1;
                    report.summary.add_skipped(&scenario.name);
                }
                break;
            }
            SuiteState::Completed => break,
        };
    }

    progress.finish_and_clear();
    report.final_state = state;
    log::info!(
        "Suite finished: {} passed, {} failed, {} skipped of {}",
        report.passed,
        report.failed,
        report.skipped,
        report.total
    );

    report
}
