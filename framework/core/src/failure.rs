/// Returned by the runner when a suite did not pass, so that the process exits with a failure.
///
/// This covers both a suite that was halted by a fatal scenario and one that completed with
/// failed scenarios.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct SuiteFailedError {
    msg: String,
}

impl SuiteFailedError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl Default for SuiteFailedError {
    fn default() -> Self {
        Self {
            msg: "Test suite failed".to_string(),
        }
    }
}
