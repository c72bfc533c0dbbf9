mod credentials;
mod error;
mod event;
mod failure;
mod scenario;
mod stats;

pub mod prelude {
    pub use crate::credentials::Credentials;
    pub use crate::error::HarnessError;
    pub use crate::event::{MetricsRecord, RawAccumulation, StreamEvent};
    pub use crate::failure::SuiteFailedError;
    pub use crate::scenario::{ScenarioResult, ScenarioSpec, Session};
    pub use crate::stats::{Phase, PhaseStats, PluginStat, SupplementalStats};
}
