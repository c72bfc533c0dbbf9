mod cli;
mod definition;
mod init;
mod interpreter;
mod monitor;
mod progress;
mod run;
mod types;

pub mod prelude {
    pub use crate::cli::GatewayTunnelCli;
    pub use crate::definition::{CatalogError, ScenarioCatalog};
    pub use crate::init::init;
    pub use crate::interpreter::{default_interpreter, interpreter_path};
    pub use crate::monitor::{
        MonitorConfig, MonitorHandle, MonitorMode, MonitorSupervisor, MONITOR_LOG_TARGET,
    };
    pub use crate::run::{run_suite, ScenarioExecutor, SuiteOptions, SuiteReport, SuiteState};
    pub use crate::types::GatewayTunnelResult;
}
