mod executor;
mod suite;

pub mod prelude {
    pub use crate::executor::{ExecutorConfig, GatewayScenarioExecutor};
    pub use crate::suite::run;

    /// Re-export of the `gateway_tunnel_runner` prelude.
    ///
    /// This is for convenience so that you can depend on a single crate for the runner in your suites.
    pub use gateway_tunnel_runner::prelude::*;

    /// Re-export of the gateway client for convenience.
    pub use gateway_client::prelude::*;
}
