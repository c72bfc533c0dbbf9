use crate::cli::GatewayTunnelCli;
use clap::Parser;

/// Initialise the CLI and logging for the gateway tunnel runner.
pub fn init() -> GatewayTunnelCli {
    env_logger::init();

    GatewayTunnelCli::parse()
}
