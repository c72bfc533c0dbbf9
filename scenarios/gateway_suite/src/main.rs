use gateway_scenario_runner::prelude::*;

#[tokio::main]
async fn main() -> GatewayTunnelResult<()> {
    let cli = init();
    log::info!("Starting gateway suite");

    run(cli).await
}
