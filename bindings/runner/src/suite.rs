use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use gateway_client::prelude::*;
use gateway_tunnel_core::prelude::Credentials;
use gateway_tunnel_instruments::prelude::CsvFileReporter;
use gateway_tunnel_runner::prelude::*;
use gateway_tunnel_summary_model::{append_run_summary, SuiteRunSummary};

use crate::executor::{ExecutorConfig, GatewayScenarioExecutor};

/// Run every selected scenario of the catalog against the gateway.
///
/// The monitor runs alongside the whole suite. Once the suite is over the outcome table is
/// printed and the run summary appended, whatever the outcome. Returns an error if any scenario
/// failed.
pub async fn run(cli: GatewayTunnelCli) -> GatewayTunnelResult<()> {
    let run_id = cli.run_id.clone().unwrap_or_else(|| nanoid::nanoid!());

    let catalog = ScenarioCatalog::load(&cli.catalog)?.select(&cli.only)?;
    log::info!(
        "Starting run {run_id} with {} scenarios from '{}'",
        catalog.len(),
        cli.catalog.display()
    );

    let mut executor = build_executor(&cli, &run_id)?;

    let supervisor = MonitorSupervisor::new(MonitorConfig {
        mode: cli.monitor,
        interpreter: cli.monitor_interpreter.clone(),
        script: cli.monitor_script.clone(),
        output: cli.monitor_out.clone(),
        grace_period: Duration::from_secs(cli.monitor_grace),
        kill_timeout: Duration::from_secs(cli.monitor_kill_timeout),
    });

    let started_at = Utc::now().timestamp();
    let monitor = supervisor.start(&run_id);

    let report = run_suite(
        catalog.scenarios(),
        &mut executor,
        &SuiteOptions {
            inter_scenario_delay: Duration::from_secs(cli.scenario_delay),
            show_progress: !cli.no_progress,
        },
    )
    .await;

    if let Some(handle) = monitor {
        supervisor.stop(handle, report.halted()).await;
    }

    report.summary.finalize();

    let mut summary = SuiteRunSummary::new(
        run_id,
        started_at,
        report.total,
        env!("CARGO_PKG_VERSION").to_string(),
    );
    summary.finished_at = Utc::now().timestamp();
    summary.passed = report.passed;
    summary.failed = report.failed;
    summary.skipped = report.skipped;
    summary.halted = report.halted();
    summary.persistence_failures = report.persistence_failures;
    if let Err(e) = append_run_summary(&summary, &cli.run_summary) {
        log::error!(
            "Failed to append the run summary to '{}': {e:?}",
            cli.run_summary.display()
        );
    }

    report.into_result()?;

    Ok(())
}

fn build_executor(
    cli: &GatewayTunnelCli,
    run_id: &str,
) -> GatewayTunnelResult<GatewayScenarioExecutor<HttpGateway>> {
    let gateway = HttpGateway::new(cli.gateway_url.clone()).context("Invalid gateway URL")?;
    let analytics = HttpAnalytics::new(
        cli.analytics_url
            .clone()
            .unwrap_or_else(|| cli.gateway_url.clone()),
    )
    .context("Invalid analytics URL")?;
    let webhook = cli.webhook_url.clone().map(|url| {
        log::info!("Delivering completed scenarios to {url}");
        Box::new(HttpWebhook::new(url)) as Box<dyn WebhookSink>
    });

    let client = SessionClient::new(
        gateway,
        Credentials::new(
            cli.access_token.clone(),
            cli.refresh_token.clone(),
            cli.company_id.clone(),
        ),
        cli.external_user_id.clone(),
    );

    Ok(GatewayScenarioExecutor::new(
        client,
        Box::new(analytics),
        Box::new(CsvFileReporter::new(&cli.report)),
        webhook,
        ExecutorConfig {
            run_id: run_id.to_string(),
            endpoint_id: cli.endpoint_id.clone(),
            model_config: ModelConfig {
                temperature: cli.temperature,
                max_tokens: cli.max_tokens,
            },
            inactivity_window: Duration::from_secs(cli.inactivity_timeout),
        },
    ))
}
