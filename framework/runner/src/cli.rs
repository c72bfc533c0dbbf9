use std::path::PathBuf;

use clap::Parser;
use url::Url;

use crate::monitor::MonitorMode;

#[derive(Debug, Clone, Parser)]
#[command(about, long_about = None)]
pub struct GatewayTunnelCli {
    /// Base URL of the gateway, for example `https://gateway.example.com/api/v1`
    #[arg(long, env = "GATEWAY_URL")]
    pub gateway_url: Url,

    /// Access token to start the run with. It is refreshed when the gateway rejects it.
    #[arg(long, env = "GATEWAY_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    #[arg(long, env = "GATEWAY_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: String,

    #[arg(long, env = "GATEWAY_COMPANY_ID")]
    pub company_id: String,

    /// The user that sessions are created on behalf of
    #[arg(long, env = "GATEWAY_EXTERNAL_USER_ID", default_value = "gateway-tunnel")]
    pub external_user_id: String,

    /// The model endpoint that every query is sent to
    #[arg(long, env = "GATEWAY_ENDPOINT_ID")]
    pub endpoint_id: String,

    #[arg(long, env = "GATEWAY_TEMPERATURE", default_value_t = 0.2)]
    pub temperature: f32,

    #[arg(long, env = "GATEWAY_MAX_TOKENS")]
    pub max_tokens: Option<u32>,

    /// Base URL of the analytics interface. Defaults to the gateway URL.
    #[arg(long, env = "GATEWAY_ANALYTICS_URL")]
    pub analytics_url: Option<Url>,

    /// Every completed scenario is posted here when set.
    #[arg(long, env = "GATEWAY_WEBHOOK_URL")]
    pub webhook_url: Option<Url>,

    /// TOML file with the `[[scenario]]` tables to run
    #[arg(long, env = "GATEWAY_CATALOG", default_value = "scenarios.toml")]
    pub catalog: PathBuf,

    /// Only run the named scenario. Can be given more than once.
    #[arg(long)]
    pub only: Vec<String>,

    /// The cumulative CSV report that a row is appended to for each passed scenario
    #[arg(long, env = "GATEWAY_REPORT", default_value = "gateway_results.csv")]
    pub report: PathBuf,

    #[arg(long, env = "GATEWAY_RUN_SUMMARY", default_value = "run_summary.jsonl")]
    pub run_summary: PathBuf,

    /// Identifies this run in the report, the run summary and the monitor output. Generated when
    /// not given.
    #[arg(long, env = "GATEWAY_RUN_ID")]
    pub run_id: Option<String>,

    /// Seconds to wait for the next chunk of a response before the scenario fails
    #[arg(long, env = "GATEWAY_INACTIVITY_TIMEOUT", default_value_t = 60)]
    pub inactivity_timeout: u64,

    /// Seconds to pause between scenarios
    #[arg(long, env = "GATEWAY_SCENARIO_DELAY", default_value_t = 2)]
    pub scenario_delay: u64,

    /// Run the resource monitor next to the suite (`local`), or leave monitoring to the remote
    /// host (`remote`)
    #[arg(long, env = "GATEWAY_MONITOR", value_enum, default_value_t = MonitorMode::Local)]
    pub monitor: MonitorMode,

    /// Interpreter for the monitor script, a name looked up on `PATH` or a path
    #[arg(long, env = "GATEWAY_MONITOR_INTERPRETER")]
    pub monitor_interpreter: Option<PathBuf>,

    #[arg(long, env = "GATEWAY_MONITOR_SCRIPT", default_value = "monitor.py")]
    pub monitor_script: PathBuf,

    /// Where the monitor writes its samples. Not supported by the Windows monitor.
    #[arg(long, env = "GATEWAY_MONITOR_OUT", default_value = "system_metrics.csv")]
    pub monitor_out: PathBuf,

    /// Seconds the monitor keeps recording after the last scenario of a completed suite
    #[arg(long, default_value_t = 5)]
    pub monitor_grace: u64,

    /// Seconds to wait for the monitor to exit after interrupting it, before it is killed
    #[arg(long, default_value_t = 5)]
    pub monitor_kill_timeout: u64,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[arg(long, default_value = "false")]
    pub no_progress: bool,
}
