use std::fmt;

use serde::{Deserialize, Serialize};

/// The two server side processing stages, each billed separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Reasoning,
    Fulfillment,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Reasoning => "reasoning",
            Phase::Fulfillment => "fulfillment",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latency and outcome of one tool call made during the reasoning phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginStat {
    pub tool_id: String,
    pub latency_ms: f64,
    pub succeeded: bool,
    pub stage: String,
    pub executed_at: String,
}

/// Token and timing statistics for one [`Phase`]. Times are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseStats {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_time: f64,
    pub time_to_first_token: f64,
    pub tokens_per_second: f64,
}

/// Statistics fetched from the analytics interface after a scenario has passed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SupplementalStats {
    pub plugin_stats: Vec<PluginStat>,
    pub reasoning: Option<PhaseStats>,
    pub fulfillment: Option<PhaseStats>,
}

impl SupplementalStats {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseStats> {
        match phase {
            Phase::Reasoning => self.reasoning.as_ref(),
            Phase::Fulfillment => self.fulfillment.as_ref(),
        }
    }
}
