use chrono::{DateTime, SecondsFormat, Utc};
use gateway_tunnel_core::prelude::{
    Phase, PhaseStats, PluginStat, RawAccumulation, SupplementalStats,
};

/// One line of the cumulative report: what the stream produced, merged with the statistics the
/// analytics interface reported for the same answer.
///
/// A phase without statistics contributes zeros and empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub run_id: String,
    pub recorded_at: DateTime<Utc>,
    pub scenario: String,
    pub session_id: String,
    pub message_id: String,
    pub answer_chars: usize,
    pub metrics_events: usize,
    pub reasoning: PhaseStats,
    pub fulfillment: PhaseStats,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Sum of both phase times. Plugin latency is already part of the reasoning time.
    pub total_time: f64,
    /// Seconds.
    pub total_plugin_latency: f64,
    /// Reasoning time without the time spent waiting on plugins.
    pub corrected_reasoning_time: f64,
    pub plugin_stats: Vec<PluginStat>,
}

impl ReportRow {
    pub fn assemble(
        run_id: &str,
        scenario: &str,
        session_id: &str,
        accumulation: &RawAccumulation,
        stats: &SupplementalStats,
    ) -> Self {
        let reasoning = stats.phase(Phase::Reasoning).cloned().unwrap_or_default();
        let fulfillment = stats.phase(Phase::Fulfillment).cloned().unwrap_or_default();
        // Folded from +0.0, an empty `sum` of floats is -0.0.
        let total_plugin_latency = stats
            .plugin_stats
            .iter()
            .fold(0.0, |total, plugin| total + plugin.latency_ms)
            / 1000.0;

        Self {
            run_id: run_id.to_string(),
            recorded_at: Utc::now(),
            scenario: scenario.to_string(),
            session_id: session_id.to_string(),
            message_id: accumulation.last_message_id().unwrap_or_default().to_string(),
            answer_chars: accumulation.final_answer.chars().count(),
            metrics_events: accumulation.metrics_log.len(),
            total_input_tokens: reasoning.input_tokens + fulfillment.input_tokens,
            total_output_tokens: reasoning.output_tokens + fulfillment.output_tokens,
            total_time: reasoning.total_time + fulfillment.total_time,
            total_plugin_latency,
            corrected_reasoning_time: reasoning.total_time - total_plugin_latency,
            reasoning,
            fulfillment,
            plugin_stats: stats.plugin_stats.clone(),
        }
    }

    /// Column names, in the same order as [`ReportRow::values`].
    pub fn columns(&self) -> Vec<String> {
        let mut columns = [
            "run_id",
            "recorded_at",
            "scenario",
            "session_id",
            "message_id",
            "answer_chars",
            "metrics_events",
        ]
        .map(str::to_string)
        .to_vec();

        for phase in [Phase::Reasoning, Phase::Fulfillment] {
            columns.extend(PHASE_COLUMNS.iter().map(|name| format!("{phase}_{name}")));
        }

        columns.extend(
            [
                "total_input_tokens",
                "total_output_tokens",
                "total_time",
                "total_plugin_latency",
                "corrected_reasoning_time",
            ]
            .map(str::to_string),
        );

        for i in 1..=self.plugin_stats.len() {
            columns.extend(PLUGIN_COLUMNS.iter().map(|name| format!("plugin_{i}_{name}")));
        }

        columns
    }

    pub fn values(&self) -> Vec<String> {
        let mut values = vec![
            self.run_id.clone(),
            self.recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.scenario.clone(),
            self.session_id.clone(),
            self.message_id.clone(),
            self.answer_chars.to_string(),
            self.metrics_events.to_string(),
        ];

        for stats in [&self.reasoning, &self.fulfillment] {
            values.extend([
                stats.model.clone(),
                stats.input_tokens.to_string(),
                stats.output_tokens.to_string(),
                stats.total_time.to_string(),
                stats.time_to_first_token.to_string(),
                stats.tokens_per_second.to_string(),
            ]);
        }

        values.extend([
            self.total_input_tokens.to_string(),
            self.total_output_tokens.to_string(),
            self.total_time.to_string(),
            self.total_plugin_latency.to_string(),
            self.corrected_reasoning_time.to_string(),
        ]);

        for plugin in &self.plugin_stats {
            values.extend([
                plugin.tool_id.clone(),
                plugin.latency_ms.to_string(),
                plugin.succeeded.to_string(),
                plugin.stage.clone(),
                plugin.executed_at.clone(),
            ]);
        }

        values
    }
}

const PHASE_COLUMNS: [&str; 6] = [
    "model",
    "input_tokens",
    "output_tokens",
    "total_time",
    "time_to_first_token",
    "tokens_per_second",
];

const PLUGIN_COLUMNS: [&str; 5] = ["tool_id", "latency_ms", "succeeded", "stage", "executed_at"];
