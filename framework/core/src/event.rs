use std::collections::BTreeMap;

use serde::Serialize;

/// A metrics event reported inline by the gateway while it streams an answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsRecord {
    pub session_id: Option<String>,
    pub message_id: Option<String>,
    /// Every numeric entry of the metrics payload, keyed by its name.
    pub fields: BTreeMap<String, f64>,
}

/// One decoded unit of the gateway's response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A piece of the answer. Concatenating all fragments in order gives the full answer.
    AnswerFragment(String),
    Metrics(MetricsRecord),
    /// The completion sentinel was received, nothing follows.
    Done,
    /// A marker-prefixed line that did not decode to a recognised event.
    Unrecognized(String),
}

/// Everything collected from the stream of one scenario.
#[derive(Debug, Clone, Default)]
pub struct RawAccumulation {
    /// The full response body as received, decoded as UTF-8.
    pub full_text: String,
    pub final_answer: String,
    pub metrics_log: Vec<MetricsRecord>,
}

impl RawAccumulation {
    /// Fold a decoded event into the accumulation.
    pub fn record(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::AnswerFragment(fragment) => self.final_answer.push_str(fragment),
            StreamEvent::Metrics(record) => self.metrics_log.push(record.clone()),
            StreamEvent::Done | StreamEvent::Unrecognized(_) => {}
        }
    }

    /// The message id of the most recent metrics record that carried one.
    pub fn last_message_id(&self) -> Option<&str> {
        self.metrics_log
            .iter()
            .rev()
            .find_map(|record| record.message_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(message_id: Option<&str>) -> MetricsRecord {
        MetricsRecord {
            session_id: Some("s-1".to_string()),
            message_id: message_id.map(str::to_string),
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn record_appends_fragments_and_metrics() {
        let mut accumulation = RawAccumulation::default();
        accumulation.record(&StreamEvent::AnswerFragment("Hello".to_string()));
        accumulation.record(&StreamEvent::Unrecognized("{}".to_string()));
        accumulation.record(&StreamEvent::AnswerFragment(", world".to_string()));
        accumulation.record(&StreamEvent::Metrics(metrics(Some("m-1"))));
        accumulation.record(&StreamEvent::Done);

        assert_eq!(accumulation.final_answer, "Hello, world");
        assert_eq!(accumulation.metrics_log.len(), 1);
    }

    #[test]
    fn last_message_id_skips_records_without_one() {
        let mut accumulation = RawAccumulation::default();
        accumulation.record(&StreamEvent::Metrics(metrics(Some("m-1"))));
        accumulation.record(&StreamEvent::Metrics(metrics(Some("m-2"))));
        accumulation.record(&StreamEvent::Metrics(metrics(None)));

        assert_eq!(accumulation.last_message_id(), Some("m-2"));
    }

    #[test]
    fn no_message_id_without_metrics() {
        assert_eq!(RawAccumulation::default().last_message_id(), None);
    }
}
