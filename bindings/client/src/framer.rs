use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use gateway_tunnel_core::prelude::{MetricsRecord, RawAccumulation, StreamEvent};
use serde_json::Value;

use crate::error::{GatewayError, StreamError};

/// Prefix of every line of the response stream that carries an event.
pub const EVENT_MARKER: &str = "data:";
/// Payload of the line that ends the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// JSON pointers to the answer text, in the order they are tried.
const ANSWER_POINTERS: [&str; 6] = [
    "/answer",
    "/content",
    "/text",
    "/delta/content",
    "/choices/0/message/content",
    "/choices/0/delta/content",
];

/// Turns arbitrarily split chunks of the response body into [`StreamEvent`]s.
///
/// Only complete lines are decoded, so the events produced do not depend on where the transport
/// split the bytes. Once the completion sentinel is seen the framer is done and ignores any
/// further input.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
    /// Length of the prefix of `pending` already known to hold no newline.
    scanned: usize,
    done: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk and return the events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.pending[search_from..].iter().position(|b| *b == b'\n') {
            let end = search_from + offset;
            let event = decode_line(&self.pending[start..end]);
            start = end + 1;
            search_from = start;

            if let Some(event) = event {
                let is_done = event == StreamEvent::Done;
                events.push(event);
                if is_done {
                    self.done = true;
                    self.pending.clear();
                    self.scanned = 0;
                    return events;
                }
            }
        }

        self.pending.drain(..start);
        self.scanned = self.pending.len();
        events
    }

    /// Flush the final line at the end of the stream, even if it was not newline terminated.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        self.done = true;
        self.scanned = 0;

        let line = std::mem::take(&mut self.pending);
        decode_line(&line).into_iter().collect()
    }

    /// Whether the completion sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Decode one complete line. Lines without the event marker, and keep-alive lines with an empty
/// payload, produce nothing.
fn decode_line(line: &[u8]) -> Option<StreamEvent> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = String::from_utf8_lossy(line);
    let payload = line.strip_prefix(EVENT_MARKER)?.trim();

    if payload.is_empty() {
        return None;
    }
    if payload == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value @ Value::Object(_)) => Some(
            classify_event(&value)
                .unwrap_or_else(|| StreamEvent::Unrecognized(payload.to_string())),
        ),
        Ok(_) => Some(StreamEvent::Unrecognized(payload.to_string())),
        Err(e) => {
            log::trace!("Undecodable stream line ({e}): {payload}");
            Some(StreamEvent::Unrecognized(payload.to_string()))
        }
    }
}

/// Answer fields take priority over metrics.
fn classify_event(value: &Value) -> Option<StreamEvent> {
    if let Some(text) = ANSWER_POINTERS
        .iter()
        .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
    {
        return Some(StreamEvent::AnswerFragment(text.to_string()));
    }

    metrics_record(value).map(StreamEvent::Metrics)
}

fn metrics_record(value: &Value) -> Option<MetricsRecord> {
    let marker = value
        .get("event")
        .or_else(|| value.get("type"))
        .and_then(Value::as_str)?;
    if !marker.eq_ignore_ascii_case("metrics") {
        return None;
    }

    let container = value
        .get("metrics")
        .or_else(|| value.get("data"))
        .and_then(Value::as_object)?;

    let identifier = |key: &str| {
        container
            .get(key)
            .or_else(|| value.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let fields = container
        .iter()
        .filter_map(|(name, v)| v.as_f64().map(|n| (name.clone(), n)))
        .collect::<BTreeMap<_, _>>();

    Some(MetricsRecord {
        session_id: identifier("session_id"),
        message_id: identifier("message_id"),
        fields,
    })
}

/// A pull based reader of [`StreamEvent`]s from a chunked response body.
///
/// Every wait for the next chunk is bounded by the inactivity window, which restarts with each
/// chunk received. The framer is finished after the completion sentinel, the end of the body, an
/// inactivity timeout or a transport error, and then only returns `None`.
pub struct StreamFramer<S> {
    chunks: S,
    lines: LineFramer,
    ready: VecDeque<StreamEvent>,
    transcript: Vec<u8>,
    inactivity_window: Duration,
    finished: bool,
}

impl<S> StreamFramer<S>
where
    S: Stream<Item = Result<Bytes, GatewayError>> + Unpin,
{
    pub fn new(chunks: S, inactivity_window: Duration) -> Self {
        Self {
            chunks,
            lines: LineFramer::new(),
            ready: VecDeque::new(),
            transcript: Vec::new(),
            inactivity_window,
            finished: false,
        }
    }

    /// Wait for the next event.
    pub async fn next_event(&mut self) -> Result<Option<StreamEvent>, StreamError> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Ok(Some(event));
            }
            if self.finished {
                return Ok(None);
            }

            match tokio::time::timeout(self.inactivity_window, self.chunks.next()).await {
                Err(_) => {
                    self.finished = true;
                    return Err(StreamError::Inactive {
                        window: self.inactivity_window,
                    });
                }
                Ok(Some(Err(e))) => {
                    self.finished = true;
                    return Err(StreamError::Transport(e));
                }
                Ok(Some(Ok(chunk))) => {
                    log::trace!("Received {} bytes", chunk.len());
                    self.transcript.extend_from_slice(&chunk);
                    self.ready.extend(self.lines.push(&chunk));
                    self.finished = self.lines.is_done();
                }
                Ok(None) => {
                    self.finished = true;
                    self.ready.extend(self.lines.finish());
                }
            }
        }
    }

    /// Everything received so far, decoded as UTF-8.
    pub fn transcript(&self) -> String {
        String::from_utf8_lossy(&self.transcript).into_owned()
    }

    /// Read the stream to its end, folding every event into `accumulation`.
    ///
    /// The transcript is stored in the accumulation even when reading fails part way.
    pub async fn accumulate(
        &mut self,
        accumulation: &mut RawAccumulation,
    ) -> Result<(), StreamError> {
        let result = loop {
            match self.next_event().await {
                Ok(Some(StreamEvent::Unrecognized(raw))) => {
                    log::debug!("Dropping unrecognised stream event: {raw}");
                }
                Ok(Some(event)) => accumulation.record(&event),
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        accumulation.full_text = self.transcript();
        result
    }
}
