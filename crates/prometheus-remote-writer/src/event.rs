//! Stdout side channel between test bodies and the reporter.
//!
//! Test bodies may run in a different process than the reporter, so they
//! cannot hand metrics over in memory. Instead a metric is written to stdout
//! as a single JSON line tagged with [`SENTINEL`]; the host forwards the line
//! to the reporter's stdout hook, which recognizes the tag and pushes the
//! payload. Lines without the tag are ordinary output and are only counted.

use crate::metrics::Timeseries;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminator carried in the `name` field of every side-channel line.
pub const SENTINEL: &str = "prometheus-remote-writer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub payload: Timeseries,
}

impl Event {
    pub fn new(payload: Timeseries) -> Self {
        Self {
            name: SENTINEL.to_string(),
            payload,
        }
    }

    /// True iff `input` is an object with a `name` equal to [`SENTINEL`] and
    /// an object `payload`.
    pub fn is(input: &Value) -> bool {
        let Some(object) = input.as_object() else {
            return false;
        };
        let named = object.get("name").and_then(Value::as_str) == Some(SENTINEL);
        let has_payload = object.get("payload").is_some_and(Value::is_object);
        named && has_payload
    }

    /// Recognize a side-channel line. Returns `None` for anything that is not
    /// a tagged event carrying a well-formed, named series.
    pub fn parse(line: &str) -> Option<Timeseries> {
        let value: Value = serde_json::from_str(line.trim()).ok()?;
        if !Self::is(&value) {
            return None;
        }
        let payload = match serde_json::from_value::<Event>(value) {
            Ok(event) => event.payload,
            Err(err) => {
                log::debug!("tagged stdout event has a malformed payload: {err}");
                return None;
            }
        };
        let named = payload.name().is_some_and(|name| !name.trim().is_empty());
        if !named {
            log::debug!("tagged stdout event payload has no series name");
            return None;
        }
        Some(payload)
    }

    /// The event as a single JSON line, without the trailing newline.
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
