mod metric;

#[cfg(test)]
mod test;

pub use metric::{Counter, CounterKind, Gauge, GaugeKind, Metric, Scoped};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Label key carrying the series name on the wire.
pub const NAME_LABEL: &str = "__name__";

/// Open-ended label bag qualifying a series beyond its name.
pub type Labels = BTreeMap<String, String>;

/// A single timestamped value of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Sample {
    pub fn now(value: f64) -> Self {
        Self {
            value,
            timestamp: from_time(SystemTime::now()),
        }
    }
}

/// Wire-level series record exchanged with the remote write endpoint and
/// carried in the stdout side channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeseries {
    pub labels: Labels,
    pub samples: Vec<Sample>,
}

impl Timeseries {
    pub fn name(&self) -> Option<&str> {
        self.labels.get(NAME_LABEL).map(String::as_str)
    }

    /// Rewrites the series name to `{prefix}{name}` and merges `extra` labels
    /// underneath the series' own labels. The name label of `extra` is ignored.
    pub fn relabel(mut self, prefix: &str, extra: &Labels) -> Self {
        for (key, value) in extra {
            if key != NAME_LABEL && !self.labels.contains_key(key) {
                self.labels.insert(key.clone(), value.clone());
            }
        }
        let name = self.labels.remove(NAME_LABEL).unwrap_or_default();
        self.labels
            .insert(NAME_LABEL.to_string(), format!("{prefix}{name}"));
        self
    }
}

/// Convert SystemTime to Prometheus timestamp (milliseconds since Unix epoch)
pub(crate) fn from_time(t: SystemTime) -> i64 {
    match t.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => {
            let secs = duration.as_secs() as i64;
            let nanos = duration.subsec_nanos() as i64;
            secs * 1000 + nanos / 1_000_000
        }
        Err(_) => 0,
    }
}
