//! Metrics created from inside a single test body.
//!
//! Fixture metrics are not registered with the reporter. They reach the
//! remote endpoint only when the test calls [`Metric::collect`] (or drops a
//! [`Metric::scoped`] guard), which writes them to stdout for the reporter's
//! stdout hook to pick up.
//!
//! [`Metric::collect`]: crate::metrics::Metric::collect
//! [`Metric::scoped`]: crate::metrics::Metric::scoped

use crate::error::Result;
use crate::metrics::{Counter, Gauge, Labels};
use crate::model::TestCase;

/// Per-test factory for fixture metrics. Labels given here are attached to
/// every metric it creates.
#[derive(Debug, Clone, Default)]
pub struct TestFixtures {
    labels: Labels,
}

impl TestFixtures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixtures for `test`, labeling every metric with the owning test.
    pub fn for_test(test: &TestCase) -> Self {
        Self::new().with_labels([("testId", test.id.as_str()), ("testTitle", test.title.as_str())])
    }

    pub fn with_labels<L, N, V>(mut self, labels: L) -> Self
    where
        L: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        self.labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn use_counter_metric(&self, name: &str, labels: Option<Labels>) -> Result<Counter> {
        Ok(Counter::new(name, self.labels.clone())?.with_labels(labels.unwrap_or_default()))
    }

    pub fn use_gauge_metric(&self, name: &str, labels: Option<Labels>) -> Result<Gauge> {
        Ok(Gauge::new(name, self.labels.clone())?.with_labels(labels.unwrap_or_default()))
    }
}
