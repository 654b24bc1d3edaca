use super::{Labels, Sample, Timeseries, NAME_LABEL};
use crate::error::{Error, Result};
use crate::event::Event;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// Marker for metrics that only move through [`Metric::inc`].
#[derive(Debug, Clone, Copy)]
pub struct CounterKind;

/// Marker for metrics that may also decrease or be set absolutely.
#[derive(Debug, Clone, Copy)]
pub struct GaugeKind;

pub type Counter = Metric<CounterKind>;
pub type Gauge = Metric<GaugeKind>;

/// A named, labeled accumulator that keeps every value it has held since
/// construction as a short time series.
///
/// Every mutation appends a sample instead of overwriting the last one, so a
/// flush pushes all values observed in the current window.
#[derive(Debug, Clone)]
pub struct Metric<K> {
    name: String,
    /// Labels given at construction; restored by [`Metric::reset`].
    base_labels: Labels,
    labels: Labels,
    initial: f64,
    value: f64,
    samples: Vec<Sample>,
    _kind: PhantomData<K>,
}

impl<K> Metric<K> {
    /// Create an unlabeled metric starting at zero.
    pub fn named(name: impl Into<String>) -> Result<Self> {
        Self::with_value(name, Labels::new(), 0.0)
    }

    /// Create a metric starting at zero.
    pub fn new<L, N, V>(name: impl Into<String>, labels: L) -> Result<Self>
    where
        L: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        Self::with_value(name, labels, 0.0)
    }

    /// Create a metric starting at `initial`.
    pub fn with_value<L, N, V>(name: impl Into<String>, labels: L, initial: f64) -> Result<Self>
    where
        L: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::MissingMetricName);
        }

        let mut base_labels = Labels::new();
        merge_labels(&name, &mut base_labels, labels);

        Ok(Self::from_parts(name, base_labels, initial))
    }

    fn from_parts(name: String, base_labels: Labels, initial: f64) -> Self {
        Self {
            name,
            labels: base_labels.clone(),
            base_labels,
            initial,
            value: initial,
            samples: vec![Sample::now(initial)],
            _kind: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Increment by one.
    pub fn inc(&mut self) -> &mut Self {
        self.inc_by(1.0)
    }

    pub fn inc_by(&mut self, amount: f64) -> &mut Self {
        self.record(self.value + amount)
    }

    /// Merge `extra` into the label set in place. Later values win for
    /// repeated keys; the reserved name label is never overwritten.
    pub fn add_labels<L, N, V>(&mut self, extra: L) -> &mut Self
    where
        L: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        merge_labels(&self.name, &mut self.labels, extra);
        self
    }

    /// Consuming variant of [`Metric::add_labels`] for builder-style setup.
    pub fn with_labels<L, N, V>(mut self, extra: L) -> Self
    where
        L: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        self.add_labels(extra);
        self
    }

    /// The current state as a wire record named after the unprefixed metric.
    pub fn to_timeseries(&self) -> Timeseries {
        let mut labels = self.labels.clone();
        labels.insert(NAME_LABEL.to_string(), self.name.clone());
        Timeseries {
            labels,
            samples: self.samples.clone(),
        }
    }

    /// Write the metric to `writer` as one stdout side-channel line.
    pub fn collect_into<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        let line = Event::new(self.to_timeseries()).to_line()?;
        writeln!(writer, "{line}")?;
        writer.flush()
    }

    /// Publish the metric on process stdout, where the reporter picks it up.
    pub fn collect(&self) -> &Self {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        if let Err(err) = self.collect_into(&mut lock) {
            log::warn!("failed to collect metric '{}': {}", self.name, err);
        }
        self
    }

    /// A fresh metric with the construction labels and initial value.
    /// `self` keeps its samples.
    pub fn reset(&self) -> Self {
        Self::from_parts(self.name.clone(), self.base_labels.clone(), self.initial)
    }

    /// Borrow the metric so that it is collected to stdout and then reset
    /// when the guard goes out of scope, including during unwinding.
    pub fn scoped(&mut self) -> Scoped<'_, K> {
        Scoped {
            metric: self,
            sink: None,
        }
    }

    /// Like [`Metric::scoped`], collecting into `sink` instead of stdout.
    pub fn scoped_into<'a>(&'a mut self, sink: &'a mut dyn Write) -> Scoped<'a, K> {
        Scoped {
            metric: self,
            sink: Some(sink),
        }
    }

    /// Drop all but the newest `max` samples.
    pub(crate) fn retain_latest(&mut self, max: usize) {
        let excess = self.samples.len().saturating_sub(max);
        self.samples.drain(..excess);
    }

    fn record(&mut self, value: f64) -> &mut Self {
        self.value = value;
        self.samples.push(Sample::now(value));
        self
    }
}

impl Metric<GaugeKind> {
    /// Decrement by one.
    pub fn dec(&mut self) -> &mut Self {
        self.dec_by(1.0)
    }

    pub fn dec_by(&mut self, amount: f64) -> &mut Self {
        self.record(self.value - amount)
    }

    pub fn set(&mut self, value: f64) -> &mut Self {
        self.record(value)
    }

    pub fn zero(&mut self) -> &mut Self {
        self.set(0.0)
    }
}

fn merge_labels<L, N, V>(name: &str, target: &mut Labels, extra: L)
where
    L: IntoIterator<Item = (N, V)>,
    N: Into<String>,
    V: Into<String>,
{
    for (key, value) in extra {
        let key = key.into();
        if key == NAME_LABEL {
            log::warn!("ignoring reserved label '{NAME_LABEL}' on metric '{name}'");
            continue;
        }
        target.insert(key, value.into());
    }
}

/// Guard returned by [`Metric::scoped`]. Collects then resets the metric on
/// drop.
pub struct Scoped<'a, K> {
    metric: &'a mut Metric<K>,
    sink: Option<&'a mut dyn Write>,
}

impl<K> Deref for Scoped<'_, K> {
    type Target = Metric<K>;

    fn deref(&self) -> &Self::Target {
        &*self.metric
    }
}

impl<K> DerefMut for Scoped<'_, K> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.metric
    }
}

impl<K> Drop for Scoped<'_, K> {
    fn drop(&mut self) {
        match self.sink.as_mut() {
            Some(sink) => {
                if let Err(err) = self.metric.collect_into(&mut **sink) {
                    log::warn!("failed to collect metric '{}': {}", self.metric.name, err);
                }
            }
            None => {
                self.metric.collect();
            }
        }
        *self.metric = self.metric.reset();
    }
}
