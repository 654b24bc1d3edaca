use crate::error::Result;
use crate::metrics::{Counter, Gauge, Labels, Timeseries};

/// Series that live for the whole run and are flushed on exit.
#[derive(Debug, Clone)]
pub(crate) struct RunMetrics {
    pub config: Counter,
    /// Template for the per-project series; never flushed itself.
    pub project: Counter,
    pub projects: Vec<Counter>,
    pub tests_planned: Gauge,
    pub tests_total: Counter,
    pub tests_passed: Counter,
    pub tests_failed: Counter,
    pub tests_skipped: Counter,
    pub tests_timed_out: Counter,
    pub tests_interrupted: Counter,
    pub tests_flaky: Counter,
    pub tests_total_duration: Counter,
    pub attachment_total_count: Counter,
    pub attachment_total_size: Counter,
    pub annotation_total_count: Counter,
    pub step_total_count: Counter,
    pub step_total_duration: Counter,
    pub step_total_error: Counter,
    pub error: Counter,
    pub error_count: Counter,
    pub stdout: Counter,
    pub stderr: Counter,
    pub run_duration: Gauge,
}

impl RunMetrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            config: Counter::with_value("config", Labels::new(), 1.0)?,
            project: Counter::with_value("project", Labels::new(), 1.0)?,
            projects: Vec::new(),
            tests_planned: Gauge::named("tests_planned")?,
            tests_total: Counter::named("tests_total")?,
            tests_passed: Counter::named("tests_passed")?,
            tests_failed: Counter::named("tests_failed")?,
            tests_skipped: Counter::named("tests_skipped")?,
            tests_timed_out: Counter::named("tests_timed_out")?,
            tests_interrupted: Counter::named("tests_interrupted")?,
            tests_flaky: Counter::named("tests_flaky")?,
            tests_total_duration: Counter::named("tests_total_duration")?,
            attachment_total_count: Counter::named("tests_attachment_total_count")?,
            attachment_total_size: Counter::named("tests_attachment_total_size")?,
            annotation_total_count: Counter::named("tests_annotation_total_count")?,
            step_total_count: Counter::named("test_step_total_count")?,
            step_total_duration: Counter::named("test_step_total_duration")?,
            step_total_error: Counter::named("test_step_total_error")?,
            error: Counter::named("error")?,
            error_count: Counter::named("error_count")?,
            stdout: Counter::named("stdout")?,
            stderr: Counter::named("stderr")?,
            run_duration: Gauge::named("run_duration")?,
        })
    }

    /// Outcome totals, flushed with every finished test.
    pub fn totals(&self) -> Vec<Timeseries> {
        vec![
            self.tests_total.to_timeseries(),
            self.tests_passed.to_timeseries(),
            self.tests_failed.to_timeseries(),
            self.tests_skipped.to_timeseries(),
            self.tests_timed_out.to_timeseries(),
            self.tests_interrupted.to_timeseries(),
            self.tests_flaky.to_timeseries(),
            self.tests_total_duration.to_timeseries(),
            self.attachment_total_count.to_timeseries(),
            self.attachment_total_size.to_timeseries(),
            self.annotation_total_count.to_timeseries(),
        ]
    }

    pub fn series(&self) -> Vec<Timeseries> {
        let mut series = vec![
            self.config.to_timeseries(),
            self.tests_planned.to_timeseries(),
        ];
        series.extend(self.projects.iter().map(Counter::to_timeseries));
        series.extend(self.totals());
        series.extend([
            self.step_total_count.to_timeseries(),
            self.step_total_duration.to_timeseries(),
            self.step_total_error.to_timeseries(),
            self.error.to_timeseries(),
            self.error_count.to_timeseries(),
            self.stdout.to_timeseries(),
            self.stderr.to_timeseries(),
            self.run_duration.to_timeseries(),
        ]);
        series
    }
}

/// Series describing the test that just finished. Replaced after each flush.
#[derive(Debug, Clone)]
pub(crate) struct TestMetrics {
    pub test: Counter,
    pub duration: Counter,
    pub retry_count: Counter,
    pub attachment: Counter,
    pub attachment_size: Counter,
    pub annotation: Counter,
    pub annotation_count: Counter,
}

impl TestMetrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            test: Counter::named("test")?,
            duration: Counter::named("test_duration")?,
            retry_count: Counter::named("test_retry_count")?,
            attachment: Counter::named("test_attachment")?,
            attachment_size: Counter::named("test_attachment_size")?,
            annotation: Counter::named("test_annotation")?,
            annotation_count: Counter::named("test_annotation_count")?,
        })
    }

    pub fn reset(&self) -> Self {
        Self {
            test: self.test.reset(),
            duration: self.duration.reset(),
            retry_count: self.retry_count.reset(),
            attachment: self.attachment.reset(),
            attachment_size: self.attachment_size.reset(),
            annotation: self.annotation.reset(),
            annotation_count: self.annotation_count.reset(),
        }
    }

    pub fn series(&self) -> Vec<Timeseries> {
        vec![
            self.test.to_timeseries(),
            self.duration.to_timeseries(),
            self.retry_count.to_timeseries(),
            self.attachment.to_timeseries(),
            self.attachment_size.to_timeseries(),
            self.annotation.to_timeseries(),
            self.annotation_count.to_timeseries(),
        ]
    }
}

/// Series describing the step that just finished. Replaced after each flush.
#[derive(Debug, Clone)]
pub(crate) struct StepMetrics {
    pub step: Counter,
    pub duration: Counter,
    pub error: Counter,
}

impl StepMetrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            step: Counter::named("test_step")?,
            duration: Counter::named("test_step_duration")?,
            error: Counter::named("test_step_error")?,
        })
    }

    pub fn reset(&self) -> Self {
        Self {
            step: self.step.reset(),
            duration: self.duration.reset(),
            error: self.error.reset(),
        }
    }

    pub fn series(&self, failed: bool) -> Vec<Timeseries> {
        let mut series = vec![self.step.to_timeseries(), self.duration.to_timeseries()];
        if failed {
            series.push(self.error.to_timeseries());
        }
        series
    }
}
