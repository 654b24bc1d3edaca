mod labels;
mod state;

use crate::config::ReporterOptions;
use crate::error::Result;
use crate::event::Event;
use crate::metrics::{Labels, Timeseries};
use crate::model::{
    Chunk, FullConfig, FullResult, Suite, TestCase, TestError, TestResult, TestStatus, TestStep,
};
use crate::remote_write::{RemoteWrite, RemoteWriteClient};
use crate::system::HostStats;
use labels::millis;
use state::{RunMetrics, StepMetrics, TestMetrics};
use std::sync::Arc;

/// Lifecycle hooks invoked by the test runner, in the order
/// `on_begin`, then per test `on_test_begin`, the step hooks and
/// `on_test_end`, then `on_end` and finally `on_exit`. Error and output hooks
/// may fire at any point.
#[async_trait::async_trait]
pub trait Reporter: Send {
    async fn on_begin(&mut self, _config: &FullConfig, _suite: &Suite) {}

    async fn on_test_begin(&mut self, _test: &TestCase, _result: &TestResult) {}

    async fn on_step_begin(&mut self, _test: &TestCase, _result: &TestResult, _step: &TestStep) {}

    async fn on_step_end(&mut self, _test: &TestCase, _result: &TestResult, _step: &TestStep) {}

    async fn on_test_end(&mut self, _test: &TestCase, _result: &TestResult) {}

    async fn on_error(&mut self, _error: &TestError) {}

    async fn on_std_out(
        &mut self,
        _chunk: &Chunk,
        _test: Option<&TestCase>,
        _result: Option<&TestResult>,
    ) {
    }

    async fn on_std_err(
        &mut self,
        _chunk: &Chunk,
        _test: Option<&TestCase>,
        _result: Option<&TestResult>,
    ) {
    }

    async fn on_end(&mut self, _result: &FullResult) {}

    async fn on_exit(&mut self) {}

    /// Whether the reporter wants the console to itself.
    fn prints_to_stdio(&self) -> bool {
        true
    }
}

/// Reporter that turns runner events into series and pushes them to a
/// Prometheus remote write endpoint.
///
/// All state belongs to one run. Per-test and per-step series are replaced
/// with fresh metrics after every flush so their labels and samples do not
/// accumulate across the run.
pub struct PrometheusReporter {
    prefix: String,
    labels: Labels,
    remote: Arc<dyn RemoteWrite>,
    host: HostStats,
    run: RunMetrics,
    test: TestMetrics,
    step: StepMetrics,
    step_index: u64,
}

impl PrometheusReporter {
    /// Build a reporter pushing over HTTP. Fails when `server_url` is
    /// missing or invalid.
    pub fn new(options: ReporterOptions) -> Result<Self> {
        let client = RemoteWriteClient::new(&options)?;
        Self::with_remote_write(options, Arc::new(client))
    }

    /// Build a reporter pushing to `remote`. The options are validated the
    /// same way as in [`PrometheusReporter::new`].
    pub fn with_remote_write(
        options: ReporterOptions,
        remote: Arc<dyn RemoteWrite>,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            host: HostStats::new(&options.env)?,
            prefix: options.prefix,
            labels: options.labels,
            remote,
            run: RunMetrics::new()?,
            test: TestMetrics::new()?,
            step: StepMetrics::new()?,
            step_index: 0,
        })
    }

    async fn push(&self, series: Vec<Timeseries>) {
        if series.is_empty() {
            return;
        }
        let count = series.len();
        let series = series
            .into_iter()
            .map(|s| s.relabel(&self.prefix, &self.labels))
            .collect();
        if let Err(err) = self.remote.push(series).await {
            log::error!("failed to push {count} series: {err:#}");
        }
    }
}

#[async_trait::async_trait]
impl Reporter for PrometheusReporter {
    async fn on_begin(&mut self, config: &FullConfig, suite: &Suite) {
        self.host.refresh();
        self.run.config.add_labels(labels::config_labels(config));
        self.run.projects = config
            .projects
            .iter()
            .map(|project| {
                self.run
                    .project
                    .reset()
                    .with_labels(labels::project_labels(project))
            })
            .collect();
        self.run
            .tests_planned
            .add_labels([("suite", suite.title.as_str())])
            .set(suite.all_tests as f64);
    }

    async fn on_test_begin(&mut self, _test: &TestCase, _result: &TestResult) {
        self.host.refresh();
    }

    async fn on_step_begin(&mut self, _test: &TestCase, _result: &TestResult, _step: &TestStep) {
        self.host.refresh();
    }

    async fn on_step_end(&mut self, test: &TestCase, result: &TestResult, step: &TestStep) {
        self.host.refresh();
        self.step_index += 1;

        let duration = millis(step.duration);
        let mut step_labels = labels::step_labels(test, result, step, self.step_index);
        if let Some(error) = &step.error {
            step_labels.extend(labels::error_labels(error));
            self.step.error.add_labels(step_labels.clone()).inc();
            self.run.step_total_error.inc();
        }
        self.step.step.add_labels(step_labels.clone()).inc();
        self.step.duration.add_labels(step_labels).inc_by(duration);
        self.run.step_total_count.inc();
        self.run.step_total_duration.inc_by(duration);

        self.push(self.step.series(step.error.is_some())).await;
        self.step = self.step.reset();
    }

    async fn on_test_end(&mut self, test: &TestCase, result: &TestResult) {
        self.host.refresh();

        let duration = millis(result.duration);
        self.run.tests_total.inc();
        self.run.tests_total_duration.inc_by(duration);
        match result.status {
            TestStatus::Passed => {
                self.run.tests_passed.inc();
                if result.retry > 0 {
                    self.run.tests_flaky.inc();
                }
            }
            TestStatus::Failed => {
                self.run.tests_failed.inc();
            }
            TestStatus::Skipped => {
                self.run.tests_skipped.inc();
            }
            TestStatus::TimedOut => {
                self.run.tests_timed_out.inc();
            }
            TestStatus::Interrupted => {
                self.run.tests_interrupted.inc();
            }
        }

        for attachment in &result.attachments {
            let size = attachment.size();
            let attachment_labels = labels::attachment_labels(test, attachment, size);
            self.test.attachment.add_labels(attachment_labels.clone()).inc();
            self.test
                .attachment_size
                .add_labels(attachment_labels)
                .inc_by(size as f64);
            self.run.attachment_total_count.inc();
            self.run.attachment_total_size.inc_by(size as f64);
        }

        for annotation in &test.annotations {
            self.test
                .annotation
                .add_labels(labels::annotation_labels(test, annotation))
                .inc();
            self.test
                .annotation_count
                .add_labels([("testId", test.id.as_str())])
                .inc();
            self.run.annotation_total_count.inc();
        }

        let test_labels = labels::test_labels(test, result);
        self.test.test.add_labels(test_labels.clone()).inc();
        self.test.duration.add_labels(test_labels.clone()).inc_by(duration);
        self.test
            .retry_count
            .add_labels(test_labels)
            .inc_by(result.retry as f64);

        let mut batch = self.test.series();
        batch.extend(self.run.totals());
        self.push(batch).await;
        self.test = self.test.reset();
    }

    async fn on_error(&mut self, error: &TestError) {
        self.host.refresh();
        self.run.error.add_labels(labels::error_labels(error)).inc();
        self.run.error_count.inc();
    }

    async fn on_std_out(
        &mut self,
        chunk: &Chunk,
        test: Option<&TestCase>,
        result: Option<&TestResult>,
    ) {
        self.host.refresh();
        let text = chunk.as_text();
        let mut output_labels = labels::output_labels(chunk, test, result);

        let event = Event::parse(&text);
        match event {
            Some(payload) => {
                output_labels.insert("internal".to_string(), "true".to_string());
                output_labels.insert("text".to_string(), String::new());
                self.run.stdout.add_labels(output_labels).inc();
                self.push(vec![payload]).await;
            }
            None => {
                output_labels.insert("internal".to_string(), "false".to_string());
                output_labels.insert("text".to_string(), text.into_owned());
                self.run.stdout.add_labels(output_labels).inc();
            }
        }
    }

    async fn on_std_err(
        &mut self,
        chunk: &Chunk,
        test: Option<&TestCase>,
        result: Option<&TestResult>,
    ) {
        self.host.refresh();
        let text = chunk.as_text();
        let parsed = serde_json::from_str::<serde_json::Value>(text.trim()).ok();
        let (json, text) = match parsed {
            Some(value) => ("true", value.to_string()),
            None => ("false", text.into_owned()),
        };

        let mut output_labels = labels::output_labels(chunk, test, result);
        output_labels.insert("json".to_string(), json.to_string());
        output_labels.insert("text".to_string(), text);
        self.run.stderr.add_labels(output_labels).inc();
    }

    async fn on_end(&mut self, result: &FullResult) {
        self.host.refresh();
        self.run
            .run_duration
            .add_labels([("status", result.status.as_str())])
            .set(millis(result.duration));
    }

    async fn on_exit(&mut self) {
        self.push(self.run.series()).await;

        self.host.refresh();
        self.push(self.host.snapshot()).await;
    }

    fn prints_to_stdio(&self) -> bool {
        false
    }
}
