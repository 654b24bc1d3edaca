//! Label sets describing runner objects.

use crate::metrics::Labels;
use crate::model::{
    Annotation, Attachment, Chunk, FullConfig, FullProject, Location, TestCase, TestError,
    TestResult, TestStep,
};
use std::time::Duration;

const PATH_SEPARATOR: &str = " > ";

struct LabelSet(Labels);

impl LabelSet {
    fn new() -> Self {
        Self(Labels::new())
    }

    fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    fn set_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    fn location(self, location: Option<&Location>) -> Self {
        match location {
            Some(location) => self
                .set("file", &location.file)
                .set("line", location.line)
                .set("column", location.column),
            None => self,
        }
    }

    fn build(self) -> Labels {
        self.0
    }
}

pub(crate) fn millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

pub(crate) fn config_labels(config: &FullConfig) -> Labels {
    let (shard_current, shard_total) = config
        .shard
        .map(|shard| (shard.current, shard.total))
        .unwrap_or((0, 0));
    LabelSet::new()
        .set("workers", config.workers)
        .set("fullyParallel", config.fully_parallel)
        .set("forbidOnly", config.forbid_only)
        .set("globalTimeout", config.global_timeout)
        .set("maxFailures", config.max_failures)
        .set("shardCurrent", shard_current)
        .set("shardTotal", shard_total)
        .set("updateSnapshots", &config.update_snapshots)
        .set("version", &config.version)
        .set("rootDir", &config.root_dir)
        .set("projects", config.projects.len())
        .build()
}

pub(crate) fn project_labels(project: &FullProject) -> Labels {
    LabelSet::new()
        .set("project", &project.name)
        .set("retries", project.retries)
        .set("timeout", project.timeout)
        .set("repeatEach", project.repeat_each)
        .set("testDir", &project.test_dir)
        .set("outputDir", &project.output_dir)
        .build()
}

fn owner(test: &TestCase) -> LabelSet {
    LabelSet::new()
        .set("testId", &test.id)
        .set("testTitle", &test.title)
}

pub(crate) fn test_labels(test: &TestCase, result: &TestResult) -> Labels {
    owner(test)
        .set("title", &test.title)
        .set("titlePath", test.title_path.join(PATH_SEPARATOR))
        .set("parent", &test.parent)
        .location(Some(&test.location))
        .set("expectedStatus", test.expected_status)
        .set("actualStatus", result.status)
        .set("ok", test.expected_status == result.status)
        .set("timeout", test.timeout)
        .set("duration", result.duration.as_millis())
        .set("workerIndex", result.worker_index)
        .set("parallelIndex", result.parallel_index)
        .set("retry", result.retry)
        .set("retries", test.retries)
        .set("repeatEachIndex", test.repeat_each_index)
        .set("attachmentsCount", result.attachments.len())
        .set("annotationsCount", test.annotations.len())
        .set("stepsCount", result.steps.len())
        .set("errorsCount", result.errors.len())
        .build()
}

pub(crate) fn step_labels(
    test: &TestCase,
    result: &TestResult,
    step: &TestStep,
    index: u64,
) -> Labels {
    let status = if step.error.is_some() {
        "failed"
    } else {
        "passed"
    };
    owner(test)
        .set("title", &step.title)
        .set("category", &step.category)
        .location(step.location.as_ref())
        .set("startTime", step.start_time)
        .set("duration", step.duration.as_millis())
        .set("path", step.title_path.join(PATH_SEPARATOR))
        .set("stepIndex", index)
        .set("stepsCount", step.steps.len())
        .set("retry", result.retry)
        .set("status", status)
        .build()
}

pub(crate) fn error_labels(error: &TestError) -> Labels {
    LabelSet::new()
        .set_opt("errorMessage", error.message.as_deref().map(single_line))
        .set_opt("errorSnippet", error.snippet.as_ref())
        .set_opt("errorStack", error.stack.as_ref())
        .set_opt("errorValue", error.value.as_ref())
        .set_opt("errorLocation", error.location.as_ref())
        .build()
}

pub(crate) fn attachment_labels(test: &TestCase, attachment: &Attachment, size: u64) -> Labels {
    owner(test)
        .set("name", &attachment.name)
        .set("contentType", &attachment.content_type)
        .set("size", size)
        .set(
            "path",
            attachment
                .path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
        )
        .set("body", attachment.body_text())
        .build()
}

pub(crate) fn annotation_labels(test: &TestCase, annotation: &Annotation) -> Labels {
    owner(test)
        .set("type", &annotation.kind)
        .set("description", annotation.description.as_deref().unwrap_or_default())
        .build()
}

pub(crate) fn output_labels(
    chunk: &Chunk,
    test: Option<&TestCase>,
    result: Option<&TestResult>,
) -> Labels {
    // always set so a chunk never inherits the previous chunk's owner
    let (id, title) = match test {
        Some(test) => (test.id.as_str(), test.title.as_str()),
        None => ("", ""),
    };
    let retry = result
        .map(|result| result.retry.to_string())
        .unwrap_or_default();
    LabelSet::new()
        .set("testId", id)
        .set("testTitle", title)
        .set("retry", retry)
        .set("size", chunk.len())
        .build()
}

fn single_line(message: &str) -> String {
    message.replace("\r\n", "\n").replace('\n', "\\n")
}
