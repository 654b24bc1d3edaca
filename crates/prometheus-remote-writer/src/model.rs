//! Shapes of the objects the test runner hands to reporter hooks.
//!
//! The runner owns these contracts; the types mirror its JSON reporter
//! payloads (camelCase keys) so a host can deserialize them directly.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    pub current: u32,
    pub total: u32,
}

/// Resolved run configuration passed to `on_begin`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FullConfig {
    pub workers: u32,
    pub fully_parallel: bool,
    pub forbid_only: bool,
    /// Milliseconds; zero means no global timeout.
    pub global_timeout: u64,
    pub max_failures: u32,
    pub shard: Option<Shard>,
    pub update_snapshots: String,
    pub version: String,
    pub root_dir: String,
    pub projects: Vec<FullProject>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FullProject {
    pub name: String,
    pub retries: u32,
    /// Milliseconds.
    pub timeout: u64,
    pub repeat_each: u32,
    pub test_dir: String,
    pub output_dir: String,
}

/// Root suite summary passed to `on_begin`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Suite {
    pub title: String,
    pub all_tests: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestStatus {
    #[default]
    Passed,
    Failed,
    TimedOut,
    Skipped,
    Interrupted,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::TimedOut => "timedOut",
            TestStatus::Skipped => "skipped",
            TestStatus::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestCase {
    pub id: String,
    pub title: String,
    /// Titles from the root suite down to and including the test.
    pub title_path: Vec<String>,
    /// Title of the suite that directly contains the test.
    pub parent: String,
    pub location: Location,
    pub expected_status: TestStatus,
    /// Milliseconds.
    pub timeout: u64,
    pub retries: u32,
    pub repeat_each_index: u32,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestError {
    pub message: Option<String>,
    pub stack: Option<String>,
    pub snippet: Option<String>,
    pub value: Option<String>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub path: Option<PathBuf>,
    pub body: Option<Vec<u8>>,
}

impl Attachment {
    /// Size of the attachment: the inline body, else the file on disk.
    pub fn size(&self) -> u64 {
        if let Some(body) = &self.body {
            return body.len() as u64;
        }
        self.path
            .as_ref()
            .and_then(|path| std::fs::metadata(path).ok())
            .map(|meta| meta.len())
            .unwrap_or(0)
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        match &self.body {
            Some(body) => String::from_utf8_lossy(body),
            None => Cow::Borrowed(""),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestStep {
    pub title: String,
    /// Titles of the enclosing steps, outermost first, ending with this step.
    pub title_path: Vec<String>,
    pub category: String,
    pub location: Option<Location>,
    /// Milliseconds since the Unix epoch.
    pub start_time: i64,
    #[serde(with = "millis")]
    pub duration: Duration,
    pub error: Option<TestError>,
    pub steps: Vec<TestStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestResult {
    pub status: TestStatus,
    pub retry: u32,
    pub worker_index: i32,
    pub parallel_index: i32,
    /// Milliseconds since the Unix epoch.
    pub start_time: i64,
    #[serde(with = "millis")]
    pub duration: Duration,
    pub attachments: Vec<Attachment>,
    pub steps: Vec<TestStep>,
    pub errors: Vec<TestError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    #[default]
    Passed,
    Failed,
    TimedOut,
    Interrupted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Passed => "passed",
            RunStatus::Failed => "failed",
            RunStatus::TimedOut => "timedOut",
            RunStatus::Interrupted => "interrupted",
        }
    }
}

/// Outcome of the whole run, passed to `on_end`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FullResult {
    pub status: RunStatus,
    pub start_time: i64,
    #[serde(with = "millis")]
    pub duration: Duration,
}

/// A chunk of output written by a test or the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Text(String),
    Binary(Vec<u8>),
}

impl Chunk {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Chunk::Text(text) => Cow::Borrowed(text),
            Chunk::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Chunk::Text(text) => text.len(),
            Chunk::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Chunk {
    fn from(value: &str) -> Self {
        Chunk::Text(value.to_string())
    }
}

impl From<String> for Chunk {
    fn from(value: String) -> Self {
        Chunk::Text(value)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(value: Vec<u8>) -> Self {
        Chunk::Binary(value)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_nanos() as f64 / 1_000_000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = f64::deserialize(deserializer)?;
        Ok(Duration::from_nanos((millis.max(0.0) * 1_000_000.0).round() as u64))
    }
}
