//! Test-run reporter that pushes lifecycle metrics to a Prometheus remote
//! write endpoint.
//!
//! The runner drives a [`PrometheusReporter`] through the [`Reporter`] hooks.
//! Each hook updates in-memory [`Counter`]s and [`Gauge`]s, and at the flush
//! points (every finished step, every finished test, process exit) their
//! series are prefixed, relabeled and pushed in one remote write request.
//!
//! Test bodies can publish their own metrics with [`TestFixtures`]; those
//! travel through stdout as tagged JSON lines (see [`event`]) and are pushed
//! by the reporter's stdout hook.
//!
//! # Usage
//!
//! ```no_run
//! use prometheus_remote_writer::{PrometheusReporter, Reporter, ReporterOptions};
//! use prometheus_remote_writer::model::{TestCase, TestResult};
//!
//! # async fn run() -> prometheus_remote_writer::Result<()> {
//! let options = ReporterOptions::new("http://localhost:9090/api/v1/write")
//!     .with_label("team", "checkout");
//! let mut reporter = PrometheusReporter::new(options)?;
//!
//! reporter
//!     .on_test_end(&TestCase::default(), &TestResult::default())
//!     .await;
//! reporter.on_exit().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod fixture;
pub mod metrics;
pub mod model;
pub mod remote_write;
mod reporter;
mod system;

pub use config::{Auth, ReporterOptions};
pub use error::{Error, Result};
pub use event::{Event, SENTINEL};
pub use fixture::TestFixtures;
pub use metrics::{Counter, Gauge, Labels, Metric, Sample, Timeseries};
pub use remote_write::{RemoteWrite, RemoteWriteClient};
pub use reporter::{PrometheusReporter, Reporter};
pub use system::HostStats;
