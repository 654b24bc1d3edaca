mod client;

pub use client::RemoteWriteClient;

use crate::metrics::Timeseries;

/// Destination for flushed series. One call per flush point; the batch is
/// already prefixed and relabeled.
#[async_trait::async_trait]
pub trait RemoteWrite: Send + Sync {
    async fn push(&self, series: Vec<Timeseries>) -> anyhow::Result<()>;
}

/// Prometheus remote write 0.1.0 protobuf messages.
pub mod prompb {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct WriteRequest {
        #[prost(message, repeated, tag = "1")]
        pub timeseries: Vec<TimeSeries>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TimeSeries {
        /// Sorted by name.
        #[prost(message, repeated, tag = "1")]
        pub labels: Vec<Label>,
        #[prost(message, repeated, tag = "2")]
        pub samples: Vec<Sample>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Label {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(string, tag = "2")]
        pub value: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Sample {
        #[prost(double, tag = "1")]
        pub value: f64,
        /// Milliseconds since the Unix epoch.
        #[prost(int64, tag = "2")]
        pub timestamp: i64,
    }

    impl From<crate::metrics::Timeseries> for TimeSeries {
        fn from(series: crate::metrics::Timeseries) -> Self {
            Self {
                labels: series
                    .labels
                    .into_iter()
                    .map(|(name, value)| Label { name, value })
                    .collect(),
                samples: series
                    .samples
                    .into_iter()
                    .map(|sample| Sample {
                        value: sample.value,
                        timestamp: sample.timestamp,
                    })
                    .collect(),
            }
        }
    }
}
