use super::{prompb, RemoteWrite};
use crate::config::{Auth, ReporterOptions};
use crate::error::{Error, Result};
use crate::metrics::Timeseries;
use anyhow::Context;
use prost::Message;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// HTTP client for a Prometheus remote write endpoint.
///
/// Each push is one protobuf `WriteRequest`, snappy compressed. There are no
/// retries; a failed push is reported to the caller.
#[derive(Debug, Clone)]
pub struct RemoteWriteClient {
    client: reqwest::Client,
    url: Url,
    auth: Option<Auth>,
}

impl RemoteWriteClient {
    pub fn new(options: &ReporterOptions) -> Result<Self> {
        let url = options.validate()?;

        let mut headers = HeaderMap::with_capacity(options.headers.len());
        for (name, value) in &options.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(options.user_agent())
            .default_headers(headers);
        if let Some(timeout) = options.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url,
            auth: options.auth.clone(),
        })
    }

    fn encode(series: Vec<Timeseries>) -> anyhow::Result<Vec<u8>> {
        let write_request = prompb::WriteRequest {
            timeseries: series.into_iter().map(prompb::TimeSeries::from).collect(),
        };

        let mut proto_buf = Vec::with_capacity(write_request.encoded_len());
        write_request
            .encode(&mut proto_buf)
            .context("marshal series into Protobuf")?;

        snap::raw::Encoder::new()
            .compress_vec(&proto_buf)
            .context("compress series with Snappy")
    }
}

#[async_trait::async_trait]
impl RemoteWrite for RemoteWriteClient {
    async fn push(&self, series: Vec<Timeseries>) -> anyhow::Result<()> {
        if series.is_empty() {
            return Ok(());
        }

        log::trace!(
            "pushing {} series to Prometheus remote write host {}",
            series.len(),
            self.url.host_str().unwrap_or_default()
        );

        let body = Self::encode(series)?;

        let mut request = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "application/x-protobuf")
            .header("Content-Encoding", "snappy")
            .header("X-Prometheus-Remote-Write-Version", "0.1.0")
            .body(body);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, auth.password.as_ref());
        }

        let response = request
            .send()
            .await
            .context("send series to Prometheus remote write destination")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response body>".to_string());
            anyhow::bail!(
                "Prometheus remote write returned non-success status {}: {}",
                status,
                body
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Sample, NAME_LABEL};
    use assert_matches::assert_matches;

    #[test]
    fn test_new_requires_server_url() {
        assert_matches!(
            RemoteWriteClient::new(&ReporterOptions::default()),
            Err(Error::MissingServerUrl)
        );
    }

    #[test]
    fn test_new_rejects_bad_header() {
        let options = ReporterOptions::new("http://x/write").with_header("bad header", "v");
        assert_matches!(
            RemoteWriteClient::new(&options),
            Err(Error::InvalidHeader(name)) if name == "bad header"
        );
    }

    #[test]
    fn test_encode_round_trip() {
        let series = Timeseries {
            labels: [
                (NAME_LABEL.to_string(), "pw_test".to_string()),
                ("status".to_string(), "passed".to_string()),
            ]
            .into(),
            samples: vec![
                Sample {
                    value: 0.0,
                    timestamp: 1,
                },
                Sample {
                    value: 1.0,
                    timestamp: 2,
                },
            ],
        };

        let compressed = RemoteWriteClient::encode(vec![series]).unwrap();
        let raw = snap::raw::Decoder::new()
            .decompress_vec(&compressed)
            .unwrap();
        let request = prompb::WriteRequest::decode(raw.as_slice()).unwrap();

        assert_eq!(request.timeseries.len(), 1);
        let names: Vec<&str> = request.timeseries[0]
            .labels
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec![NAME_LABEL, "status"]);
        assert_eq!(request.timeseries[0].samples[1].value, 1.0);
        assert_eq!(request.timeseries[0].samples[1].timestamp, 2);
    }
}
