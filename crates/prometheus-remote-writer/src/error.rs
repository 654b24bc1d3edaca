use thiserror::Error;

/// Result type for reporter and metric construction.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for everything that can fail synchronously while setting up
/// metrics or the reporter. Push failures are not represented here; they are
/// logged by the reporter and never reach the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// A metric was constructed without a name.
    #[error("metric name is required")]
    MissingMetricName,

    /// The reporter was constructed without a remote write url.
    #[error("serverUrl is required: set it to the Prometheus remote write endpoint, e.g. http://localhost:9090/api/v1/write")]
    MissingServerUrl,

    /// The remote write url could not be parsed.
    #[error("invalid serverUrl \"{url}\": {source}")]
    InvalidServerUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header \"{0}\"")]
    InvalidHeader(String),

    /// The HTTP client could not be built from the configuration.
    #[error("http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl Error {
    /// Reports whether the error stems from invalid configuration, as
    /// opposed to the environment the reporter runs in.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Error::HttpClient(_))
    }
}
