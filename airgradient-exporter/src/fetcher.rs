//! Fetcher for the AirGradient local server API.

use std::time::Duration;

use reqwest::Url;
use tracing::debug;

use crate::error::{ConfigError, FetchError};
use crate::snapshot::{MEASURES_PATH, Snapshot};

/// Polls one device for its current measures.
///
/// One GET per [`Fetcher::fetch`] call, no retries. Dropping the returned
/// future aborts the in-flight request.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    url: Url,
}

impl Fetcher {
    /// Create a fetcher for the device at `endpoint`
    /// (e.g. `http://airgradient_<serial-number>.local`).
    ///
    /// Fails before any network activity if the endpoint is not an absolute
    /// `http`/`https` URL with a host.
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        let url = measures_url(endpoint)?;
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self { client, url })
    }

    /// The resolved measures URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch and decode the current measures.
    pub async fn fetch(&self) -> Result<Snapshot, FetchError> {
        debug!(url = %self.url, "Getting measures from device");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        let snapshot = Snapshot::from_json(&body)?;

        debug!(
            serialno = %snapshot.serial_no,
            firmware = %snapshot.firmware,
            model = %snapshot.model,
            "Got measures from device"
        );
        Ok(snapshot)
    }

    /// Fetch, giving up once `deadline` has elapsed.
    pub async fn fetch_within(&self, deadline: Option<Duration>) -> Result<Snapshot, FetchError> {
        match deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.fetch())
                .await
                .map_err(|_| FetchError::DeadlineExceeded(deadline))?,
            None => self.fetch().await,
        }
    }
}

/// Validate the endpoint and join it with the measures path.
fn measures_url(endpoint: &str) -> Result<Url, ConfigError> {
    if endpoint.trim().is_empty() {
        return Err(ConfigError::MissingEndpoint);
    }

    let mut url = Url::parse(endpoint).map_err(|e| ConfigError::invalid_endpoint(endpoint, e))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid_endpoint(
            endpoint,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::invalid_endpoint(endpoint, "missing host"));
    }

    // Keep any path prefix on the base address.
    let path = format!("{}{}", url.path().trim_end_matches('/'), MEASURES_PATH);
    url.set_path(&path);
    Ok(url)
}
