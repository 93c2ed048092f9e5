use std::error::Error;
use std::ops::Range;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::REFERER;
use tracing::debug;
use url::Url;

use crate::domain::errors::FetchError;
use crate::domain::ports::ImageFetcher;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const USER_AGENT: &str = concat!("thumb-server/", env!("CARGO_PKG_VERSION"));

/// Largest source image body that will be downloaded.
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Status codes treated as a successful fetch.
const SUCCESS_STATUSES: Range<u16> = 200..299;

/// Fetches source images over HTTP(S) with a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpImageFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Build a fetcher with its own client identifying as this server.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::new(client, timeout))
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }

        let response = self
            .client
            .get(url.clone())
            .header(REFERER, origin(url))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| FetchError::Network {
                url: url.to_string(),
                message: error_chain(&err),
            })?;

        let status = response.status().as_u16();
        if !SUCCESS_STATUSES.contains(&status) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = self.read_body(url, response).await?;

        debug!(url = %url, bytes = bytes.len(), "fetched source image");
        Ok(bytes)
    }
}

impl HttpImageFetcher {
    async fn read_body(
        &self,
        url: &Url,
        mut response: reqwest::Response,
    ) -> Result<Vec<u8>, FetchError> {
        let too_large = || FetchError::Body {
            url: url.to_string(),
            message: format!("body exceeds {} bytes", self.max_body_bytes),
        };

        let declared = response.content_length().unwrap_or(0);
        if !usize::try_from(declared).is_ok_and(|len| len <= self.max_body_bytes) {
            return Err(too_large());
        }

        let mut body = Vec::with_capacity(usize::try_from(declared).unwrap_or(0));
        while let Some(chunk) = response.chunk().await.map_err(|err| FetchError::Body {
            url: url.to_string(),
            message: error_chain(&err),
        })? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

/// Scheme, host and non-default port of `url`, without path or query.
pub fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Render an error together with its sources, skipping causes already in the message.
fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
