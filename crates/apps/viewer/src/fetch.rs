//! The network seam between sources and the outside world.
//!
//! Sources never fetch on their own; the session asks a [`GeoFetcher`] for
//! the bytes behind a URL and feeds the outcome back into the source.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use streaming::SourceLoadError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait GeoFetcher: Send + Sync {
    /// GET `url` and return the response body.
    fn fetch(&self, url: String) -> BoxFuture<'_, Result<Vec<u8>, SourceLoadError>>;
}

/// reqwest-backed fetcher with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl GeoFetcher for HttpFetcher {
    fn fetch(&self, url: String) -> BoxFuture<'_, Result<Vec<u8>, SourceLoadError>> {
        Box::pin(async move {
            let resp = self.client.get(&url).send().await.map_err(map_reqwest)?;

            if !resp.status().is_success() {
                return Err(SourceLoadError::Status(resp.status().as_u16()));
            }

            let bytes = resp.bytes().await.map_err(map_reqwest)?;
            Ok(bytes.to_vec())
        })
    }
}

fn map_reqwest(e: reqwest::Error) -> SourceLoadError {
    if e.is_timeout() {
        SourceLoadError::Timeout
    } else {
        SourceLoadError::Network(e.to_string())
    }
}
