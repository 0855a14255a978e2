// # Feed Fetcher
//
// Single-shot HTTP GET of a feed body. No retries: the next scheduled
// sync cycle is the retry.

use threat_sync_core::config::FeedConfig;
use threat_sync_core::{Error, Result, Shutdown};

use reqwest::StatusCode;
use tracing::debug;

/// User-Agent sent with every feed request
pub const USER_AGENT: &str = concat!("threat-sync/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by the text feed parsers
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
}

impl FeedFetcher {
    /// Create a fetcher with the default User-Agent
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Fetch the body of `feed.url`
    ///
    /// # Errors
    ///
    /// - `Error::Cancelled`: The shutdown signal fired mid-request
    /// - `Error::Fetch`: Transport failure, timeout or unreadable body
    /// - `Error::UnexpectedStatus`: Any status other than 200
    pub async fn fetch(&self, shutdown: &Shutdown, feed: &FeedConfig) -> Result<String> {
        let timeout = feed.timeout();
        debug!(feed = %feed.name, url = %feed.url, timeout = ?timeout, "Requesting feed");

        let request = self.client.get(&feed.url).timeout(timeout).send();

        let response = tokio::select! {
            biased;
            _ = shutdown.triggered() => return Err(Error::Cancelled),
            result = request => result.map_err(|e| Error::fetch(&feed.name, e.to_string()))?,
        };

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::unexpected_status(&feed.name, status.as_u16()));
        }

        tokio::select! {
            biased;
            _ = shutdown.triggered() => Err(Error::Cancelled),
            body = response.text() => body.map_err(|e| {
                Error::fetch(&feed.name, format!("error reading feed: {}", e))
            }),
        }
    }
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural checks shared by the HTTP-backed parsers
pub fn validate_url(feed: &FeedConfig) -> Result<()> {
    if feed.url.is_empty() {
        return Err(Error::config(format!("feed {}: url is required", feed.name)));
    }

    let url = reqwest::Url::parse(&feed.url)
        .map_err(|e| Error::config(format!("feed {}: invalid url: {}", feed.name, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::config(format!(
            "feed {}: unsupported url scheme '{}'",
            feed.name, other
        ))),
    }
}
