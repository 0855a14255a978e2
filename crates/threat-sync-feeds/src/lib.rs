// # HTTP Feed Parsers
//
// This crate provides the text feed formats for the threat-sync system.
//
// ## Formats
//
// | Name     | Source                         | Comment prefixes   |
// |----------|--------------------------------|--------------------|
// | `plain`  | Any one-entry-per-line list    | `#`, `;`, `//`     |
// | `netset` | FireHOL `.netset` / `.ipset`   | `#`                |
//
// Both fetch `feed.url` with a single GET, honour `feed.timeout()` and the
// shutdown signal, and then run the body through the shared line parser.
//
// ## Registration
//
// ```rust,ignore
// let registry = ParserRegistry::new();
// threat_sync_feeds::register(&registry);
// ```

pub mod http;
pub mod lines;

pub use http::{FeedFetcher, USER_AGENT};
pub use lines::{CommentStyle, LineParseOutcome, parse_lines};

use threat_sync_core::config::FeedConfig;
use threat_sync_core::traits::FeedParser;
use threat_sync_core::{NetworkEntry, ParserRegistry, Result, Shutdown};

use std::sync::Arc;

/// Fetch a feed and run its body through the line parser
async fn fetch_and_parse(
    fetcher: &FeedFetcher,
    shutdown: &Shutdown,
    feed: &FeedConfig,
    style: CommentStyle,
) -> Result<Vec<NetworkEntry>> {
    let body = fetcher.fetch(shutdown, feed).await?;
    lines::parse_body(&feed.name, &body, style)
}

/// Plain-text feed: one IP or CIDR per line
#[derive(Debug, Clone, Default)]
pub struct PlainParser {
    fetcher: FeedFetcher,
}

impl PlainParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser sharing an existing fetcher
    pub fn with_fetcher(fetcher: FeedFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl FeedParser for PlainParser {
    fn name(&self) -> &str {
        "plain"
    }

    async fn parse(&self, shutdown: &Shutdown, feed: &FeedConfig) -> Result<Vec<NetworkEntry>> {
        fetch_and_parse(&self.fetcher, shutdown, feed, CommentStyle::HashSemicolonSlash).await
    }

    fn validate_config(&self, feed: &FeedConfig) -> Result<()> {
        http::validate_url(feed)
    }
}

/// FireHOL netset feed
#[derive(Debug, Clone, Default)]
pub struct NetsetParser {
    fetcher: FeedFetcher,
}

impl NetsetParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser sharing an existing fetcher
    pub fn with_fetcher(fetcher: FeedFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl FeedParser for NetsetParser {
    fn name(&self) -> &str {
        "netset"
    }

    async fn parse(&self, shutdown: &Shutdown, feed: &FeedConfig) -> Result<Vec<NetworkEntry>> {
        fetch_and_parse(&self.fetcher, shutdown, feed, CommentStyle::Hash).await
    }

    fn validate_config(&self, feed: &FeedConfig) -> Result<()> {
        http::validate_url(feed)
    }
}

/// Register the text feed parsers with a registry
pub fn register(registry: &ParserRegistry) {
    let fetcher = FeedFetcher::new();
    registry.register(Arc::new(PlainParser::with_fetcher(fetcher.clone())));
    registry.register(Arc::new(NetsetParser::with_fetcher(fetcher)));
}
