// # Feed Parser Trait
//
// Defines the interface for turning one feed format into network entries.
//
// ## Implementations
//
// - `plain`, `netset`: `threat-sync-feeds` crate
//
// ## Usage
//
// ```rust,ignore
// use threat_sync_core::{FeedParser, Shutdown};
//
// let parser = /* FeedParser implementation */;
// parser.validate_config(&feed)?;
// let entries = parser.parse(&Shutdown::never(), &feed).await?;
// ```

use crate::config::FeedConfig;
use crate::entry::NetworkEntry;
use crate::error::Result;
use crate::shutdown::Shutdown;
use async_trait::async_trait;

/// Trait for feed parser implementations
///
/// A parser owns retrieval and decoding for one feed format. It is selected
/// by matching [`FeedParser::name`] against [`FeedConfig::parser`].
///
/// # Contract
///
/// - Use [`FeedConfig::timeout`] as the request deadline.
/// - Abort the in-flight request and return [`crate::Error::Cancelled`] when
///   the shutdown signal fires.
/// - Return `Fetch` on transport failure, `UnexpectedStatus` on a
///   non-success response and `NoValidEntries` when nothing parsed.
/// - Never retry; the next scheduled cycle is the retry.
#[async_trait]
pub trait FeedParser: Send + Sync {
    /// Stable identifier matched against `FeedConfig::parser`
    fn name(&self) -> &str;

    /// Fetch the feed and parse it into network entries
    async fn parse(&self, shutdown: &Shutdown, feed: &FeedConfig) -> Result<Vec<NetworkEntry>>;

    /// Structural validation only; performs no network I/O
    fn validate_config(&self, feed: &FeedConfig) -> Result<()>;
}
