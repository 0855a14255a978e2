//! Plugin-based parser registry
//!
//! The registry maps a feed format identifier to a parser implementation so
//! the engine never needs a central switch over formats.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use threat_sync_core::ParserRegistry;
//!
//! let registry = Arc::new(ParserRegistry::new());
//! threat_sync_feeds::register(&registry);
//!
//! let parser = registry.get("netset")?;
//! ```
//!
//! ## Registration
//!
//! Parser crates expose a `register` function called once during process
//! initialization:
//!
//! ```rust,ignore
//! pub fn register(registry: &ParserRegistry) {
//!     registry.register(Arc::new(PlainParser::new()));
//! }
//! ```

use crate::error::{Error, Result};
use crate::traits::FeedParser;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Registry of feed parsers keyed by their self-reported name
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// lookups and exclusive registration.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: RwLock<HashMap<String, Arc<dyn FeedParser>>>,
}

impl ParserRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parser under its own [`FeedParser::name`]
    ///
    /// Registering a second parser with the same name replaces the first.
    pub fn register(&self, parser: Arc<dyn FeedParser>) {
        let name = parser.name().to_string();
        let mut parsers = self.parsers.write().unwrap_or_else(PoisonError::into_inner);

        if parsers.insert(name.clone(), parser).is_some() {
            warn!(parser = %name, "Parser registered twice, previous registration replaced");
        } else {
            debug!(parser = %name, "Parser registered");
        }
    }

    /// Look up a parser by name
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn FeedParser>)`: The registered parser
    /// - `Err(Error::UnknownParser)`: If no parser has this name
    pub fn get(&self, name: &str) -> Result<Arc<dyn FeedParser>> {
        let parsers = self.parsers.read().unwrap_or_else(PoisonError::into_inner);
        parsers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::unknown_parser(name))
    }

    /// List all registered parser names (unordered)
    pub fn list(&self) -> Vec<String> {
        let parsers = self.parsers.read().unwrap_or_else(PoisonError::into_inner);
        parsers.keys().cloned().collect()
    }

    /// Check if a parser is registered
    pub fn has_parser(&self, name: &str) -> bool {
        let parsers = self.parsers.read().unwrap_or_else(PoisonError::into_inner);
        parsers.contains_key(name)
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("parsers", &self.list())
            .finish()
    }
}
