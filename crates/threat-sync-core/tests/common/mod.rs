//! Test doubles and common utilities for sync contract tests
//!
//! This module provides minimal test doubles that verify orchestration
//! constraints without touching the network.

#![allow(dead_code)]

use threat_sync_core::config::{FeedConfig, FeedsList};
use threat_sync_core::error::{Error, Result};
use threat_sync_core::traits::{AddressGroup, AddressGroupClient, FeedParser, HealthRecorder};
use threat_sync_core::{NetworkEntry, ParserRegistry, Shutdown, SyncEngine};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A parser returning a fixed (but replaceable) list of entries
pub struct StaticParser {
    name: &'static str,
    /// Entries returned by parse(); swap between runs to simulate feed changes
    entries: Arc<Mutex<Vec<String>>>,
    /// Call counter for parse()
    parse_call_count: Arc<AtomicUsize>,
}

impl StaticParser {
    pub fn new(name: &'static str, entries: &[&str]) -> Self {
        Self {
            name,
            entries: Arc::new(Mutex::new(entries.iter().map(|s| s.to_string()).collect())),
            parse_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the entries returned by subsequent parse() calls
    pub fn set_entries(&self, entries: &[&str]) {
        *self.entries.lock().unwrap() = entries.iter().map(|s| s.to_string()).collect();
    }

    /// Get the number of times parse() was called
    pub fn parse_call_count(&self) -> usize {
        self.parse_call_count.load(Ordering::SeqCst)
    }

    /// Create a new StaticParser that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            name: other.name,
            entries: Arc::clone(&other.entries),
            parse_call_count: Arc::clone(&other.parse_call_count),
        }
    }
}

#[async_trait::async_trait]
impl FeedParser for StaticParser {
    fn name(&self) -> &str {
        self.name
    }

    async fn parse(&self, _shutdown: &Shutdown, _feed: &FeedConfig) -> Result<Vec<NetworkEntry>> {
        self.parse_call_count.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries.lock().unwrap().clone();
        entries.iter().map(|s| NetworkEntry::parse(s)).collect()
    }

    fn validate_config(&self, _feed: &FeedConfig) -> Result<()> {
        Ok(())
    }
}

/// A parser that always fails with a feed-level fetch error
pub struct FailingParser {
    name: &'static str,
    invalid_body: bool,
}

impl FailingParser {
    /// Fails every parse with a transport error
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            invalid_body: false,
        }
    }

    /// Fails every parse with a non-feed error (invalid input)
    pub fn invalid_body(name: &'static str) -> Self {
        Self {
            name,
            invalid_body: true,
        }
    }
}

#[async_trait::async_trait]
impl FeedParser for FailingParser {
    fn name(&self) -> &str {
        self.name
    }

    async fn parse(&self, _shutdown: &Shutdown, feed: &FeedConfig) -> Result<Vec<NetworkEntry>> {
        if self.invalid_body {
            return Err(Error::invalid_input("body is not UTF-8"));
        }
        Err(Error::fetch(&feed.name, "connection refused"))
    }

    fn validate_config(&self, feed: &FeedConfig) -> Result<()> {
        Err(Error::config(format!("{} is misconfigured", feed.name)))
    }
}

/// A parser that never completes on its own (for cancellation testing)
pub struct HangingParser {
    name: &'static str,
}

impl HangingParser {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait::async_trait]
impl FeedParser for HangingParser {
    fn name(&self) -> &str {
        self.name
    }

    async fn parse(&self, _shutdown: &Shutdown, _feed: &FeedConfig) -> Result<Vec<NetworkEntry>> {
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }

    fn validate_config(&self, _feed: &FeedConfig) -> Result<()> {
        Ok(())
    }
}

/// How a `MockGroupClient` answers `get_group`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupBehavior {
    /// Return the stored group, or NotFound if none exists yet
    Normal,
    /// Fail with an authentication error
    AuthFailure,
}

/// A mock AddressGroupClient that tracks calls
pub struct MockGroupClient {
    /// The remote group, if it exists
    group: Arc<Mutex<Option<AddressGroup>>>,
    /// Call counters
    get_call_count: Arc<AtomicUsize>,
    create_call_count: Arc<AtomicUsize>,
    update_call_count: Arc<AtomicUsize>,
    /// When set, create/update fail
    fail_writes: Arc<AtomicBool>,
    lookup: LookupBehavior,
}

impl MockGroupClient {
    /// A client whose group does not exist yet
    pub fn new() -> Self {
        Self {
            group: Arc::new(Mutex::new(None)),
            get_call_count: Arc::new(AtomicUsize::new(0)),
            create_call_count: Arc::new(AtomicUsize::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            lookup: LookupBehavior::Normal,
        }
    }

    /// A client whose group already exists with the given members
    pub fn with_existing_group(id: &str, name: &str, members: &[&str]) -> Self {
        let client = Self::new();
        *client.group.lock().unwrap() = Some(AddressGroup {
            id: id.to_string(),
            name: name.to_string(),
            members: members.iter().map(|s| s.to_string()).collect(),
        });
        client
    }

    pub fn with_lookup(mut self, lookup: LookupBehavior) -> Self {
        self.lookup = lookup;
        self
    }

    /// Make create/update fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn get_call_count(&self) -> usize {
        self.get_call_count.load(Ordering::SeqCst)
    }

    pub fn create_call_count(&self) -> usize {
        self.create_call_count.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Total number of remote calls of any kind
    pub fn total_calls(&self) -> usize {
        self.get_call_count() + self.create_call_count() + self.update_call_count()
    }

    /// Current remote membership, if the group exists
    pub fn members(&self) -> Option<Vec<String>> {
        self.group.lock().unwrap().as_ref().map(|g| g.members.clone())
    }

    /// Create a new MockGroupClient that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            group: Arc::clone(&other.group),
            get_call_count: Arc::clone(&other.get_call_count),
            create_call_count: Arc::clone(&other.create_call_count),
            update_call_count: Arc::clone(&other.update_call_count),
            fail_writes: Arc::clone(&other.fail_writes),
            lookup: other.lookup,
        }
    }
}

#[async_trait::async_trait]
impl AddressGroupClient for MockGroupClient {
    async fn get_group(&self, name: &str) -> Result<AddressGroup> {
        self.get_call_count.fetch_add(1, Ordering::SeqCst);

        if self.lookup == LookupBehavior::AuthFailure {
            return Err(Error::auth("session expired"));
        }

        self.group
            .lock()
            .unwrap()
            .clone()
            .filter(|g| g.name == name)
            .ok_or_else(|| Error::not_found(format!("address group '{}'", name)))
    }

    async fn create_group(&self, name: &str, members: &[String]) -> Result<AddressGroup> {
        self.create_call_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::http("POST returned 500"));
        }

        let group = AddressGroup {
            id: "group-1".to_string(),
            name: name.to_string(),
            members: members.to_vec(),
        };
        *self.group.lock().unwrap() = Some(group.clone());
        Ok(group)
    }

    async fn update_group(&self, id: &str, members: &[String]) -> Result<()> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::http("PUT returned 500"));
        }

        let mut group = self.group.lock().unwrap();
        match group.as_mut() {
            Some(g) if g.id == id => {
                g.members = members.to_vec();
                Ok(())
            }
            _ => Err(Error::not_found(format!("address group id '{}'", id))),
        }
    }

    fn client_name(&self) -> &'static str {
        "mock"
    }
}

/// A HealthRecorder that counts notifications
#[derive(Default)]
pub struct CountingHealthRecorder {
    syncs: AtomicUsize,
    errors: AtomicUsize,
}

impl CountingHealthRecorder {
    pub fn syncs(&self) -> usize {
        self.syncs.load(Ordering::SeqCst)
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }
}

impl HealthRecorder for CountingHealthRecorder {
    fn record_sync(&self) {
        self.syncs.fetch_add(1, Ordering::SeqCst);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}

/// Group name used by all contract tests
pub const GROUP: &str = "uts-block-list";

/// Helper to build an enabled feed using `parser`
pub fn feed(name: &str, parser: &str) -> FeedConfig {
    FeedConfig::new(name, format!("https://feeds.example/{}", name), parser)
}

/// Helper to build a registry from a set of parsers
pub fn registry_with(parsers: Vec<Arc<dyn FeedParser>>) -> Arc<ParserRegistry> {
    let registry = Arc::new(ParserRegistry::new());
    for parser in parsers {
        registry.register(parser);
    }
    registry
}

/// Helper to build an engine whose event receiver is dropped
pub fn engine(
    registry: Arc<ParserRegistry>,
    client: MockGroupClient,
    feeds: Vec<FeedConfig>,
) -> SyncEngine {
    let (engine, _event_rx) =
        SyncEngine::new(registry, Box::new(client), FeedsList::new(feeds), GROUP);
    engine
}
