//! Core sync engine
//!
//! The SyncEngine is responsible for:
//! - Fetching every enabled feed through its registered parser
//! - Normalizing and fingerprinting the combined entry set
//! - Skipping the remote side when the fingerprint is unchanged
//! - Reconciling the remote address-group (fetch-or-create, then replace)
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   Vec<NetworkEntry>   ┌──────────────┐
//! │ ParserRegistry │──────────────────────▶│  SyncEngine  │
//! │  (FeedParser)  │    (per feed)         └──────────────┘
//! └────────────────┘                              │
//!         ┌──────────────────────┬────────────────┼──────────────────────┐
//!         ▼                      ▼                ▼                      ▼
//! ┌──────────────┐     ┌──────────────┐   ┌────────────────────┐ ┌──────────────┐
//! │  Normalizer  │     │ Fingerprint  │   │ AddressGroupClient │ │    Events    │
//! │ (dedup/sort) │     │  (compare)   │   │ (get/create/update)│ │   (notify)   │
//! └──────────────┘     └──────────────┘   └────────────────────┘ └──────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Fetch each enabled feed in configuration order; a failing feed is
//!    logged and skipped
//! 2. Normalize the concatenated entries
//! 3. Fingerprint the normalized set
//! 4. If the fingerprint matches the last successful one, stop
//! 5. Otherwise look up the group by name and create or update it
//! 6. On success, remember the fingerprint and notify the health recorder

use crate::config::{FeedConfig, FeedsList, ThreatSyncConfig};
use crate::entry::NetworkEntry;
use crate::error::{Error, Result};
use crate::normalizer::{self, Fingerprint};
use crate::registry::ParserRegistry;
use crate::shutdown::Shutdown;
use crate::traits::{AddressGroupClient, HealthRecorder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Capacity of the engine's event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Sync cycle started
    CycleStarted {
        feeds: usize,
    },

    /// Feed fetched and parsed
    FeedFetched {
        feed: String,
        entries: usize,
    },

    /// Feed skipped after a feed-level error
    FeedSkipped {
        feed: String,
        error: String,
    },

    /// Normalized set unchanged since the last successful sync
    Unchanged {
        fingerprint: Fingerprint,
        entries: usize,
    },

    /// Address-group created
    GroupCreated {
        group: String,
        entries: usize,
    },

    /// Address-group membership replaced
    GroupUpdated {
        group: String,
        entries: usize,
    },

    /// Sync cycle failed
    CycleFailed {
        error: String,
    },
}

/// Result of a successful sync cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing changed; no remote calls were made
    Unchanged {
        fingerprint: Fingerprint,
        entries: usize,
    },

    /// The group did not exist and was created
    Created {
        fingerprint: Fingerprint,
        entries: usize,
        group_id: String,
    },

    /// The group's membership was replaced
    Updated {
        fingerprint: Fingerprint,
        entries: usize,
        group_id: String,
    },
}

impl SyncOutcome {
    /// Fingerprint of the normalized set this cycle produced
    pub fn fingerprint(&self) -> Fingerprint {
        match self {
            SyncOutcome::Unchanged { fingerprint, .. }
            | SyncOutcome::Created { fingerprint, .. }
            | SyncOutcome::Updated { fingerprint, .. } => *fingerprint,
        }
    }

    /// Number of unique entries in the normalized set
    pub fn entries(&self) -> usize {
        match self {
            SyncOutcome::Unchanged { entries, .. }
            | SyncOutcome::Created { entries, .. }
            | SyncOutcome::Updated { entries, .. } => *entries,
        }
    }
}

/// Core sync engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`] or [`SyncEngine::from_config()`]
/// 2. Optionally attach a recorder with [`SyncEngine::set_health_recorder()`]
/// 3. Call [`SyncEngine::run()`] once per tick, or hand the schedule to
///    [`SyncEngine::run_periodic()`]
///
/// ## State
///
/// The only cross-cycle state is the last successful fingerprint. It is
/// held in an async mutex for the whole cycle, so overlapping `run` calls
/// serialize instead of racing.
pub struct SyncEngine {
    /// Parser lookup by format name
    registry: Arc<ParserRegistry>,

    /// Remote address-group client
    remote: Box<dyn AddressGroupClient>,

    /// Feeds, in fetch order
    feeds: FeedsList,

    /// Remote address-group name
    group_name: String,

    /// Fingerprint of the last successfully reconciled set
    last_fingerprint: Mutex<Option<Fingerprint>>,

    /// Optional health observer
    health: Option<Arc<dyn HealthRecorder>>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        registry: Arc<ParserRegistry>,
        remote: Box<dyn AddressGroupClient>,
        feeds: FeedsList,
        group_name: impl Into<String>,
    ) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (tx, rx) = mpsc::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            registry,
            remote,
            feeds,
            group_name: group_name.into(),
            last_fingerprint: Mutex::new(None),
            health: None,
            event_tx: tx,
        };

        (engine, rx)
    }

    /// Create a sync engine from a validated configuration
    pub fn from_config(
        registry: Arc<ParserRegistry>,
        remote: Box<dyn AddressGroupClient>,
        config: &ThreatSyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;
        Ok(Self::new(
            registry,
            remote,
            config.feeds.clone(),
            config.controller.group_name.clone(),
        ))
    }

    /// Attach a health recorder
    ///
    /// Orchestration behaves identically with or without one.
    pub fn set_health_recorder(&mut self, recorder: Arc<dyn HealthRecorder>) {
        self.health = Some(recorder);
    }

    /// Fingerprint of the last successfully reconciled set
    pub async fn last_fingerprint(&self) -> Option<Fingerprint> {
        *self.last_fingerprint.lock().await
    }

    /// Check every enabled feed against its parser without network I/O
    ///
    /// # Returns
    ///
    /// One `(feed name, error)` pair per problem found; empty when all
    /// enabled feeds have a registered parser that accepts their config.
    pub fn validate_feeds(&self) -> Vec<(String, Error)> {
        self.feeds
            .enabled()
            .filter_map(|feed| {
                self.registry
                    .get(&feed.parser)
                    .and_then(|parser| parser.validate_config(feed))
                    .err()
                    .map(|e| (feed.name.clone(), e))
            })
            .collect()
    }

    /// Execute exactly one sync cycle
    ///
    /// # Returns
    ///
    /// - `Ok(SyncOutcome)`: The cycle completed (possibly with no remote calls)
    /// - `Err(Error::Cancelled)`: Shutdown fired before reconciliation began
    /// - `Err(Error::RemoteReconcile)`: The remote group could not be read,
    ///   created or updated; the fingerprint is left untouched so the next
    ///   cycle retries
    pub async fn run(&self, shutdown: &Shutdown) -> Result<SyncOutcome> {
        let result = self.run_cycle(shutdown).await;

        if let Err(ref e) = result {
            self.emit_event(SyncEvent::CycleFailed {
                error: e.to_string(),
            });
        }

        result
    }

    async fn run_cycle(&self, shutdown: &Shutdown) -> Result<SyncOutcome> {
        let mut last_fingerprint = self.last_fingerprint.lock().await;

        let feed_count = self.feeds.enabled_count();
        info!(feeds = feed_count, "Starting sync cycle");
        self.emit_event(SyncEvent::CycleStarted { feeds: feed_count });

        let all_entries = self.fetch_all_feeds(shutdown).await?;
        info!(entries = all_entries.len(), "Fetched IPs/CIDRs from feeds");

        let normalized = normalizer::normalize(all_entries);
        let entries = normalized.len();
        info!(entries, "After deduplication");

        let fingerprint = normalized.fingerprint();

        if *last_fingerprint == Some(fingerprint) {
            info!(fingerprint = %fingerprint, "No changes detected, skipping update");
            self.emit_event(SyncEvent::Unchanged {
                fingerprint,
                entries,
            });
            self.record_sync();
            return Ok(SyncOutcome::Unchanged {
                fingerprint,
                entries,
            });
        }

        // Last point at which a shutdown may stop the cycle; once the remote
        // side is touched the cycle runs to completion.
        if shutdown.is_triggered() {
            return Err(Error::Cancelled);
        }

        info!(fingerprint = %fingerprint, "Changes detected, updating address-group");
        let members = normalized.to_strings();
        let outcome = self.reconcile(&members, fingerprint).await?;

        *last_fingerprint = Some(fingerprint);
        self.record_sync();

        info!(group = %self.group_name, entries, "Sync completed successfully");
        Ok(outcome)
    }

    /// Fetch every enabled feed in order, skipping the ones that fail
    async fn fetch_all_feeds(&self, shutdown: &Shutdown) -> Result<Vec<NetworkEntry>> {
        let mut all_entries = Vec::new();
        let mut fetched = 0usize;

        for feed in self.feeds.enabled() {
            info!(feed = %feed.name, parser = %feed.parser, "Fetching feed");

            match self.fetch_feed(shutdown, feed).await {
                Ok(entries) => {
                    info!(feed = %feed.name, entries = entries.len(), "Feed parsed");
                    self.emit_event(SyncEvent::FeedFetched {
                        feed: feed.name.clone(),
                        entries: entries.len(),
                    });
                    fetched += 1;
                    all_entries.extend(entries);
                }
                Err(Error::Cancelled) => {
                    info!(feed = %feed.name, "Feed fetch aborted by shutdown");
                    return Err(Error::Cancelled);
                }
                Err(e) => {
                    warn!(feed = %feed.name, error = %e, "Skipping feed");
                    self.emit_event(SyncEvent::FeedSkipped {
                        feed: feed.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if fetched == 0 && self.feeds.enabled_count() > 0 {
            warn!("No feed could be fetched, the normalized set is empty");
        }

        Ok(all_entries)
    }

    /// Fetch one feed, racing the parser against the shutdown signal
    async fn fetch_feed(&self, shutdown: &Shutdown, feed: &FeedConfig) -> Result<Vec<NetworkEntry>> {
        let parser = self.registry.get(&feed.parser)?;

        tokio::select! {
            biased;
            _ = shutdown.triggered() => Err(Error::Cancelled),
            result = parser.parse(shutdown, feed) => result.map_err(|e| match e {
                Error::Cancelled => e,
                e if e.is_feed_level() => e,
                other => Error::fetch(&feed.name, other.to_string()),
            }),
        }
    }

    /// Make the remote group's membership match `members`
    ///
    /// Creates the group when the lookup reports `NotFound`; any other
    /// lookup failure aborts.
    async fn reconcile(&self, members: &[String], fingerprint: Fingerprint) -> Result<SyncOutcome> {
        let client = self.remote.client_name();
        let entries = members.len();

        match self.remote.get_group(&self.group_name).await {
            Ok(group) => {
                info!(group = %self.group_name, id = %group.id, "Updating address-group");
                self.remote
                    .update_group(&group.id, members)
                    .await
                    .map_err(|e| {
                        Error::remote(format!(
                            "{}: failed to update group '{}': {}",
                            client, self.group_name, e
                        ))
                    })?;

                self.emit_event(SyncEvent::GroupUpdated {
                    group: self.group_name.clone(),
                    entries,
                });
                Ok(SyncOutcome::Updated {
                    fingerprint,
                    entries,
                    group_id: group.id,
                })
            }
            Err(Error::NotFound(_)) => {
                info!(group = %self.group_name, "Address-group not found, creating");
                let group = self
                    .remote
                    .create_group(&self.group_name, members)
                    .await
                    .map_err(|e| {
                        Error::remote(format!(
                            "{}: failed to create group '{}': {}",
                            client, self.group_name, e
                        ))
                    })?;

                self.emit_event(SyncEvent::GroupCreated {
                    group: self.group_name.clone(),
                    entries,
                });
                Ok(SyncOutcome::Created {
                    fingerprint,
                    entries,
                    group_id: group.id,
                })
            }
            Err(e) => Err(Error::remote(format!(
                "{}: failed to look up group '{}': {}",
                client, self.group_name, e
            ))),
        }
    }

    /// Run one cycle now, then one per `interval` until shutdown
    ///
    /// Failed cycles are logged and reported to the health recorder; the
    /// next tick is the retry. Ticks missed while a cycle runs are skipped.
    pub async fn run_periodic(&self, interval: Duration, shutdown: Shutdown) {
        info!("Running initial sync");
        self.run_and_report(&shutdown).await;

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval = ?interval, "Sync loop started");

        loop {
            tokio::select! {
                _ = shutdown.triggered() => {
                    info!("Shutdown signal received, stopping sync loop");
                    break;
                }
                _ = ticker.tick() => {
                    debug!("Starting scheduled sync");
                    self.run_and_report(&shutdown).await;
                }
            }
        }
    }

    async fn run_and_report(&self, shutdown: &Shutdown) {
        match self.run(shutdown).await {
            Ok(outcome) => {
                debug!(outcome = ?outcome, "Sync cycle finished");
            }
            Err(Error::Cancelled) => {
                info!("Sync cycle cancelled by shutdown");
            }
            Err(e) => {
                error!(error = %e, "Sync failed");
                if let Some(health) = &self.health {
                    health.record_error();
                }
            }
        }
    }

    fn record_sync(&self) {
        if let Some(health) = &self.health {
            health.record_sync();
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
