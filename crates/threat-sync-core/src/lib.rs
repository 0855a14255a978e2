// # threat-sync-core
//
// Core library for synchronizing public threat-intelligence IP feeds into a
// firewall address-group on a network controller.
//
// ## Architecture Overview
//
// - **FeedParser**: Trait for fetching one feed and turning it into entries
// - **ParserRegistry**: Plugin-based registry keyed by feed format name
// - **Normalizer**: Dedup and canonical ordering, plus the set fingerprint
// - **AddressGroupClient**: Trait for reading and replacing the remote group
// - **SyncEngine**: Orchestrates fetch → normalize → compare → reconcile
// - **HealthRecorder**: Optional observer of cycle outcomes
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from feed and controller implementations
// 2. **Plugin-Based**: Parsers are registered dynamically, no hard-coded format switch
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Idempotency**: An unchanged fingerprint means no remote calls

pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod normalizer;
pub mod registry;
pub mod shutdown;
pub mod traits;

// Re-export core types for convenience
pub use config::{FeedConfig, FeedsList, ThreatSyncConfig};
pub use engine::{SyncEngine, SyncEvent, SyncOutcome};
pub use entry::{AddressFamily, NetworkEntry};
pub use error::{Error, Result};
pub use normalizer::{Fingerprint, NormalizedSet, normalize};
pub use registry::ParserRegistry;
pub use shutdown::Shutdown;
pub use traits::{AddressGroup, AddressGroupClient, FeedParser, HealthRecorder};
