//! Core traits for the threat-sync system
//!
//! This module defines the seams between the core and its plugins.
//!
//! - [`FeedParser`]: Fetch one feed format and turn it into network entries
//! - [`AddressGroupClient`]: Read and write the remote firewall address-group
//! - [`HealthRecorder`]: Observe sync outcomes

pub mod feed_parser;
pub mod group_client;
pub mod health_recorder;

pub use feed_parser::FeedParser;
pub use group_client::{AddressGroup, AddressGroupClient};
pub use health_recorder::HealthRecorder;
