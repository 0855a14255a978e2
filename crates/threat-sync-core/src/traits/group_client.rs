// # Address-Group Client Trait
//
// Defines the interface to the remote controller's firewall address-group.
//
// ## Implementations
//
// - UniFi: `threat-sync-unifi` crate

use crate::error::Result;
use async_trait::async_trait;

/// A remote firewall address-group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressGroup {
    /// Controller-assigned identifier
    pub id: String,
    /// Group name
    pub name: String,
    /// Canonical CIDR strings
    pub members: Vec<String>,
}

/// Trait for remote address-group clients
///
/// Like every plugin, a client performs single-shot calls: no retries, no
/// caching of group state and no decision about whether an update is
/// needed. That decision belongs to `SyncEngine`.
#[async_trait]
pub trait AddressGroupClient: Send + Sync {
    /// Look up a group by name
    ///
    /// Returns [`crate::Error::NotFound`] when no group has this name.
    async fn get_group(&self, name: &str) -> Result<AddressGroup>;

    /// Create a group with the given membership
    async fn create_group(&self, name: &str, members: &[String]) -> Result<AddressGroup>;

    /// Replace the membership of an existing group
    async fn update_group(&self, id: &str, members: &[String]) -> Result<()>;

    /// Client name (for logging)
    fn client_name(&self) -> &'static str;
}

#[async_trait]
impl<T: AddressGroupClient + ?Sized> AddressGroupClient for std::sync::Arc<T> {
    async fn get_group(&self, name: &str) -> Result<AddressGroup> {
        (**self).get_group(name).await
    }

    async fn create_group(&self, name: &str, members: &[String]) -> Result<AddressGroup> {
        (**self).create_group(name, members).await
    }

    async fn update_group(&self, id: &str, members: &[String]) -> Result<()> {
        (**self).update_group(id, members).await
    }

    fn client_name(&self) -> &'static str {
        (**self).client_name()
    }
}
