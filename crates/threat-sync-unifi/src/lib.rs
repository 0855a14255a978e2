// # UniFi Controller Client
//
// This crate provides the UniFi implementation of `AddressGroupClient`.
//
// ## Behaviour
//
// - Cookie-based session: `login()` once, every group call reuses the session
// - A 401/403 from any group call drops the session so the next call logs in
//   again
// - Single-shot calls: no retries and no caching of group contents (the sync
//   engine decides when an update is needed)
// - Dry-run mode performs reads and logs the writes it would have made
//
// ## Security
//
// - The password never appears in logs or `Debug` output
// - TLS verification is off unless `verify_tls` is set, since controllers
//   ship with self-signed certificates
//
// ## API Reference
//
// - Login: POST `/api/auth/login` `{username, password, remember}`
// - Logout: POST `/api/auth/logout`
// - List groups: GET `/proxy/network/api/s/:site/rest/firewallgroup`
// - Create group: POST `/proxy/network/api/s/:site/rest/firewallgroup`
// - Update group: PUT `/proxy/network/api/s/:site/rest/firewallgroup/:id`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use threat_sync_core::config::ControllerConfig;
use threat_sync_core::traits::{AddressGroup, AddressGroupClient};
use threat_sync_core::{Error, Result};
use tokio::sync::Mutex;

/// Default HTTP timeout for controller requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// UniFi group type for IP/CIDR lists
const ADDRESS_GROUP_TYPE: &str = "address-group";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    remember: bool,
}

/// Firewall group as returned by the Network API
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FirewallGroup {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    id: String,
    name: String,
    #[serde(default)]
    group_type: String,
    #[serde(default)]
    group_members: Vec<String>,
}

impl From<FirewallGroup> for AddressGroup {
    fn from(group: FirewallGroup) -> Self {
        Self {
            id: group.id,
            name: group.name,
            members: group.group_members,
        }
    }
}

#[derive(Serialize)]
struct UpdateMembers<'a> {
    group_members: &'a [String],
}

/// `{"meta": {...}, "data": [...]}` response envelope
#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// UniFi firewall-group client
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the client will:
/// - Log in and perform GET requests
/// - Log the intended POST/PUT payload
/// - **NOT** modify the controller
pub struct UnifiClient {
    /// Controller base URL without trailing slash
    base_url: String,

    /// Controller site
    site: String,

    username: String,

    /// ⚠️ NEVER log this value
    password: String,

    /// HTTP client with cookie store
    client: reqwest::Client,

    /// Whether the cookie store currently holds a valid session
    logged_in: AtomicBool,

    /// Serializes re-authentication
    login_lock: Mutex<()>,

    dry_run: bool,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for UnifiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiClient")
            .field("base_url", &self.base_url)
            .field("site", &self.site)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("logged_in", &self.is_logged_in())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl UnifiClient {
    /// Create a client from the controller configuration
    ///
    /// Does not contact the controller; call [`UnifiClient::login`] to test
    /// the credentials.
    pub fn new(config: &ControllerConfig) -> Result<Self> {
        if config.username.is_empty() || config.password.is_empty() {
            return Err(Error::config("UniFi username and password are required"));
        }

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;

        if config.dry_run {
            tracing::warn!("UniFi client running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            site: config.site.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            client,
            logged_in: AtomicBool::new(false),
            login_lock: Mutex::new(()),
            dry_run: config.dry_run,
        })
    }

    /// True while a session is believed valid
    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    /// True in dry-run mode
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Authenticate and store the session cookie
    pub async fn login(&self) -> Result<()> {
        let url = format!("{}/api/auth/login", self.base_url);
        tracing::debug!(url = %url, username = %self.username, "Logging in to UniFi controller");

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
                remember: true,
            })
            .send()
            .await
            .map_err(|e| Error::http(format!("login request failed: {}", e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            self.logged_in.store(false, Ordering::SeqCst);
            return Err(Error::auth(format!(
                "login failed with status {}: {}",
                status, body
            )));
        }

        self.logged_in.store(true, Ordering::SeqCst);
        tracing::info!(site = %self.site, "Logged in to UniFi controller");
        Ok(())
    }

    /// End the session; a no-op when not logged in
    pub async fn logout(&self) -> Result<()> {
        if !self.is_logged_in() {
            return Ok(());
        }

        let url = format!("{}/api/auth/logout", self.base_url);
        self.client
            .post(&url)
            .send()
            .await
            .map_err(|e| Error::http(format!("logout request failed: {}", e)))?;

        self.logged_in.store(false, Ordering::SeqCst);
        tracing::info!("Logged out from UniFi controller");
        Ok(())
    }

    async fn ensure_logged_in(&self) -> Result<()> {
        if self.is_logged_in() {
            return Ok(());
        }

        let _guard = self.login_lock.lock().await;
        // Another caller may have logged in while we waited
        if self.is_logged_in() {
            return Ok(());
        }
        self.login().await
    }

    fn groups_url(&self) -> String {
        format!(
            "{}/proxy/network/api/s/{}/rest/firewallgroup",
            self.base_url, self.site
        )
    }

    /// Map a non-success response to an error
    ///
    /// Authentication failures also drop the session.
    async fn status_error(&self, response: reqwest::Response, action: &str) -> Error {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        match status.as_u16() {
            401 | 403 => {
                self.logged_in.store(false, Ordering::SeqCst);
                Error::auth(format!("{}: session rejected with status {}", action, status))
            }
            429 => Error::remote(format!(
                "{}: rate limit exceeded, status {}",
                action, status
            )),
            500..=599 => Error::remote(format!(
                "{}: controller error (transient): {} - {}",
                action, status, error_text
            )),
            _ => Error::remote(format!(
                "{}: unexpected status {} - {}",
                action, status, error_text
            )),
        }
    }

    async fn decode_groups(response: reqwest::Response) -> Result<Vec<FirewallGroup>> {
        let envelope: Envelope<FirewallGroup> = response
            .json()
            .await
            .map_err(|e| Error::remote(format!("failed to decode response: {}", e)))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl AddressGroupClient for UnifiClient {
    async fn get_group(&self, name: &str) -> Result<AddressGroup> {
        self.ensure_logged_in().await?;

        let response = self
            .client
            .get(self.groups_url())
            .send()
            .await
            .map_err(|e| Error::http(format!("list groups request failed: {}", e)))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(self.status_error(response, "list groups").await);
        }

        Self::decode_groups(response)
            .await?
            .into_iter()
            .find(|group| group.name == name)
            .map(AddressGroup::from)
            .ok_or_else(|| Error::not_found(format!("group not found: {}", name)))
    }

    async fn create_group(&self, name: &str, members: &[String]) -> Result<AddressGroup> {
        let payload = FirewallGroup {
            id: String::new(),
            name: name.to_string(),
            group_type: ADDRESS_GROUP_TYPE.to_string(),
            group_members: members.to_vec(),
        };

        tracing::info!(
            group = %name,
            members = members.len(),
            mode = if self.dry_run { "DRY-RUN" } else { "LIVE" },
            "Creating firewall group"
        );

        if self.dry_run {
            tracing::info!(url = %self.groups_url(), "[DRY-RUN] Would send POST request");
            return Ok(AddressGroup {
                id: "dry-run".to_string(),
                name: name.to_string(),
                members: members.to_vec(),
            });
        }

        self.ensure_logged_in().await?;

        let response = self
            .client
            .post(self.groups_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::http(format!("create group request failed: {}", e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK && status != reqwest::StatusCode::CREATED {
            return Err(self.status_error(response, "create group").await);
        }

        Self::decode_groups(response)
            .await?
            .into_iter()
            .next()
            .map(AddressGroup::from)
            .ok_or_else(|| Error::remote("no group returned in response"))
    }

    async fn update_group(&self, id: &str, members: &[String]) -> Result<()> {
        let url = format!("{}/{}", self.groups_url(), id);

        tracing::info!(
            id = %id,
            members = members.len(),
            mode = if self.dry_run { "DRY-RUN" } else { "LIVE" },
            "Updating firewall group"
        );

        if self.dry_run {
            tracing::info!(url = %url, "[DRY-RUN] Would send PUT request");
            return Ok(());
        }

        self.ensure_logged_in().await?;

        let response = self
            .client
            .put(&url)
            .json(&UpdateMembers {
                group_members: members,
            })
            .send()
            .await
            .map_err(|e| Error::http(format!("update group request failed: {}", e)))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(self.status_error(response, "update group").await);
        }

        Ok(())
    }

    fn client_name(&self) -> &'static str {
        "unifi"
    }
}
