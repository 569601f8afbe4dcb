//! Configuration types for the reconciliation system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main reconciliation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Proxy-manager inventory endpoint and credentials
    pub inventory: InventoryConfig,

    /// Root domain → zone credential routing table
    pub routing: RoutingConfig,

    /// Public-IP resolution endpoint
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// State persistence location
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Re-apply the current IP to all routable hostnames even when no
    /// change was detected
    #[serde(default)]
    pub force_update: bool,
}

impl SyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.inventory.validate()?;
        self.routing.validate()?;
        self.ip_source.validate()?;
        Ok(())
    }
}

/// Proxy-manager inventory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Base URL of the proxy manager API (e.g., "http://npm.local:81")
    pub base_url: String,
    /// Account identity (email/username) for token auth
    pub identity: String,
    /// Account secret for token auth
    pub secret: String,
}

impl InventoryConfig {
    /// Validate the inventory configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.base_url.is_empty() {
            return Err(crate::Error::config("inventory base URL cannot be empty"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(crate::Error::config(format!(
                "inventory base URL must use http or https: {}",
                self.base_url
            )));
        }
        if self.identity.is_empty() || self.secret.is_empty() {
            return Err(crate::Error::config("inventory credentials cannot be empty"));
        }
        Ok(())
    }
}

/// One configured root domain with its zone credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct RootDomain {
    /// Root-domain suffix hostnames are matched against (e.g., "example.com")
    pub root: String,
    /// Provider zone identifier for this root
    pub zone_id: String,
    /// Provider API token for this zone
    pub api_token: String,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for RootDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootDomain")
            .field("root", &self.root)
            .field("zone_id", &self.zone_id)
            .field("api_token", &"<REDACTED>")
            .finish()
    }
}

/// Immutable routing table from root-domain suffix to zone credentials
///
/// Passed into the `DomainRouter` at construction; never process-wide state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Configured root domains
    pub roots: Vec<RootDomain>,
}

impl RoutingConfig {
    /// Validate the routing configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.roots.is_empty() {
            return Err(crate::Error::config("no root domains configured"));
        }
        for entry in &self.roots {
            if entry.root.is_empty() {
                return Err(crate::Error::config("root domain cannot be empty"));
            }
            if entry.zone_id.is_empty() {
                return Err(crate::Error::config(format!(
                    "zone id for root '{}' cannot be empty",
                    entry.root
                )));
            }
            if entry.api_token.is_empty() {
                return Err(crate::Error::config(format!(
                    "API token for root '{}' cannot be empty",
                    entry.root
                )));
            }
        }
        Ok(())
    }
}

/// Public-IP resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// URL returning the caller's public IP as JSON (`{"ip": "..."}`)
    pub url: String,
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.url.is_empty() {
            return Err(crate::Error::config("IP source URL cannot be empty"));
        }
        Ok(())
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            url: "https://api.ipify.org?format=json".to_string(),
        }
    }
}

/// State persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// Directory holding the three state files
    Dir {
        /// Directory path
        path: String,
    },
    /// In-memory state (not persistent; testing and throwaway runs)
    Memory,
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        StateStoreConfig::Dir {
            path: ".".to_string(),
        }
    }
}

/// Parse the force-update flag from its environment string form
///
/// Recognized truthy forms, case-insensitive: `true`, `1`, `yes`.
/// Everything else (including empty/missing) is false.
pub fn parse_force_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
