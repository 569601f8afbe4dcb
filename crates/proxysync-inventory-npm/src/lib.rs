// # Nginx Proxy Manager Inventory Client
//
// This crate provides the hostname inventory source for proxysync.
//
// ## Purpose
//
// Nginx Proxy Manager (NPM) is the source of truth for which hostnames are
// currently fronted by the reverse proxy. Each proxy host entry carries one
// or more `domain_names`; the inventory is their set-union.
//
// ## API Calls
//
// ```http
// POST /api/tokens                { "identity": ..., "secret": ... }
// GET  /api/nginx/proxy-hosts     Authorization: Bearer <token>
// ```
//
// ## Failure Semantics
//
// Auth and listing failures are fatal to a run: without the inventory, no
// safe reconciliation decision exists. Errors propagate to the engine,
// which aborts before touching any state.
//
// ## Security
//
// The account secret never appears in logs; the Debug implementation
// redacts it.

use proxysync_core::traits::InventorySource;
use proxysync_core::{Error, Result};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// HTTP timeout for NPM API requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    identity: &'a str,
    secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ProxyHost {
    #[serde(default)]
    domain_names: Vec<String>,
}

/// Inventory client for the Nginx Proxy Manager API
pub struct NpmInventory {
    /// Base URL of the NPM instance (no trailing slash expected)
    base_url: String,

    /// Account identity (email/username)
    identity: String,

    /// Account secret
    /// ⚠️ never log this value
    secret: String,

    /// HTTP client
    client: reqwest::Client,
}

// Custom Debug implementation that hides the secret
impl std::fmt::Debug for NpmInventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NpmInventory")
            .field("base_url", &self.base_url)
            .field("identity", &self.identity)
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

impl NpmInventory {
    /// Create a new inventory client
    pub fn new(
        base_url: impl Into<String>,
        identity: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            base_url,
            identity: identity.into(),
            secret: secret.into(),
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Exchange credentials for a bearer token
    async fn authenticate(&self) -> Result<String> {
        let url = format!("{}/api/tokens", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&TokenRequest {
                identity: &self.identity,
                secret: &self.secret,
            })
            .send()
            .await
            .map_err(|e| Error::inventory(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(Error::api("npm", status, body));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::inventory(format!("unparsable token response: {}", e)))?;

        Ok(parsed.token)
    }

    /// List proxy hosts with the given token
    async fn list_proxy_hosts(&self, token: &str) -> Result<Vec<ProxyHost>> {
        let url = format!("{}/api/nginx/proxy-hosts", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::inventory(format!("proxy-host listing failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(Error::api("npm", status, body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::inventory(format!("unparsable proxy-host response: {}", e)))
    }
}

#[async_trait::async_trait]
impl InventorySource for NpmInventory {
    async fn current_hostnames(&self) -> Result<BTreeSet<String>> {
        let token = self.authenticate().await?;
        let hosts = self.list_proxy_hosts(&token).await?;

        let hostnames: BTreeSet<String> = hosts
            .into_iter()
            .flat_map(|host| host.domain_names)
            .collect();

        tracing::debug!("inventory lists {} hostname(s)", hostnames.len());
        Ok(hostnames)
    }
}
