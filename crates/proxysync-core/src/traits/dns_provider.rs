// # DNS Provider Trait
//
// Defines the interface for reconciling A records via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `proxysync-provider-cloudflare` crate
//
// ## Responsibility Boundaries
//
// Providers are isolated, stateless adapters:
// - One logical operation per call (the check-before-write inside `apply`
//   counts as one operation)
// - No access to the state store; the engine owns whether a call is needed
// - No scheduling decisions; the engine owns continuation after failure
//
// Whether a record needs touching at all is decided by the `SyncEngine`
// from persisted state; the provider only decides create-vs-update from
// what the remote actually holds.

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::router::ZoneRoute;

/// Result of an apply (create-or-update) operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// No record existed; one was created
    Created,
    /// At least one existing record pointed elsewhere and was rewritten
    Updated {
        /// Content of the first record that was rewritten
        previous: Ipv4Addr,
    },
    /// Every existing record already had the correct content
    Unchanged,
}

/// Result of a delete operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Number of records removed (0 when none existed, which is a no-op)
    pub removed: usize,
    /// Number of records that failed to delete (others proceeded regardless)
    pub failed: usize,
}

/// Trait for DNS provider implementations
///
/// Credentials arrive per call as a [`ZoneRoute`] resolved by the
/// `DomainRouter`: one provider instance serves every configured zone.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Reconcile the A record(s) for a hostname to the given IP
    ///
    /// Check-before-write semantics:
    /// - No record exists → create one (`type=A, ttl=3600, proxied=true`)
    /// - One or more exist → rewrite each whose content differs, leave the
    ///   rest untouched (all records for the name are reconciled, not just
    ///   the first)
    ///
    /// # Idempotency
    ///
    /// Calling this repeatedly with the same IP is safe and performs no
    /// writes after the first successful application.
    ///
    /// # Returns
    ///
    /// - `Ok(ApplyOutcome)`: What the provider did
    /// - `Err(Error)`: Lookup or write failure (caller decides continuation)
    async fn apply(
        &self,
        hostname: &str,
        ip: Ipv4Addr,
        route: &ZoneRoute,
    ) -> Result<ApplyOutcome, crate::Error>;

    /// Delete the A record(s) for a hostname
    ///
    /// Looks up existing records first; absence is a no-op. Each matching
    /// record is deleted by its provider-assigned identifier independently,
    /// so one failed deletion does not block the others.
    ///
    /// # Returns
    ///
    /// - `Ok(DeleteOutcome)`: How many records were removed / failed
    /// - `Err(Error)`: Lookup failure (caller decides continuation)
    async fn delete(&self, hostname: &str, route: &ZoneRoute)
    -> Result<DeleteOutcome, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
