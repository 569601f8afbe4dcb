// # Inventory Source Trait
//
// Defines the interface for retrieving the current set of managed hostnames
// from the reverse-proxy manager.
//
// ## Implementations
//
// - Nginx Proxy Manager: `proxysync-inventory-npm` crate
//
// ## Failure Semantics
//
// Inventory failures (authentication or listing) are FATAL to a run: without
// the current hostname set, no safe reconciliation decision can be made and
// no prior state may be touched.

use async_trait::async_trait;
use std::collections::BTreeSet;

/// Trait for inventory source implementations
///
/// An inventory source knows how to authenticate to the proxy manager and
/// return the full set of hostnames it currently fronts. A proxy host may
/// carry several hostnames; the source flattens them into one set.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Fetch the current set of managed hostnames
    ///
    /// Implementations handle authentication internally; a single call
    /// performs whatever token exchange the upstream requires.
    ///
    /// # Returns
    ///
    /// - `Ok(BTreeSet<String>)`: The deduplicated hostname set
    /// - `Err(Error)`: Auth or listing failure (fatal to the run)
    async fn current_hostnames(&self) -> Result<BTreeSet<String>, crate::Error>;
}
