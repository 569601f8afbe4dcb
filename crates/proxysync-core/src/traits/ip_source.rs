// # IP Source Trait
//
// Defines the interface for resolving the node's current public IPv4 address.
//
// ## Implementations
//
// - HTTP-based (ipify-style JSON endpoint): `proxysync-ip-http` crate
//
// ## Failure Semantics
//
// Resolution failure aborts the run. Reconciling against a stale or guessed
// IP would push wrong records to every routable hostname, so the engine
// never falls back.

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public-IP source implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The address as seen from the external vantage point
    /// - `Err(Error)`: Resolution failure (fatal to the run)
    async fn current_ipv4(&self) -> Result<Ipv4Addr, crate::Error>;
}
