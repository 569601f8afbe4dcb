// # State Store Trait
//
// Defines the interface for persisting reconciliation state across runs.
//
// ## Purpose
//
// Three pieces of state survive a run and let the next one compute a
// correct delta:
// - the hostname set as of the last successful run
// - the hostname → last-applied IP mapping
// - the last-applied public IP
//
// ## Consistency Model
//
// The store is a best-effort cache, not an authority over the remote DNS
// zone: a hostname present in the IP mapping means a create/update was
// attempted for it at some point; absence does not mean no remote record
// exists. Implementations need not be transactional across the three
// pieces — the engine recomputes deltas from whatever loads, and the
// system converges over subsequent runs.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

/// The cross-run state snapshot
///
/// Loaded once at run start, mutated in memory during reconciliation, and
/// persisted once at run end (only on runs that performed work).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// Hostname set from the prior run (empty on first run)
    pub hostnames: BTreeSet<String>,
    /// Hostname → IP last successfully applied to its DNS record
    pub recorded_ips: BTreeMap<String, Ipv4Addr>,
    /// Last-applied public IP (absent on first run)
    pub last_public_ip: Option<Ipv4Addr>,
}

impl PersistedState {
    /// Create an empty first-run state
    pub fn new() -> Self {
        Self::default()
    }
}

/// Trait for state store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks,
/// though the engine itself is strictly sequential within a run.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted snapshot
    ///
    /// Missing backing data loads as the empty first-run state rather than
    /// an error; only genuine I/O failures are surfaced.
    async fn load(&self) -> Result<PersistedState, crate::Error>;

    /// Persist a snapshot, replacing whatever was stored before
    async fn persist(&self, state: &PersistedState) -> Result<(), crate::Error>;
}
