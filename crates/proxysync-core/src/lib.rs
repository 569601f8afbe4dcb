// # proxysync-core
//
// Core library for reconciling reverse-proxy hostnames with DNS A records.
//
// ## Architecture Overview
//
// This library provides the reconciliation core:
// - **InventorySource**: Trait for listing the currently managed hostnames
// - **IpSource**: Trait for resolving the node's public IPv4 address
// - **DnsProvider**: Trait for A-record lookup/create/update/delete
// - **StateStore**: Trait for persisting cross-run state (idempotency)
// - **DomainRouter**: Maps a hostname to the zone credentials responsible for it
// - **SyncEngine**: Computes the per-run action plan and drives the provider
//
// ## Design Principles
//
// 1. **Separation of Concerns**: decision logic is separate from the HTTP adapters
// 2. **Run-to-Completion**: one invocation performs one reconciliation pass
// 3. **Idempotency**: the persisted state makes re-runs safe and cheap
// 4. **Partial-Failure Tolerance**: one hostname's failure never aborts the run

pub mod config;
pub mod engine;
pub mod error;
pub mod router;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{RootDomain, RoutingConfig, SyncConfig, parse_force_flag};
pub use engine::{HostAction, HostOutcome, RunOutcome, RunReport, SyncEngine};
pub use error::{Error, Result};
pub use router::{DomainRouter, ZoneRoute};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{DnsProvider, InventorySource, IpSource, PersistedState, StateStore};
