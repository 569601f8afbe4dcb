//! Core traits for the reconciliation system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`InventorySource`]: List the hostnames currently managed by the proxy
//! - [`IpSource`]: Resolve the node's current public IPv4 address
//! - [`DnsProvider`]: A-record lookup/create/update/delete at the DNS provider
//! - [`StateStore`]: Persistent cross-run state for idempotency

pub mod dns_provider;
pub mod inventory;
pub mod ip_source;
pub mod state_store;

pub use dns_provider::{ApplyOutcome, DeleteOutcome, DnsProvider};
pub use inventory::InventorySource;
pub use ip_source::IpSource;
pub use state_store::{PersistedState, StateStore};
