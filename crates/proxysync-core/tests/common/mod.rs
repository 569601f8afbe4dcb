//! Test doubles and common utilities for reconciliation contract tests
//!
//! These doubles track calls so tests can assert what the engine did and,
//! just as importantly, what it did not do.

// Each test binary compiles this module and uses a different subset of it.
#![allow(dead_code)]

use async_trait::async_trait;
use proxysync_core::config::{RootDomain, RoutingConfig};
use proxysync_core::error::{Error, Result};
use proxysync_core::router::DomainRouter;
use proxysync_core::traits::{
    ApplyOutcome, DeleteOutcome, DnsProvider, InventorySource, IpSource,
};
use std::collections::{BTreeSet, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Inventory source returning a fixed hostname set
#[derive(Clone)]
pub struct FixedInventory {
    hostnames: BTreeSet<String>,
    call_count: Arc<AtomicUsize>,
}

impl FixedInventory {
    pub fn new(hostnames: &[&str]) -> Self {
        Self {
            hostnames: hostnames.iter().map(|s| s.to_string()).collect(),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventorySource for FixedInventory {
    async fn current_hostnames(&self) -> Result<BTreeSet<String>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.hostnames.clone())
    }
}

/// IP source returning a fixed address
#[derive(Clone)]
pub struct FixedIpSource {
    ip: Ipv4Addr,
}

impl FixedIpSource {
    pub fn new(ip: &str) -> Self {
        Self {
            ip: ip.parse().expect("valid test IP"),
        }
    }
}

#[async_trait]
impl IpSource for FixedIpSource {
    async fn current_ipv4(&self) -> Result<Ipv4Addr> {
        Ok(self.ip)
    }
}

/// A DnsProvider double that records every call
///
/// Clones share their counters, so tests keep one instance for assertions
/// and hand a clone to the engine.
#[derive(Clone)]
pub struct MockDnsProvider {
    /// (hostname, ip) pairs passed to apply()
    applied: Arc<Mutex<Vec<(String, Ipv4Addr)>>>,
    /// Hostnames passed to delete()
    deleted: Arc<Mutex<Vec<String>>>,
    /// Hostnames whose apply() should fail
    failing_hosts: Arc<Mutex<HashSet<String>>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self {
            applied: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            failing_hosts: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Make apply() fail for the given hostname
    pub fn fail_for(&self, hostname: &str) {
        self.failing_hosts
            .lock()
            .unwrap()
            .insert(hostname.to_string());
    }

    /// Stop failing for the given hostname
    pub fn heal(&self, hostname: &str) {
        self.failing_hosts.lock().unwrap().remove(hostname);
    }

    pub fn apply_count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }

    pub fn applied(&self) -> Vec<(String, Ipv4Addr)> {
        self.applied.lock().unwrap().clone()
    }

    pub fn applied_hosts(&self) -> Vec<String> {
        self.applied
            .lock()
            .unwrap()
            .iter()
            .map(|(host, _)| host.clone())
            .collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.apply_count() + self.deleted.lock().unwrap().len()
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn apply(
        &self,
        hostname: &str,
        ip: Ipv4Addr,
        _route: &proxysync_core::router::ZoneRoute,
    ) -> Result<ApplyOutcome> {
        if self.failing_hosts.lock().unwrap().contains(hostname) {
            return Err(Error::api("mock", 500, format!("injected failure for {hostname}")));
        }
        self.applied
            .lock()
            .unwrap()
            .push((hostname.to_string(), ip));
        Ok(ApplyOutcome::Created)
    }

    async fn delete(
        &self,
        hostname: &str,
        _route: &proxysync_core::router::ZoneRoute,
    ) -> Result<DeleteOutcome> {
        self.deleted.lock().unwrap().push(hostname.to_string());
        Ok(DeleteOutcome {
            removed: 1,
            failed: 0,
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Router over the given root domains with dummy credentials
pub fn test_router(roots: &[&str]) -> DomainRouter {
    let config = RoutingConfig {
        roots: roots
            .iter()
            .map(|root| RootDomain {
                root: root.to_string(),
                zone_id: format!("zone-{root}"),
                api_token: "test-token-0123456789".to_string(),
            })
            .collect(),
    };
    DomainRouter::new(&config)
}
