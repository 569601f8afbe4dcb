//! Core reconciliation engine
//!
//! The SyncEngine is responsible for:
//! - Detecting the delta between the previous and current hostname sets
//! - Detecting public-IP change
//! - Deciding per hostname whether to create, update, skip, or delete
//! - Persisting the resulting state so the next run computes a correct delta
//!
//! ## Control Flow
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌────────────┐
//! │ StateStore   │   │ Inventory  │   │  IpSource  │
//! │ (load prior) │   │ (current)  │   │ (public IP)│
//! └──────┬───────┘   └─────┬──────┘   └─────┬──────┘
//!        └─────────────────┼────────────────┘
//!                          ▼
//!                 ┌─────────────────┐
//!                 │  ReconcilePlan  │── no work ──▶ early exit (no writes)
//!                 └────────┬────────┘
//!                          ▼
//!            ┌──────────────────────────┐
//!            │ per hostname: route →    │
//!            │ create / update / skip / │
//!            │ delete via DnsProvider   │
//!            └────────────┬─────────────┘
//!                         ▼
//!                persist new snapshot
//! ```
//!
//! ## Failure Model
//!
//! Inventory and public-IP failures abort the run before any state
//! mutation. Per-hostname provider failures are captured as explicit
//! [`HostOutcome`] values and never abort the run; a failed hostname is
//! not recorded as applied, so the next run naturally retries it.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::router::DomainRouter;
use crate::traits::{
    ApplyOutcome, DnsProvider, InventorySource, IpSource, PersistedState, StateStore,
};

/// Per-run action plan, computed before any provider call
///
/// `created` and `deleted` partition the symmetric difference of the two
/// hostname sets; everything in `current` but not in `created` survived
/// from the previous run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Hostnames present now but not in the previous run
    pub created: BTreeSet<String>,
    /// Hostnames present in the previous run but gone now
    pub deleted: BTreeSet<String>,
    /// Whether the public IP differs from the last-applied one
    /// (an absent last IP counts as changed)
    pub ip_changed: bool,
    /// Whether a forced re-apply was requested
    pub force: bool,
}

impl ReconcilePlan {
    /// Compute the plan from the previous and current snapshots
    pub fn compute(
        previous: &BTreeSet<String>,
        current: &BTreeSet<String>,
        last_public_ip: Option<Ipv4Addr>,
        current_public_ip: Ipv4Addr,
        force: bool,
    ) -> Self {
        let created: BTreeSet<String> = current.difference(previous).cloned().collect();
        let deleted: BTreeSet<String> = previous.difference(current).cloned().collect();
        let ip_changed = last_public_ip != Some(current_public_ip);

        Self {
            created,
            deleted,
            ip_changed,
            force,
        }
    }

    /// Whether the hostname set changed at all
    pub fn domains_changed(&self) -> bool {
        !self.created.is_empty() || !self.deleted.is_empty()
    }

    /// Whether this run has anything to do
    ///
    /// When false the engine performs no provider calls and no state
    /// writes. This early exit is the system's main efficiency guarantee.
    pub fn has_work(&self) -> bool {
        self.domains_changed() || self.ip_changed || self.force
    }
}

/// The DNS action attempted (or deliberately not attempted) for a hostname
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    /// Fresh hostname: create-or-update issued
    Create,
    /// Surviving hostname re-pointed at the new IP
    Update,
    /// Already correct, nothing issued
    Skip,
    /// No configured root domain matched; invisible to reconciliation
    Unroutable,
    /// Hostname left the inventory: remote record removal issued
    Delete,
}

/// Explicit per-hostname result, aggregated into the [`RunReport`]
///
/// Replaces catch-and-log flow control: the engine records the cause and
/// decides continuation itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOutcome {
    /// The hostname this outcome belongs to
    pub hostname: String,
    /// What the engine decided to do
    pub action: HostAction,
    /// Success, or the failure cause
    pub result: std::result::Result<(), String>,
}

impl HostOutcome {
    fn ok(hostname: &str, action: HostAction) -> Self {
        Self {
            hostname: hostname.to_string(),
            action,
            result: Ok(()),
        }
    }

    fn failed(hostname: &str, action: HostAction, cause: impl Into<String>) -> Self {
        Self {
            hostname: hostname.to_string(),
            action,
            result: Err(cause.into()),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing changed; no provider calls made, no state written
    NoChange,
    /// Work was performed and the new snapshot was persisted
    Reconciled,
}

/// Summary of one reconciliation run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// How the run ended
    pub outcome: RunOutcome,
    /// The public IP the run reconciled against
    pub public_ip: Ipv4Addr,
    /// Per-hostname outcomes, in processing order (empty on early exit)
    pub hosts: Vec<HostOutcome>,
}

impl RunReport {
    /// Number of per-hostname failures in this run
    ///
    /// Failures here are recoverable: they never affect the process exit
    /// status, only the log.
    pub fn failures(&self) -> usize {
        self.hosts.iter().filter(|h| h.result.is_err()).count()
    }
}

/// Core reconciliation engine
///
/// One `run_once` call performs one complete pass: load prior state, fetch
/// inventory and public IP, compute the plan, drive the provider, persist.
/// The engine is sequential and synchronous per run; serialization of runs
/// against the same state is the scheduler's responsibility.
pub struct SyncEngine {
    /// Source of the current managed hostname set
    inventory: Box<dyn InventorySource>,

    /// Source of the current public IPv4 address
    ip_source: Box<dyn IpSource>,

    /// DNS record client, fed per-hostname zone routes
    provider: Box<dyn DnsProvider>,

    /// Cross-run state persistence
    state: Box<dyn StateStore>,

    /// Hostname → zone credential routing
    router: DomainRouter,

    /// Re-apply the current IP even with no detected change
    force_update: bool,
}

impl SyncEngine {
    /// Create a new engine
    pub fn new(
        inventory: Box<dyn InventorySource>,
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        state: Box<dyn StateStore>,
        router: DomainRouter,
        force_update: bool,
    ) -> Self {
        Self {
            inventory,
            ip_source,
            provider,
            state,
            router,
            force_update,
        }
    }

    /// Perform one reconciliation run
    ///
    /// # Returns
    ///
    /// - `Ok(RunReport)`: The run completed; per-hostname failures, if any,
    ///   are inside the report, not the error channel
    /// - `Err(Error)`: Inventory or public-IP resolution failed; prior
    ///   persisted state is untouched
    pub async fn run_once(&self) -> Result<RunReport> {
        let prior = self.state.load().await?;

        // Both fetches are fatal on failure: without the inventory there is
        // no safe delta, and a guessed IP must never reach the provider.
        let current = self.inventory.current_hostnames().await?;
        let public_ip = self.ip_source.current_ipv4().await?;

        let plan = ReconcilePlan::compute(
            &prior.hostnames,
            &current,
            prior.last_public_ip,
            public_ip,
            self.force_update,
        );

        if plan.domains_changed() {
            info!(
                "domain changes detected: {} new, {} removed",
                plan.created.len(),
                plan.deleted.len()
            );
            if !plan.created.is_empty() {
                info!("new hostnames: {}", join(&plan.created));
            }
            if !plan.deleted.is_empty() {
                info!("removed hostnames: {}", join(&plan.deleted));
            }
        }

        if plan.ip_changed {
            match prior.last_public_ip {
                Some(last) => info!("IP change detected: {} -> {}", last, public_ip),
                None => info!("initial IP detection: {}", public_ip),
            }
        }

        if !plan.has_work() {
            info!("no changes detected; skipping update cycle");
            return Ok(RunReport {
                outcome: RunOutcome::NoChange,
                public_ip,
                hosts: Vec::new(),
            });
        }

        let mut recorded_ips = prior.recorded_ips.clone();
        let mut hosts = Vec::new();

        // Every current hostname gets an individual decision; a provider
        // failure for one never aborts the rest.
        for hostname in &current {
            let Some(route) = self.router.resolve(hostname) else {
                info!("skipping {}: no DNS route configured", hostname);
                hosts.push(HostOutcome::ok(hostname, HostAction::Unroutable));
                continue;
            };

            let fresh = plan.created.contains(hostname) || !recorded_ips.contains_key(hostname);

            let action = if fresh {
                HostAction::Create
            } else if plan.ip_changed || plan.force {
                HostAction::Update
            } else {
                debug!("no changes needed for {}", hostname);
                hosts.push(HostOutcome::ok(hostname, HostAction::Skip));
                continue;
            };

            match action {
                HostAction::Create => {
                    info!("new hostname {}: applying A record with IP {}", hostname, public_ip)
                }
                HostAction::Update if plan.ip_changed => {
                    info!("updating {} with new IP {}", hostname, public_ip)
                }
                _ => info!("forced update for {} with IP {}", hostname, public_ip),
            }

            match self.provider.apply(hostname, public_ip, route).await {
                Ok(outcome) => {
                    match outcome {
                        ApplyOutcome::Created => debug!("record created for {}", hostname),
                        ApplyOutcome::Updated { previous } => {
                            debug!("record for {} rewritten (was {})", hostname, previous)
                        }
                        ApplyOutcome::Unchanged => {
                            debug!("record for {} already correct", hostname)
                        }
                    }
                    recorded_ips.insert(hostname.clone(), public_ip);
                    hosts.push(HostOutcome::ok(hostname, action));
                }
                Err(e) => {
                    // Not recorded as applied: the absent entry makes the
                    // next run retry this hostname as a fresh create.
                    error!("failed to apply record for {}: {}", hostname, e);
                    hosts.push(HostOutcome::failed(hostname, action, e.to_string()));
                }
            }
        }

        // Hostnames that left the inventory: best-effort remote removal,
        // unconditional removal from the recorded map.
        for hostname in &plan.deleted {
            if let Some(route) = self.router.resolve(hostname) {
                info!("deleting DNS record for removed hostname {}", hostname);
                match self.provider.delete(hostname, route).await {
                    Ok(outcome) => {
                        if outcome.removed == 0 && outcome.failed == 0 {
                            debug!("no record found for {}", hostname);
                        } else if outcome.failed > 0 {
                            warn!(
                                "deleted {} record(s) for {}, {} failed",
                                outcome.removed, hostname, outcome.failed
                            );
                        }
                        hosts.push(HostOutcome::ok(hostname, HostAction::Delete));
                    }
                    Err(e) => {
                        error!("failed to delete record for {}: {}", hostname, e);
                        hosts.push(HostOutcome::failed(hostname, HostAction::Delete, e.to_string()));
                    }
                }
            } else {
                info!("skipping removed hostname {}: no DNS route configured", hostname);
                hosts.push(HostOutcome::ok(hostname, HostAction::Unroutable));
            }
            recorded_ips.remove(hostname);
        }

        // Persist even when some per-host operations failed: the system
        // favors eventual convergence over strict per-run correctness.
        let next = PersistedState {
            hostnames: current,
            recorded_ips,
            last_public_ip: Some(public_ip),
        };
        self.state.persist(&next).await?;

        let report = RunReport {
            outcome: RunOutcome::Reconciled,
            public_ip,
            hosts,
        };

        if report.failures() > 0 {
            warn!(
                "run completed with {} per-hostname failure(s); they will be retried next run",
                report.failures()
            );
        } else {
            info!("run completed: {} hostname(s) reconciled", report.hosts.len());
        }

        Ok(report)
    }
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join(", ")
}
