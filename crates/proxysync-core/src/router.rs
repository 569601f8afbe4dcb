//! Hostname → zone credential routing
//!
//! The router decides which configured zone is responsible for a hostname
//! by suffix-matching it against the configured root domains. A hostname
//! matching no root is invisible to reconciliation: the engine logs it and
//! moves on, it is never an error.

use crate::config::RoutingConfig;

/// Credentials and zone identity for one configured root domain
#[derive(Clone, PartialEq, Eq)]
pub struct ZoneRoute {
    /// Provider zone identifier
    pub zone_id: String,
    /// Provider API token for this zone
    pub api_token: String,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for ZoneRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneRoute")
            .field("zone_id", &self.zone_id)
            .field("api_token", &"<REDACTED>")
            .finish()
    }
}

/// Maps hostnames to zone credentials by root-domain suffix
///
/// Matching is a true suffix match on a dot-separated label boundary:
/// `app.example.com` matches root `example.com`, the root itself matches,
/// and `example.com.evil.org` does not.
///
/// When a hostname matches several configured roots (e.g., `example.com`
/// and `sub.example.com`), the longest configured suffix wins. Entries are
/// sorted once at construction, so resolution order never depends on
/// configuration iteration order.
#[derive(Debug, Clone)]
pub struct DomainRouter {
    /// (root, route) pairs sorted by descending root length
    entries: Vec<(String, ZoneRoute)>,
}

impl DomainRouter {
    /// Build a router from the routing configuration
    pub fn new(config: &RoutingConfig) -> Self {
        let mut entries: Vec<(String, ZoneRoute)> = config
            .roots
            .iter()
            .map(|entry| {
                (
                    entry.root.clone(),
                    ZoneRoute {
                        zone_id: entry.zone_id.clone(),
                        api_token: entry.api_token.clone(),
                    },
                )
            })
            .collect();

        // Longest suffix first; equal lengths tie-break lexicographically
        // so resolution is fully deterministic.
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Self { entries }
    }

    /// Resolve the zone route responsible for a hostname
    ///
    /// Returns `None` when no configured root matches; the caller logs and
    /// skips such hostnames.
    pub fn resolve(&self, hostname: &str) -> Option<&ZoneRoute> {
        self.entries
            .iter()
            .find(|(root, _)| Self::matches_root(hostname, root))
            .map(|(_, route)| route)
    }

    /// True suffix match on a label boundary
    fn matches_root(hostname: &str, root: &str) -> bool {
        hostname == root
            || (hostname.len() > root.len()
                && hostname.ends_with(root)
                && hostname.as_bytes()[hostname.len() - root.len() - 1] == b'.')
    }

    /// Number of configured roots
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the router has no roots configured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RootDomain;

    fn router(roots: &[&str]) -> DomainRouter {
        let config = RoutingConfig {
            roots: roots
                .iter()
                .map(|root| RootDomain {
                    root: root.to_string(),
                    zone_id: format!("zone-{root}"),
                    api_token: format!("token-{root}"),
                })
                .collect(),
        };
        DomainRouter::new(&config)
    }

    #[test]
    fn subdomain_matches_configured_root() {
        let router = router(&["example.com"]);
        let route = router.resolve("app.example.com").unwrap();
        assert_eq!(route.zone_id, "zone-example.com");
    }

    #[test]
    fn root_itself_matches() {
        let router = router(&["example.com"]);
        assert!(router.resolve("example.com").is_some());
    }

    #[test]
    fn substring_suffix_does_not_match() {
        let router = router(&["example.com"]);
        // Not a label-boundary suffix: must never route.
        assert!(router.resolve("example.com.evil.org").is_none());
        assert!(router.resolve("badexample.com").is_none());
    }

    #[test]
    fn unconfigured_hostname_resolves_to_none() {
        let router = router(&["example.com"]);
        assert!(router.resolve("app.other.org").is_none());
    }

    #[test]
    fn longest_suffix_wins_regardless_of_config_order() {
        let forward = router(&["example.com", "sub.example.com"]);
        let reversed = router(&["sub.example.com", "example.com"]);

        for r in [&forward, &reversed] {
            let route = r.resolve("app.sub.example.com").unwrap();
            assert_eq!(route.zone_id, "zone-sub.example.com");
            let route = r.resolve("app.example.com").unwrap();
            assert_eq!(route.zone_id, "zone-example.com");
        }
    }

    #[test]
    fn zone_route_debug_redacts_token() {
        let router = router(&["example.com"]);
        let route = router.resolve("example.com").unwrap();
        let debug = format!("{:?}", route);
        assert!(!debug.contains("token-example.com"));
        assert!(debug.contains("REDACTED"));
    }
}
