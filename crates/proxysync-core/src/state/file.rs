// # File State Store
//
// File-based implementation of StateStore.
//
// ## Layout
//
// Three independent files inside one directory, matching the formats the
// rest of the tooling around this system expects:
//
// - `proxy_hosts.txt`    — one hostname per line (prior hostname set)
// - `domain_ips.json`    — JSON object, hostname → last-applied IP string
// - `last_public_ip.txt` — single IP string (last-applied public IP)
//
// ## Consistency
//
// Each file is written via write-temp-then-rename, so an individual file is
// never observed half-written. The three files are NOT updated as one
// transaction: a crash between writes can leave them mutually inconsistent,
// which the next run repairs by recomputing deltas from whatever loads.
// Correctness here is self-healing convergence, not atomicity.
//
// A `domain_ips.json` that fails to parse loads as an empty map (with a
// warning): affected hostnames are simply re-applied as fresh creates on
// the next run, which is the intended recovery path for this best-effort
// cache.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::state_store::{PersistedState, StateStore};

/// Prior hostname set, one per line
const HOSTS_FILE: &str = "proxy_hosts.txt";
/// Hostname → last-applied IP, JSON object
const DOMAIN_IPS_FILE: &str = "domain_ips.json";
/// Last-applied public IP, single line
const LAST_IP_FILE: &str = "last_public_ip.txt";

/// File-based state store
///
/// # Example
///
/// ```rust,no_run
/// use proxysync_core::state::FileStateStore;
/// use proxysync_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/proxysync").await?;
///     let state = store.load().await?;
///     println!("{} hostnames tracked", state.hostnames.len());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Create a store rooted at the given directory, creating it if needed
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.exists() {
            fs::create_dir_all(&dir).await.map_err(|e| {
                Error::config(format!(
                    "failed to create state directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Read a file to string, treating absence as None
    async fn read_optional(path: &Path) -> Result<Option<String>, Error> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::state_store(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Write a file atomically (temp write, then rename)
    async fn write_atomic(&self, name: &str, content: &str) -> Result<(), Error> {
        let path = self.path(name);
        let mut temp = path.clone();
        temp.set_extension("tmp");

        {
            let mut file = fs::File::create(&temp).await.map_err(|e| {
                Error::state_store(format!("failed to create {}: {}", temp.display(), e))
            })?;
            file.write_all(content.as_bytes()).await.map_err(|e| {
                Error::state_store(format!("failed to write {}: {}", temp.display(), e))
            })?;
            file.flush().await.map_err(|e| {
                Error::state_store(format!("failed to flush {}: {}", temp.display(), e))
            })?;
        }

        fs::rename(&temp, &path).await.map_err(|e| {
            Error::state_store(format!(
                "failed to rename {} to {}: {}",
                temp.display(),
                path.display(),
                e
            ))
        })?;

        Ok(())
    }

    fn parse_hostnames(content: &str) -> BTreeSet<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }

    fn parse_domain_ips(path: &Path, content: &str) -> BTreeMap<String, Ipv4Addr> {
        let raw: BTreeMap<String, String> = match serde_json::from_str(content) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(
                    "unparsable {}: {}; starting with an empty IP map (affected \
                     hostnames will be re-applied as fresh creates)",
                    path.display(),
                    e
                );
                return BTreeMap::new();
            }
        };

        let mut parsed = BTreeMap::new();
        for (host, ip) in raw {
            match ip.parse::<Ipv4Addr>() {
                Ok(ip) => {
                    parsed.insert(host, ip);
                }
                Err(_) => {
                    tracing::warn!("dropping invalid IP {:?} recorded for {}", ip, host);
                }
            }
        }
        parsed
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<PersistedState, Error> {
        let hostnames = Self::read_optional(&self.path(HOSTS_FILE))
            .await?
            .map(|content| Self::parse_hostnames(&content))
            .unwrap_or_default();

        let recorded_ips = match Self::read_optional(&self.path(DOMAIN_IPS_FILE)).await? {
            Some(content) => Self::parse_domain_ips(&self.path(DOMAIN_IPS_FILE), &content),
            None => BTreeMap::new(),
        };

        let last_public_ip = Self::read_optional(&self.path(LAST_IP_FILE))
            .await?
            .and_then(|content| {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    return None;
                }
                match trimmed.parse::<Ipv4Addr>() {
                    Ok(ip) => Some(ip),
                    Err(_) => {
                        tracing::warn!(
                            "invalid stored public IP {:?}; treating as first run",
                            trimmed
                        );
                        None
                    }
                }
            });

        tracing::debug!(
            "loaded state: {} hostnames, {} recorded IPs, last public IP {:?}",
            hostnames.len(),
            recorded_ips.len(),
            last_public_ip
        );

        Ok(PersistedState {
            hostnames,
            recorded_ips,
            last_public_ip,
        })
    }

    async fn persist(&self, state: &PersistedState) -> Result<(), Error> {
        let mut hosts = String::new();
        for host in &state.hostnames {
            hosts.push_str(host);
            hosts.push('\n');
        }
        self.write_atomic(HOSTS_FILE, &hosts).await?;

        let string_map: BTreeMap<&String, String> = state
            .recorded_ips
            .iter()
            .map(|(host, ip)| (host, ip.to_string()))
            .collect();
        let json = serde_json::to_string_pretty(&string_map)?;
        self.write_atomic(DOMAIN_IPS_FILE, &json).await?;

        if let Some(ip) = state.last_public_ip {
            self.write_atomic(LAST_IP_FILE, &ip.to_string()).await?;
        }

        tracing::trace!("state persisted to {}", self.dir.display());
        Ok(())
    }
}
