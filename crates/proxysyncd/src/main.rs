// # proxysyncd - Proxy-to-DNS Reconciliation Daemon
//
// This binary is a THIN integration layer. It:
// 1. Reads configuration from environment variables
// 2. Initializes logging and the tokio runtime
// 3. Wires the inventory, IP source, provider, and state store into the engine
// 4. Performs exactly one reconciliation run and exits
//
// All reconciliation logic lives in proxysync-core. Scheduling is external
// (cron, a systemd timer, or a container restart policy); persisted state
// makes repeated invocations cheap.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Inventory (Nginx Proxy Manager)
// - `PROXYSYNC_NPM_URL`: Base URL of the NPM API (e.g., http://npm.local:81)
// - `PROXYSYNC_NPM_IDENTITY`: Account identity (email) for token auth
// - `PROXYSYNC_NPM_SECRET`: Account secret for token auth
//
// ### DNS Routing
// - `PROXYSYNC_ROOT_DOMAINS`: Comma-separated `root=zone_id:api_token`
//   entries, e.g. `example.com=abc123:cf-token,other.org=def456:cf-token2`
//
// ### Public IP
// - `PROXYSYNC_IP_URL`: URL returning `{"ip": "..."}` (default: ipify)
//
// ### State
// - `PROXYSYNC_STATE_DIR`: Directory for the state files (default: `.`)
//
// ### Behavior
// - `FORCE_UPDATE`: `true`/`1`/`yes` re-applies the current IP to every
//   routable hostname even when nothing changed
// - `PROXYSYNC_MODE`: `dry-run` performs lookups but skips all DNS writes
// - `PROXYSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export PROXYSYNC_NPM_URL=http://npm.local:81
// export PROXYSYNC_NPM_IDENTITY=admin@example.com
// export PROXYSYNC_NPM_SECRET=changeme
// export PROXYSYNC_ROOT_DOMAINS=example.com=abc123:cf-token
// export PROXYSYNC_STATE_DIR=/var/lib/proxysync
//
// proxysyncd
// ```

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use proxysync_core::config::{InventoryConfig, IpSourceConfig, StateStoreConfig};
use proxysync_core::{
    DomainRouter, FileStateStore, RootDomain, RoutingConfig, SyncConfig, SyncEngine,
    parse_force_flag,
};
use proxysync_inventory_npm::NpmInventory;
use proxysync_ip_http::{DEFAULT_IP_URL, HttpIpResolver};
use proxysync_provider_cloudflare::CloudflareDns;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Run completed (including the no-change early exit)
/// - 1: Configuration or startup error
/// - 2: Fatal run error (inventory or IP resolution failed)
///
/// Per-hostname DNS failures never affect the exit status; they are logged
/// and retried on the next invocation.
#[derive(Debug, Clone, Copy)]
enum SyncExitCode {
    /// Run completed
    Completed = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Fatal run error
    RunError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration, assembled from environment variables
struct AppConfig {
    sync: SyncConfig,
    dry_run: bool,
    log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let npm_url = require_env("PROXYSYNC_NPM_URL")?;
        let npm_identity = require_env("PROXYSYNC_NPM_IDENTITY")?;
        let npm_secret = require_env("PROXYSYNC_NPM_SECRET")?;
        let roots = parse_root_domains(&require_env("PROXYSYNC_ROOT_DOMAINS")?)?;

        let sync = SyncConfig {
            inventory: InventoryConfig {
                base_url: npm_url,
                identity: npm_identity,
                secret: npm_secret,
            },
            routing: RoutingConfig { roots },
            ip_source: IpSourceConfig {
                url: env::var("PROXYSYNC_IP_URL").unwrap_or_else(|_| DEFAULT_IP_URL.to_string()),
            },
            state_store: StateStoreConfig::Dir {
                path: env::var("PROXYSYNC_STATE_DIR").unwrap_or_else(|_| ".".to_string()),
            },
            force_update: env::var("FORCE_UPDATE")
                .map(|raw| parse_force_flag(&raw))
                .unwrap_or(false),
        };

        let dry_run = match env::var("PROXYSYNC_MODE").ok().as_deref() {
            None | Some("apply") => false,
            Some("dry-run") => true,
            Some(other) => anyhow::bail!(
                "PROXYSYNC_MODE '{}' is not supported. Supported modes: apply, dry-run",
                other
            ),
        };

        Ok(Self {
            sync,
            dry_run,
            log_level: env::var("PROXYSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Structural validation (non-empty fields, URL schemes) is delegated
    /// to the core config types; this adds the environment-facing checks:
    /// domain-name syntax, placeholder-token detection, log level.
    fn validate(&self) -> Result<()> {
        self.sync
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        for entry in &self.sync.routing.roots {
            validate_domain_name(&entry.root)?;

            // Catch obvious placeholder tokens before they hit the API
            let token_lower = entry.api_token.to_lowercase();
            if token_lower.contains("your_token")
                || token_lower.contains("replace_me")
                || token_lower == "token"
            {
                anyhow::bail!(
                    "API token for root '{}' appears to be a placeholder. \
                    Use an actual API token from your DNS provider.",
                    entry.root
                );
            }
        }

        // Common for NPM on a LAN, but worth a warning
        if !self.sync.inventory.base_url.starts_with("https://") {
            eprintln!(
                "WARNING: PROXYSYNC_NPM_URL uses HTTP (not HTTPS). \
                Credentials travel in cleartext on this connection."
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "PROXYSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn require_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| {
        anyhow::anyhow!(
            "{} is required. Set it via: export {}=...",
            name,
            name
        )
    })
}

/// Parse `root=zone_id:api_token` entries from the routing variable
///
/// The token is split off at the FIRST colon after the zone id, so tokens
/// containing colons survive intact.
fn parse_root_domains(raw: &str) -> Result<Vec<RootDomain>> {
    let mut roots = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (root, rest) = entry.split_once('=').ok_or_else(|| {
            anyhow::anyhow!(
                "PROXYSYNC_ROOT_DOMAINS entry '{}' is malformed. \
                Expected: root=zone_id:api_token",
                entry
            )
        })?;
        let (zone_id, api_token) = rest.split_once(':').ok_or_else(|| {
            anyhow::anyhow!(
                "PROXYSYNC_ROOT_DOMAINS entry for '{}' is missing the API token. \
                Expected: root=zone_id:api_token",
                root
            )
        })?;

        roots.push(RootDomain {
            root: root.trim().to_string(),
            zone_id: zone_id.trim().to_string(),
            api_token: api_token.trim().to_string(),
        });
    }

    if roots.is_empty() {
        anyhow::bail!(
            "PROXYSYNC_ROOT_DOMAINS must contain at least one entry. \
            Set it via: export PROXYSYNC_ROOT_DOMAINS=example.com=zone_id:api_token"
        );
    }

    Ok(roots)
}

/// Validate that a string is a valid domain name
///
/// Basic DNS name validation per RFC 1035; not comprehensive but catches
/// common configuration mistakes.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        anyhow::bail!("Root domain cannot be empty");
    }

    if domain.len() > 253 {
        anyhow::bail!(
            "Root domain too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Root domain has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    info!("Starting proxysyncd");
    info!(
        "Configuration loaded: {} root domain(s), force_update={}, dry_run={}",
        config.sync.routing.roots.len(),
        config.sync.force_update,
        config.dry_run
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RunError.into();
        }
    };

    let result = rt.block_on(async {
        match run(config).await {
            Ok(()) => SyncExitCode::Completed,
            Err(e) => {
                error!("Run failed: {}", e);
                SyncExitCode::RunError
            }
        }
    });

    result.into()
}

/// Wire the components together and perform one reconciliation run
async fn run(config: AppConfig) -> Result<()> {
    let inventory = NpmInventory::new(
        &config.sync.inventory.base_url,
        &config.sync.inventory.identity,
        &config.sync.inventory.secret,
    );

    let ip_source = HttpIpResolver::new(&config.sync.ip_source.url);

    if config.dry_run {
        info!("Dry-run mode: DNS lookups only, all writes skipped");
    }
    let provider = CloudflareDns::new(config.dry_run);

    let state: Box<dyn proxysync_core::StateStore> = match &config.sync.state_store {
        StateStoreConfig::Dir { path } => {
            info!("State directory: {}", path);
            Box::new(FileStateStore::new(path).await?)
        }
        StateStoreConfig::Memory => Box::new(proxysync_core::MemoryStateStore::new()),
    };

    let router = DomainRouter::new(&config.sync.routing);

    let engine = SyncEngine::new(
        Box::new(inventory),
        Box::new(ip_source),
        Box::new(provider),
        state,
        router,
        config.sync.force_update,
    );

    let report = engine.run_once().await?;

    match report.outcome {
        proxysync_core::RunOutcome::NoChange => {
            info!("No changes; exiting");
        }
        proxysync_core::RunOutcome::Reconciled => {
            info!(
                "Reconciled {} hostname(s) against IP {} ({} failure(s))",
                report.hosts.len(),
                report.public_ip,
                report.failures()
            );
        }
    }

    Ok(())
}
