// # Cloudflare DNS Client
//
// This crate provides the Cloudflare A-record client for proxysync.
//
// ## Behavior
//
// - `apply` is check-before-write: list the A records for a name, create
//   one if none exist, otherwise rewrite each record whose content differs
//   and leave matching ones untouched. Every record returned for the name
//   is reconciled, not just the first.
// - `delete` lists first (absence is a no-op) and removes each record by
//   its provider-assigned identifier independently, so one failed deletion
//   never blocks the others.
// - Credentials arrive per call as a `ZoneRoute`: one client instance
//   serves every configured zone.
// - Non-2xx lookup responses surface as `Error::Api` with the HTTP status
//   and response body captured. Whether a failure aborts anything is the
//   engine's decision, never this crate's.
//
// ## Dry-Run Mode
//
// When `dry_run` is true the client performs all GET requests, logs the
// intended write, skips it, and reports success. Enabled in the daemon via
// `PROXYSYNC_MODE=dry-run`.
//
// ## Security
//
// - API tokens NEVER appear in logs
// - Records are created with `ttl=3600, proxied=true`, so origin IPs stay
//   behind Cloudflare's network
//
// ## API Reference
//
// - List:   GET    `/zones/:zone_id/dns_records?type=A&name=...`
// - Create: POST   `/zones/:zone_id/dns_records`
// - Update: PUT    `/zones/:zone_id/dns_records/:record_id`
// - Delete: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use proxysync_core::router::ZoneRoute;
use proxysync_core::traits::{ApplyOutcome, DeleteOutcome, DnsProvider};
use proxysync_core::{Error, Result};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records are created proxied with a fixed TTL
const RECORD_TTL: u32 = 3600;

#[derive(Debug, Deserialize)]
struct RecordListResponse {
    #[serde(default)]
    result: Vec<DnsRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct DnsRecord {
    id: String,
    content: String,
}

/// Cloudflare A-record client
pub struct CloudflareDns {
    /// API base URL (overridable for tests)
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: perform GET requests but skip writes
    dry_run: bool,
}

impl std::fmt::Debug for CloudflareDns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareDns")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareDns {
    /// Create a new client against the production API
    pub fn new(dry_run: bool) -> Self {
        Self::with_api_base(CLOUDFLARE_API_BASE, dry_run)
    }

    /// Create a client against an alternate API base (used by tests)
    pub fn with_api_base(api_base: impl Into<String>, dry_run: bool) -> Self {
        let mut api_base = api_base.into();
        while api_base.ends_with('/') {
            api_base.pop();
        }

        Self {
            api_base,
            client: reqwest::Client::builder()
                .timeout(DEFAULT_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            dry_run,
        }
    }

    /// Turn a non-2xx response into an `Error::Api`, consuming the body
    async fn api_error(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error response".to_string());
        Error::api("cloudflare", status, body)
    }

    /// List the A records for a hostname in the routed zone
    async fn list_records(&self, hostname: &str, route: &ZoneRoute) -> Result<Vec<DnsRecord>> {
        let url = format!("{}/zones/{}/dns_records", self.api_base, route.zone_id);
        let response = self
            .client
            .get(&url)
            .query(&[("type", "A"), ("name", hostname)])
            .bearer_auth(&route.api_token)
            .send()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("record lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let parsed: RecordListResponse = response.json().await.map_err(|e| {
            Error::provider("cloudflare", format!("unparsable record list: {}", e))
        })?;

        Ok(parsed.result)
    }

    fn record_payload(hostname: &str, ip: Ipv4Addr) -> serde_json::Value {
        serde_json::json!({
            "type": "A",
            "name": hostname,
            "content": ip.to_string(),
            "ttl": RECORD_TTL,
            "proxied": true,
        })
    }

    /// Create a new A record
    async fn create_record(&self, hostname: &str, ip: Ipv4Addr, route: &ZoneRoute) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[dry-run] would create A record {} -> {} (ttl={}, proxied)",
                hostname,
                ip,
                RECORD_TTL
            );
            return Ok(());
        }

        let url = format!("{}/zones/{}/dns_records", self.api_base, route.zone_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&route.api_token)
            .json(&Self::record_payload(hostname, ip))
            .send()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("record create failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        tracing::info!("A record created for {} with IP {}", hostname, ip);
        Ok(())
    }

    /// Rewrite an existing record in place
    async fn update_record(
        &self,
        record_id: &str,
        hostname: &str,
        ip: Ipv4Addr,
        route: &ZoneRoute,
    ) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[dry-run] would update record {} for {} -> {}",
                record_id,
                hostname,
                ip
            );
            return Ok(());
        }

        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.api_base, route.zone_id, record_id
        );
        let response = self
            .client
            .put(&url)
            .bearer_auth(&route.api_token)
            .json(&Self::record_payload(hostname, ip))
            .send()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("record update failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        tracing::info!("A record updated for {} to IP {}", hostname, ip);
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for CloudflareDns {
    async fn apply(&self, hostname: &str, ip: Ipv4Addr, route: &ZoneRoute) -> Result<ApplyOutcome> {
        let records = self.list_records(hostname, route).await?;

        if records.is_empty() {
            self.create_record(hostname, ip, route).await?;
            return Ok(ApplyOutcome::Created);
        }

        let mut first_rewritten: Option<Ipv4Addr> = None;
        let want = ip.to_string();

        for record in &records {
            if record.content == want {
                tracing::debug!("record {} for {} already has IP {}", record.id, hostname, ip);
                continue;
            }

            self.update_record(&record.id, hostname, ip, route).await?;
            if first_rewritten.is_none() {
                first_rewritten = record.content.parse().ok();
            }
        }

        match first_rewritten {
            Some(previous) => Ok(ApplyOutcome::Updated { previous }),
            None if records.iter().all(|r| r.content == want) => Ok(ApplyOutcome::Unchanged),
            // A record was rewritten but held unparsable content before
            None => Ok(ApplyOutcome::Updated { previous: ip }),
        }
    }

    async fn delete(&self, hostname: &str, route: &ZoneRoute) -> Result<DeleteOutcome> {
        let records = self.list_records(hostname, route).await?;

        if records.is_empty() {
            tracing::debug!("no A record found for {}", hostname);
            return Ok(DeleteOutcome {
                removed: 0,
                failed: 0,
            });
        }

        let mut removed = 0;
        let mut failed = 0;

        // Each record is deleted independently; one failure never blocks
        // the rest.
        for record in &records {
            if self.dry_run {
                tracing::info!(
                    "[dry-run] would delete record {} for {}",
                    record.id,
                    hostname
                );
                removed += 1;
                continue;
            }

            let url = format!(
                "{}/zones/{}/dns_records/{}",
                self.api_base, route.zone_id, record.id
            );
            let result = self
                .client
                .delete(&url)
                .bearer_auth(&route.api_token)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("A record {} deleted for {}", record.id, hostname);
                    removed += 1;
                }
                Ok(response) => {
                    let err = Self::api_error(response).await;
                    tracing::warn!("failed to delete record {} for {}: {}", record.id, hostname, err);
                    failed += 1;
                }
                Err(e) => {
                    tracing::warn!("failed to delete record {} for {}: {}", record.id, hostname, e);
                    failed += 1;
                }
            }
        }

        Ok(DeleteOutcome { removed, failed })
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn route() -> ZoneRoute {
        ZoneRoute {
            zone_id: "zone123".to_string(),
            api_token: "cf-test-token".to_string(),
        }
    }

    fn record_list(records: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "result": records,
        }))
    }

    async fn mock_list(server: &MockServer, hostname: &str, records: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/zones/zone123/dns_records"))
            .and(query_param("type", "A"))
            .and(query_param("name", hostname))
            .and(header("authorization", "Bearer cf-test-token"))
            .respond_with(record_list(records))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn creates_when_no_record_exists() {
        let server = MockServer::start().await;
        mock_list(&server, "app.example.com", serde_json::json!([])).await;

        Mock::given(method("POST"))
            .and(path("/zones/zone123/dns_records"))
            .and(body_partial_json(serde_json::json!({
                "type": "A",
                "name": "app.example.com",
                "content": "1.2.3.4",
                "ttl": 3600,
                "proxied": true,
            })))
            .respond_with(record_list(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = CloudflareDns::with_api_base(server.uri(), false);
        let outcome = client
            .apply("app.example.com", "1.2.3.4".parse().unwrap(), &route())
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Created);
    }

    #[tokio::test]
    async fn updates_only_records_with_stale_content() {
        let server = MockServer::start().await;
        mock_list(
            &server,
            "app.example.com",
            serde_json::json!([
                { "id": "rec-stale", "content": "9.9.9.9" },
                { "id": "rec-fresh", "content": "1.2.3.4" },
            ]),
        )
        .await;

        // Only the stale record gets a PUT.
        Mock::given(method("PUT"))
            .and(path("/zones/zone123/dns_records/rec-stale"))
            .and(body_partial_json(serde_json::json!({ "content": "1.2.3.4" })))
            .respond_with(record_list(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/zones/zone123/dns_records/rec-fresh"))
            .respond_with(record_list(serde_json::json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = CloudflareDns::with_api_base(server.uri(), false);
        let outcome = client
            .apply("app.example.com", "1.2.3.4".parse().unwrap(), &route())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Updated {
                previous: "9.9.9.9".parse().unwrap()
            }
        );
    }

    #[tokio::test]
    async fn matching_record_is_a_no_op() {
        let server = MockServer::start().await;
        mock_list(
            &server,
            "app.example.com",
            serde_json::json!([{ "id": "rec1", "content": "1.2.3.4" }]),
        )
        .await;

        let client = CloudflareDns::with_api_base(server.uri(), false);
        let outcome = client
            .apply("app.example.com", "1.2.3.4".parse().unwrap(), &route())
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Unchanged);
    }

    #[tokio::test]
    async fn lookup_failure_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/zones/zone123/dns_records"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = CloudflareDns::with_api_base(server.uri(), false);
        let err = client
            .apply("app.example.com", "1.2.3.4".parse().unwrap(), &route())
            .await
            .unwrap_err();
        match err {
            Error::Api {
                status, body, ..
            } => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn deletes_each_record_independently() {
        let server = MockServer::start().await;
        mock_list(
            &server,
            "gone.example.com",
            serde_json::json!([
                { "id": "rec1", "content": "1.2.3.4" },
                { "id": "rec2", "content": "1.2.3.4" },
            ]),
        )
        .await;

        // rec1 fails, rec2 must still be attempted and succeed.
        Mock::given(method("DELETE"))
            .and(path("/zones/zone123/dns_records/rec1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/zones/zone123/dns_records/rec2"))
            .respond_with(record_list(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = CloudflareDns::with_api_base(server.uri(), false);
        let outcome = client.delete("gone.example.com", &route()).await.unwrap();
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.failed, 1);
    }

    #[tokio::test]
    async fn delete_with_no_records_is_a_no_op() {
        let server = MockServer::start().await;
        mock_list(&server, "gone.example.com", serde_json::json!([])).await;

        let client = CloudflareDns::with_api_base(server.uri(), false);
        let outcome = client.delete("gone.example.com", &route()).await.unwrap();
        assert_eq!(outcome.removed, 0);
        assert_eq!(outcome.failed, 0);
    }

    #[tokio::test]
    async fn dry_run_reads_but_never_writes() {
        let server = MockServer::start().await;
        mock_list(&server, "app.example.com", serde_json::json!([])).await;

        // No write may reach the API in dry-run mode.
        Mock::given(method("POST"))
            .and(path("/zones/zone123/dns_records"))
            .respond_with(record_list(serde_json::json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = CloudflareDns::with_api_base(server.uri(), true);
        let outcome = client
            .apply("app.example.com", "1.2.3.4".parse().unwrap(), &route())
            .await
            .unwrap();
        // Reported as success so the engine records it; the log carries
        // the would-have-been write.
        assert_eq!(outcome, ApplyOutcome::Created);
    }

    #[test]
    fn debug_output_is_token_free() {
        let client = CloudflareDns::new(false);
        let debug = format!("{:?}", client);
        assert!(debug.contains("CloudflareDns"));
        assert!(debug.contains("api.cloudflare.com"));
    }
}
