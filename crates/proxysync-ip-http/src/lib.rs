// # HTTP Public-IP Resolver
//
// This crate provides the public-IP source for proxysync.
//
// ## Purpose
//
// The node's public address must come from an external vantage point (an
// ipify-style "what is my IP" service): the interfaces visible locally say
// nothing about the address the world routes to behind NAT.
//
// ## Failure Semantics
//
// Any failure — transport, non-2xx, unparsable body, non-IPv4 answer — is
// surfaced as an error. The engine aborts the run on it; reconciling
// against a stale or guessed IP is never acceptable.

use proxysync_core::traits::IpSource;
use proxysync_core::{Error, Result};

use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Default resolution endpoint (returns `{"ip": "a.b.c.d"}`)
pub const DEFAULT_IP_URL: &str = "https://api.ipify.org?format=json";

/// HTTP timeout for IP resolution
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

/// HTTP-based public-IP resolver
pub struct HttpIpResolver {
    /// URL of the JSON IP endpoint
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a resolver against the given endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpIpResolver {
    fn default() -> Self {
        Self::new(DEFAULT_IP_URL)
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpResolver {
    async fn current_ipv4(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_resolution(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(Error::api("ip-resolver", status, body));
        }

        let parsed: IpResponse = response
            .json()
            .await
            .map_err(|e| Error::ip_resolution(format!("unparsable response: {}", e)))?;

        let ip: Ipv4Addr = parsed.ip.trim().parse().map_err(|_| {
            Error::ip_resolution(format!("not an IPv4 address: {:?}", parsed.ip))
        })?;

        tracing::debug!("resolved public IP: {}", ip);
        Ok(ip)
    }
}
