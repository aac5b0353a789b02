use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ScanError;

pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "CLOUDFLARE_API_KEY";

/// TTL value the API treats as "automatic".
pub const AUTOMATIC_TTL: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
    pub ttl: u32,
}

impl DnsRecord {
    /// A CDN-proxied CNAME from `name` to `target`.
    pub fn proxied_cname(name: &str, target: &str) -> Self {
        Self {
            id: None,
            record_type: "CNAME".to_string(),
            name: name.to_string(),
            content: target.to_string(),
            proxied: true,
            ttl: AUTOMATIC_TTL,
        }
    }
}

/// DNS record operations on the zone the DNS backend rotates through.
#[async_trait]
pub trait ZoneRecords: Send + Sync {
    async fn list_records(&self, name: &str) -> anyhow::Result<Vec<DnsRecord>>;
    async fn delete_record(&self, id: &str) -> anyhow::Result<()>;
    async fn create_record(&self, record: &DnsRecord) -> anyhow::Result<()>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: u32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

pub struct CloudflareZone {
    client: Client,
    api_base: String,
    token: String,
    zone_id: String,
}

impl CloudflareZone {
    /// Look the zone up by name and bind to it.
    pub async fn connect(api_base: &str, token: &str, zone_name: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .use_rustls_tls()
            .build()?;

        let mut zone = Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            zone_id: String::new(),
        };

        let url = format!("{}/zones", zone.api_base);
        let found: Vec<Zone> = zone
            .call(zone.client.get(&url).query(&[("name", zone_name)]))
            .await
            .with_context(|| format!("looking up zone {}", zone_name))?;

        zone.zone_id = found
            .into_iter()
            .next()
            .map(|z| z.id)
            .ok_or_else(|| ScanError::ZoneNotFound(zone_name.to_string()))?;

        tracing::info!(zone = zone_name, zone_id = %zone.zone_id, "resolved cloudflare zone");
        Ok(zone)
    }

    /// Same as `connect` with the token taken from `CLOUDFLARE_API_KEY`.
    pub async fn from_env(api_base: &str, zone_name: &str) -> anyhow::Result<Self> {
        let token = std::env::var(TOKEN_ENV).map_err(|_| ScanError::MissingCredentials(TOKEN_ENV))?;
        Self::connect(api_base, &token, zone_name).await
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, self.zone_id)
    }

    async fn call<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> anyhow::Result<T> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        let body: ApiResponse<T> = response
            .json()
            .await
            .with_context(|| format!("decoding cloudflare response (status {})", status))?;

        if !body.success {
            let errors = body
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ScanError::ZoneApi(errors).into());
        }

        body.result
            .ok_or_else(|| ScanError::ZoneApi(format!("empty result (status {})", status)).into())
    }
}

#[async_trait]
impl ZoneRecords for CloudflareZone {
    async fn list_records(&self, name: &str) -> anyhow::Result<Vec<DnsRecord>> {
        let request = self.client.get(self.records_url()).query(&[("name", name)]);
        self.call(request).await
    }

    async fn delete_record(&self, id: &str) -> anyhow::Result<()> {
        let url = format!("{}/{}", self.records_url(), id);
        let _: serde_json::Value = self.call(self.client.delete(url)).await?;
        tracing::debug!(record_id = id, "deleted dns record");
        Ok(())
    }

    async fn create_record(&self, record: &DnsRecord) -> anyhow::Result<()> {
        let created: DnsRecord = self.call(self.client.post(self.records_url()).json(record)).await?;
        tracing::debug!(name = %created.name, content = %created.content, "created dns record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cname_body() {
        let record = DnsRecord::proxied_cname("proxy-07.spare.example.com", "10.0.0.1");
        let body = serde_json::to_value(&record).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "type": "CNAME",
                "name": "proxy-07.spare.example.com",
                "content": "10.0.0.1",
                "proxied": true,
                "ttl": 1
            })
        );
    }

    #[test]
    fn test_record_from_api() {
        let raw = r#"{"id":"372e67954025e0ba6aaa6d586b9e0b59","type":"CNAME","name":"proxy-01.spare.example.com","content":"origin.example.com","proxied":true,"ttl":1,"zone_id":"023e105f4ecef8ad9ca31a8372d0c353"}"#;
        let record: DnsRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.id.as_deref(), Some("372e67954025e0ba6aaa6d586b9e0b59"));
        assert!(record.proxied);
    }
}
