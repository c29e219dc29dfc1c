//! HTTP record store — REST client for a remote tabular store API.

use async_trait::async_trait;
use leadclaw_core::config::StoreConfig;
use leadclaw_core::error::{LeadClawError, Result};
use leadclaw_core::traits::RecordStore;
use serde::Deserialize;
use std::time::Duration;

/// Response envelope the tabular API wraps every payload in.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

/// REST client for a remote row-oriented store (sheet-backed or similar).
///
/// Reads always carry a cache-busting timestamp parameter so the backend
/// cannot serve us a stale snapshot from an edge cache. The backend itself
/// may still lag its own writes, which is the adapter layer's problem.
pub struct HttpRecordStore {
    config: StoreConfig,
    client: reqwest::Client,
}

impl HttpRecordStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LeadClawError::Store(format!("HTTP client init failed: {e}")))?;
        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn rows_url(&self) -> String {
        self.api_url(&format!("tables/{}/rows", self.config.candidates_table))
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.config.api_token.is_empty() {
            req
        } else {
            req.bearer_auth(&self.config.api_token)
        }
    }

    async fn decode<T: serde::de::DeserializeOwned + Default>(
        &self,
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LeadClawError::PermissionDenied(format!(
                "{what}: store API returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(LeadClawError::Store(format!(
                "{what}: store API returned {status}"
            )));
        }

        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| LeadClawError::Store(format!("{what}: invalid response: {e}")))?;

        if !body.ok {
            let msg = body.error.unwrap_or_default();
            // Some backends report revoked access in-band instead of via 403.
            if msg.to_ascii_lowercase().contains("permission") {
                return Err(LeadClawError::PermissionDenied(format!("{what}: {msg}")));
            }
            return Err(LeadClawError::Store(format!("{what}: {msg}")));
        }
        body.result
            .ok_or_else(|| LeadClawError::Store(format!("{what}: empty result")))
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn append_row(&self, row: &serde_json::Value) -> Result<()> {
        let response = self
            .authed(self.client.post(self.rows_url()))
            .json(row)
            .send()
            .await
            .map_err(|e| LeadClawError::Store(format!("append failed: {e}")))?;
        let _: serde_json::Value = self.decode(response, "append").await?;
        Ok(())
    }

    async fn fetch_rows(&self) -> Result<Vec<serde_json::Value>> {
        let response = self
            .authed(self.client.get(self.rows_url()))
            .query(&[("_ts", chrono::Utc::now().timestamp_millis().to_string())])
            .send()
            .await
            .map_err(|e| LeadClawError::Store(format!("fetch failed: {e}")))?;
        self.decode(response, "fetch").await
    }

    async fn update_row(&self, id: &str, fields: &serde_json::Value) -> Result<()> {
        let url = format!("{}/{}", self.rows_url(), id);
        let response = self
            .authed(self.client.patch(url))
            .json(fields)
            .send()
            .await
            .map_err(|e| LeadClawError::Store(format!("update {id} failed: {e}")))?;
        let _: serde_json::Value = self.decode(response, "update").await?;
        Ok(())
    }

    async fn read_control(&self) -> Result<String> {
        let url = self.api_url(&format!("control/{}", self.config.control_cell));
        let response = self
            .authed(self.client.get(url))
            .query(&[("_ts", chrono::Utc::now().timestamp_millis().to_string())])
            .send()
            .await
            .map_err(|e| LeadClawError::Store(format!("control read failed: {e}")))?;
        self.decode(response, "control read").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_joins_cleanly() {
        let mut config = StoreConfig::default();
        config.base_url = "https://sheets.example.com/v1/".into();
        let store = HttpRecordStore::new(config).unwrap();
        assert_eq!(
            store.rows_url(),
            "https://sheets.example.com/v1/tables/candidates/rows"
        );
        assert_eq!(
            store.api_url("control/kill_switch"),
            "https://sheets.example.com/v1/control/kill_switch"
        );
    }
}
