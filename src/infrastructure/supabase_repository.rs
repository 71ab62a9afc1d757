// Supabase (PostgREST) repository implementation
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::application::cell_log_repository::{CellLogQuery, CellLogRepository};
use crate::domain::cell_log::CellLogRow;

const CELL_LOGS_TABLE: &str = "cell_logs";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct SupabaseRepository {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl SupabaseRepository {
    pub fn new(base_url: String, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn logs_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, CELL_LOGS_TABLE)
    }

    /// PostgREST filter parameters for a range read: device equality,
    /// lower timestamp bound, descending order, row cap.
    fn query_params(query: &CellLogQuery, now: DateTime<Utc>) -> Vec<(String, String)> {
        let start = query
            .window_start(now)
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        vec![
            ("device_id".to_string(), format!("eq.{}", query.device_id)),
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "ts.desc".to_string()),
            ("limit".to_string(), query.limit.to_string()),
            ("ts".to_string(), format!("gte.{start}")),
        ]
    }
}

#[async_trait]
impl CellLogRepository for SupabaseRepository {
    async fn fetch_cell_logs(&self, query: &CellLogQuery) -> Result<Vec<CellLogRow>> {
        let url = self.logs_url();
        let params = Self::query_params(query, Utc::now());
        tracing::debug!(%url, device = %query.device_id, "querying cell logs");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to reach the Supabase endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Supabase query failed with status {status}: {body}");
        }

        response
            .json::<Vec<CellLogRow>>()
            .await
            .context("Failed to parse Supabase response")
    }

    fn cache_scope(&self) -> String {
        format!("{}#{}", self.base_url, self.api_key)
    }
}
