// Dashboard service - runs one refresh cycle: cache check, fetch,
// timezone normalize, filter/aggregate
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use thiserror::Error;

use crate::application::cell_log_repository::{CellLogQuery, CellLogRepository};
use crate::domain::cell_log::PackStatus;
use crate::domain::view::ViewState;
use crate::infrastructure::query_cache::{CacheKey, QueryCache};

/// Everything the operator has dialed in for one refresh cycle.
#[derive(Debug, Clone)]
pub struct DashboardRequest {
    pub query: CellLogQuery,
    /// IANA zone name for display timestamps.
    pub timezone: String,
    /// Empty set means no filtering.
    pub status_filter: BTreeSet<PackStatus>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Operator typo in the timezone field. Propagated loudly instead of
    /// silently falling back to UTC, and kept distinct from fetch errors.
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
}

pub struct DashboardService {
    repository: Arc<dyn CellLogRepository>,
    cache: QueryCache,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn CellLogRepository>, cache_ttl: Duration) -> Self {
        Self {
            repository,
            cache: QueryCache::new(cache_ttl),
        }
    }

    fn cache_key(&self, query: &CellLogQuery) -> CacheKey {
        CacheKey::new(self.repository.cache_scope(), query)
    }

    /// Drop the memoized rows for this parameter set so the next
    /// [`build_view`](Self::build_view) hits the store. Called on each
    /// refresh tick; data is append-only so this only trades staleness.
    pub fn invalidate(&mut self, request: &DashboardRequest) {
        self.cache.invalidate(&self.cache_key(&request.query));
    }

    /// Run one full pipeline cycle and produce the state to render.
    ///
    /// Fetch failures are contained here: the returned view is empty and
    /// carries the error message. Only a bad timezone name propagates.
    pub async fn build_view(
        &mut self,
        request: &DashboardRequest,
    ) -> Result<ViewState, PipelineError> {
        let tz: Tz = request
            .timezone
            .parse()
            .map_err(|_| PipelineError::UnknownTimezone(request.timezone.clone()))?;

        let key = self.cache_key(&request.query);
        let rows = match self.cache.get(&key) {
            Some(rows) => {
                tracing::debug!(rows = rows.len(), "query cache hit");
                rows
            }
            None => match self.repository.fetch_cell_logs(&request.query).await {
                Ok(rows) => {
                    tracing::debug!(
                        rows = rows.len(),
                        device = %request.query.device_id,
                        "fetched cell logs"
                    );
                    self.cache.insert(key, rows.clone());
                    rows
                }
                Err(err) => {
                    tracing::error!(error = %err, "cell log fetch failed");
                    let mut view = ViewState::empty(tz);
                    view.fetch_error = Some(format!("Fetch failed: {err:#}"));
                    return Ok(view);
                }
            },
        };

        Ok(ViewState::build(rows, tz, &request.status_filter))
    }
}
