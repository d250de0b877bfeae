use crate::domain::insight::AnomalyRecord;
use crate::domain::metrics::RawTotals;
use crate::error::OverviewError;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub mod anomalies;
pub mod metrics;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

/// Optional platform/account restriction applied uniformly to metric queries.
/// Empty lists mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricFilter {
    pub platforms: Vec<String>,
    pub accounts: Vec<String>,
}

/// Read seam over the metrics and anomaly tables. The overview path depends
/// on this trait so its computation stays a pure function of the store.
#[async_trait::async_trait]
pub trait MetricsStore: Send + Sync {
    async fn workspace_exists(&self, workspace_id: Uuid) -> Result<bool, OverviewError>;

    /// Summed raw counters over `[start, end]` inclusive, nulls as 0.
    async fn fetch_totals(
        &self,
        workspace_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        filter: &MetricFilter,
    ) -> Result<RawTotals, OverviewError>;

    /// Same sums grouped per platform.
    async fn fetch_platform_totals(
        &self,
        workspace_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        filter: &MetricFilter,
    ) -> Result<Vec<(String, RawTotals)>, OverviewError>;

    /// Unreviewed anomalies created at or after `since`, ordered by severity
    /// descending then recency descending, capped at `limit`.
    async fn fetch_unreviewed_anomalies(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<AnomalyRecord>, OverviewError>;
}

#[derive(Debug, Clone)]
pub struct PgMetricsStore {
    pool: sqlx::PgPool,
}

impl PgMetricsStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MetricsStore for PgMetricsStore {
    async fn workspace_exists(&self, workspace_id: Uuid) -> Result<bool, OverviewError> {
        metrics::workspace_exists(&self.pool, workspace_id).await
    }

    async fn fetch_totals(
        &self,
        workspace_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        filter: &MetricFilter,
    ) -> Result<RawTotals, OverviewError> {
        metrics::fetch_totals(&self.pool, workspace_id, start, end, filter).await
    }

    async fn fetch_platform_totals(
        &self,
        workspace_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        filter: &MetricFilter,
    ) -> Result<Vec<(String, RawTotals)>, OverviewError> {
        metrics::fetch_platform_totals(&self.pool, workspace_id, start, end, filter).await
    }

    async fn fetch_unreviewed_anomalies(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<AnomalyRecord>, OverviewError> {
        anomalies::fetch_unreviewed(&self.pool, workspace_id, since, limit).await
    }
}
