use crate::domain::insight::{AnomalyRecord, Severity};
use crate::error::OverviewError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub async fn fetch_unreviewed(
    pool: &sqlx::PgPool,
    workspace_id: Uuid,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<AnomalyRecord>, OverviewError> {
    let rows: Vec<(String, String, String, String, String, f64, f64, DateTime<Utc>)> =
        sqlx::query_as(
            "SELECT entity_type, entity_id, metric, anomaly_type, severity, \
                    current_value, expected_value, created_at \
             FROM anomaly_detections \
             WHERE workspace_id = $1 AND is_reviewed = FALSE AND created_at >= $2 \
             ORDER BY CASE severity \
                        WHEN 'critical' THEN 0 \
                        WHEN 'warning' THEN 1 \
                        ELSE 2 \
                      END ASC, \
                      created_at DESC \
             LIMIT $3",
        )
        .bind(workspace_id)
        .bind(since)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(
            |(
                entity_type,
                entity_id,
                metric,
                anomaly_type,
                severity,
                current_value,
                expected_value,
                created_at,
            )| {
                AnomalyRecord {
                    entity_type,
                    entity_id,
                    metric,
                    anomaly_type,
                    severity: Severity::parse(&severity).unwrap_or(Severity::Info),
                    current_value,
                    expected_value,
                    created_at,
                }
            },
        )
        .collect())
}
