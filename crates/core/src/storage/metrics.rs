use crate::domain::metrics::RawTotals;
use crate::error::OverviewError;
use crate::storage::MetricFilter;
use chrono::NaiveDate;
use uuid::Uuid;

pub async fn workspace_exists(
    pool: &sqlx::PgPool,
    workspace_id: Uuid,
) -> Result<bool, OverviewError> {
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM workspaces WHERE id = $1)")
            .bind(workspace_id)
            .fetch_one(pool)
            .await?;
    Ok(exists.0)
}

// Null text[] binds disable the corresponding filter; this keeps one static
// statement instead of building SQL per filter combination.
pub async fn fetch_totals(
    pool: &sqlx::PgPool,
    workspace_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    filter: &MetricFilter,
) -> Result<RawTotals, OverviewError> {
    let row: (f64, f64, i64, i64, i64) = sqlx::query_as(
        "SELECT COALESCE(SUM(spend), 0)::DOUBLE PRECISION, \
                COALESCE(SUM(revenue), 0)::DOUBLE PRECISION, \
                COALESCE(SUM(impressions), 0)::BIGINT, \
                COALESCE(SUM(clicks), 0)::BIGINT, \
                COALESCE(SUM(conversions), 0)::BIGINT \
         FROM daily_metrics \
         WHERE workspace_id = $1 AND date >= $2 AND date <= $3 \
           AND ($4::text[] IS NULL OR platform = ANY($4)) \
           AND ($5::text[] IS NULL OR account_id = ANY($5))",
    )
    .bind(workspace_id)
    .bind(start)
    .bind(end)
    .bind(as_filter_param(&filter.platforms))
    .bind(as_filter_param(&filter.accounts))
    .fetch_one(pool)
    .await?;

    Ok(totals_from_row(row))
}

pub async fn fetch_platform_totals(
    pool: &sqlx::PgPool,
    workspace_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    filter: &MetricFilter,
) -> Result<Vec<(String, RawTotals)>, OverviewError> {
    let rows: Vec<(String, f64, f64, i64, i64, i64)> = sqlx::query_as(
        "SELECT platform, \
                COALESCE(SUM(spend), 0)::DOUBLE PRECISION, \
                COALESCE(SUM(revenue), 0)::DOUBLE PRECISION, \
                COALESCE(SUM(impressions), 0)::BIGINT, \
                COALESCE(SUM(clicks), 0)::BIGINT, \
                COALESCE(SUM(conversions), 0)::BIGINT \
         FROM daily_metrics \
         WHERE workspace_id = $1 AND date >= $2 AND date <= $3 \
           AND ($4::text[] IS NULL OR platform = ANY($4)) \
           AND ($5::text[] IS NULL OR account_id = ANY($5)) \
         GROUP BY platform \
         ORDER BY platform ASC",
    )
    .bind(workspace_id)
    .bind(start)
    .bind(end)
    .bind(as_filter_param(&filter.platforms))
    .bind(as_filter_param(&filter.accounts))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(platform, spend, revenue, impressions, clicks, conversions)| {
            (
                platform,
                totals_from_row((spend, revenue, impressions, clicks, conversions)),
            )
        })
        .collect())
}

fn as_filter_param(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

fn totals_from_row((spend, revenue, impressions, clicks, conversions): (f64, f64, i64, i64, i64)) -> RawTotals {
    RawTotals {
        spend,
        revenue,
        impressions,
        clicks,
        conversions,
    }
}
