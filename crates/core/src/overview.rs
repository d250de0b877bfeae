use crate::domain::insight::{generate_insights, Insight};
use crate::domain::metrics::{AggregateSnapshot, MetricChanges};
use crate::error::OverviewError;
use crate::storage::{MetricFilter, MetricsStore};
use crate::time::range::resolve_range;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ANOMALY_LOOKBACK_DAYS: i64 = 7;
const ANOMALY_INSIGHT_LIMIT: i64 = 3;

/// Raw query-string inputs for the overview endpoint. Everything is optional;
/// parsing and validation happen inside [`build_overview`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverviewQuery {
    pub date_preset: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub comparison_mode: Option<String>,
    /// Comma-separated platform identifiers.
    pub platforms: Option<String>,
    /// Comma-separated account identifiers.
    pub accounts: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewResponse {
    pub spend: f64,
    pub revenue: f64,
    pub roas: f64,
    pub cpa: f64,
    pub ctr: f64,
    pub cpm: f64,
    pub cvr: f64,
    pub mer: f64,
    #[serde(serialize_with = "comparison_as_object")]
    pub comparison: Option<MetricChanges>,
    pub insights: Vec<Insight>,
}

// The wire contract is an empty object, not null, when no comparison period
// was requested.
fn comparison_as_object<S>(v: &Option<MetricChanges>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match v {
        Some(changes) => changes.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

/// Computes the full KPI overview for one workspace: resolves the date range,
/// sums the current (and optional comparison) period, derives ratio metrics
/// and period-over-period changes, and generates insights. Queries run
/// sequentially on the injected store with no transaction; a write landing
/// between them can skew the comparison, which is accepted for this
/// best-effort reporting path.
pub async fn build_overview<S: MetricsStore + ?Sized>(
    store: &S,
    workspace_id: Uuid,
    query: &OverviewQuery,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<OverviewResponse, OverviewError> {
    if !store.workspace_exists(workspace_id).await? {
        return Err(OverviewError::WorkspaceNotFound(workspace_id));
    }

    let range = resolve_range(
        query.date_preset.as_deref(),
        query.date_from.as_deref(),
        query.date_to.as_deref(),
        query.comparison_mode.as_deref(),
        today,
    )?;

    tracing::debug!(
        %workspace_id,
        start = %range.start,
        end = %range.end,
        comparison = ?range.comparison,
        "resolved overview range"
    );

    let filter = MetricFilter {
        platforms: parse_list(query.platforms.as_deref()),
        accounts: parse_list(query.accounts.as_deref()),
    };

    let current_totals = store
        .fetch_totals(workspace_id, range.start, range.end, &filter)
        .await?;
    let current = AggregateSnapshot::from_totals(current_totals);

    let changes = match range.comparison {
        None => None,
        Some((comp_start, comp_end)) => {
            let comp_totals = store
                .fetch_totals(workspace_id, comp_start, comp_end, &filter)
                .await?;
            let comparison = AggregateSnapshot::from_totals(comp_totals);
            Some(MetricChanges::between(&current, &comparison))
        }
    };

    let platform_snapshots: Vec<(String, AggregateSnapshot)> = store
        .fetch_platform_totals(workspace_id, range.start, range.end, &filter)
        .await?
        .into_iter()
        .map(|(platform, totals)| (platform, AggregateSnapshot::from_totals(totals)))
        .collect();

    let anomalies = store
        .fetch_unreviewed_anomalies(
            workspace_id,
            now - Duration::days(ANOMALY_LOOKBACK_DAYS),
            ANOMALY_INSIGHT_LIMIT,
        )
        .await?;

    let insights = generate_insights(
        workspace_id,
        changes.as_ref(),
        &platform_snapshots,
        &anomalies,
    );

    Ok(OverviewResponse {
        spend: current.spend,
        revenue: current.revenue,
        roas: current.roas,
        cpa: current.cpa,
        ctr: current.ctr,
        cpm: current.cpm,
        cvr: current.cvr,
        mer: current.mer,
        comparison: changes,
        insights,
    })
}

fn parse_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::insight::{AnomalyRecord, InsightKind, Severity};
    use crate::domain::metrics::RawTotals;
    use chrono::TimeZone;

    struct MetricRow {
        date: NaiveDate,
        platform: &'static str,
        account_id: &'static str,
        totals: RawTotals,
    }

    struct MemStore {
        workspaces: Vec<Uuid>,
        rows: Vec<MetricRow>,
        anomalies: Vec<AnomalyRecord>,
    }

    impl MemStore {
        fn with_rows(workspace_id: Uuid, rows: Vec<MetricRow>) -> Self {
            Self {
                workspaces: vec![workspace_id],
                rows,
                anomalies: Vec::new(),
            }
        }

        fn matching(&self, start: NaiveDate, end: NaiveDate, filter: &MetricFilter) -> Vec<&MetricRow> {
            self.rows
                .iter()
                .filter(|r| r.date >= start && r.date <= end)
                .filter(|r| {
                    filter.platforms.is_empty()
                        || filter.platforms.iter().any(|p| p == r.platform)
                })
                .filter(|r| {
                    filter.accounts.is_empty()
                        || filter.accounts.iter().any(|a| a == r.account_id)
                })
                .collect()
        }
    }

    fn sum(rows: &[&MetricRow]) -> RawTotals {
        rows.iter().fold(RawTotals::default(), |mut acc, r| {
            acc.spend += r.totals.spend;
            acc.revenue += r.totals.revenue;
            acc.impressions += r.totals.impressions;
            acc.clicks += r.totals.clicks;
            acc.conversions += r.totals.conversions;
            acc
        })
    }

    #[async_trait::async_trait]
    impl MetricsStore for MemStore {
        async fn workspace_exists(&self, workspace_id: Uuid) -> Result<bool, OverviewError> {
            Ok(self.workspaces.contains(&workspace_id))
        }

        async fn fetch_totals(
            &self,
            _workspace_id: Uuid,
            start: NaiveDate,
            end: NaiveDate,
            filter: &MetricFilter,
        ) -> Result<RawTotals, OverviewError> {
            Ok(sum(&self.matching(start, end, filter)))
        }

        async fn fetch_platform_totals(
            &self,
            _workspace_id: Uuid,
            start: NaiveDate,
            end: NaiveDate,
            filter: &MetricFilter,
        ) -> Result<Vec<(String, RawTotals)>, OverviewError> {
            let mut by_platform: std::collections::BTreeMap<&str, Vec<&MetricRow>> =
                std::collections::BTreeMap::new();
            for row in self.matching(start, end, filter) {
                by_platform.entry(row.platform).or_default().push(row);
            }
            Ok(by_platform
                .into_iter()
                .map(|(platform, rows)| (platform.to_string(), sum(&rows)))
                .collect())
        }

        async fn fetch_unreviewed_anomalies(
            &self,
            _workspace_id: Uuid,
            since: DateTime<Utc>,
            limit: i64,
        ) -> Result<Vec<AnomalyRecord>, OverviewError> {
            let mut out: Vec<AnomalyRecord> = self
                .anomalies
                .iter()
                .filter(|a| a.created_at >= since)
                .cloned()
                .collect();
            out.sort_by(|a, b| {
                b.severity
                    .cmp(&a.severity)
                    .then(b.created_at.cmp(&a.created_at))
            });
            out.truncate(limit as usize);
            Ok(out)
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn row(date: NaiveDate, platform: &'static str, totals: RawTotals) -> MetricRow {
        MetricRow {
            date,
            platform,
            account_id: "acct-1",
            totals,
        }
    }

    fn explicit_range(from: &str, to: &str) -> OverviewQuery {
        OverviewQuery {
            date_from: Some(from.to_string()),
            date_to: Some(to.to_string()),
            ..OverviewQuery::default()
        }
    }

    #[tokio::test]
    async fn unknown_workspace_is_not_found() {
        let ws = Uuid::new_v4();
        let store = MemStore::with_rows(ws, Vec::new());
        let err = build_overview(&store, Uuid::new_v4(), &OverviewQuery::default(), d(2026, 3, 15), now())
            .await
            .unwrap_err();
        assert!(matches!(err, OverviewError::WorkspaceNotFound(_)));
    }

    #[tokio::test]
    async fn empty_range_yields_all_zero_response() {
        let ws = Uuid::new_v4();
        let store = MemStore::with_rows(ws, Vec::new());
        let mut query = explicit_range("2026-03-01", "2026-03-10");
        query.comparison_mode = Some("vs_previous_period".to_string());

        let resp = build_overview(&store, ws, &query, d(2026, 3, 15), now())
            .await
            .unwrap();
        assert_eq!(resp.spend, 0.0);
        assert_eq!(resp.roas, 0.0);
        let changes = resp.comparison.unwrap();
        assert_eq!(changes, MetricChanges::default());
        assert!(resp.insights.is_empty());
    }

    #[tokio::test]
    async fn single_record_derives_expected_ratios() {
        let ws = Uuid::new_v4();
        let store = MemStore::with_rows(
            ws,
            vec![row(
                d(2026, 3, 5),
                "facebook",
                RawTotals {
                    spend: 100.0,
                    revenue: 300.0,
                    impressions: 1000,
                    clicks: 50,
                    conversions: 5,
                },
            )],
        );

        let resp = build_overview(&store, ws, &explicit_range("2026-03-01", "2026-03-10"), d(2026, 3, 15), now())
            .await
            .unwrap();
        assert_eq!(resp.spend, 100.0);
        assert_eq!(resp.revenue, 300.0);
        assert_eq!(resp.roas, 3.0);
        assert_eq!(resp.cpa, 20.0);
        assert_eq!(resp.ctr, 5.0);
        assert_eq!(resp.cpm, 100.0);
        assert_eq!(resp.cvr, 10.0);
        assert_eq!(resp.mer, 3.0);
    }

    #[tokio::test]
    async fn spend_increase_over_25_percent_emits_warning() {
        let ws = Uuid::new_v4();
        let store = MemStore::with_rows(
            ws,
            vec![
                row(
                    d(2026, 3, 5),
                    "facebook",
                    RawTotals {
                        spend: 260.0,
                        ..RawTotals::default()
                    },
                ),
                row(
                    d(2026, 2, 25),
                    "facebook",
                    RawTotals {
                        spend: 200.0,
                        ..RawTotals::default()
                    },
                ),
            ],
        );
        let mut query = explicit_range("2026-03-01", "2026-03-10");
        query.comparison_mode = Some("vs_previous_period".to_string());

        let resp = build_overview(&store, ws, &query, d(2026, 3, 15), now())
            .await
            .unwrap();
        assert_eq!(resp.comparison.unwrap().spend_change, 30.0);
        let spend_insights: Vec<_> = resp
            .insights
            .iter()
            .filter(|i| i.kind == InsightKind::PerformanceChange)
            .collect();
        assert_eq!(spend_insights.len(), 1);
        assert_eq!(spend_insights[0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn two_platforms_emit_leader_and_laggard() {
        let ws = Uuid::new_v4();
        let store = MemStore::with_rows(
            ws,
            vec![
                row(
                    d(2026, 3, 5),
                    "facebook",
                    RawTotals {
                        spend: 100.0,
                        revenue: 400.0,
                        ..RawTotals::default()
                    },
                ),
                row(
                    d(2026, 3, 6),
                    "tiktok",
                    RawTotals {
                        spend: 100.0,
                        revenue: 50.0,
                        ..RawTotals::default()
                    },
                ),
            ],
        );

        let resp = build_overview(&store, ws, &explicit_range("2026-03-01", "2026-03-10"), d(2026, 3, 15), now())
            .await
            .unwrap();
        let trends: Vec<_> = resp
            .insights
            .iter()
            .filter(|i| i.kind == InsightKind::Trend)
            .collect();
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].entity_id, "facebook");
        assert_eq!(trends[1].entity_id, "tiktok");
    }

    #[tokio::test]
    async fn platform_filter_restricts_aggregation() {
        let ws = Uuid::new_v4();
        let store = MemStore::with_rows(
            ws,
            vec![
                row(
                    d(2026, 3, 5),
                    "facebook",
                    RawTotals {
                        spend: 100.0,
                        ..RawTotals::default()
                    },
                ),
                row(
                    d(2026, 3, 6),
                    "google",
                    RawTotals {
                        spend: 40.0,
                        ..RawTotals::default()
                    },
                ),
            ],
        );
        let mut query = explicit_range("2026-03-01", "2026-03-10");
        query.platforms = Some("google, ,".to_string());

        let resp = build_overview(&store, ws, &query, d(2026, 3, 15), now())
            .await
            .unwrap();
        assert_eq!(resp.spend, 40.0);
    }

    #[tokio::test]
    async fn anomalies_cap_at_three_by_severity_then_recency() {
        let ws = Uuid::new_v4();
        let mut store = MemStore::with_rows(ws, Vec::new());
        let base = now();
        let mk = |id: &str, severity, hours_ago: i64| AnomalyRecord {
            entity_type: "campaign".to_string(),
            entity_id: id.to_string(),
            metric: "spend".to_string(),
            anomaly_type: "spike".to_string(),
            severity,
            current_value: 10.0,
            expected_value: 5.0,
            created_at: base - Duration::hours(hours_ago),
        };
        store.anomalies = vec![
            mk("a-info-old", Severity::Info, 48),
            mk("a-critical", Severity::Critical, 24),
            mk("a-warning-new", Severity::Warning, 1),
            mk("a-warning-old", Severity::Warning, 30),
        ];

        let resp = build_overview(&store, ws, &explicit_range("2026-03-01", "2026-03-10"), d(2026, 3, 15), now())
            .await
            .unwrap();
        let ids: Vec<&str> = resp
            .insights
            .iter()
            .filter(|i| i.kind == InsightKind::Anomaly)
            .map(|i| i.entity_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a-critical", "a-warning-new", "a-warning-old"]);
    }

    #[tokio::test]
    async fn anomalies_older_than_seven_days_are_ignored() {
        let ws = Uuid::new_v4();
        let mut store = MemStore::with_rows(ws, Vec::new());
        store.anomalies = vec![AnomalyRecord {
            entity_type: "campaign".to_string(),
            entity_id: "stale".to_string(),
            metric: "spend".to_string(),
            anomaly_type: "spike".to_string(),
            severity: Severity::Critical,
            current_value: 10.0,
            expected_value: 5.0,
            created_at: now() - Duration::days(8),
        }];

        let resp = build_overview(&store, ws, &explicit_range("2026-03-01", "2026-03-10"), d(2026, 3, 15), now())
            .await
            .unwrap();
        assert!(resp.insights.is_empty());
    }

    #[tokio::test]
    async fn missing_comparison_serializes_as_empty_object() {
        let ws = Uuid::new_v4();
        let store = MemStore::with_rows(ws, Vec::new());
        let resp = build_overview(&store, ws, &explicit_range("2026-03-01", "2026-03-10"), d(2026, 3, 15), now())
            .await
            .unwrap();

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["comparison"], serde_json::json!({}));
        assert!(json["spend"].is_number());
    }
}
