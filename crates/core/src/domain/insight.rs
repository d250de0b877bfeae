use crate::domain::metrics::{AggregateSnapshot, MetricChanges};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SPEND_CHANGE_THRESHOLD: f64 = 10.0;
const SPEND_CHANGE_WARNING_THRESHOLD: f64 = 25.0;
const ROAS_CHANGE_THRESHOLD: f64 = 15.0;
const UNDERPERFORMING_ROAS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    PerformanceChange,
    Trend,
    Anomaly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// A generated human-readable observation surfaced alongside raw metrics.
/// Ephemeral: built per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub message: String,
    pub severity: Severity,
    pub entity_type: String,
    pub entity_id: String,
}

/// Pre-existing anomaly detection output, consumed read-only to surface
/// recent unreviewed anomalies.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRecord {
    pub entity_type: String,
    pub entity_id: String,
    pub metric: String,
    pub anomaly_type: String,
    pub severity: Severity,
    pub current_value: f64,
    pub expected_value: f64,
    pub created_at: DateTime<Utc>,
}

/// Applies the insight rules in order. Rules are independent; any subset may
/// fire. Thresholds are strict, so boundary values never trigger.
pub fn generate_insights(
    workspace_id: Uuid,
    changes: Option<&MetricChanges>,
    platform_snapshots: &[(String, AggregateSnapshot)],
    anomalies: &[AnomalyRecord],
) -> Vec<Insight> {
    let mut out = Vec::new();

    if let Some(changes) = changes {
        if changes.spend_change.abs() > SPEND_CHANGE_THRESHOLD {
            let severity = if changes.spend_change.abs() > SPEND_CHANGE_WARNING_THRESHOLD {
                Severity::Warning
            } else {
                Severity::Info
            };
            let direction = if changes.spend_change > 0.0 {
                "increased"
            } else {
                "decreased"
            };
            out.push(Insight {
                kind: InsightKind::PerformanceChange,
                message: format!(
                    "Spend {direction} {:.2}% versus the comparison period",
                    changes.spend_change.abs()
                ),
                severity,
                entity_type: "workspace".to_string(),
                entity_id: workspace_id.to_string(),
            });
        }

        if changes.roas_change.abs() > ROAS_CHANGE_THRESHOLD {
            let (severity, direction) = if changes.roas_change < -ROAS_CHANGE_THRESHOLD {
                (Severity::Critical, "dropped")
            } else {
                (Severity::Info, "improved")
            };
            out.push(Insight {
                kind: InsightKind::PerformanceChange,
                message: format!(
                    "ROAS {direction} {:.2}% versus the comparison period",
                    changes.roas_change.abs()
                ),
                severity,
                entity_type: "workspace".to_string(),
                entity_id: workspace_id.to_string(),
            });
        }
    }

    out.extend(platform_insights(platform_snapshots));

    for a in anomalies {
        out.push(Insight {
            kind: InsightKind::Anomaly,
            message: format!(
                "Unreviewed {} anomaly in {}: current {:.2}, expected {:.2}",
                a.anomaly_type, a.metric, a.current_value, a.expected_value
            ),
            severity: a.severity,
            entity_type: a.entity_type.clone(),
            entity_id: a.entity_id.clone(),
        });
    }

    out
}

// Leader/laggard over per-platform snapshots with spend. Fires only when at
// least two platforms qualify.
fn platform_insights(platform_snapshots: &[(String, AggregateSnapshot)]) -> Vec<Insight> {
    let mut qualifying: Vec<&(String, AggregateSnapshot)> = platform_snapshots
        .iter()
        .filter(|(_, snap)| snap.spend > 0.0)
        .collect();
    if qualifying.len() < 2 {
        return Vec::new();
    }
    qualifying.sort_by(|a, b| b.1.roas.total_cmp(&a.1.roas));

    let mut out = Vec::new();

    let (leader, leader_snap) = qualifying[0];
    out.push(Insight {
        kind: InsightKind::Trend,
        message: format!(
            "{leader} delivered the highest ROAS ({:.2}) across platforms in this period",
            leader_snap.roas
        ),
        severity: Severity::Info,
        entity_type: "platform".to_string(),
        entity_id: leader.clone(),
    });

    let (laggard, laggard_snap) = qualifying[qualifying.len() - 1];
    if laggard_snap.roas < UNDERPERFORMING_ROAS {
        out.push(Insight {
            kind: InsightKind::Trend,
            message: format!(
                "{laggard} is underperforming with ROAS {:.2}",
                laggard_snap.roas
            ),
            severity: Severity::Warning,
            entity_type: "platform".to_string(),
            entity_id: laggard.clone(),
        });
    }

    out
}
