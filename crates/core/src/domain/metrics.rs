use serde::{Deserialize, Serialize};

/// Raw counters summed over a filtered set of daily metric rows. These are
/// additive across any grouping; ratio metrics are not and must always be
/// recomputed from these sums.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawTotals {
    pub spend: f64,
    pub revenue: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
}

/// Summed counters plus derived ratio metrics for one period, all ratios
/// rounded to 2 decimal places and 0 when the denominator is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub spend: f64,
    pub revenue: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub roas: f64,
    pub cpa: f64,
    pub ctr: f64,
    pub cpm: f64,
    pub cvr: f64,
    pub mer: f64,
}

impl AggregateSnapshot {
    pub fn from_totals(t: RawTotals) -> Self {
        let impressions = t.impressions as f64;
        let clicks = t.clicks as f64;
        let conversions = t.conversions as f64;

        let roas = ratio(t.revenue, t.spend, 1.0);
        // MER is defined identically to ROAS at the snapshot level; it is kept
        // as a separate field because callers consume it under its own name.
        let mer = ratio(t.revenue, t.spend, 1.0);

        Self {
            spend: t.spend,
            revenue: t.revenue,
            impressions: t.impressions,
            clicks: t.clicks,
            conversions: t.conversions,
            roas,
            cpa: ratio(t.spend, conversions, 1.0),
            ctr: ratio(clicks, impressions, 100.0),
            cpm: ratio(t.spend, impressions, 1000.0),
            cvr: ratio(conversions, clicks, 100.0),
            mer,
        }
    }
}

/// Percentage change of each metric between a current and a comparison
/// snapshot. A zero comparison value reports 0 rather than a division error;
/// callers cannot distinguish "no prior data" from "no change".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricChanges {
    pub spend_change: f64,
    pub revenue_change: f64,
    pub roas_change: f64,
    pub cpa_change: f64,
    pub ctr_change: f64,
    pub cpm_change: f64,
    pub cvr_change: f64,
    pub mer_change: f64,
}

impl MetricChanges {
    pub fn between(current: &AggregateSnapshot, comparison: &AggregateSnapshot) -> Self {
        Self {
            spend_change: pct_change(current.spend, comparison.spend),
            revenue_change: pct_change(current.revenue, comparison.revenue),
            roas_change: pct_change(current.roas, comparison.roas),
            cpa_change: pct_change(current.cpa, comparison.cpa),
            ctr_change: pct_change(current.ctr, comparison.ctr),
            cpm_change: pct_change(current.cpm, comparison.cpm),
            cvr_change: pct_change(current.cvr, comparison.cvr),
            mer_change: pct_change(current.mer, comparison.mer),
        }
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn pct_change(current: f64, comparison: f64) -> f64 {
    if comparison > 0.0 {
        round2((current - comparison) / comparison * 100.0)
    } else {
        0.0
    }
}

fn ratio(numerator: f64, denominator: f64, scale: f64) -> f64 {
    if denominator > 0.0 {
        round2(numerator * scale / denominator)
    } else {
        0.0
    }
}
