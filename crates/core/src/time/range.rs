use crate::error::OverviewError;
use chrono::{Datelike, Duration, NaiveDate};

const DEFAULT_PRESET_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
    Last90Days,
}

impl DatePreset {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "today" => Some(Self::Today),
            "yesterday" => Some(Self::Yesterday),
            "last_7_days" => Some(Self::Last7Days),
            "last_30_days" => Some(Self::Last30Days),
            "last_90_days" => Some(Self::Last90Days),
            _ => None,
        }
    }

    fn bounds(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::Today => (today, today),
            Self::Yesterday => {
                let d = today - Duration::days(1);
                (d, d)
            }
            Self::Last7Days => (today - Duration::days(6), today),
            Self::Last30Days => (today - Duration::days(29), today),
            Self::Last90Days => (today - Duration::days(89), today),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonMode {
    VsPreviousPeriod,
    VsSamePeriodLastYear,
}

impl ComparisonMode {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "vs_previous_period" => Some(Self::VsPreviousPeriod),
            "vs_same_period_last_year" => Some(Self::VsSamePeriodLastYear),
            _ => None,
        }
    }
}

/// Inclusive date bounds for the primary window and, when a comparison mode
/// was requested, the comparison window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub comparison: Option<(NaiveDate, NaiveDate)>,
}

/// Turns raw query inputs into concrete calendar dates.
///
/// A preset wins over explicit dates; no preset and no dates defaults to the
/// trailing 30-day window ending on `today`. Presets resolve against the
/// server's local calendar day — per-workspace timezones are deliberately not
/// consulted here because that would change reported numbers.
pub fn resolve_range(
    preset: Option<&str>,
    date_from: Option<&str>,
    date_to: Option<&str>,
    comparison_mode: Option<&str>,
    today: NaiveDate,
) -> Result<ResolvedRange, OverviewError> {
    let (start, end) = match preset {
        Some(s) => DatePreset::parse(s)
            .ok_or_else(|| {
                OverviewError::validation("invalid_preset", format!("unknown date_preset: {s}"))
            })?
            .bounds(today),
        None => match (date_from, date_to) {
            (Some(from), Some(to)) => (parse_date(from)?, parse_date(to)?),
            (None, None) => {
                let start = today - Duration::days(DEFAULT_PRESET_DAYS - 1);
                (start, today)
            }
            _ => {
                return Err(OverviewError::validation(
                    "invalid_range",
                    "date_from and date_to must be provided together",
                ))
            }
        },
    };

    if start > end {
        return Err(OverviewError::validation(
            "invalid_range",
            format!("date_from {start} is after date_to {end}"),
        ));
    }

    let comparison = match comparison_mode {
        None => None,
        Some(s) => {
            let mode = ComparisonMode::parse(s).ok_or_else(|| {
                OverviewError::validation(
                    "invalid_comparison_mode",
                    format!("unknown comparison_mode: {s}"),
                )
            })?;
            Some(comparison_bounds(mode, start, end))
        }
    };

    Ok(ResolvedRange {
        start,
        end,
        comparison,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, OverviewError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        OverviewError::validation("invalid_date", format!("malformed date: {s} (want YYYY-MM-DD)"))
    })
}

fn comparison_bounds(
    mode: ComparisonMode,
    start: NaiveDate,
    end: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    match mode {
        ComparisonMode::VsPreviousPeriod => {
            let days = (end - start).num_days();
            let comp_end = start - Duration::days(1);
            (comp_end - Duration::days(days), comp_end)
        }
        ComparisonMode::VsSamePeriodLastYear => {
            (shift_back_one_year(start), shift_back_one_year(end))
        }
    }
}

// Calendar-aware year shift. Feb 29 clamps to Feb 28 when the target year is
// not a leap year.
fn shift_back_one_year(date: NaiveDate) -> NaiveDate {
    let year = date.year() - 1;
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, 2, 28).expect("Feb 28 is always valid"))
}
