//! Epidemic curve: outbreak counts per day, week or month

use chrono::{Datelike, Days, Months, NaiveDate};
use layerstore::FeatureStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::{AnalysisError, layer_with_fields};

/// Width of one epicurve bin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Day,
    /// Monday to Sunday
    Week,
    Month,
}

impl TimeUnit {
    /// First day of the bin containing `date`
    pub fn bin_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            TimeUnit::Day => date,
            TimeUnit::Week => date - Days::new(u64::from(date.weekday().num_days_from_monday())),
            TimeUnit::Month => date.with_day(1).unwrap_or(date),
        }
    }

    /// First day of the bin after the one starting at `start`
    fn next_start(&self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            TimeUnit::Day => start.checked_add_days(Days::new(1)),
            TimeUnit::Week => start.checked_add_days(Days::new(7)),
            TimeUnit::Month => start.checked_add_months(Months::new(1)),
        }
    }

    /// Number of bins from the one starting at `first` to the one starting at `last`, inclusive
    fn bins_spanned(&self, first: NaiveDate, last: NaiveDate) -> usize {
        let span = match self {
            TimeUnit::Day => (last - first).num_days(),
            TimeUnit::Week => (last - first).num_days() / 7,
            TimeUnit::Month => {
                i64::from(last.year() - first.year()) * 12 + i64::from(last.month()) - i64::from(first.month())
            }
        };
        usize::try_from(span).map_or(0, |n| n.saturating_add(1))
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Day => write!(f, "day"),
            TimeUnit::Week => write!(f, "week"),
            TimeUnit::Month => write!(f, "month"),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "d" => Ok(TimeUnit::Day),
            "week" | "w" => Ok(TimeUnit::Week),
            "month" | "m" => Ok(TimeUnit::Month),
            _ => Err(AnalysisError::UnknownTimeUnit(s.to_string())),
        }
    }
}

/// Outbreaks whose date falls in `start..=end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EpiBin {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpiCurve {
    pub unit: TimeUnit,
    pub bins: Vec<EpiBin>,
    /// Features with a null or unparseable date
    pub skipped: usize,
}

impl EpiCurve {
    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }

    /// Bin with the most outbreaks (earliest on ties)
    pub fn peak(&self) -> Option<&EpiBin> {
        self.bins
            .iter()
            .rev()
            .max_by_key(|b| b.count)
    }
}

/// Upper bound on the number of bins in one curve
pub const MAX_BINS: usize = 10_000;

/// Count dates per bin. Bins run contiguously from the earliest to the latest
/// date, so quiet periods show up as zero counts. More than [`MAX_BINS`] bins is
/// an error; a mistyped year usually causes it.
pub fn bin_dates(dates: &[NaiveDate], unit: TimeUnit) -> Result<Vec<EpiBin>, AnalysisError> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in dates {
        *counts.entry(unit.bin_start(*date)).or_default() += 1;
    }
    let (Some(first), Some(last)) = (counts.keys().next().copied(), counts.keys().next_back().copied()) else {
        return Ok(Vec::new());
    };
    let needed = unit.bins_spanned(first, last);
    if needed > MAX_BINS {
        return Err(AnalysisError::TooManyBins {
            unit,
            first,
            last,
            bins: needed,
            limit: MAX_BINS,
        });
    }

    let mut bins = Vec::with_capacity(needed);
    let mut start = first;
    while start <= last {
        let next = unit.next_start(start);
        let end = next.and_then(|n| n.pred_opt()).unwrap_or(start);
        bins.push(EpiBin {
            start,
            end,
            count: counts.get(&start).copied().unwrap_or(0),
        });
        match next {
            Some(next) => start = next,
            None => break,
        }
    }
    Ok(bins)
}

/// Epidemic curve of `layer` using the dates in `date_field`
pub fn epicurve(
    store: &dyn FeatureStore,
    layer: &str,
    date_field: &str,
    unit: TimeUnit,
) -> Result<EpiCurve, AnalysisError> {
    debug!(%layer, %date_field, %unit, "epicurve: called");
    layer_with_fields(store, layer, &[date_field])?;

    let mut dates = Vec::new();
    let mut skipped = 0;
    for feature in store.features(layer)? {
        match feature.get(date_field).as_timestamp() {
            Some(ts) => dates.push(ts.date()),
            None => skipped += 1,
        }
    }
    if dates.is_empty() {
        return Err(AnalysisError::NoDates {
            layer: layer.to_string(),
            field: date_field.to_string(),
        });
    }
    if skipped > 0 {
        warn!(%layer, %date_field, skipped, "Skipped features without a usable date");
    }

    let bins = bin_dates(&dates, unit)?;
    info!(%layer, bins = bins.len(), dated = dates.len(), "Built epidemic curve");
    Ok(EpiCurve { unit, bins, skipped })
}
