use chrono::{NaiveDate, NaiveDateTime};

use crate::record::EPOCHS;

/// Day-first formats tried in order. ISO dates are unambiguous and accepted as well.
const DATE_FORMATS: [&str; 5] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parses a free-form date string, day-first. Unparseable input yields `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Day counts between consecutive survey epochs.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemporalFeaturizer;

impl TemporalFeaturizer {
    pub fn new() -> Self {
        Self
    }

    /// `delta[i] = date[i + 1] - date[i]` in whole days; NaN when either date is missing
    /// or unparseable.
    pub fn deltas(&self, dates: &[Option<String>; EPOCHS]) -> [f64; EPOCHS - 1] {
        let parsed: [Option<NaiveDate>; EPOCHS] =
            std::array::from_fn(|i| dates[i].as_deref().and_then(parse_date));
        std::array::from_fn(|i| match (parsed[i], parsed[i + 1]) {
            (Some(from), Some(to)) => (to - from).num_days() as f64,
            _ => f64::NAN,
        })
    }

    /// Number of dates that were present but could not be parsed.
    pub fn unparseable(&self, dates: &[Option<String>; EPOCHS]) -> usize {
        dates
            .iter()
            .flatten()
            .filter(|raw| parse_date(raw).is_none())
            .count()
    }
}
