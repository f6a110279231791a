//! Time windows and sighting filter predicates.
//!
//! Year and month filters arrive as raw strings from the CLI. Anything that
//! does not parse into a real calendar window falls back to
//! [`TimeWindow::All`] instead of failing the request.

use std::collections::BTreeSet;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::model::{BirdId, LocationId, TripId};

/// The calendar span a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeWindow {
    /// Every sighting ever recorded.
    #[default]
    All,
    /// One calendar year.
    Year {
        /// The year.
        year: i32,
    },
    /// One calendar month.
    Month {
        /// The year.
        year: i32,
        /// The month, 1 through 12.
        month: u32,
    },
}

impl TimeWindow {
    /// Parse optional year and month inputs.
    ///
    /// - year and month both valid: a month window
    /// - year valid, month absent: a year window
    /// - anything else (unparseable year, month outside 1..=12, month
    ///   without a year): no filter
    #[must_use]
    pub fn parse(year: Option<&str>, month: Option<&str>) -> Self {
        let Some(year) = year.and_then(parse_year) else {
            return Self::All;
        };
        match month.map(str::trim).filter(|m| !m.is_empty()) {
            None => Self::Year { year },
            Some(raw) => match raw.parse::<u32>() {
                Ok(month) if (1..=12).contains(&month) => Self::Month { year, month },
                _ => Self::All,
            },
        }
    }

    /// Parse a year-only input, falling back to no filter.
    #[must_use]
    pub fn parse_year(year: Option<&str>) -> Self {
        Self::parse(year, None)
    }

    /// First day inside the window, `None` for [`TimeWindow::All`].
    #[must_use]
    pub fn start(&self) -> Option<NaiveDate> {
        match *self {
            Self::All => None,
            Self::Year { year } => NaiveDate::from_ymd_opt(year, 1, 1),
            Self::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1),
        }
    }

    /// First day after the window, `None` for [`TimeWindow::All`].
    #[must_use]
    pub fn end_exclusive(&self) -> Option<NaiveDate> {
        let start = self.start()?;
        match self {
            Self::All => None,
            Self::Year { .. } => start.checked_add_months(Months::new(12)),
            Self::Month { .. } => start.checked_add_months(Months::new(1)),
        }
    }

    /// Whether `date` falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            Self::All => true,
            Self::Year { year } => date.year() == year,
            Self::Month { year, month } => date.year() == year && date.month() == month,
        }
    }

    /// The window's year, if any.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        match *self {
            Self::All => None,
            Self::Year { year } | Self::Month { year, .. } => Some(year),
        }
    }

    /// English month name for a month window.
    #[must_use]
    pub fn month_name(&self) -> Option<&'static str> {
        match *self {
            Self::Month { month, .. } => month_name(month),
            _ => None,
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::All => write!(f, "all time"),
            Self::Year { year } => write!(f, "{year}"),
            Self::Month { year, month } => match month_name(month) {
                Some(name) => write!(f, "{name} {year}"),
                None => write!(f, "{year}-{month:02}"),
            },
        }
    }
}

/// English name for a month number.
#[must_use]
pub fn month_name(month: u32) -> Option<&'static str> {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    NAMES.get(index).copied()
}

fn parse_year(raw: &str) -> Option<i32> {
    let year = raw.trim().parse::<i32>().ok()?;
    // Must be representable as a calendar date.
    NaiveDate::from_ymd_opt(year, 1, 1).map(|_| year)
}

/// Predicates applied by the record store when selecting sightings.
///
/// All set predicates must hold; an empty filter selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SightingFilter {
    /// Calendar window on `date_seen`.
    pub window: TimeWindow,
    /// Only sightings dated strictly before this day.
    pub before: Option<NaiveDate>,
    /// Only sightings at one of these locations.
    pub location_ids: Option<BTreeSet<LocationId>>,
    /// Only sightings on this trip.
    pub trip_id: Option<TripId>,
    /// Only sightings of this bird.
    pub bird_id: Option<BirdId>,
    /// Only sightings on exactly this day.
    pub on: Option<NaiveDate>,
}

impl SightingFilter {
    /// Select every sighting.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Select sightings inside a calendar window.
    #[must_use]
    pub fn window(window: TimeWindow) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    /// Select sightings dated strictly before `date`.
    #[must_use]
    pub fn before(date: NaiveDate) -> Self {
        Self {
            before: Some(date),
            ..Self::default()
        }
    }

    /// Restrict to a set of locations.
    #[must_use]
    pub fn at_locations(mut self, ids: BTreeSet<LocationId>) -> Self {
        self.location_ids = Some(ids);
        self
    }

    /// Restrict to one trip.
    #[must_use]
    pub fn on_trip(mut self, trip_id: TripId) -> Self {
        self.trip_id = Some(trip_id);
        self
    }

    /// Restrict to one bird.
    #[must_use]
    pub fn of_bird(mut self, bird_id: BirdId) -> Self {
        self.bird_id = Some(bird_id);
        self
    }

    /// Restrict to a single day.
    #[must_use]
    pub fn on_day(mut self, date: NaiveDate) -> Self {
        self.on = Some(date);
        self
    }

    /// Evaluate the filter in memory.
    #[must_use]
    pub fn matches(&self, sighting: &crate::model::Sighting) -> bool {
        self.window.contains(sighting.date_seen)
            && self.before.map_or(true, |d| sighting.date_seen < d)
            && self.on.map_or(true, |d| sighting.date_seen == d)
            && self
                .location_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&sighting.location_id))
            && self.trip_id.map_or(true, |t| sighting.trip_id == Some(t))
            && self.bird_id.map_or(true, |b| sighting.bird_id == b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Sighting, SightingId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_year_and_month() {
        assert_eq!(
            TimeWindow::parse(Some("2023"), Some("6")),
            TimeWindow::Month {
                year: 2023,
                month: 6
            }
        );
        assert_eq!(
            TimeWindow::parse(Some("2023"), None),
            TimeWindow::Year { year: 2023 }
        );
        assert_eq!(
            TimeWindow::parse(Some(" 2023 "), Some("")),
            TimeWindow::Year { year: 2023 }
        );
    }

    #[test]
    fn test_parse_invalid_inputs_fall_back_to_all() {
        assert_eq!(TimeWindow::parse(None, None), TimeWindow::All);
        assert_eq!(TimeWindow::parse(Some("abc"), None), TimeWindow::All);
        assert_eq!(TimeWindow::parse(Some("2023"), Some("13")), TimeWindow::All);
        assert_eq!(TimeWindow::parse(Some("2023"), Some("0")), TimeWindow::All);
        assert_eq!(TimeWindow::parse(Some("2023"), Some("may")), TimeWindow::All);
        assert_eq!(TimeWindow::parse(None, Some("5")), TimeWindow::All);
        assert_eq!(TimeWindow::parse(Some("999999999"), None), TimeWindow::All);
    }

    #[test]
    fn test_window_bounds() {
        let year = TimeWindow::Year { year: 2023 };
        assert_eq!(year.start(), Some(date(2023, 1, 1)));
        assert_eq!(year.end_exclusive(), Some(date(2024, 1, 1)));

        let dec = TimeWindow::Month {
            year: 2023,
            month: 12,
        };
        assert_eq!(dec.start(), Some(date(2023, 12, 1)));
        assert_eq!(dec.end_exclusive(), Some(date(2024, 1, 1)));

        assert_eq!(TimeWindow::All.start(), None);
        assert_eq!(TimeWindow::All.end_exclusive(), None);
    }

    #[test]
    fn test_window_contains() {
        let feb = TimeWindow::Month {
            year: 2024,
            month: 2,
        };
        assert!(feb.contains(date(2024, 2, 29)));
        assert!(!feb.contains(date(2024, 3, 1)));
        assert!(!feb.contains(date(2023, 2, 1)));
        assert!(TimeWindow::All.contains(date(1900, 1, 1)));
    }

    #[test]
    fn test_window_display() {
        assert_eq!(TimeWindow::All.to_string(), "all time");
        assert_eq!(TimeWindow::Year { year: 2022 }.to_string(), "2022");
        assert_eq!(
            TimeWindow::Month {
                year: 2022,
                month: 3
            }
            .to_string(),
            "March 2022"
        );
    }

    #[test]
    fn test_month_name_bounds() {
        assert_eq!(month_name(1), Some("January"));
        assert_eq!(month_name(12), Some("December"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }

    #[test]
    fn test_filter_matches_in_memory() {
        let sighting = Sighting {
            id: SightingId(1),
            bird_id: BirdId(3),
            location_id: LocationId(5),
            trip_id: Some(TripId(9)),
            date_seen: date(2023, 4, 10),
            heard_not_seen: false,
            count: 1,
            notes: String::new(),
        };

        assert!(SightingFilter::all().matches(&sighting));
        assert!(SightingFilter::window(TimeWindow::Year { year: 2023 }).matches(&sighting));
        assert!(!SightingFilter::before(date(2023, 4, 10)).matches(&sighting));
        assert!(SightingFilter::before(date(2023, 4, 11)).matches(&sighting));
        assert!(SightingFilter::all().on_trip(TripId(9)).matches(&sighting));
        assert!(!SightingFilter::all().of_bird(BirdId(4)).matches(&sighting));
        assert!(!SightingFilter::all()
            .at_locations(BTreeSet::from([LocationId(6)]))
            .matches(&sighting));
    }
}
