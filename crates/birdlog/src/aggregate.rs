//! Per-species and per-period statistics over a set of sightings.
//!
//! Every function here is filter-agnostic: callers select the sightings
//! (by window, location set, trip, bird) and the aggregator only groups
//! and counts. Nothing is cached; results are recomputed per call.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::filter::month_name;
use crate::model::{BirdId, Sighting, SightingId};

/// Statistics for one species inside a set of sightings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpeciesSummary {
    /// Earliest `date_seen`.
    pub first_seen: NaiveDate,
    /// Latest `date_seen`.
    pub last_seen: NaiveDate,
    /// Number of sighting records.
    pub count: usize,
    /// Sum of the individuals reported across those records.
    pub individuals: u64,
    /// The sighting on `first_seen`; lowest id wins a same-day tie.
    pub first_sighting: SightingId,
    /// The sighting on `last_seen`; highest id wins a same-day tie.
    pub last_sighting: SightingId,
}

impl SpeciesSummary {
    fn from_sighting(s: &Sighting) -> Self {
        Self {
            first_seen: s.date_seen,
            last_seen: s.date_seen,
            count: 1,
            individuals: u64::from(s.count),
            first_sighting: s.id,
            last_sighting: s.id,
        }
    }

    fn absorb(&mut self, s: &Sighting) {
        self.count += 1;
        self.individuals = self.individuals.saturating_add(u64::from(s.count));

        if (s.date_seen, s.id) < (self.first_seen, self.first_sighting) {
            self.first_seen = s.date_seen;
            self.first_sighting = s.id;
        }
        if (s.date_seen, s.id) > (self.last_seen, self.last_sighting) {
            self.last_seen = s.date_seen;
            self.last_sighting = s.id;
        }
    }

    /// Whether every sighting of the species fell on a single day.
    #[must_use]
    pub fn seen_on_single_day(&self) -> bool {
        self.first_seen == self.last_seen
    }
}

/// Group sightings by bird and compute first/last dates and counts.
///
/// Empty input gives an empty map.
#[must_use]
pub fn species_summary(sightings: &[Sighting]) -> BTreeMap<BirdId, SpeciesSummary> {
    let mut summary: BTreeMap<BirdId, SpeciesSummary> = BTreeMap::new();
    for s in sightings {
        summary
            .entry(s.bird_id)
            .and_modify(|entry| entry.absorb(s))
            .or_insert_with(|| SpeciesSummary::from_sighting(s));
    }
    summary
}

/// The distinct birds in a set of sightings.
#[must_use]
pub fn species_set(sightings: &[Sighting]) -> BTreeSet<BirdId> {
    sightings.iter().map(|s| s.bird_id).collect()
}

/// Number of distinct birds in a set of sightings.
#[must_use]
pub fn distinct_species(sightings: &[Sighting]) -> usize {
    sightings
        .iter()
        .map(|s| s.bird_id)
        .collect::<HashSet<_>>()
        .len()
}

/// How many species in `current` never appear in `prior`.
///
/// `prior` is expected to hold every sighting dated before the current
/// window starts, which makes the result the number of life-list additions.
#[must_use]
pub fn new_species_delta(current: &[Sighting], prior: &[Sighting]) -> usize {
    let before: HashSet<BirdId> = prior.iter().map(|s| s.bird_id).collect();
    species_set(current)
        .into_iter()
        .filter(|bird| !before.contains(bird))
        .count()
}

/// Most recently seen first; ties go to the lower bird id.
#[must_use]
pub fn order_by_recency(
    summary: BTreeMap<BirdId, SpeciesSummary>,
) -> Vec<(BirdId, SpeciesSummary)> {
    let mut ordered: Vec<_> = summary.into_iter().collect();
    // The map iterates in bird-id order and the sort is stable.
    ordered.sort_by(|a, b| b.1.last_seen.cmp(&a.1.last_seen));
    ordered
}

/// Bucket size for [`period_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Calendar years.
    Year,
    /// Calendar months.
    Month,
}

/// A calendar bucket. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum PeriodKey {
    /// A whole year.
    Year {
        /// The year.
        year: i32,
    },
    /// One month of one year.
    Month {
        /// The year.
        year: i32,
        /// The month, 1 through 12.
        month: u32,
    },
}

impl PeriodKey {
    fn of(date: NaiveDate, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Year => Self::Year { year: date.year() },
            Granularity::Month => Self::Month {
                year: date.year(),
                month: date.month(),
            },
        }
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Year { year } => write!(f, "{year}"),
            Self::Month { year, month } => write!(f, "{year}-{month:02}"),
        }
    }
}

/// Sighting and species counts for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodStats {
    /// The period.
    pub period: PeriodKey,
    /// Number of sighting records in the period.
    pub sighting_count: usize,
    /// Number of distinct species in the period.
    pub species_count: usize,
}

/// Which periods have sightings, newest period first.
#[must_use]
pub fn period_index(sightings: &[Sighting], granularity: Granularity) -> Vec<PeriodStats> {
    let mut buckets: BTreeMap<PeriodKey, (usize, HashSet<BirdId>)> = BTreeMap::new();
    for s in sightings {
        let (count, birds) = buckets
            .entry(PeriodKey::of(s.date_seen, granularity))
            .or_default();
        *count += 1;
        birds.insert(s.bird_id);
    }

    buckets
        .into_iter()
        .rev()
        .map(|(period, (sighting_count, birds))| PeriodStats {
            period,
            sighting_count,
            species_count: birds.len(),
        })
        .collect()
}

/// Counts for one month inside a [`YearIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthStats {
    /// The month, 1 through 12.
    pub month: u32,
    /// English month name.
    pub month_name: &'static str,
    /// Number of sighting records in the month.
    pub sighting_count: usize,
    /// Number of distinct species in the month.
    pub species_count: usize,
}

/// A year and the months inside it that have sightings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearIndex {
    /// The year.
    pub year: i32,
    /// Sighting records across the whole year.
    pub sighting_count: usize,
    /// Distinct species across the whole year (not the sum of the months).
    pub species_count: usize,
    /// Months with sightings, newest first.
    pub months: Vec<MonthStats>,
}

/// Two-level year/month navigation index, newest first at both levels.
#[must_use]
pub fn month_index(sightings: &[Sighting]) -> Vec<YearIndex> {
    let years = period_index(sightings, Granularity::Year);
    let months = period_index(sightings, Granularity::Month);

    years
        .into_iter()
        .filter_map(|y| match y.period {
            PeriodKey::Year { year } => Some(YearIndex {
                year,
                sighting_count: y.sighting_count,
                species_count: y.species_count,
                months: months
                    .iter()
                    .filter_map(|m| match m.period {
                        PeriodKey::Month { year: my, month } if my == year => Some(MonthStats {
                            month,
                            month_name: month_name(month).unwrap_or_default(),
                            sighting_count: m.sighting_count,
                            species_count: m.species_count,
                        }),
                        _ => None,
                    })
                    .collect(),
            }),
            PeriodKey::Month { .. } => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocationId;

    const ROBIN: BirdId = BirdId(1);
    const SPARROW: BirdId = BirdId(2);
    const WREN: BirdId = BirdId(3);

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sighting(id: i64, bird: BirdId, seen: NaiveDate) -> Sighting {
        Sighting {
            id: SightingId(id),
            bird_id: bird,
            location_id: LocationId(1),
            trip_id: None,
            date_seen: seen,
            heard_not_seen: false,
            count: 1,
            notes: String::new(),
        }
    }

    #[test]
    fn test_species_summary_scenario() {
        let sightings = vec![
            sighting(1, ROBIN, date(2023, 1, 5)),
            sighting(2, ROBIN, date(2023, 6, 1)),
            sighting(3, SPARROW, date(2023, 3, 1)),
        ];
        let summary = species_summary(&sightings);

        assert_eq!(summary.len(), 2);
        let robin = summary[&ROBIN];
        assert_eq!(robin.first_seen, date(2023, 1, 5));
        assert_eq!(robin.last_seen, date(2023, 6, 1));
        assert_eq!(robin.count, 2);

        let sparrow = summary[&SPARROW];
        assert_eq!(sparrow.first_seen, date(2023, 3, 1));
        assert_eq!(sparrow.last_seen, date(2023, 3, 1));
        assert_eq!(sparrow.count, 1);
        assert!(sparrow.seen_on_single_day());
    }

    #[test]
    fn test_species_summary_empty() {
        assert!(species_summary(&[]).is_empty());
    }

    #[test]
    fn test_species_summary_invariants() {
        let sightings: Vec<Sighting> = (0..40)
            .map(|i| {
                let bird = BirdId(i % 7);
                let day = u32::try_from(i % 28).unwrap() + 1;
                sighting(i, bird, date(2020 + i32::try_from(i % 3).unwrap(), 5, day))
            })
            .collect();

        for entry in species_summary(&sightings).values() {
            assert!(entry.first_seen <= entry.last_seen);
            assert!(entry.count >= 1);
        }
    }

    #[test]
    fn test_species_summary_tie_break_by_sighting_id() {
        let day = date(2023, 4, 4);
        let sightings = vec![
            sighting(9, ROBIN, day),
            sighting(4, ROBIN, day),
            sighting(6, ROBIN, day),
        ];
        let robin = species_summary(&sightings)[&ROBIN];
        assert_eq!(robin.first_sighting, SightingId(4));
        assert_eq!(robin.last_sighting, SightingId(9));
    }

    #[test]
    fn test_individuals_sum_counts() {
        let mut flock = sighting(1, SPARROW, date(2023, 1, 1));
        flock.count = 12;
        let single = sighting(2, SPARROW, date(2023, 1, 2));

        let summary = species_summary(&[flock, single]);
        assert_eq!(summary[&SPARROW].count, 2);
        assert_eq!(summary[&SPARROW].individuals, 13);
    }

    #[test]
    fn test_new_species_delta_scenario() {
        let prior = vec![sighting(1, ROBIN, date(2022, 7, 1))];
        let current = vec![
            sighting(2, ROBIN, date(2023, 2, 1)),
            sighting(3, SPARROW, date(2023, 2, 2)),
            sighting(4, SPARROW, date(2023, 3, 2)),
        ];
        assert_eq!(new_species_delta(&current, &prior), 1);
    }

    #[test]
    fn test_new_species_delta_bounds() {
        let current = vec![
            sighting(1, ROBIN, date(2023, 1, 1)),
            sighting(2, WREN, date(2023, 1, 1)),
        ];
        assert_eq!(new_species_delta(&current, &[]), distinct_species(&current));
        assert_eq!(new_species_delta(&[], &current), 0);
        assert_eq!(new_species_delta(&current, &current), 0);
    }

    #[test]
    fn test_order_by_recency_with_tie_break() {
        let sightings = vec![
            sighting(1, WREN, date(2023, 5, 1)),
            sighting(2, SPARROW, date(2023, 5, 1)),
            sighting(3, ROBIN, date(2023, 1, 1)),
        ];
        let ordered: Vec<BirdId> = order_by_recency(species_summary(&sightings))
            .into_iter()
            .map(|(bird, _)| bird)
            .collect();
        assert_eq!(ordered, vec![SPARROW, WREN, ROBIN]);
    }

    #[test]
    fn test_period_index_by_year() {
        let sightings = vec![
            sighting(1, ROBIN, date(2022, 1, 1)),
            sighting(2, ROBIN, date(2023, 1, 1)),
            sighting(3, ROBIN, date(2023, 2, 1)),
            sighting(4, SPARROW, date(2023, 3, 1)),
        ];
        let index = period_index(&sightings, Granularity::Year);

        assert_eq!(
            index,
            vec![
                PeriodStats {
                    period: PeriodKey::Year { year: 2023 },
                    sighting_count: 3,
                    species_count: 2,
                },
                PeriodStats {
                    period: PeriodKey::Year { year: 2022 },
                    sighting_count: 1,
                    species_count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_period_index_by_month_sorted_descending() {
        let sightings = vec![
            sighting(1, ROBIN, date(2022, 12, 1)),
            sighting(2, ROBIN, date(2023, 1, 1)),
            sighting(3, ROBIN, date(2023, 11, 1)),
        ];
        let periods: Vec<String> = period_index(&sightings, Granularity::Month)
            .iter()
            .map(|p| p.period.to_string())
            .collect();
        assert_eq!(periods, vec!["2023-11", "2023-01", "2022-12"]);
    }

    #[test]
    fn test_period_index_empty() {
        assert!(period_index(&[], Granularity::Year).is_empty());
        assert!(month_index(&[]).is_empty());
    }

    #[test]
    fn test_month_index_year_species_is_distinct() {
        let sightings = vec![
            sighting(1, ROBIN, date(2023, 1, 1)),
            sighting(2, ROBIN, date(2023, 2, 1)),
            sighting(3, SPARROW, date(2023, 2, 3)),
            sighting(4, WREN, date(2021, 6, 3)),
        ];
        let index = month_index(&sightings);

        assert_eq!(index.len(), 2);
        assert_eq!(index[0].year, 2023);
        assert_eq!(index[0].sighting_count, 3);
        // Robin counted once even though it appears in two months.
        assert_eq!(index[0].species_count, 2);
        assert_eq!(
            index[0].months.iter().map(|m| m.month).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert_eq!(index[0].months[0].month_name, "February");
        assert_eq!(index[1].year, 2021);
        assert_eq!(index[1].months.len(), 1);
    }
}
