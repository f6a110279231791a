//! Report assembly.
//!
//! Each report asks the store for the sightings it covers, hands them to
//! [`crate::aggregate`], pages the result with [`crate::paginate`] and
//! resolves the ids on the page into records. Reports hold no state and
//! every number is recomputed per call.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{
    distinct_species, month_index, new_species_delta, order_by_recency, period_index,
    species_summary, Granularity, PeriodStats, SpeciesSummary, YearIndex,
};
use crate::error::{Error, Result};
use crate::filter::{SightingFilter, TimeWindow};
use crate::hierarchy::LocationTree;
use crate::model::{Bird, BirdId, Location, LocationId, Sighting, SightingId, Trip, TripId};
use crate::paginate::{paginate, Page, PageNumber, PageSize};
use crate::store::RecordStore;

/// A sighting with the names a reader needs next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SightingView {
    /// The sighting.
    #[serde(flatten)]
    pub sighting: Sighting,
    /// English name of the bird.
    pub bird_name: String,
    /// Name of the location.
    pub location_name: String,
    /// Name of the trip, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_name: Option<String>,
}

/// One species row of a list report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesEntry {
    /// The species.
    pub bird: Bird,
    /// Earliest sighting date in the report's scope.
    pub first_seen: NaiveDate,
    /// Latest sighting date in the report's scope.
    pub last_seen: NaiveDate,
    /// Sighting records in scope.
    pub sighting_count: usize,
    /// Individuals counted across those records.
    pub individuals: u64,
    /// The sighting on `first_seen`.
    pub first_sighting: SightingView,
    /// The sighting on `last_seen`.
    pub last_sighting: SightingView,
    /// Every sighting in scope fell on one day.
    pub seen_once: bool,
    /// No sighting of this bird anywhere predates `first_seen`.
    pub is_life_list_addition: bool,
}

/// Totals for a bounded period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodTotals {
    /// Sighting records in the period.
    pub total_sightings: usize,
    /// Distinct species in the period.
    pub unique_species: usize,
    /// Species in the period that were never seen before it.
    pub new_species: usize,
}

/// Every species ever recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifeList {
    /// Species rows, most recently seen first.
    pub entries: Page<SpeciesEntry>,
    /// Size of the life list.
    pub total_species: usize,
}

/// Species seen in one year, or across all years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearList {
    /// The year shown; `None` lists every year.
    pub year: Option<i32>,
    /// Species rows, most recently seen first.
    pub entries: Page<SpeciesEntry>,
    /// Totals for the year; only present when a year is selected.
    pub totals: Option<PeriodTotals>,
    /// Years with sightings, newest first.
    pub years: Vec<PeriodStats>,
    /// Size of the life list.
    pub total_all_species: usize,
}

/// Species seen in a month, a year, or across all time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthList {
    /// The window shown.
    pub window: TimeWindow,
    /// English month name for a month window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_name: Option<&'static str>,
    /// Species rows, most recently seen first.
    pub entries: Page<SpeciesEntry>,
    /// Totals for the month; only present for a month window.
    pub totals: Option<PeriodTotals>,
    /// Year/month navigation, newest first.
    pub index: Vec<YearIndex>,
    /// Size of the life list.
    pub total_all_species: usize,
}

/// Species seen at a location or anywhere beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationSpecies {
    /// The selected location.
    pub location: Location,
    /// Ancestors, root first.
    pub breadcrumb: Vec<Location>,
    /// Path from the root.
    pub full_path: String,
    /// Every location beneath this one, ordered by name.
    pub descendants: Vec<Location>,
    /// Species rows, most recently seen first.
    pub entries: Page<SpeciesEntry>,
    /// Distinct species across the location and its descendants.
    pub total_species: usize,
    /// Sighting records across the location and its descendants.
    pub total_sightings: usize,
}

/// A child location with its rolled-up sighting count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildLocation {
    /// The child.
    pub location: Location,
    /// Sightings at the child and everything beneath it.
    pub sighting_count: usize,
}

/// Overview of one location and its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationDetail {
    /// The location.
    pub location: Location,
    /// Ancestors, root first.
    pub breadcrumb: Vec<Location>,
    /// Path from the root.
    pub full_path: String,
    /// Direct children, ordered by name.
    pub children: Vec<ChildLocation>,
    /// Number of locations beneath this one at any depth.
    pub descendant_count: usize,
    /// Sighting records across the subtree.
    pub total_sightings: usize,
    /// Distinct species across the subtree.
    pub unique_species: usize,
    /// Earliest sighting in the subtree.
    pub first_sighting: Option<SightingView>,
    /// Latest sighting in the subtree.
    pub latest_sighting: Option<SightingView>,
    /// The most recent sightings, newest first.
    pub recent_sightings: Vec<SightingView>,
}

/// Everything recorded on one trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripDetail {
    /// The trip.
    pub trip: Trip,
    /// Days covered, counting both ends.
    pub duration_days: i64,
    /// Sightings on the trip, newest first.
    pub sightings: Vec<SightingView>,
    /// Distinct birds, ordered by English name.
    pub unique_birds: Vec<Bird>,
    /// Distinct locations, ordered by name.
    pub unique_locations: Vec<Location>,
    /// Sighting records on the trip.
    pub total_sightings: usize,
    /// Date of the earliest sighting.
    pub first_sighting_date: Option<NaiveDate>,
    /// Date of the latest sighting.
    pub last_sighting_date: Option<NaiveDate>,
}

/// Everything recorded for one bird.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BirdDetail {
    /// The bird.
    pub bird: Bird,
    /// Sightings of the bird, newest first.
    pub sightings: Vec<SightingView>,
    /// Sighting records.
    pub total_sightings: usize,
    /// The earliest sighting.
    pub first_sighting: Option<SightingView>,
    /// The latest sighting.
    pub latest_sighting: Option<SightingView>,
    /// Names of the places the bird was seen, sorted and unique.
    pub locations: Vec<String>,
}

/// The dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Home {
    /// The day the dashboard was computed for.
    pub today: NaiveDate,
    /// Size of the life list.
    pub life_list_count: usize,
    /// Species seen in the current year.
    pub year_species: usize,
    /// Species seen in the previous year.
    pub last_year_species: usize,
    /// Species seen in the current month.
    pub month_species: usize,
    /// Species seen in the previous month.
    pub last_month_species: usize,
    /// Sightings dated today.
    pub todays_sightings: Vec<SightingView>,
}

/// The life list: every species ever recorded.
///
/// # Errors
///
/// Returns an error if a store query fails.
pub fn life_list<S: RecordStore + ?Sized>(
    store: &S,
    size: PageSize,
    page: PageNumber,
) -> Result<LifeList> {
    let all = store.filter_sightings(&SightingFilter::all())?;
    let all_time = species_summary(&all);
    let total_species = all_time.len();

    let mut resolver = Resolver::new(store);
    let entries = species_page(&mut resolver, &all, &all_time, size, page)?;

    info!(
        "Life list: {} species, page {}/{}",
        total_species, entries.number, entries.total_pages
    );
    Ok(LifeList {
        entries,
        total_species,
    })
}

/// Species seen in `year`, or in every year when `None`.
///
/// # Errors
///
/// Returns an error if a store query fails.
pub fn year_list<S: RecordStore + ?Sized>(
    store: &S,
    year: Option<i32>,
    size: PageSize,
    page: PageNumber,
) -> Result<YearList> {
    let window = year.map_or(TimeWindow::All, |year| TimeWindow::Year { year });
    let all = store.filter_sightings(&SightingFilter::all())?;
    let all_time = species_summary(&all);
    let (in_window, totals) = window_with_totals(store, window, &all)?;

    let mut resolver = Resolver::new(store);
    let entries = species_page(&mut resolver, &in_window, &all_time, size, page)?;

    info!("Year list ({}): {} species", window, entries.total_items);
    Ok(YearList {
        year,
        entries,
        totals: year.and(totals),
        years: period_index(&all, Granularity::Year),
        total_all_species: all_time.len(),
    })
}

/// Species seen inside `window`.
///
/// # Errors
///
/// Returns an error if a store query fails.
pub fn month_list<S: RecordStore + ?Sized>(
    store: &S,
    window: TimeWindow,
    size: PageSize,
    page: PageNumber,
) -> Result<MonthList> {
    let all = store.filter_sightings(&SightingFilter::all())?;
    let all_time = species_summary(&all);
    let (in_window, totals) = window_with_totals(store, window, &all)?;

    let mut resolver = Resolver::new(store);
    let entries = species_page(&mut resolver, &in_window, &all_time, size, page)?;

    info!("Month list ({}): {} species", window, entries.total_items);
    Ok(MonthList {
        window,
        month_name: window.month_name(),
        entries,
        totals: match window {
            TimeWindow::Month { .. } => totals,
            _ => None,
        },
        index: month_index(&all),
        total_all_species: all_time.len(),
    })
}

/// Species seen at a location, including every location beneath it.
///
/// # Errors
///
/// Returns `NotFound` for an unknown location, or a store error.
pub fn location_species<S: RecordStore + ?Sized>(
    store: &S,
    id: LocationId,
    size: PageSize,
    page: PageNumber,
) -> Result<LocationSpecies> {
    let tree = LocationTree::load(store)?;
    let location = tree.get(id)?.clone();
    let scope = tree.expand_to_location_set(id)?;

    let sightings = store.filter_sightings(&SightingFilter::all().at_locations(scope))?;
    let all_time = species_summary(&store.filter_sightings(&SightingFilter::all())?);

    let mut resolver = Resolver::with_tree(store, &tree);
    let entries = species_page(&mut resolver, &sightings, &all_time, size, page)?;

    info!(
        "Location list for {}: {} species across {} sighting(s)",
        location.location_name,
        entries.total_items,
        sightings.len()
    );
    Ok(LocationSpecies {
        breadcrumb: tree.ancestors_of(id)?.into_iter().cloned().collect(),
        full_path: tree.full_path_string(id)?,
        descendants: tree.descendants_of(id)?.into_iter().cloned().collect(),
        total_species: entries.total_items,
        total_sightings: sightings.len(),
        entries,
        location,
    })
}

/// A location's subtree at a glance.
///
/// # Errors
///
/// Returns `NotFound` for an unknown location, or a store error.
pub fn location_detail<S: RecordStore + ?Sized>(
    store: &S,
    id: LocationId,
    recent_limit: usize,
) -> Result<LocationDetail> {
    let tree = LocationTree::load(store)?;
    let location = tree.get(id)?.clone();
    let scope = tree.expand_to_location_set(id)?;
    let sightings = store.filter_sightings(&SightingFilter::all().at_locations(scope))?;

    let children = tree
        .children_of(id)?
        .into_iter()
        .map(|child| {
            let subtree = tree.expand_to_location_set(child.id)?;
            Ok(ChildLocation {
                location: child.clone(),
                sighting_count: sightings
                    .iter()
                    .filter(|s| subtree.contains(&s.location_id))
                    .count(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut resolver = Resolver::with_tree(store, &tree);
    // Newest first, so the oldest sighting is last.
    let latest_sighting = sightings
        .first()
        .map(|s| resolver.view(s))
        .transpose()?;
    let first_sighting = sightings.last().map(|s| resolver.view(s)).transpose()?;
    let recent_sightings = sightings
        .iter()
        .take(recent_limit)
        .map(|s| resolver.view(s))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Location detail for {}: {} child(ren), {} sighting(s)",
        location.location_name,
        children.len(),
        sightings.len()
    );
    Ok(LocationDetail {
        breadcrumb: tree.ancestors_of(id)?.into_iter().cloned().collect(),
        full_path: tree.full_path_string(id)?,
        descendant_count: tree.descendants_of(id)?.len(),
        total_sightings: sightings.len(),
        unique_species: distinct_species(&sightings),
        children,
        first_sighting,
        latest_sighting,
        recent_sightings,
        location,
    })
}

/// Everything recorded on a trip.
///
/// # Errors
///
/// Returns `NotFound` for an unknown trip, or a store error.
pub fn trip_detail<S: RecordStore + ?Sized>(store: &S, id: TripId) -> Result<TripDetail> {
    let trip = store.trip(id)?;
    let sightings = store.filter_sightings(&SightingFilter::all().on_trip(id))?;

    let mut resolver = Resolver::new(store);
    let views = sightings
        .iter()
        .map(|s| resolver.view(s))
        .collect::<Result<Vec<_>>>()?;

    let mut unique_birds = sightings
        .iter()
        .map(|s| s.bird_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|bird| resolver.bird(bird))
        .collect::<Result<Vec<_>>>()?;
    unique_birds.sort_by(|a, b| {
        a.english_name
            .cmp(&b.english_name)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut unique_locations = sightings
        .iter()
        .map(|s| s.location_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|location| resolver.location(location))
        .collect::<Result<Vec<_>>>()?;
    unique_locations.sort_by(|a, b| {
        a.location_name
            .cmp(&b.location_name)
            .then_with(|| a.id.cmp(&b.id))
    });

    Ok(TripDetail {
        duration_days: trip.duration_days(),
        total_sightings: sightings.len(),
        first_sighting_date: sightings.last().map(|s| s.date_seen),
        last_sighting_date: sightings.first().map(|s| s.date_seen),
        sightings: views,
        unique_birds,
        unique_locations,
        trip,
    })
}

/// Everything recorded for a bird.
///
/// # Errors
///
/// Returns `NotFound` for an unknown bird, or a store error.
pub fn bird_detail<S: RecordStore + ?Sized>(store: &S, id: BirdId) -> Result<BirdDetail> {
    let bird = store.bird(id)?;
    let sightings = store.filter_sightings(&SightingFilter::all().of_bird(id))?;

    let mut resolver = Resolver::new(store);
    let views = sightings
        .iter()
        .map(|s| resolver.view(s))
        .collect::<Result<Vec<_>>>()?;

    let locations: BTreeSet<String> = views.iter().map(|v| v.location_name.clone()).collect();

    Ok(BirdDetail {
        total_sightings: views.len(),
        latest_sighting: views.first().cloned(),
        first_sighting: views.last().cloned(),
        locations: locations.into_iter().collect(),
        sightings: views,
        bird,
    })
}

/// Dashboard counts relative to `today`.
///
/// # Errors
///
/// Returns an error if a store query fails.
pub fn home<S: RecordStore + ?Sized>(store: &S, today: NaiveDate) -> Result<Home> {
    let year = today.year();
    let month = today.month();
    let (last_month_year, last_month) = if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    };

    let species_in = |window: TimeWindow| -> Result<usize> {
        Ok(distinct_species(
            &store.filter_sightings(&SightingFilter::window(window))?,
        ))
    };

    let todays = store.filter_sightings(&SightingFilter::all().on_day(today))?;
    let mut resolver = Resolver::new(store);
    let todays_sightings = todays
        .iter()
        .map(|s| resolver.view(s))
        .collect::<Result<Vec<_>>>()?;

    Ok(Home {
        today,
        life_list_count: species_in(TimeWindow::All)?,
        year_species: species_in(TimeWindow::Year { year })?,
        last_year_species: species_in(TimeWindow::Year { year: year - 1 })?,
        month_species: species_in(TimeWindow::Month { year, month })?,
        last_month_species: species_in(TimeWindow::Month {
            year: last_month_year,
            month: last_month,
        })?,
        todays_sightings,
    })
}

/// One sighting with its names resolved.
///
/// # Errors
///
/// Returns `NotFound` for an unknown sighting, or a store error.
pub fn sighting_view<S: RecordStore + ?Sized>(
    store: &S,
    id: SightingId,
) -> Result<SightingView> {
    let sighting = store.sighting(id)?;
    Resolver::new(store).view(&sighting)
}

/// Sightings matching `filter`, newest first, with their names resolved.
///
/// # Errors
///
/// Returns an error if a store query fails.
pub fn sighting_log<S: RecordStore + ?Sized>(
    store: &S,
    filter: &SightingFilter,
) -> Result<Vec<SightingView>> {
    let sightings = store.filter_sightings(filter)?;
    let mut resolver = Resolver::new(store);
    sightings.iter().map(|s| resolver.view(s)).collect()
}

/// Sightings inside `window` plus its totals when the window is bounded.
fn window_with_totals<S: RecordStore + ?Sized>(
    store: &S,
    window: TimeWindow,
    all: &[Sighting],
) -> Result<(Vec<Sighting>, Option<PeriodTotals>)> {
    let Some(start) = window.start() else {
        return Ok((all.to_vec(), None));
    };

    let in_window = store.filter_sightings(&SightingFilter::window(window))?;
    let prior = store.filter_sightings(&SightingFilter::before(start))?;
    let totals = PeriodTotals {
        total_sightings: in_window.len(),
        unique_species: distinct_species(&in_window),
        new_species: new_species_delta(&in_window, &prior),
    };
    Ok((in_window, Some(totals)))
}

/// Summarise `sightings`, order by recency, page, then resolve the page.
fn species_page<S: RecordStore + ?Sized>(
    resolver: &mut Resolver<'_, S>,
    sightings: &[Sighting],
    all_time: &BTreeMap<BirdId, SpeciesSummary>,
    size: PageSize,
    page: PageNumber,
) -> Result<Page<SpeciesEntry>> {
    let by_id: HashMap<SightingId, &Sighting> = sightings.iter().map(|s| (s.id, s)).collect();
    let lookup = |id: SightingId| {
        by_id
            .get(&id)
            .copied()
            .ok_or_else(|| Error::internal(format!("sighting {id} missing from its own summary")))
    };

    let ordered = order_by_recency(species_summary(sightings));
    paginate(ordered, size, page).try_map(|(bird_id, summary)| -> Result<SpeciesEntry> {
        let first_sighting = resolver.view(lookup(summary.first_sighting)?)?;
        let last_sighting = resolver.view(lookup(summary.last_sighting)?)?;
        let is_life_list_addition = all_time
            .get(&bird_id)
            .map_or(true, |ever| ever.first_seen >= summary.first_seen);

        Ok(SpeciesEntry {
            bird: resolver.bird(bird_id)?,
            first_seen: summary.first_seen,
            last_seen: summary.last_seen,
            sighting_count: summary.count,
            individuals: summary.individuals,
            first_sighting,
            last_sighting,
            seen_once: summary.seen_on_single_day(),
            is_life_list_addition,
        })
    })
}

/// Looks up the records a sighting points at, once per id.
struct Resolver<'a, S: ?Sized> {
    store: &'a S,
    tree: Option<&'a LocationTree>,
    birds: HashMap<BirdId, Bird>,
    locations: HashMap<LocationId, Location>,
    trips: HashMap<TripId, Trip>,
}

impl<'a, S: RecordStore + ?Sized> Resolver<'a, S> {
    fn new(store: &'a S) -> Self {
        Self {
            store,
            tree: None,
            birds: HashMap::new(),
            locations: HashMap::new(),
            trips: HashMap::new(),
        }
    }

    fn with_tree(store: &'a S, tree: &'a LocationTree) -> Self {
        Self {
            tree: Some(tree),
            ..Self::new(store)
        }
    }

    fn bird(&mut self, id: BirdId) -> Result<Bird> {
        if let Some(bird) = self.birds.get(&id) {
            return Ok(bird.clone());
        }
        let bird = self.store.bird(id)?;
        self.birds.insert(id, bird.clone());
        Ok(bird)
    }

    fn location(&mut self, id: LocationId) -> Result<Location> {
        if let Some(tree) = self.tree {
            return tree.get(id).cloned();
        }
        if let Some(location) = self.locations.get(&id) {
            return Ok(location.clone());
        }
        let location = self.store.location(id)?;
        self.locations.insert(id, location.clone());
        Ok(location)
    }

    fn trip(&mut self, id: TripId) -> Result<Trip> {
        if let Some(trip) = self.trips.get(&id) {
            return Ok(trip.clone());
        }
        let trip = self.store.trip(id)?;
        self.trips.insert(id, trip.clone());
        Ok(trip)
    }

    fn view(&mut self, sighting: &Sighting) -> Result<SightingView> {
        let trip_name = match sighting.trip_id {
            Some(trip) => Some(self.trip(trip)?.trip_name),
            None => None,
        };
        Ok(SightingView {
            bird_name: self.bird(sighting.bird_id)?.english_name,
            location_name: self.location(sighting.location_id)?.location_name,
            trip_name,
            sighting: sighting.clone(),
        })
    }
}
