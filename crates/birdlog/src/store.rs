//! The read boundary between reports and the record store.
//!
//! Reports never talk to SQLite directly; they go through [`RecordStore`],
//! which [`crate::storage::Storage`] implements.

use crate::error::Result;
use crate::filter::SightingFilter;
use crate::model::{Bird, BirdId, Location, LocationId, Sighting, SightingId, Trip, TripId};

/// Read operations the reporting layer needs from a record store.
///
/// Lookups by identity fail with [`crate::Error::NotFound`] when the record
/// does not exist.
pub trait RecordStore {
    /// Sightings matching every predicate in `filter`, newest first
    /// (`date_seen` descending, then identity descending).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    fn filter_sightings(&self, filter: &SightingFilter) -> Result<Vec<Sighting>>;

    /// A single sighting.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or a query error.
    fn sighting(&self, id: SightingId) -> Result<Sighting>;

    /// A single location.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or a query error.
    fn location(&self, id: LocationId) -> Result<Location>;

    /// Direct children of a location, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    fn child_locations(&self, parent: LocationId) -> Result<Vec<Location>>;

    /// Every location, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    fn locations(&self) -> Result<Vec<Location>>;

    /// A single bird.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or a query error.
    fn bird(&self, id: BirdId) -> Result<Bird>;

    /// A single trip.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or a query error.
    fn trip(&self, id: TripId) -> Result<Trip>;
}
