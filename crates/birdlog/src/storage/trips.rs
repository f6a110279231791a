//! Trips.

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{like_pattern, to_usize, Clauses, Storage};
use crate::error::{EntityKind, Error, Result};
use crate::model::{NewTrip, Trip, TripId};
use crate::store::RecordStore;

pub(super) const TRIP_COLUMNS: &str = "id, trip_name, start_date, end_date, description";

/// Filters for [`Storage::trips`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripQuery {
    /// Substring matched against name and description.
    pub search: Option<String>,
    /// Only trips that start or end in this year.
    pub year: Option<i32>,
}

/// A trip with sighting totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripListing {
    /// The trip.
    #[serde(flatten)]
    pub trip: Trip,
    /// Sightings recorded on the trip.
    pub sighting_count: usize,
    /// Date of the earliest sighting on the trip.
    pub first_sighting: Option<NaiveDate>,
    /// Date of the latest sighting on the trip.
    pub last_sighting: Option<NaiveDate>,
}

impl Storage {
    /// Create a trip.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name or an end date before the start.
    pub fn add_trip(&self, new: &NewTrip) -> Result<Trip> {
        check_trip(new)?;
        self.conn.execute(
            r"
            INSERT INTO trips (trip_name, start_date, end_date, description)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                new.trip_name.trim(),
                new.start_date,
                new.end_date,
                new.description
            ],
        )?;
        let id = TripId(self.conn.last_insert_rowid());
        debug!("Added trip {} ({})", id, new.trip_name);
        self.trip(id)
    }

    /// Replace every field of a trip.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for invalid fields and `NotFound` for an unknown id.
    pub fn update_trip(&self, id: TripId, new: &NewTrip) -> Result<Trip> {
        check_trip(new)?;
        let affected = self.conn.execute(
            r"
            UPDATE trips SET trip_name = ?1, start_date = ?2, end_date = ?3, description = ?4
            WHERE id = ?5
            ",
            params![
                new.trip_name.trim(),
                new.start_date,
                new.end_date,
                new.description,
                id
            ],
        )?;
        if affected == 0 {
            return Err(Error::not_found(EntityKind::Trip, id));
        }
        debug!("Updated trip {}", id);
        self.trip(id)
    }

    /// Trips matching `query`, newest start date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn trips(&self, query: &TripQuery) -> Result<Vec<TripListing>> {
        let mut clauses = Clauses::default();
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            clauses.push_repeated(
                r"(t.trip_name LIKE ? ESCAPE '\' OR t.description LIKE ? ESCAPE '\')",
                &like_pattern(search),
            );
        }
        if let Some(year) = query.year {
            clauses.push_repeated(
                "(strftime('%Y', t.start_date) = ? OR strftime('%Y', t.end_date) = ?)",
                &Value::Text(format!("{year:04}")),
            );
        }

        let sql = format!(
            r"
            SELECT t.id, t.trip_name, t.start_date, t.end_date, t.description,
                   COUNT(s.id), MIN(s.date_seen), MAX(s.date_seen)
            FROM trips t
            LEFT JOIN sightings s ON s.trip_id = t.id{}
            GROUP BY t.id
            ORDER BY t.start_date DESC, t.id DESC
            ",
            clauses.where_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let listings = stmt
            .query_map(params_from_iter(clauses.values.iter()), |row| {
                let sighting_count: i64 = row.get(5)?;
                Ok(TripListing {
                    trip: row_to_trip(row)?,
                    sighting_count: to_usize(sighting_count),
                    first_sighting: row.get(6)?,
                    last_sighting: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(listings)
    }

    /// Delete a trip, detaching its sightings first.
    ///
    /// Returns the number of sightings that were detached; they stay in the
    /// log without a trip.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub fn delete_trip(&self, id: TripId) -> Result<usize> {
        let trip = self.trip(id)?;

        let tx = self.conn.unchecked_transaction()?;
        let detached = tx.execute(
            "UPDATE sightings SET trip_id = NULL WHERE trip_id = ?1",
            [id],
        )?;
        tx.execute("DELETE FROM trips WHERE id = ?1", [id])?;
        tx.commit()?;

        info!(
            "Deleted trip {} ({}), detached {} sighting(s)",
            id, trip.trip_name, detached
        );
        Ok(detached)
    }
}

fn check_trip(new: &NewTrip) -> Result<()> {
    if let Err(err) = new.validate() {
        warn!("Rejected trip: {}", err);
        return Err(err);
    }
    Ok(())
}

pub(super) fn row_to_trip(row: &rusqlite::Row) -> rusqlite::Result<Trip> {
    Ok(Trip {
        id: row.get(0)?,
        trip_name: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        description: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::filter::SightingFilter;
    use crate::model::NewSighting;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn new_trip(name: &str, start: NaiveDate, end: NaiveDate) -> NewTrip {
        NewTrip {
            trip_name: name.to_string(),
            start_date: start,
            end_date: end,
            description: String::new(),
        }
    }

    #[test]
    fn test_add_and_update_trip() {
        let storage = create_test_storage();
        let added = storage
            .add_trip(&new_trip("Point Pelee", date(2023, 5, 10), date(2023, 5, 14)))
            .unwrap();
        assert_eq!(added.duration_days(), 5);

        let mut changed = new_trip("Point Pelee", date(2023, 5, 10), date(2023, 5, 12));
        changed.description = "spring migration".to_string();
        let updated = storage.update_trip(added.id, &changed).unwrap();
        assert_eq!(updated.end_date, date(2023, 5, 12));
        assert_eq!(updated.description, "spring migration");
    }

    #[test]
    fn test_trip_validation() {
        let storage = create_test_storage();
        let err = storage
            .add_trip(&new_trip("Backwards", date(2023, 5, 10), date(2023, 5, 1)))
            .unwrap_err();
        assert!(err.is_validation());

        let err = storage
            .add_trip(&new_trip(" ", date(2023, 5, 1), date(2023, 5, 1)))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(storage.trips(&TripQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn test_trips_listing_with_totals() {
        let storage = create_test_storage();
        let robin = bird(&storage, "American Robin");
        let park = location(&storage, "High Park", None);
        let spring = trip(&storage, "Spring", date(2023, 5, 1), date(2023, 5, 3));
        trip(&storage, "Winter", date(2022, 12, 30), date(2023, 1, 2));
        trip(&storage, "Autumn", date(2021, 10, 1), date(2021, 10, 2));

        for day in [1, 3] {
            let mut new = NewSighting::new(robin, park, date(2023, 5, day));
            new.trip_id = Some(spring);
            storage.add_sighting(&new).unwrap();
        }

        let all = storage.trips(&TripQuery::default()).unwrap();
        let names: Vec<&str> = all.iter().map(|t| t.trip.trip_name.as_str()).collect();
        assert_eq!(names, vec!["Spring", "Winter", "Autumn"]);
        assert_eq!(all[0].sighting_count, 2);
        assert_eq!(all[0].first_sighting, Some(date(2023, 5, 1)));
        assert_eq!(all[0].last_sighting, Some(date(2023, 5, 3)));
        assert_eq!(all[1].sighting_count, 0);
        assert_eq!(all[1].first_sighting, None);

        let in_2023 = storage
            .trips(&TripQuery {
                search: None,
                year: Some(2023),
            })
            .unwrap();
        assert_eq!(in_2023.len(), 2);

        let searched = storage
            .trips(&TripQuery {
                search: Some("wint".to_string()),
                year: None,
            })
            .unwrap();
        assert_eq!(searched.len(), 1);

        let wildcard = storage
            .trips(&TripQuery {
                search: Some("%".to_string()),
                year: None,
            })
            .unwrap();
        assert!(wildcard.is_empty());
    }

    #[test]
    fn test_delete_trip_detaches_sightings() {
        let storage = create_test_storage();
        let robin = bird(&storage, "American Robin");
        let park = location(&storage, "High Park", None);
        let spring = trip(&storage, "Spring", date(2023, 5, 1), date(2023, 5, 3));
        let mut new = NewSighting::new(robin, park, date(2023, 5, 2));
        new.trip_id = Some(spring);
        let sighting = storage.add_sighting(&new).unwrap();

        assert_eq!(storage.delete_trip(spring).unwrap(), 1);
        assert!(storage.trip(spring).unwrap_err().is_not_found());
        assert_eq!(storage.sighting(sighting.id).unwrap().trip_id, None);
        assert_eq!(
            storage
                .filter_sightings(&SightingFilter::all())
                .unwrap()
                .len(),
            1
        );
        assert!(storage.delete_trip(spring).unwrap_err().is_not_found());
    }
}
