//! Storage layer for birdlog.
//!
//! `SQLite`-backed persistence for birds, families, locations, trips and
//! sightings. [`Storage`] implements the [`RecordStore`] read boundary the
//! reports use, plus the write paths that enforce the referential and
//! hierarchy rules.

mod birds;
mod locations;
pub mod migrations;
pub mod schema;
mod trips;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{EntityKind, Error, Result};
use crate::filter::SightingFilter;
use crate::model::{
    Bird, BirdId, Location, LocationId, NewSighting, Sighting, SightingId, Trip, TripId,
};
use crate::store::RecordStore;

pub use birds::{BirdListing, BirdQuery, FamilyListing};
pub use locations::{LocationListing, LocationMatch, LocationQuery};
pub use trips::{TripListing, TripQuery};

const SIGHTING_COLUMNS: &str =
    "id, bird_id, location_id, trip_id, date_seen, heard_not_seen, count, notes";

/// The `SQLite` record store.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a database at the given path.
    ///
    /// Creates parent directories as needed and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // === Sightings ===

    /// Record a sighting.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero count and `NotFound` if the bird,
    /// location or trip does not exist.
    pub fn add_sighting(&self, new: &NewSighting) -> Result<Sighting> {
        self.check_sighting(new)?;

        self.conn.execute(
            r"
            INSERT INTO sightings
                (bird_id, location_id, trip_id, date_seen, heard_not_seen, count, notes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                new.bird_id,
                new.location_id,
                new.trip_id,
                new.date_seen,
                new.heard_not_seen,
                i64::from(new.count),
                new.notes,
            ],
        )?;

        let id = SightingId(self.conn.last_insert_rowid());
        debug!(
            "Recorded sighting {} of bird {} at location {} on {}",
            id, new.bird_id, new.location_id, new.date_seen
        );
        self.sighting(id)
    }

    /// Replace every field of a sighting.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown sighting or reference, and
    /// `Validation` for a zero count.
    pub fn update_sighting(&self, id: SightingId, new: &NewSighting) -> Result<Sighting> {
        self.check_sighting(new)?;

        let affected = self.conn.execute(
            r"
            UPDATE sightings
            SET bird_id = ?1, location_id = ?2, trip_id = ?3, date_seen = ?4,
                heard_not_seen = ?5, count = ?6, notes = ?7
            WHERE id = ?8
            ",
            params![
                new.bird_id,
                new.location_id,
                new.trip_id,
                new.date_seen,
                new.heard_not_seen,
                i64::from(new.count),
                new.notes,
                id,
            ],
        )?;
        if affected == 0 {
            return Err(Error::not_found(EntityKind::Sighting, id));
        }

        debug!("Updated sighting {}", id);
        self.sighting(id)
    }

    /// Delete a sighting.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the sighting does not exist.
    pub fn delete_sighting(&self, id: SightingId) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM sightings WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(Error::not_found(EntityKind::Sighting, id));
        }
        info!("Deleted sighting {}", id);
        Ok(())
    }

    fn check_sighting(&self, new: &NewSighting) -> Result<()> {
        if let Err(err) = new.validate() {
            warn!("Rejected sighting: {}", err);
            return Err(err);
        }
        self.bird(new.bird_id)?;
        self.location(new.location_id)?;
        if let Some(trip_id) = new.trip_id {
            self.trip(trip_id)?;
        }
        Ok(())
    }

    // === Statistics ===

    /// Row counts, date span and file size.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let (first_sighting, last_sighting): (Option<NaiveDate>, Option<NaiveDate>) =
            self.conn.query_row(
                "SELECT MIN(date_seen), MAX(date_seen) FROM sightings",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            families: self.count_rows("families")?,
            birds: self.count_rows("birds")?,
            locations: self.count_rows("locations")?,
            trips: self.count_rows("trips")?,
            sightings: self.count_rows("sightings")?,
            first_sighting,
            last_sighting,
            schema_version: migrations::schema_version(&self.conn)?,
            db_size_bytes,
        })
    }

    fn count_rows(&self, table: &str) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
        Ok(to_usize(count))
    }

    /// `SELECT COUNT(*)` with a single id parameter.
    fn count_by(&self, sql: &str, id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(sql, [id], |row| row.get(0))?;
        Ok(to_usize(count))
    }
}

impl RecordStore for Storage {
    fn filter_sightings(&self, filter: &SightingFilter) -> Result<Vec<Sighting>> {
        let mut clauses = Clauses::default();

        if let (Some(start), Some(end)) = (filter.window.start(), filter.window.end_exclusive()) {
            clauses.push("date_seen >= ?", date_value(start));
            clauses.push("date_seen < ?", date_value(end));
        }
        if let Some(before) = filter.before {
            clauses.push("date_seen < ?", date_value(before));
        }
        if let Some(on) = filter.on {
            clauses.push("date_seen = ?", date_value(on));
        }
        if let Some(ids) = &filter.location_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            clauses.push_in("location_id", ids.iter().map(|id| Value::Integer(id.0)));
        }
        if let Some(trip_id) = filter.trip_id {
            clauses.push("trip_id = ?", Value::Integer(trip_id.0));
        }
        if let Some(bird_id) = filter.bird_id {
            clauses.push("bird_id = ?", Value::Integer(bird_id.0));
        }

        let sql = format!(
            "SELECT {SIGHTING_COLUMNS} FROM sightings{} ORDER BY date_seen DESC, id DESC",
            clauses.where_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let sightings = stmt
            .query_map(params_from_iter(clauses.values.iter()), row_to_sighting)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            "Sighting filter ({}) matched {} row(s)",
            filter.window,
            sightings.len()
        );
        Ok(sightings)
    }

    fn sighting(&self, id: SightingId) -> Result<Sighting> {
        self.conn
            .query_row(
                &format!("SELECT {SIGHTING_COLUMNS} FROM sightings WHERE id = ?1"),
                [id],
                row_to_sighting,
            )
            .optional()?
            .ok_or_else(|| Error::not_found(EntityKind::Sighting, id))
    }

    fn location(&self, id: LocationId) -> Result<Location> {
        self.conn
            .query_row(
                "SELECT id, location_name, parent_id FROM locations WHERE id = ?1",
                [id],
                locations::row_to_location,
            )
            .optional()?
            .ok_or_else(|| Error::not_found(EntityKind::Location, id))
    }

    fn child_locations(&self, parent: LocationId) -> Result<Vec<Location>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, location_name, parent_id FROM locations
            WHERE parent_id = ?1 ORDER BY location_name, id
            ",
        )?;
        let children = stmt
            .query_map([parent], locations::row_to_location)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(children)
    }

    fn locations(&self) -> Result<Vec<Location>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, location_name, parent_id FROM locations ORDER BY location_name, id",
        )?;
        let all = stmt
            .query_map([], locations::row_to_location)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(all)
    }

    fn bird(&self, id: BirdId) -> Result<Bird> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM birds WHERE id = ?1", birds::BIRD_COLUMNS),
                [id],
                birds::row_to_bird,
            )
            .optional()?
            .ok_or_else(|| Error::not_found(EntityKind::Bird, id))
    }

    fn trip(&self, id: TripId) -> Result<Trip> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM trips WHERE id = ?1", trips::TRIP_COLUMNS),
                [id],
                trips::row_to_trip,
            )
            .optional()?
            .ok_or_else(|| Error::not_found(EntityKind::Trip, id))
    }
}

/// Row counts and date span of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of families.
    pub families: usize,
    /// Number of birds.
    pub birds: usize,
    /// Number of locations.
    pub locations: usize,
    /// Number of trips.
    pub trips: usize,
    /// Number of sightings.
    pub sightings: usize,
    /// Date of the earliest sighting.
    pub first_sighting: Option<NaiveDate>,
    /// Date of the latest sighting.
    pub last_sighting: Option<NaiveDate>,
    /// Recorded schema version.
    pub schema_version: i32,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// A `WHERE` clause assembled from optional predicates, with positional
/// parameters in the same order as the placeholders.
#[derive(Debug, Default)]
struct Clauses {
    sql: Vec<String>,
    values: Vec<Value>,
}

impl Clauses {
    fn push(&mut self, clause: &str, value: Value) {
        self.sql.push(clause.to_string());
        self.values.push(value);
    }

    /// One clause that binds the same value to several placeholders.
    fn push_repeated(&mut self, clause: &str, value: &Value) {
        let placeholders = clause.matches('?').count();
        self.sql.push(clause.to_string());
        self.values
            .extend(std::iter::repeat(value.clone()).take(placeholders));
    }

    fn push_in(&mut self, column: &str, values: impl Iterator<Item = Value>) {
        let start = self.values.len();
        self.values.extend(values);
        let placeholders = vec!["?"; self.values.len() - start].join(", ");
        self.sql.push(format!("{column} IN ({placeholders})"));
    }

    fn push_raw(&mut self, clause: &str) {
        self.sql.push(clause.to_string());
    }

    fn where_sql(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql.join(" AND "))
        }
    }
}

fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}

/// `%query%` for a `LIKE ? ESCAPE '\'` match; wildcards in `query` match
/// literally.
fn like_pattern(query: &str) -> Value {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Value::Text(format!("%{escaped}%"))
}

fn to_usize(count: i64) -> usize {
    usize::try_from(count).unwrap_or(0)
}

fn row_to_sighting(row: &rusqlite::Row) -> rusqlite::Result<Sighting> {
    let count: i64 = row.get(6)?;
    Ok(Sighting {
        id: row.get(0)?,
        bird_id: row.get(1)?,
        location_id: row.get(2)?,
        trip_id: row.get(3)?,
        date_seen: row.get(4)?,
        heard_not_seen: row.get(5)?,
        count: u32::try_from(count)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(6, count))?,
        notes: row.get(7)?,
    })
}
