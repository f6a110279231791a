//! Locations and the reparenting guard.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{like_pattern, to_usize, Clauses, Storage};
use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::hierarchy::LocationTree;
use crate::model::{Location, LocationId, NewLocation};
use crate::store::RecordStore;

/// Filters for [`Storage::location_listings`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationQuery {
    /// Substring matched against the location name.
    pub search: Option<String>,
    /// Only direct children of this location.
    pub parent_id: Option<LocationId>,
    /// Only locations without a parent. Ignored when `parent_id` is set.
    pub top_level_only: bool,
}

/// A location with its path and direct counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationListing {
    /// The location.
    #[serde(flatten)]
    pub location: Location,
    /// Path from the root, e.g. `Canada > Ontario > Toronto`.
    pub full_path: String,
    /// Sightings recorded directly at this location.
    pub sighting_count: usize,
    /// Number of direct children.
    pub child_count: usize,
}

/// An autocomplete hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationMatch {
    /// The location.
    #[serde(flatten)]
    pub location: Location,
    /// Path from the root.
    pub full_path: String,
}

impl Storage {
    /// Create a location under an existing parent, or as a root.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name and `NotFound` if the parent
    /// does not exist.
    pub fn add_location(&self, new: &NewLocation) -> Result<Location> {
        if let Err(err) = new.validate() {
            warn!("Rejected location: {}", err);
            return Err(err);
        }
        if let Some(parent) = new.parent_id {
            self.location(parent)?;
        }

        self.conn.execute(
            "INSERT INTO locations (location_name, parent_id) VALUES (?1, ?2)",
            params![new.location_name.trim(), new.parent_id],
        )?;
        let id = LocationId(self.conn.last_insert_rowid());
        debug!("Added location {} ({})", id, new.location_name);
        self.location(id)
    }

    /// Rename and/or reparent a location.
    ///
    /// The new parent link is checked against the current hierarchy before
    /// anything is written; a link that would make the location its own
    /// ancestor is refused and no row changes.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name or a circular parent link, and
    /// `NotFound` for an unknown location or parent.
    pub fn update_location(&self, id: LocationId, new: &NewLocation) -> Result<Location> {
        if let Err(err) = new.validate() {
            warn!("Rejected location {}: {}", id, err);
            return Err(err);
        }

        let tx = self.conn.unchecked_transaction()?;
        let tree = LocationTree::load(self)?;
        if let Err(err) = tree.check_reparent(id, new.parent_id) {
            warn!("Rejected reparent of location {}: {}", id, err);
            return Err(err);
        }

        tx.execute(
            "UPDATE locations SET location_name = ?1, parent_id = ?2 WHERE id = ?3",
            params![new.location_name.trim(), new.parent_id, id],
        )?;
        tx.commit()?;

        debug!("Updated location {}", id);
        self.location(id)
    }

    /// Locations matching `query`, ordered by name, with paths and counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn location_listings(&self, query: &LocationQuery) -> Result<Vec<LocationListing>> {
        let mut clauses = Clauses::default();
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            clauses.push(r"l.location_name LIKE ? ESCAPE '\'", like_pattern(search));
        }
        if let Some(parent) = query.parent_id {
            clauses.push("l.parent_id = ?", Value::Integer(parent.0));
        } else if query.top_level_only {
            clauses.push_raw("l.parent_id IS NULL");
        }

        let sql = format!(
            r"
            SELECT l.id, l.location_name, l.parent_id,
                   (SELECT COUNT(*) FROM sightings s WHERE s.location_id = l.id),
                   (SELECT COUNT(*) FROM locations c WHERE c.parent_id = l.id)
            FROM locations l{}
            ORDER BY l.location_name, l.id
            ",
            clauses.where_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(clauses.values.iter()), |row| {
                let sightings: i64 = row.get(3)?;
                let children: i64 = row.get(4)?;
                Ok((row_to_location(row)?, sightings, children))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let tree = LocationTree::load(self)?;
        rows.into_iter()
            .map(|(location, sightings, children)| {
                Ok(LocationListing {
                    full_path: tree.full_path_string(location.id)?,
                    location,
                    sighting_count: to_usize(sightings),
                    child_count: to_usize(children),
                })
            })
            .collect()
    }

    /// Autocomplete over location names, returning full paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search_locations(
        &self,
        query: &str,
        limits: &SearchConfig,
    ) -> Result<Vec<LocationMatch>> {
        let query = query.trim();
        if query.chars().count() < limits.min_query_length {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            r"
            SELECT id, location_name, parent_id FROM locations
            WHERE location_name LIKE ?1 ESCAPE '\'
            ORDER BY location_name, id
            LIMIT ?2
            ",
        )?;
        let limit = i64::try_from(limits.result_limit).unwrap_or(i64::MAX);
        let hits = stmt
            .query_map(params![like_pattern(query), limit], row_to_location)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let tree = LocationTree::load(self)?;
        hits.into_iter()
            .map(|location| {
                Ok(LocationMatch {
                    full_path: tree.full_path_string(location.id)?,
                    location,
                })
            })
            .collect()
    }

    /// Delete a location with no sightings and no children.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id and `Conflict` naming the
    /// sightings or child locations that block the delete.
    pub fn delete_location(&self, id: LocationId) -> Result<()> {
        self.delete_locations(&[id]).map(|_| ())
    }

    /// Delete several locations; either all go or none do.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for any unknown id and `Conflict` naming every
    /// location that still has sightings or children.
    pub fn delete_locations(&self, ids: &[LocationId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut blockers = Vec::new();
        let mut names = Vec::with_capacity(ids.len());
        for &id in ids {
            let location = self.location(id)?;
            let sightings =
                self.count_by("SELECT COUNT(*) FROM sightings WHERE location_id = ?1", id.0)?;
            let children =
                self.count_by("SELECT COUNT(*) FROM locations WHERE parent_id = ?1", id.0)?;

            let mut reasons = Vec::new();
            if sightings > 0 {
                reasons.push(format!("{sightings} sighting(s)"));
            }
            if children > 0 {
                reasons.push(format!("{children} child location(s)"));
            }
            if !reasons.is_empty() {
                blockers.push(format!(
                    "\"{}\" has {}",
                    location.location_name,
                    reasons.join(" and ")
                ));
            }
            names.push(location.location_name);
        }

        if !blockers.is_empty() {
            warn!(
                "Refused to delete {} location(s): {}",
                ids.len(),
                blockers.join("; ")
            );
            let entity = match names.as_slice() {
                [only] => format!("location \"{only}\""),
                _ => format!("{} locations", names.len()),
            };
            return Err(Error::conflict(entity, blockers.join("; ")));
        }

        let mut deleted = 0;
        for &id in ids {
            deleted += tx.execute("DELETE FROM locations WHERE id = ?1", [id])?;
        }
        tx.commit()?;

        info!("Deleted {} location(s): {}", deleted, names.join(", "));
        Ok(deleted)
    }

    /// Number of sightings recorded directly at a location.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub fn location_sighting_count(&self, id: LocationId) -> Result<usize> {
        self.location(id)?;
        self.count_by("SELECT COUNT(*) FROM sightings WHERE location_id = ?1", id.0)
    }
}

pub(super) fn row_to_location(row: &rusqlite::Row) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        location_name: row.get(1)?,
        parent_id: row.get(2)?,
    })
}
