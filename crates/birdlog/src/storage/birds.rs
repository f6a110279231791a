//! Families and birds.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{like_pattern, to_usize, Clauses, Storage};
use crate::config::SearchConfig;
use crate::error::{EntityKind, Error, Result};
use crate::model::{Bird, BirdId, Family, FamilyId, NewBird, NewFamily};
use crate::store::RecordStore;

pub(super) const BIRD_COLUMNS: &str =
    "id, english_name, latin_name, french_name, species_status, family_id";

/// A family with the number of birds assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyListing {
    /// The family.
    #[serde(flatten)]
    pub family: Family,
    /// Birds referencing this family.
    pub bird_count: usize,
}

/// Filters for [`Storage::birds`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BirdQuery {
    /// Substring matched against the English, Latin and French names.
    pub search: Option<String>,
    /// Only birds of this family.
    pub family_id: Option<FamilyId>,
}

/// A bird with its family name and how often it was seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BirdListing {
    /// The bird.
    #[serde(flatten)]
    pub bird: Bird,
    /// Name of the bird's family, if assigned.
    pub family_name: Option<String>,
    /// Number of sightings of this bird.
    pub sighting_count: usize,
}

impl Storage {
    // === Families ===

    /// Create a family.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the family name is blank.
    pub fn add_family(&self, new: &NewFamily) -> Result<Family> {
        check_family(new)?;
        self.conn.execute(
            "INSERT INTO families (family_name, subfamily_name) VALUES (?1, ?2)",
            params![new.family_name.trim(), new.subfamily_name],
        )?;
        let id = FamilyId(self.conn.last_insert_rowid());
        debug!("Added family {} ({})", id, new.family_name);
        self.family(id)
    }

    /// Replace a family's names.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name and `NotFound` for an unknown id.
    pub fn update_family(&self, id: FamilyId, new: &NewFamily) -> Result<Family> {
        check_family(new)?;
        let affected = self.conn.execute(
            "UPDATE families SET family_name = ?1, subfamily_name = ?2 WHERE id = ?3",
            params![new.family_name.trim(), new.subfamily_name, id],
        )?;
        if affected == 0 {
            return Err(Error::not_found(EntityKind::Family, id));
        }
        debug!("Updated family {}", id);
        self.family(id)
    }

    /// A single family.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub fn family(&self, id: FamilyId) -> Result<Family> {
        self.conn
            .query_row(
                "SELECT id, family_name, subfamily_name FROM families WHERE id = ?1",
                [id],
                row_to_family,
            )
            .optional()?
            .ok_or_else(|| Error::not_found(EntityKind::Family, id))
    }

    /// Every family with its bird count, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn families(&self) -> Result<Vec<FamilyListing>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT f.id, f.family_name, f.subfamily_name,
                   (SELECT COUNT(*) FROM birds b WHERE b.family_id = f.id)
            FROM families f
            ORDER BY f.family_name, f.subfamily_name, f.id
            ",
        )?;
        let listings = stmt
            .query_map([], |row| {
                let bird_count: i64 = row.get(3)?;
                Ok(FamilyListing {
                    family: row_to_family(row)?,
                    bird_count: to_usize(bird_count),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(listings)
    }

    /// Delete a family that no bird references.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id and `Conflict` while birds
    /// still belong to the family.
    pub fn delete_family(&self, id: FamilyId) -> Result<()> {
        let family = self.family(id)?;
        let birds = self.count_by("SELECT COUNT(*) FROM birds WHERE family_id = ?1", id.0)?;
        if birds > 0 {
            warn!("Refused to delete family {}: {} bird(s)", id, birds);
            return Err(Error::conflict(
                format!("family \"{family}\""),
                format!("{birds} bird(s) belong to it"),
            ));
        }

        self.conn
            .execute("DELETE FROM families WHERE id = ?1", [id])?;
        info!("Deleted family {} ({})", id, family);
        Ok(())
    }

    // === Birds ===

    /// Create a bird.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank English name and `NotFound` if the
    /// family does not exist.
    pub fn add_bird(&self, new: &NewBird) -> Result<Bird> {
        self.check_bird(new)?;
        self.conn.execute(
            r"
            INSERT INTO birds (english_name, latin_name, french_name, species_status, family_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                new.english_name.trim(),
                new.latin_name,
                new.french_name,
                new.species_status,
                new.family_id,
            ],
        )?;
        let id = BirdId(self.conn.last_insert_rowid());
        debug!("Added bird {} ({})", id, new.english_name);
        self.bird(id)
    }

    /// Replace every field of a bird.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank English name and `NotFound` for an
    /// unknown bird or family.
    pub fn update_bird(&self, id: BirdId, new: &NewBird) -> Result<Bird> {
        self.check_bird(new)?;
        let affected = self.conn.execute(
            r"
            UPDATE birds
            SET english_name = ?1, latin_name = ?2, french_name = ?3,
                species_status = ?4, family_id = ?5
            WHERE id = ?6
            ",
            params![
                new.english_name.trim(),
                new.latin_name,
                new.french_name,
                new.species_status,
                new.family_id,
                id,
            ],
        )?;
        if affected == 0 {
            return Err(Error::not_found(EntityKind::Bird, id));
        }
        debug!("Updated bird {}", id);
        self.bird(id)
    }

    /// Birds matching `query`, ordered by English name, with sighting counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn birds(&self, query: &BirdQuery) -> Result<Vec<BirdListing>> {
        let mut clauses = Clauses::default();
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            clauses.push_repeated(
                r"(b.english_name LIKE ? ESCAPE '\'
                    OR b.latin_name LIKE ? ESCAPE '\'
                    OR b.french_name LIKE ? ESCAPE '\')",
                &like_pattern(search),
            );
        }
        if let Some(family_id) = query.family_id {
            clauses.push("b.family_id = ?", Value::Integer(family_id.0));
        }

        let sql = format!(
            r"
            SELECT b.id, b.english_name, b.latin_name, b.french_name, b.species_status,
                   b.family_id, f.family_name,
                   (SELECT COUNT(*) FROM sightings s WHERE s.bird_id = b.id)
            FROM birds b
            LEFT JOIN families f ON f.id = b.family_id{}
            ORDER BY b.english_name, b.id
            ",
            clauses.where_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let listings = stmt
            .query_map(params_from_iter(clauses.values.iter()), |row| {
                let sighting_count: i64 = row.get(7)?;
                Ok(BirdListing {
                    bird: row_to_bird(row)?,
                    family_name: row.get(6)?,
                    sighting_count: to_usize(sighting_count),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(listings)
    }

    /// Autocomplete over bird names.
    ///
    /// Queries shorter than `limits.min_query_length` characters return
    /// nothing; at most `limits.result_limit` birds come back.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search_birds(&self, query: &str, limits: &SearchConfig) -> Result<Vec<Bird>> {
        let query = query.trim();
        if query.chars().count() < limits.min_query_length {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {BIRD_COLUMNS} FROM birds
            WHERE english_name LIKE ?1 ESCAPE '\'
                OR latin_name LIKE ?1 ESCAPE '\'
                OR french_name LIKE ?1 ESCAPE '\'
            ORDER BY english_name, id
            LIMIT ?2
            "
        ))?;
        let limit = i64::try_from(limits.result_limit).unwrap_or(i64::MAX);
        let birds = stmt
            .query_map(params![like_pattern(query), limit], row_to_bird)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(birds)
    }

    /// Delete a bird that has never been sighted.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id and `Conflict` if sightings
    /// reference the bird.
    pub fn delete_bird(&self, id: BirdId) -> Result<()> {
        self.delete_birds(&[id]).map(|_| ())
    }

    /// Delete several birds at once; either all go or none do.
    ///
    /// Returns the number of birds deleted.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for any unknown id and `Conflict` naming every
    /// bird that still has sightings.
    pub fn delete_birds(&self, ids: &[BirdId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut blockers = Vec::new();
        let mut names = Vec::with_capacity(ids.len());
        for &id in ids {
            let bird = self.bird(id)?;
            let sightings =
                self.count_by("SELECT COUNT(*) FROM sightings WHERE bird_id = ?1", id.0)?;
            if sightings > 0 {
                blockers.push(format!(
                    "\"{}\" has {sightings} sighting(s)",
                    bird.english_name
                ));
            }
            names.push(bird.english_name);
        }

        if !blockers.is_empty() {
            warn!("Refused to delete {} bird(s): {}", ids.len(), blockers.join("; "));
            let entity = match names.as_slice() {
                [only] => format!("bird \"{only}\""),
                _ => format!("{} birds", names.len()),
            };
            return Err(Error::conflict(entity, blockers.join("; ")));
        }

        let mut deleted = 0;
        for &id in ids {
            deleted += tx.execute("DELETE FROM birds WHERE id = ?1", [id])?;
        }
        tx.commit()?;

        info!("Deleted {} bird(s): {}", deleted, names.join(", "));
        Ok(deleted)
    }

    fn check_bird(&self, new: &NewBird) -> Result<()> {
        if let Err(err) = new.validate() {
            warn!("Rejected bird: {}", err);
            return Err(err);
        }
        if let Some(family_id) = new.family_id {
            self.family(family_id)?;
        }
        Ok(())
    }
}

fn check_family(new: &NewFamily) -> Result<()> {
    if let Err(err) = new.validate() {
        warn!("Rejected family: {}", err);
        return Err(err);
    }
    Ok(())
}

pub(super) fn row_to_bird(row: &rusqlite::Row) -> rusqlite::Result<Bird> {
    Ok(Bird {
        id: row.get(0)?,
        english_name: row.get(1)?,
        latin_name: row.get(2)?,
        french_name: row.get(3)?,
        species_status: row.get(4)?,
        family_id: row.get(5)?,
    })
}

fn row_to_family(row: &rusqlite::Row) -> rusqlite::Result<Family> {
    Ok(Family {
        id: row.get(0)?,
        family_name: row.get(1)?,
        subfamily_name: row.get(2)?,
    })
}
