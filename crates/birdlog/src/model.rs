//! Record types for birdlog.
//!
//! Birds, families, locations, trips and the sightings that link them.
//! Each record has a typed identity so a `BirdId` can never be passed
//! where a `LocationId` is expected.

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

record_id!(
    /// Identity of a [`Bird`].
    BirdId
);
record_id!(
    /// Identity of a [`Family`].
    FamilyId
);
record_id!(
    /// Identity of a [`Location`].
    LocationId
);
record_id!(
    /// Identity of a [`Trip`].
    TripId
);
record_id!(
    /// Identity of a [`Sighting`].
    SightingId
);

/// A bird species.
///
/// Names are not unique; two records may share an English name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bird {
    /// Identity assigned by the store.
    pub id: BirdId,
    /// Common English name.
    pub english_name: String,
    /// Binomial scientific name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latin_name: Option<String>,
    /// Common French name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub french_name: Option<String>,
    /// Occurrence or conservation status (e.g. "Resident", "Vagrant").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species_status: Option<String>,
    /// The family this bird belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_id: Option<FamilyId>,
}

impl Bird {
    /// Name with the scientific name in parentheses when known.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.latin_name {
            Some(latin) if !latin.is_empty() => format!("{} ({latin})", self.english_name),
            _ => self.english_name.clone(),
        }
    }
}

/// Fields for creating or replacing a [`Bird`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBird {
    /// Common English name (required).
    pub english_name: String,
    /// Binomial scientific name.
    pub latin_name: Option<String>,
    /// Common French name.
    pub french_name: Option<String>,
    /// Occurrence or conservation status.
    pub species_status: Option<String>,
    /// Owning family.
    pub family_id: Option<FamilyId>,
}

impl NewBird {
    /// Shorthand for a bird with only an English name.
    #[must_use]
    pub fn named(english_name: impl Into<String>) -> Self {
        Self {
            english_name: english_name.into(),
            ..Self::default()
        }
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the English name is blank.
    pub fn validate(&self) -> Result<()> {
        require_name("english_name", &self.english_name)
    }
}

/// A bird family, optionally narrowed to a subfamily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    /// Identity assigned by the store.
    pub id: FamilyId,
    /// Family name.
    pub family_name: String,
    /// Subfamily name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subfamily_name: Option<String>,
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subfamily_name {
            Some(sub) if !sub.is_empty() => write!(f, "{} - {sub}", self.family_name),
            _ => write!(f, "{}", self.family_name),
        }
    }
}

/// Fields for creating or replacing a [`Family`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFamily {
    /// Family name (required).
    pub family_name: String,
    /// Subfamily name.
    pub subfamily_name: Option<String>,
}

impl NewFamily {
    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the family name is blank.
    pub fn validate(&self) -> Result<()> {
        require_name("family_name", &self.family_name)
    }
}

/// A place where birds are seen. Locations nest through `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Identity assigned by the store.
    pub id: LocationId,
    /// Display name of this node only.
    pub location_name: String,
    /// The enclosing location, `None` for a root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<LocationId>,
}

/// Fields for creating or replacing a [`Location`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    /// Display name (required).
    pub location_name: String,
    /// The enclosing location.
    pub parent_id: Option<LocationId>,
}

impl NewLocation {
    /// A location with the given name and parent.
    #[must_use]
    pub fn new(location_name: impl Into<String>, parent_id: Option<LocationId>) -> Self {
        Self {
            location_name: location_name.into(),
            parent_id,
        }
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the name is blank.
    pub fn validate(&self) -> Result<()> {
        require_name("location_name", &self.location_name)
    }
}

/// A birding trip spanning one or more days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    /// Identity assigned by the store.
    pub id: TripId,
    /// Trip name.
    pub trip_name: String,
    /// First day of the trip.
    pub start_date: NaiveDate,
    /// Last day of the trip (inclusive).
    pub end_date: NaiveDate,
    /// Free-form description.
    pub description: String,
}

impl Trip {
    /// Length of the trip in days, counting both ends.
    #[must_use]
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Fields for creating or replacing a [`Trip`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrip {
    /// Trip name (required).
    pub trip_name: String,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day (inclusive).
    pub end_date: NaiveDate,
    /// Free-form description.
    pub description: String,
}

impl NewTrip {
    /// Check required fields and the date range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the name is blank or the trip ends
    /// before it starts.
    pub fn validate(&self) -> Result<()> {
        require_name("trip_name", &self.trip_name)?;
        if self.end_date < self.start_date {
            return Err(Error::validation(format!(
                "end date {} cannot be before start date {}",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

/// One observation of a bird at a location on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
    /// Identity assigned by the store.
    pub id: SightingId,
    /// The species seen.
    pub bird_id: BirdId,
    /// Where it was seen.
    pub location_id: LocationId,
    /// The trip this sighting belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<TripId>,
    /// Date of the observation.
    pub date_seen: NaiveDate,
    /// Identified by call or song only.
    pub heard_not_seen: bool,
    /// Number of individuals (at least 1).
    pub count: u32,
    /// Free-form notes.
    pub notes: String,
}

/// Fields for recording a [`Sighting`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSighting {
    /// The species seen.
    pub bird_id: BirdId,
    /// Where it was seen.
    pub location_id: LocationId,
    /// Owning trip.
    pub trip_id: Option<TripId>,
    /// Date of the observation.
    pub date_seen: NaiveDate,
    /// Identified by call or song only.
    pub heard_not_seen: bool,
    /// Number of individuals.
    pub count: u32,
    /// Free-form notes.
    pub notes: String,
}

impl NewSighting {
    /// A single bird seen at a location on a date, no trip and no notes.
    #[must_use]
    pub fn new(bird_id: BirdId, location_id: LocationId, date_seen: NaiveDate) -> Self {
        Self {
            bird_id,
            location_id,
            trip_id: None,
            date_seen,
            heard_not_seen: false,
            count: 1,
            notes: String::new(),
        }
    }

    /// Check field-level constraints. References are checked by the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `count` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(Error::validation("count must be at least 1"));
        }
        Ok(())
    }
}

fn require_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(())
}
