//! CLI command definitions.
//!
//! Year, month, page and page-size inputs are taken as raw strings and
//! parsed leniently by the report layer, so a bad value narrows nothing
//! instead of failing the command.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::model::{
    Bird, BirdId, Family, FamilyId, Location, LocationId, NewBird, NewFamily, NewLocation,
    NewSighting, NewTrip, Sighting, Trip, TripId,
};

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Plain,
    /// JSON output
    Json,
}

/// Format flag shared by read commands.
#[derive(Debug, Clone, Copy, Args)]
pub struct FormatArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Paging flags shared by list reports.
#[derive(Debug, Clone, Args)]
pub struct PageArgs {
    /// Rows per page, or "all"
    #[arg(short = 's', long, value_name = "N|all", allow_hyphen_values = true)]
    pub page_size: Option<String>,

    /// Page to show, starting at 1
    #[arg(short, long, allow_hyphen_values = true)]
    pub page: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Bird fields for add and edit.
#[derive(Debug, Clone, Args)]
pub struct BirdFields {
    /// Common English name
    pub english_name: String,

    /// Scientific name
    #[arg(long)]
    pub latin: Option<String>,

    /// Common French name
    #[arg(long)]
    pub french: Option<String>,

    /// Occurrence status, e.g. "Resident"
    #[arg(long)]
    pub status: Option<String>,

    /// Family id
    #[arg(long)]
    pub family: Option<i64>,
}

impl From<BirdFields> for NewBird {
    fn from(fields: BirdFields) -> Self {
        Self {
            english_name: fields.english_name,
            latin_name: fields.latin,
            french_name: fields.french,
            species_status: fields.status,
            family_id: fields.family.map(FamilyId),
        }
    }
}

/// Bird changes; fields left out keep their stored value.
#[derive(Debug, Clone, Default, Args)]
pub struct BirdEdit {
    /// Common English name
    pub english_name: Option<String>,

    /// Scientific name; empty to clear
    #[arg(long)]
    pub latin: Option<String>,

    /// Common French name; empty to clear
    #[arg(long)]
    pub french: Option<String>,

    /// Occurrence status; empty to clear
    #[arg(long)]
    pub status: Option<String>,

    /// Family id
    #[arg(long)]
    pub family: Option<i64>,

    /// Remove the bird from its family
    #[arg(long, conflicts_with = "family")]
    pub no_family: bool,
}

impl BirdEdit {
    /// Merge these changes over the stored bird.
    #[must_use]
    pub fn apply(self, current: &Bird) -> NewBird {
        let family_id = if self.no_family {
            None
        } else {
            self.family.map(FamilyId).or(current.family_id)
        };
        NewBird {
            english_name: self
                .english_name
                .unwrap_or_else(|| current.english_name.clone()),
            latin_name: merge_optional(self.latin, current.latin_name.as_deref()),
            french_name: merge_optional(self.french, current.french_name.as_deref()),
            species_status: merge_optional(self.status, current.species_status.as_deref()),
            family_id,
        }
    }
}

/// Bird commands.
#[derive(Debug, Subcommand)]
pub enum BirdCommand {
    /// Add a bird
    Add(BirdFields),

    /// Change a bird's fields
    Edit {
        /// Bird id
        id: i64,

        /// Changed field values
        #[command(flatten)]
        changes: BirdEdit,
    },

    /// Show a bird and its sightings
    Show {
        /// Bird id
        id: i64,

        /// Output options
        #[command(flatten)]
        output: FormatArgs,
    },

    /// List birds with sighting counts
    List {
        /// Match English, Latin or French names
        #[arg(long)]
        search: Option<String>,

        /// Only birds of this family id
        #[arg(long)]
        family: Option<i64>,

        /// Output options
        #[command(flatten)]
        output: FormatArgs,
    },

    /// Autocomplete bird names
    Search {
        /// Partial name
        query: String,

        /// Output options
        #[command(flatten)]
        output: FormatArgs,
    },

    /// Delete birds with no sightings (all or none)
    Delete {
        /// Bird ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

/// Family commands.
#[derive(Debug, Subcommand)]
pub enum FamilyCommand {
    /// Add a family
    Add {
        /// Family name
        name: String,

        /// Subfamily name
        #[arg(long)]
        subfamily: Option<String>,
    },

    /// Rename a family
    Edit {
        /// Family id
        id: i64,

        /// Changed field values
        #[command(flatten)]
        changes: FamilyEdit,
    },

    /// List families with bird counts
    List {
        /// Output options
        #[command(flatten)]
        output: FormatArgs,
    },

    /// Delete a family no bird belongs to
    Delete {
        /// Family id
        id: i64,
    },
}

/// Family changes; fields left out keep their stored value.
#[derive(Debug, Clone, Default, Args)]
pub struct FamilyEdit {
    /// Family name
    pub name: Option<String>,

    /// Subfamily name; empty to clear
    #[arg(long)]
    pub subfamily: Option<String>,
}

impl FamilyEdit {
    /// Merge these changes over the stored family.
    #[must_use]
    pub fn apply(self, current: &Family) -> NewFamily {
        NewFamily {
            family_name: self.name.unwrap_or_else(|| current.family_name.clone()),
            subfamily_name: merge_optional(self.subfamily, current.subfamily_name.as_deref()),
        }
    }
}

/// Location changes; fields left out keep their stored value.
#[derive(Debug, Clone, Default, Args)]
pub struct LocationEdit {
    /// Location name
    pub name: Option<String>,

    /// Move under this location id
    #[arg(long)]
    pub parent: Option<i64>,

    /// Move to the top level
    #[arg(long, conflicts_with = "parent")]
    pub top_level: bool,
}

impl LocationEdit {
    /// Merge these changes over the stored location.
    #[must_use]
    pub fn apply(self, current: &Location) -> NewLocation {
        let parent_id = if self.top_level {
            None
        } else {
            self.parent.map(LocationId).or(current.parent_id)
        };
        NewLocation::new(
            self.name.unwrap_or_else(|| current.location_name.clone()),
            parent_id,
        )
    }
}

/// Location commands.
#[derive(Debug, Subcommand)]
pub enum LocationCommand {
    /// Add a location
    Add {
        /// Location name
        name: String,

        /// Parent location id
        #[arg(long)]
        parent: Option<i64>,
    },

    /// Rename or move a location
    Edit {
        /// Location id
        id: i64,

        /// Changed field values
        #[command(flatten)]
        changes: LocationEdit,
    },

    /// Show a location's subtree summary
    Show {
        /// Location id
        id: i64,

        /// Number of recent sightings to show
        #[arg(long)]
        recent: Option<usize>,

        /// Output options
        #[command(flatten)]
        output: FormatArgs,
    },

    /// List locations with counts and paths
    List {
        /// Match location names
        #[arg(long)]
        search: Option<String>,

        /// Only children of this location id
        #[arg(long)]
        parent: Option<i64>,

        /// Only top-level locations
        #[arg(long, conflicts_with = "parent")]
        top_level: bool,

        /// Output options
        #[command(flatten)]
        output: FormatArgs,
    },

    /// Autocomplete location names
    Search {
        /// Partial name
        query: String,

        /// Output options
        #[command(flatten)]
        output: FormatArgs,
    },

    /// Delete locations with no sightings and no children (all or none)
    Delete {
        /// Location ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

/// Trip fields for add and edit.
#[derive(Debug, Clone, Args)]
pub struct TripFields {
    /// Trip name
    pub name: String,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day (YYYY-MM-DD); defaults to the first day
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Description
    #[arg(long, default_value = "")]
    pub description: String,
}

impl From<TripFields> for NewTrip {
    fn from(fields: TripFields) -> Self {
        Self {
            trip_name: fields.name,
            start_date: fields.start,
            end_date: fields.end.unwrap_or(fields.start),
            description: fields.description,
        }
    }
}

/// Trip changes; fields left out keep their stored value.
#[derive(Debug, Clone, Default, Args)]
pub struct TripEdit {
    /// Trip name
    pub name: Option<String>,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Description
    #[arg(long)]
    pub description: Option<String>,
}

impl TripEdit {
    /// Merge these changes over the stored trip.
    #[must_use]
    pub fn apply(self, current: &Trip) -> NewTrip {
        NewTrip {
            trip_name: self.name.unwrap_or_else(|| current.trip_name.clone()),
            start_date: self.start.unwrap_or(current.start_date),
            end_date: self.end.unwrap_or(current.end_date),
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
        }
    }
}

/// Trip commands.
#[derive(Debug, Subcommand)]
pub enum TripCommand {
    /// Add a trip
    Add(TripFields),

    /// Change a trip's fields
    Edit {
        /// Trip id
        id: i64,

        /// Changed field values
        #[command(flatten)]
        changes: TripEdit,
    },

    /// Show a trip with its sightings
    Show {
        /// Trip id
        id: i64,

        /// Output options
        #[command(flatten)]
        output: FormatArgs,
    },

    /// List trips with sighting totals
    List {
        /// Match name or description
        #[arg(long)]
        search: Option<String>,

        /// Only trips starting or ending in this year
        #[arg(long)]
        year: Option<i32>,

        /// Output options
        #[command(flatten)]
        output: FormatArgs,
    },

    /// Delete a trip; its sightings are kept without a trip
    Delete {
        /// Trip id
        id: i64,
    },
}

/// Sighting fields for add and edit.
#[derive(Debug, Clone, Args)]
pub struct SightingFields {
    /// Bird id
    #[arg(long)]
    pub bird: i64,

    /// Location id
    #[arg(long)]
    pub location: i64,

    /// Date seen (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Trip id
    #[arg(long)]
    pub trip: Option<i64>,

    /// Number of individuals
    #[arg(long, default_value = "1")]
    pub count: u32,

    /// Identified by call or song only
    #[arg(long)]
    pub heard: bool,

    /// Notes
    #[arg(long, default_value = "")]
    pub notes: String,
}

impl SightingFields {
    /// The sighting to record, dated `today` when no date was given.
    #[must_use]
    pub fn into_new(self, today: NaiveDate) -> NewSighting {
        NewSighting {
            bird_id: BirdId(self.bird),
            location_id: LocationId(self.location),
            trip_id: self.trip.map(TripId),
            date_seen: self.date.unwrap_or(today),
            heard_not_seen: self.heard,
            count: self.count,
            notes: self.notes,
        }
    }
}

/// Sighting changes; fields left out keep their stored value.
#[derive(Debug, Clone, Default, Args)]
pub struct SightingEdit {
    /// Bird id
    #[arg(long)]
    pub bird: Option<i64>,

    /// Location id
    #[arg(long)]
    pub location: Option<i64>,

    /// Date seen (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Trip id
    #[arg(long)]
    pub trip: Option<i64>,

    /// Detach the sighting from its trip
    #[arg(long, conflicts_with = "trip")]
    pub no_trip: bool,

    /// Number of individuals
    #[arg(long)]
    pub count: Option<u32>,

    /// Identified by call or song only
    #[arg(long, conflicts_with = "seen")]
    pub heard: bool,

    /// Seen rather than only heard
    #[arg(long)]
    pub seen: bool,

    /// Notes
    #[arg(long)]
    pub notes: Option<String>,
}

impl SightingEdit {
    /// Merge these changes over the stored sighting.
    #[must_use]
    pub fn apply(self, current: &Sighting) -> NewSighting {
        let trip_id = if self.no_trip {
            None
        } else {
            self.trip.map(TripId).or(current.trip_id)
        };
        let heard_not_seen = match (self.heard, self.seen) {
            (true, _) => true,
            (_, true) => false,
            _ => current.heard_not_seen,
        };
        NewSighting {
            bird_id: self.bird.map_or(current.bird_id, BirdId),
            location_id: self.location.map_or(current.location_id, LocationId),
            trip_id,
            date_seen: self.date.unwrap_or(current.date_seen),
            heard_not_seen,
            count: self.count.unwrap_or(current.count),
            notes: self.notes.unwrap_or_else(|| current.notes.clone()),
        }
    }
}

/// Sighting commands.
#[derive(Debug, Subcommand)]
pub enum SightingCommand {
    /// Record a sighting
    Add(SightingFields),

    /// Change a sighting's fields
    Edit {
        /// Sighting id
        id: i64,

        /// Changed field values
        #[command(flatten)]
        changes: SightingEdit,
    },

    /// Show one sighting
    Show {
        /// Sighting id
        id: i64,

        /// Output options
        #[command(flatten)]
        output: FormatArgs,
    },

    /// List sightings, newest first
    List {
        /// Year filter
        #[arg(long)]
        year: Option<String>,

        /// Month filter (1-12), used with --year
        #[arg(long)]
        month: Option<String>,

        /// Location id; includes every location beneath it
        #[arg(long)]
        location: Option<i64>,

        /// Trip id
        #[arg(long)]
        trip: Option<i64>,

        /// Bird id
        #[arg(long)]
        bird: Option<i64>,

        /// Output options
        #[command(flatten)]
        output: FormatArgs,
    },

    /// Delete a sighting
    Delete {
        /// Sighting id
        id: i64,
    },
}

/// Year list arguments.
#[derive(Debug, Clone, Args)]
pub struct YearListCommand {
    /// Year to show; omit for every year
    #[arg(short, long)]
    pub year: Option<String>,

    /// Paging and output options
    #[command(flatten)]
    pub paging: PageArgs,
}

/// Month list arguments.
#[derive(Debug, Clone, Args)]
pub struct MonthListCommand {
    /// Year to show
    #[arg(short, long)]
    pub year: Option<String>,

    /// Month to show (1-12)
    #[arg(short, long)]
    pub month: Option<String>,

    /// Paging and output options
    #[command(flatten)]
    pub paging: PageArgs,
}

/// Location species list arguments.
#[derive(Debug, Clone, Args)]
pub struct LocationListCommand {
    /// Location id
    pub location: i64,

    /// Paging and output options
    #[command(flatten)]
    pub paging: PageArgs,
}

/// Dashboard arguments.
#[derive(Debug, Clone, Args)]
pub struct HomeCommand {
    /// Day to report on (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Output options
    #[command(flatten)]
    pub output: FormatArgs,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// An optional text change: absent keeps `current`, blank clears it.
fn merge_optional(change: Option<String>, current: Option<&str>) -> Option<String> {
    match change {
        Some(value) if value.trim().is_empty() => None,
        Some(value) => Some(value),
        None => current.map(str::to_string),
    }
}
