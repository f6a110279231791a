//! `SQLite` schema definitions for birdlog.
//!
//! Dates are stored as ISO `YYYY-MM-DD` text, so string comparison orders
//! them chronologically.

/// Bird families and optional subfamilies.
pub const CREATE_FAMILIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS families (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    family_name TEXT NOT NULL,
    subfamily_name TEXT
)
";

/// Bird species. Names are deliberately not unique.
pub const CREATE_BIRDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS birds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    english_name TEXT NOT NULL,
    latin_name TEXT,
    french_name TEXT,
    species_status TEXT,
    family_id INTEGER REFERENCES families(id) ON DELETE SET NULL
)
";

/// Self-referential location forest.
pub const CREATE_LOCATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_name TEXT NOT NULL,
    parent_id INTEGER REFERENCES locations(id) ON DELETE CASCADE
)
";

/// Birding trips.
pub const CREATE_TRIPS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS trips (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trip_name TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    CHECK (end_date >= start_date)
)
";

/// The fact table every report aggregates over.
pub const CREATE_SIGHTINGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sightings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bird_id INTEGER NOT NULL REFERENCES birds(id) ON DELETE CASCADE,
    location_id INTEGER NOT NULL REFERENCES locations(id) ON DELETE CASCADE,
    trip_id INTEGER REFERENCES trips(id) ON DELETE SET NULL,
    date_seen TEXT NOT NULL,
    heard_not_seen INTEGER NOT NULL DEFAULT 0,
    count INTEGER NOT NULL DEFAULT 1 CHECK (count >= 1),
    notes TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// Window filters and recency ordering.
pub const CREATE_SIGHTINGS_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_sightings_date_seen ON sightings(date_seen DESC)
";

/// Per-species lookups and delete checks.
pub const CREATE_SIGHTINGS_BIRD_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_sightings_bird ON sightings(bird_id)
";

/// Location rollups.
pub const CREATE_SIGHTINGS_LOCATION_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_sightings_location ON sightings(location_id)
";

/// Trip detail.
pub const CREATE_SIGHTINGS_TRIP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_sightings_trip ON sightings(trip_id)
";

/// Child lookups.
pub const CREATE_LOCATIONS_PARENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_locations_parent ON locations(parent_id)
";

/// Family membership.
pub const CREATE_BIRDS_FAMILY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_birds_family ON birds(family_id)
";

/// Key-value store for schema bookkeeping.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements, parents before children.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_FAMILIES_TABLE,
    CREATE_BIRDS_TABLE,
    CREATE_LOCATIONS_TABLE,
    CREATE_TRIPS_TABLE,
    CREATE_SIGHTINGS_TABLE,
    CREATE_SIGHTINGS_DATE_INDEX,
    CREATE_SIGHTINGS_BIRD_INDEX,
    CREATE_SIGHTINGS_LOCATION_INDEX,
    CREATE_SIGHTINGS_TRIP_INDEX,
    CREATE_LOCATIONS_PARENT_INDEX,
    CREATE_BIRDS_FAMILY_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_sightings_reference_parents() {
        assert!(CREATE_SIGHTINGS_TABLE.contains("REFERENCES birds(id) ON DELETE CASCADE"));
        assert!(CREATE_SIGHTINGS_TABLE.contains("REFERENCES locations(id) ON DELETE CASCADE"));
        assert!(CREATE_SIGHTINGS_TABLE.contains("REFERENCES trips(id) ON DELETE SET NULL"));
    }

    #[test]
    fn test_parent_tables_created_first() {
        let position = |stmt: &str| SCHEMA_STATEMENTS.iter().position(|s| *s == stmt);
        assert!(position(CREATE_BIRDS_TABLE) < position(CREATE_SIGHTINGS_TABLE));
        assert!(position(CREATE_FAMILIES_TABLE) < position(CREATE_BIRDS_TABLE));
    }
}
