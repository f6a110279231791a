//! Plain-text rendering of records and reports.
//!
//! Each function returns the whole text block; the binary prints it.

use crate::filter::TimeWindow;
use crate::paginate::{Page, PageSize};
use crate::reports::{
    BirdDetail, Home, LifeList, LocationDetail, LocationSpecies, MonthList, PeriodTotals,
    SightingView, SpeciesEntry, TripDetail, YearList,
};
use crate::storage::{
    BirdListing, FamilyListing, LocationListing, LocationMatch, StorageStats, TripListing,
};

/// One line per species, numbered across pages, with a pager footer.
///
/// With `mark_additions`, species first seen within the listed scope are
/// flagged with `*`.
#[must_use]
pub fn species_page(page: &Page<SpeciesEntry>, mark_additions: bool) -> String {
    if page.items.is_empty() {
        return "No species recorded.".to_string();
    }

    let offset = match page.page_size {
        PageSize::All => 0,
        PageSize::Count(n) => (page.number - 1) * n.get(),
    };
    let mut lines: Vec<String> = page
        .items
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut line = format!(
                "{:>4}. {}  first {}  last {}  ({} sighting(s), {} bird(s))",
                offset + i + 1,
                entry.bird.display_name(),
                entry.first_seen,
                entry.last_seen,
                entry.sighting_count,
                entry.individuals
            );
            if mark_additions && entry.is_life_list_addition {
                line.push_str("  *");
            }
            line
        })
        .collect();

    if page.has_multiple_pages {
        lines.push(String::new());
        lines.push(format!(
            "Page {} of {} ({} species, {} per page)",
            page.number, page.total_pages, page.total_items, page.page_size
        ));
    }
    lines.join("\n")
}

fn totals_line(totals: &PeriodTotals) -> String {
    format!(
        "{} sighting(s), {} species, {} new to the life list",
        totals.total_sightings, totals.unique_species, totals.new_species
    )
}

/// The life list.
#[must_use]
pub fn life_list(report: &LifeList) -> String {
    format!(
        "Life list: {} species\n\n{}",
        report.total_species,
        species_page(&report.entries, false)
    )
}

/// A year list with its per-year index.
#[must_use]
pub fn year_list(report: &YearList) -> String {
    let mut lines = vec![match report.year {
        Some(year) => format!("Year list: {year}"),
        None => "Year list: all years".to_string(),
    }];
    if let Some(totals) = &report.totals {
        lines.push(totals_line(totals));
    }
    lines.push(String::new());
    lines.push(species_page(&report.entries, report.year.is_some()));
    lines.push(String::new());
    lines.push(format!("Life list: {} species", report.total_all_species));
    for stats in &report.years {
        lines.push(format!(
            "  {}: {} species, {} sighting(s)",
            stats.period, stats.species_count, stats.sighting_count
        ));
    }
    lines.join("\n")
}

/// A month list with its year and month index.
#[must_use]
pub fn month_list(report: &MonthList) -> String {
    let mut lines = vec![format!("Month list: {}", report.window)];
    if let Some(totals) = &report.totals {
        lines.push(totals_line(totals));
    }
    lines.push(String::new());
    let bounded = !matches!(report.window, TimeWindow::All);
    lines.push(species_page(&report.entries, bounded));
    lines.push(String::new());
    lines.push(format!("Life list: {} species", report.total_all_species));
    for year in &report.index {
        lines.push(format!(
            "  {}: {} species, {} sighting(s)",
            year.year, year.species_count, year.sighting_count
        ));
        for month in &year.months {
            lines.push(format!(
                "    {}: {} species, {} sighting(s)",
                month.month_name, month.species_count, month.sighting_count
            ));
        }
    }
    lines.join("\n")
}

/// Species seen at a location subtree.
#[must_use]
pub fn location_species(report: &LocationSpecies) -> String {
    let mut lines = vec![
        report.full_path.clone(),
        format!(
            "{} species, {} sighting(s), {} location(s) beneath",
            report.total_species,
            report.total_sightings,
            report.descendants.len()
        ),
        String::new(),
        species_page(&report.entries, true),
    ];
    if !report.descendants.is_empty() {
        lines.push(String::new());
        lines.push("Includes:".to_string());
        lines.extend(
            report
                .descendants
                .iter()
                .map(|l| format!("  [{}] {}", l.id, l.location_name)),
        );
    }
    lines.join("\n")
}

/// One sighting line.
#[must_use]
pub fn sighting_line(view: &SightingView) -> String {
    let s = &view.sighting;
    let mut line = format!(
        "[{}] {}  {}  {}",
        s.id, s.date_seen, view.bird_name, view.location_name
    );
    if s.count > 1 {
        line.push_str(&format!("  x{}", s.count));
    }
    if s.heard_not_seen {
        line.push_str("  (heard)");
    }
    if let Some(trip) = &view.trip_name {
        line.push_str(&format!("  trip: {trip}"));
    }
    if !s.notes.is_empty() {
        line.push_str(&format!("  - {}", s.notes));
    }
    line
}

/// Sightings, one per line.
#[must_use]
pub fn sightings(views: &[SightingView]) -> String {
    if views.is_empty() {
        return "No sightings.".to_string();
    }
    views.iter().map(sighting_line).collect::<Vec<_>>().join("\n")
}

/// A location's subtree summary.
#[must_use]
pub fn location_detail(report: &LocationDetail) -> String {
    let mut lines = vec![
        report.full_path.clone(),
        format!(
            "{} sighting(s), {} species, {} location(s) beneath",
            report.total_sightings, report.unique_species, report.descendant_count
        ),
    ];
    if let Some(first) = &report.first_sighting {
        lines.push(format!("First:  {}", sighting_line(first)));
    }
    if let Some(latest) = &report.latest_sighting {
        lines.push(format!("Latest: {}", sighting_line(latest)));
    }
    if !report.children.is_empty() {
        lines.push(String::new());
        lines.push("Children:".to_string());
        for child in &report.children {
            lines.push(format!(
                "  [{}] {} ({} sighting(s))",
                child.location.id, child.location.location_name, child.sighting_count
            ));
        }
    }
    if !report.recent_sightings.is_empty() {
        lines.push(String::new());
        lines.push("Recent:".to_string());
        lines.push(sightings(&report.recent_sightings));
    }
    lines.join("\n")
}

/// A trip with its sightings.
#[must_use]
pub fn trip_detail(report: &TripDetail) -> String {
    let trip = &report.trip;
    let mut lines = vec![
        format!(
            "{} ({} to {}, {} day(s))",
            trip.trip_name, trip.start_date, trip.end_date, report.duration_days
        ),
        format!(
            "{} sighting(s), {} species, {} location(s)",
            report.total_sightings,
            report.unique_birds.len(),
            report.unique_locations.len()
        ),
    ];
    if !trip.description.is_empty() {
        lines.push(trip.description.clone());
    }
    lines.push(String::new());
    lines.push(sightings(&report.sightings));
    lines.join("\n")
}

/// A bird with its sightings.
#[must_use]
pub fn bird_detail(report: &BirdDetail) -> String {
    let mut lines = vec![
        report.bird.display_name(),
        format!(
            "{} sighting(s) at {} location(s)",
            report.total_sightings,
            report.locations.len()
        ),
    ];
    if !report.locations.is_empty() {
        lines.push(format!("Seen at: {}", report.locations.join(", ")));
    }
    lines.push(String::new());
    lines.push(sightings(&report.sightings));
    lines.join("\n")
}

/// The dashboard.
#[must_use]
pub fn home(report: &Home) -> String {
    let mut lines = vec![
        format!("birdlog - {}", report.today),
        format!("Life list:   {} species", report.life_list_count),
        format!(
            "This year:   {} species (last year {})",
            report.year_species, report.last_year_species
        ),
        format!(
            "This month:  {} species (last month {})",
            report.month_species, report.last_month_species
        ),
        String::new(),
        "Today:".to_string(),
    ];
    lines.push(sightings(&report.todays_sightings));
    lines.join("\n")
}

/// Bird listing rows.
#[must_use]
pub fn birds(listings: &[BirdListing]) -> String {
    if listings.is_empty() {
        return "No birds.".to_string();
    }
    listings
        .iter()
        .map(|l| {
            format!(
                "[{}] {}  {}  ({} sighting(s))",
                l.bird.id,
                l.bird.display_name(),
                l.family_name.as_deref().unwrap_or("-"),
                l.sighting_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Family listing rows.
#[must_use]
pub fn families(listings: &[FamilyListing]) -> String {
    if listings.is_empty() {
        return "No families.".to_string();
    }
    listings
        .iter()
        .map(|l| format!("[{}] {}  ({} bird(s))", l.family.id, l.family, l.bird_count))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Location listing rows.
#[must_use]
pub fn locations(listings: &[LocationListing]) -> String {
    if listings.is_empty() {
        return "No locations.".to_string();
    }
    listings
        .iter()
        .map(|l| {
            format!(
                "[{}] {}  ({} sighting(s), {} child(ren))",
                l.location.id, l.full_path, l.sighting_count, l.child_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Location autocomplete rows.
#[must_use]
pub fn location_matches(matches: &[LocationMatch]) -> String {
    matches
        .iter()
        .map(|m| format!("[{}] {}", m.location.id, m.full_path))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trip listing rows.
#[must_use]
pub fn trips(listings: &[TripListing]) -> String {
    if listings.is_empty() {
        return "No trips.".to_string();
    }
    listings
        .iter()
        .map(|l| {
            format!(
                "[{}] {}  {} to {}  ({} sighting(s))",
                l.trip.id, l.trip.trip_name, l.trip.start_date, l.trip.end_date, l.sighting_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Database status.
#[must_use]
pub fn stats(stats: &StorageStats, path: &std::path::Path) -> String {
    let span = match (stats.first_sighting, stats.last_sighting) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "-".to_string(),
    };
    [
        "birdlog status".to_string(),
        "--------------".to_string(),
        format!("Database:      {}", path.display()),
        format!("Schema:        v{}", stats.schema_version),
        format!("Size:          {} bytes", stats.db_size_bytes),
        format!("Families:      {}", stats.families),
        format!("Birds:         {}", stats.birds),
        format!("Locations:     {}", stats.locations),
        format!("Trips:         {}", stats.trips),
        format!("Sightings:     {}", stats.sightings),
        format!("Span:          {span}"),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::paginate::PageNumber;
    use crate::reports;
    use crate::storage::test_support::*;
    use crate::storage::Storage;

    fn size(n: usize) -> PageSize {
        PageSize::Count(NonZeroUsize::new(n).unwrap())
    }

    fn page(n: usize) -> PageNumber {
        PageNumber::from(NonZeroUsize::new(n).unwrap())
    }

    #[test]
    fn test_species_page_numbers_continue_across_pages() {
        let storage = Storage::open_in_memory().unwrap();
        let park = location(&storage, "High Park", None);
        for (day, name) in ["Robin", "Wren", "Heron"].iter().enumerate() {
            let id = bird(&storage, name);
            seen(&storage, id, park, date(2023, 5, u32::try_from(day).unwrap() + 1));
        }

        let report = reports::life_list(&storage, size(2), page(2)).unwrap();
        let text = species_page(&report.entries, false);
        assert!(text.contains("   3. Robin"));
        assert!(text.contains("Page 2 of 2 (3 species, 2 per page)"));
    }

    #[test]
    fn test_addition_marker_only_for_bounded_windows() {
        let storage = Storage::open_in_memory().unwrap();
        let park = location(&storage, "High Park", None);
        let robin = bird(&storage, "Robin");
        let wren = bird(&storage, "Wren");
        seen(&storage, robin, park, date(2022, 5, 1));
        seen(&storage, robin, park, date(2023, 5, 1));
        seen(&storage, wren, park, date(2023, 5, 2));

        let life = reports::life_list(&storage, PageSize::All, PageNumber::FIRST).unwrap();
        assert!(!life_list(&life).contains('*'));

        let all_years = reports::year_list(&storage, None, PageSize::All, PageNumber::FIRST);
        assert!(!year_list(&all_years.unwrap()).contains('*'));

        let window = TimeWindow::Month {
            year: 2023,
            month: 5,
        };
        let month = reports::month_list(&storage, window, PageSize::All, PageNumber::FIRST);
        let text = month_list(&month.unwrap());
        let wren_line = text.lines().find(|l| l.contains("Wren")).unwrap();
        let robin_line = text.lines().find(|l| l.contains("Robin")).unwrap();
        assert!(wren_line.ends_with("  *"));
        assert!(!robin_line.ends_with('*'));
    }

    #[test]
    fn test_empty_reports() {
        let storage = Storage::open_in_memory().unwrap();
        let report = reports::life_list(&storage, PageSize::All, PageNumber::FIRST).unwrap();
        assert!(life_list(&report).contains("No species recorded."));
        assert_eq!(sightings(&[]), "No sightings.");
        assert_eq!(birds(&[]), "No birds.");
    }

    #[test]
    fn test_sighting_line_flags() {
        let storage = Storage::open_in_memory().unwrap();
        let robin = bird(&storage, "American Robin");
        let park = location(&storage, "High Park", None);
        let mut new = crate::model::NewSighting::new(robin, park, date(2023, 5, 1));
        new.count = 3;
        new.heard_not_seen = true;
        new.notes = "singing".to_string();
        storage.add_sighting(&new).unwrap();

        let views = reports::sighting_log(&storage, &crate::filter::SightingFilter::all()).unwrap();
        let line = sighting_line(&views[0]);
        assert!(line.contains("2023-05-01  American Robin  High Park  x3  (heard)"));
        assert!(line.ends_with("- singing"));
    }

    #[test]
    fn test_home_text() {
        let storage = Storage::open_in_memory().unwrap();
        let robin = bird(&storage, "American Robin");
        let park = location(&storage, "High Park", None);
        seen(&storage, robin, park, date(2023, 5, 1));

        let text = home(&reports::home(&storage, date(2023, 5, 1)).unwrap());
        assert!(text.contains("Life list:   1 species"));
        assert!(text.contains("American Robin"));
    }
}
