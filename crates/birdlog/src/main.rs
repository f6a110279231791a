//! `birdlog` - CLI for the birdwatching log
//!
//! This binary records birds, locations, trips and sightings, and prints
//! the life, year, month and location reports built from them.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;
use tracing::debug;

use birdlog::cli::{
    render, BirdCommand, Cli, Command, ConfigCommand, FamilyCommand, LocationCommand,
    OutputFormat, PageArgs, SightingCommand, TripCommand,
};
use birdlog::filter::{SightingFilter, TimeWindow};
use birdlog::hierarchy::LocationTree;
use birdlog::model::{
    BirdId, FamilyId, LocationId, NewBird, NewFamily, NewLocation, NewTrip, SightingId, TripId,
};
use birdlog::paginate::{PageNumber, PageSize};
use birdlog::reports;
use birdlog::storage::{BirdQuery, LocationQuery, TripQuery};
use birdlog::{init_logging, Config, RecordStore, Storage};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        command => {
            let path = config.database_path();
            let storage = Storage::open(&path)
                .with_context(|| format!("failed to open database {}", path.display()))?;
            debug!("Using database {}", path.display());
            run(&config, &storage, command)
        }
    }
}

fn run(config: &Config, storage: &Storage, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Bird(cmd) => handle_bird(config, storage, cmd),
        Command::Family(cmd) => handle_family(storage, cmd),
        Command::Location(cmd) => handle_location(config, storage, cmd),
        Command::Trip(cmd) => handle_trip(storage, cmd),
        Command::Sighting(cmd) => handle_sighting(storage, cmd),
        Command::LifeList(paging) => {
            let report = reports::life_list(
                storage,
                page_size(config, &paging),
                page_number(&paging),
            )?;
            emit(paging.format, &report, render::life_list)
        }
        Command::YearList(cmd) => {
            let year = TimeWindow::parse_year(cmd.year.as_deref()).year();
            let report = reports::year_list(
                storage,
                year,
                page_size(config, &cmd.paging),
                page_number(&cmd.paging),
            )?;
            emit(cmd.paging.format, &report, render::year_list)
        }
        Command::MonthList(cmd) => {
            let window = TimeWindow::parse(cmd.year.as_deref(), cmd.month.as_deref());
            let report = reports::month_list(
                storage,
                window,
                page_size(config, &cmd.paging),
                page_number(&cmd.paging),
            )?;
            emit(cmd.paging.format, &report, render::month_list)
        }
        Command::LocationList(cmd) => {
            let report = reports::location_species(
                storage,
                LocationId(cmd.location),
                page_size(config, &cmd.paging),
                page_number(&cmd.paging),
            )?;
            emit(cmd.paging.format, &report, render::location_species)
        }
        Command::Home(cmd) => {
            let report = reports::home(storage, cmd.date.unwrap_or_else(today))?;
            emit(cmd.output.format, &report, render::home)
        }
        Command::Status(output) => {
            let stats = storage.stats()?;
            emit(output.format, &stats, |s| render::stats(s, storage.path()))
        }
        Command::Config(cmd) => handle_config(config, cmd),
    }
}

fn handle_bird(config: &Config, storage: &Storage, cmd: BirdCommand) -> anyhow::Result<()> {
    match cmd {
        BirdCommand::Add(fields) => {
            let bird = storage.add_bird(&NewBird::from(fields))?;
            println!("Added bird {}: {}", bird.id, bird.display_name());
        }
        BirdCommand::Edit { id, changes } => {
            let id = BirdId(id);
            let bird = storage.update_bird(id, &changes.apply(&storage.bird(id)?))?;
            println!("Updated bird {}: {}", bird.id, bird.display_name());
        }
        BirdCommand::Show { id, output } => {
            let report = reports::bird_detail(storage, BirdId(id))?;
            emit(output.format, &report, render::bird_detail)?;
        }
        BirdCommand::List {
            search,
            family,
            output,
        } => {
            let listings = storage.birds(&BirdQuery {
                search,
                family_id: family.map(FamilyId),
            })?;
            emit(output.format, &listings, |l| render::birds(l))?;
        }
        BirdCommand::Search { query, output } => {
            let birds = storage.search_birds(&query, &config.search)?;
            emit(output.format, &birds, |birds| {
                birds
                    .iter()
                    .map(|b| format!("[{}] {}", b.id, b.display_name()))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        BirdCommand::Delete { ids } => {
            let ids: Vec<BirdId> = ids.into_iter().map(BirdId).collect();
            let deleted = storage.delete_birds(&ids)?;
            println!("Deleted {deleted} bird(s)");
        }
    }
    Ok(())
}

fn handle_family(storage: &Storage, cmd: FamilyCommand) -> anyhow::Result<()> {
    match cmd {
        FamilyCommand::Add { name, subfamily } => {
            let family = storage.add_family(&NewFamily {
                family_name: name,
                subfamily_name: subfamily,
            })?;
            println!("Added family {}: {}", family.id, family);
        }
        FamilyCommand::Edit { id, changes } => {
            let id = FamilyId(id);
            let family = storage.update_family(id, &changes.apply(&storage.family(id)?))?;
            println!("Updated family {}: {}", family.id, family);
        }
        FamilyCommand::List { output } => {
            let listings = storage.families()?;
            emit(output.format, &listings, |l| render::families(l))?;
        }
        FamilyCommand::Delete { id } => {
            storage.delete_family(FamilyId(id))?;
            println!("Deleted family {id}");
        }
    }
    Ok(())
}

fn handle_location(config: &Config, storage: &Storage, cmd: LocationCommand) -> anyhow::Result<()> {
    match cmd {
        LocationCommand::Add { name, parent } => {
            let location = storage.add_location(&NewLocation::new(name, parent.map(LocationId)))?;
            println!("Added location {}: {}", location.id, location.location_name);
        }
        LocationCommand::Edit { id, changes } => {
            let id = LocationId(id);
            let location = storage.update_location(id, &changes.apply(&storage.location(id)?))?;
            println!("Updated location {}: {}", location.id, location.location_name);
        }
        LocationCommand::Show { id, recent, output } => {
            let limit = recent.unwrap_or(config.reports.recent_sightings_limit);
            let report = reports::location_detail(storage, LocationId(id), limit)?;
            emit(output.format, &report, render::location_detail)?;
        }
        LocationCommand::List {
            search,
            parent,
            top_level,
            output,
        } => {
            let listings = storage.location_listings(&LocationQuery {
                search,
                parent_id: parent.map(LocationId),
                top_level_only: top_level,
            })?;
            emit(output.format, &listings, |l| render::locations(l))?;
        }
        LocationCommand::Search { query, output } => {
            let matches = storage.search_locations(&query, &config.search)?;
            emit(output.format, &matches, |m| render::location_matches(m))?;
        }
        LocationCommand::Delete { ids } => {
            let ids: Vec<LocationId> = ids.into_iter().map(LocationId).collect();
            let deleted = storage.delete_locations(&ids)?;
            println!("Deleted {deleted} location(s)");
        }
    }
    Ok(())
}

fn handle_trip(storage: &Storage, cmd: TripCommand) -> anyhow::Result<()> {
    match cmd {
        TripCommand::Add(fields) => {
            let trip = storage.add_trip(&NewTrip::from(fields))?;
            println!("Added trip {}: {}", trip.id, trip.trip_name);
        }
        TripCommand::Edit { id, changes } => {
            let id = TripId(id);
            let trip = storage.update_trip(id, &changes.apply(&storage.trip(id)?))?;
            println!("Updated trip {}: {}", trip.id, trip.trip_name);
        }
        TripCommand::Show { id, output } => {
            let report = reports::trip_detail(storage, TripId(id))?;
            emit(output.format, &report, render::trip_detail)?;
        }
        TripCommand::List {
            search,
            year,
            output,
        } => {
            let listings = storage.trips(&TripQuery { search, year })?;
            emit(output.format, &listings, |l| render::trips(l))?;
        }
        TripCommand::Delete { id } => {
            let detached = storage.delete_trip(TripId(id))?;
            println!("Deleted trip {id}; {detached} sighting(s) kept without a trip");
        }
    }
    Ok(())
}

fn handle_sighting(storage: &Storage, cmd: SightingCommand) -> anyhow::Result<()> {
    match cmd {
        SightingCommand::Add(fields) => {
            let sighting = storage.add_sighting(&fields.into_new(today()))?;
            let view = reports::sighting_view(storage, sighting.id)?;
            println!("Added {}", render::sighting_line(&view));
        }
        SightingCommand::Edit { id, changes } => {
            let id = SightingId(id);
            let sighting = storage.update_sighting(id, &changes.apply(&storage.sighting(id)?))?;
            let view = reports::sighting_view(storage, sighting.id)?;
            println!("Updated {}", render::sighting_line(&view));
        }
        SightingCommand::Show { id, output } => {
            let view = reports::sighting_view(storage, SightingId(id))?;
            emit(output.format, &view, render::sighting_line)?;
        }
        SightingCommand::List {
            year,
            month,
            location,
            trip,
            bird,
            output,
        } => {
            let mut filter =
                SightingFilter::window(TimeWindow::parse(year.as_deref(), month.as_deref()));
            if let Some(id) = location {
                let tree = LocationTree::load(storage)?;
                filter = filter.at_locations(tree.expand_to_location_set(LocationId(id))?);
            }
            if let Some(id) = trip {
                filter = filter.on_trip(TripId(id));
            }
            if let Some(id) = bird {
                filter = filter.of_bird(BirdId(id));
            }
            let views = reports::sighting_log(storage, &filter)?;
            emit(output.format, &views, |v| render::sightings(v))?;
        }
        SightingCommand::Delete { id } => {
            storage.delete_sighting(SightingId(id))?;
            println!("Deleted sighting {id}");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Reports]");
                println!("  Default page size:  {}", config.reports.default_page_size);
                println!(
                    "  Recent sightings:   {}",
                    config.reports.recent_sightings_limit
                );
                println!();
                println!("[Search]");
                println!("  Min query length:   {}", config.search.min_query_length);
                println!("  Result limit:       {}", config.search.result_limit);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

/// Print `value` as JSON or through its plain-text renderer.
fn emit<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    plain: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Plain => println!("{}", plain(value)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn page_size(config: &Config, paging: &PageArgs) -> PageSize {
    PageSize::parse(paging.page_size.as_deref(), config.default_page_size())
}

fn page_number(paging: &PageArgs) -> PageNumber {
    PageNumber::parse(paging.page.as_deref())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
