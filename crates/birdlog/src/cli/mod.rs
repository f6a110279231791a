//! Command-line interface for birdlog.
//!
//! This module provides the CLI structure for the `birdlog` binary and the
//! plain-text rendering of reports.

mod commands;
pub mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    BirdCommand, BirdEdit, BirdFields, ConfigCommand, FamilyCommand, FamilyEdit, FormatArgs,
    HomeCommand, LocationCommand, LocationEdit, LocationListCommand, MonthListCommand,
    OutputFormat, PageArgs, SightingCommand, SightingEdit, SightingFields, TripCommand, TripEdit,
    TripFields, YearListCommand,
};

use crate::logging::Verbosity;

/// birdlog - A personal birdwatching log
///
/// Records birds, places and trips, and reports life, year, month and
/// location lists from the sightings that link them.
#[derive(Debug, Parser)]
#[command(name = "birdlog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage birds
    #[command(subcommand)]
    Bird(BirdCommand),

    /// Manage bird families
    #[command(subcommand)]
    Family(FamilyCommand),

    /// Manage locations
    #[command(subcommand)]
    Location(LocationCommand),

    /// Manage trips
    #[command(subcommand)]
    Trip(TripCommand),

    /// Record and browse sightings
    #[command(subcommand)]
    Sighting(SightingCommand),

    /// Every species ever recorded
    LifeList(PageArgs),

    /// Species seen in a year
    YearList(YearListCommand),

    /// Species seen in a month
    MonthList(MonthListCommand),

    /// Species seen at a location and everywhere beneath it
    LocationList(LocationListCommand),

    /// Dashboard counts for today
    Home(HomeCommand),

    /// Show database status
    Status(FormatArgs),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn status_cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(FormatArgs {
                format: OutputFormat::Plain,
            }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "birdlog");
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(status_cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(status_cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(status_cli(3, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_bird_add() {
        let args = vec![
            "birdlog",
            "bird",
            "add",
            "American Robin",
            "--latin",
            "Turdus migratorius",
            "--family",
            "3",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Bird(BirdCommand::Add(fields)) => {
                assert_eq!(fields.english_name, "American Robin");
                assert_eq!(fields.latin.as_deref(), Some("Turdus migratorius"));
                assert_eq!(fields.family, Some(3));
                assert_eq!(fields.french, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_bulk_delete_requires_ids() {
        let cli = Cli::try_parse_from(vec!["birdlog", "location", "delete", "4", "5"]).unwrap();
        match cli.command {
            Command::Location(LocationCommand::Delete { ids }) => assert_eq!(ids, vec![4, 5]),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(vec!["birdlog", "bird", "delete"]).is_err());
    }

    #[test]
    fn test_parse_location_list_flags_conflict() {
        let args = vec!["birdlog", "location", "list", "--parent", "1", "--top-level"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_sighting_add_defaults() {
        let args = vec![
            "birdlog",
            "sighting",
            "add",
            "--bird",
            "1",
            "--location",
            "2",
            "--date",
            "2023-05-10",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Sighting(SightingCommand::Add(fields)) => {
                assert_eq!(fields.count, 1);
                assert!(!fields.heard);
                assert_eq!(fields.trip, None);
                assert_eq!(
                    fields.date,
                    chrono::NaiveDate::from_ymd_opt(2023, 5, 10)
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_location_edit_name_only() {
        let args = vec!["birdlog", "location", "edit", "3", "Toronto West"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Location(LocationCommand::Edit { id, changes }) => {
                assert_eq!(id, 3);
                assert_eq!(changes.name.as_deref(), Some("Toronto West"));
                assert_eq!(changes.parent, None);
                assert!(!changes.top_level);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        let args = vec!["birdlog", "location", "edit", "3", "--parent", "1", "--top-level"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_sighting_edit_leaves_date_unset() {
        let args = vec![
            "birdlog", "sighting", "edit", "1", "--bird", "1", "--location", "3", "--count", "2",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Sighting(SightingCommand::Edit { id, changes }) => {
                assert_eq!(id, 1);
                assert_eq!(changes.date, None);
                assert_eq!(changes.count, Some(2));
                assert_eq!(changes.notes, None);
                assert!(!changes.heard && !changes.seen);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_trip_and_bird_edits_take_no_required_fields() {
        let args = vec!["birdlog", "trip", "edit", "2", "--end", "2024-05-14"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Trip(TripCommand::Edit { changes, .. }) => {
                assert_eq!(changes.name, None);
                assert_eq!(changes.start, None);
                assert_eq!(changes.end, chrono::NaiveDate::from_ymd_opt(2024, 5, 14));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        let args = vec!["birdlog", "bird", "edit", "5", "--status", "Rare"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Bird(BirdCommand::Edit { changes, .. }) => {
                assert_eq!(changes.english_name, None);
                assert_eq!(changes.status.as_deref(), Some("Rare"));
                assert!(!changes.no_family);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_bad_date_is_rejected() {
        let args = vec!["birdlog", "trip", "add", "Spring", "--start", "May 1st"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_report_inputs_stay_raw() {
        let args = vec![
            "birdlog",
            "month-list",
            "--year",
            "abc",
            "--month",
            "13",
            "--page-size",
            "all",
            "--page",
            "-2",
            "--format",
            "json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::MonthList(cmd) => {
                assert_eq!(cmd.year.as_deref(), Some("abc"));
                assert_eq!(cmd.month.as_deref(), Some("13"));
                assert_eq!(cmd.paging.page_size.as_deref(), Some("all"));
                assert_eq!(cmd.paging.page.as_deref(), Some("-2"));
                assert_eq!(cmd.paging.format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_life_list() {
        let cli = Cli::try_parse_from(vec!["birdlog", "life-list"]).unwrap();
        match cli.command {
            Command::LifeList(paging) => {
                assert_eq!(paging.page_size, None);
                assert_eq!(paging.format, OutputFormat::Plain);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let args = vec!["birdlog", "-c", "/custom/config.toml", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(vec!["birdlog", "home", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = Cli::try_parse_from(vec!["birdlog", "status", "-q"]).unwrap();
        assert!(cli.quiet);
    }
}
