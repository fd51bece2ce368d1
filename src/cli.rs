// src/cli.rs
use clap::{Command, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "Log running and cycling workouts against map pins", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Print list output as CSV instead of a table
    #[arg(long, global = true)]
    pub export_csv: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindCli {
    Running,
    Cycling,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the map at the configured home position and show every pin
    Map,
    /// Drop a pin and log a workout against it
    Add {
        /// Workout kind
        #[arg(value_enum)]
        kind: KindCli,

        /// Latitude of the pin
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude of the pin
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Distance in kilometres
        #[arg(short, long)]
        distance: f64,

        /// Duration in minutes
        #[arg(short = 't', long)]
        duration: f64,

        /// Cadence in steps per minute (running)
        #[arg(short, long)]
        cadence: Option<f64>,

        /// Elevation gain in metres (cycling; zero or negative is fine)
        #[arg(short, long, allow_hyphen_values = true)]
        elevation: Option<f64>,
    },
    /// List logged workouts
    List,
    /// Edit a single field of a workout in place
    Edit {
        /// Workout ID or unique ID prefix
        id: String,
        /// Field to edit: distance, duration, cadence or elevation
        field: String,
        /// New value
        value: String,
    },
    /// Delete workouts by ID
    Delete {
        /// Workout IDs or unique ID prefixes
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete every workout
    Clear,
    /// Pan the map to a workout's pin
    Goto {
        /// Workout ID or unique ID prefix
        id: String,
    },
    /// Clear the persistent store and start from empty
    Reset,
    /// Set the home position the map opens at
    SetHome {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lng: f64,
    },
    /// Set the map zoom level (1-19)
    SetZoom { zoom: u8 },
    /// Show where the workout collection is stored
    StoragePath,
    /// Generate shell completion scripts
    GenerateCompletion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> Command {
    Cli::command()
}
