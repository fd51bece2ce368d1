//src/main.rs
mod cli; // Keep cli module for parsing args

use anyhow::{anyhow, bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use std::io::stdout;
use std::str::FromStr;

use workout_map_lib::{
    App, Coordinates, EditableField, FileStore, GeolocationError, Geolocator, MapWidget, Metrics,
    Renderer, Workout, WorkoutForm, WorkoutKind, STORAGE_KEY,
};

fn main() -> Result<()> {
    // --- Check for completion generation request FIRST ---
    let cli_args = cli::parse_args(); // Parse arguments once
    let export_csv = cli_args.export_csv;

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command(); // Get the command structure
        let bin_name = cmd.get_name().to_string(); // Get the binary name

        eprintln!("Generating completion script for {shell}..."); // Print to stderr
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout()); // Print script to stdout
        return Ok(()); // Exit after generating script
    }

    // Initialize the controller against the on-disk store and the console
    // surfaces, then restore whatever was persisted last session.
    let store = FileStore::open_default().context("Failed to open workout storage")?;
    let storage_path = store.path_for(STORAGE_KEY)?;
    let mut app = App::initialize(
        Box::new(store),
        Box::new(ConsoleMap),
        Box::new(ConsoleRenderer),
    )
    .context("Failed to initialize application")?;
    app.restore()
        .context("Failed to restore persisted workouts")?;

    // --- Execute Commands ---
    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            // This case is handled above, but keep it exhaustive
            unreachable!("Completion generation should have exited already");
        }
        cli::Commands::Map => {
            let mut geolocator = HomeGeolocator {
                home: app.config.home_position(),
            };
            app.request_location(&mut geolocator);
            if !app.map_ready() {
                bail!("Map not initialized.");
            }
            println!("{} pin(s) on the map.", app.workouts().len());
        }
        cli::Commands::Add {
            kind,
            lat,
            lng,
            distance,
            duration,
            cadence,
            elevation,
        } => {
            // A CLI invocation collapses "click the map, then submit the
            // form" into one step.
            app.on_map_clicked(Coordinates { lat, lng });
            let form = WorkoutForm {
                kind: kind_cli_to_kind(kind),
                distance_km: distance,
                duration_min: duration,
                cadence_spm: cadence,
                elevation_gain_m: elevation,
            };
            match app.submit_new_workout(&form) {
                Ok(id) => {
                    let workout = app.resolve_workout(&id)?;
                    println!(
                        "Successfully added workout '{}' ({}: {:.1}) ID: {}",
                        workout.description,
                        derived_label(workout.kind()),
                        workout.derived_metric(),
                        id
                    );
                }
                Err(e) => bail!("Error adding workout: {e}"),
            }
        }
        cli::Commands::List => {
            let workouts = app.workouts();
            if workouts.is_empty() {
                println!("No workouts logged yet. Use 'add' to log one.");
            } else if export_csv {
                print_workout_csv(workouts)?;
            } else {
                print_workout_table(workouts);
            }
        }
        cli::Commands::Edit { id, field, value } => {
            let field = EditableField::from_str(&field).map_err(|_| {
                anyhow!("Unknown field '{field}'. Expected distance, duration, cadence or elevation.")
            })?;
            let full_id = app.resolve_workout(&id)?.id.clone();
            if let Err(e) = app.begin_field_edit(&full_id, field) {
                bail!("Error editing workout '{id}': {e}");
            }
            match app.commit_field_edit(&value) {
                Ok(()) => {
                    let workout = app.resolve_workout(&full_id)?;
                    println!(
                        "Successfully updated {field} of '{}'; {} is now {:.1}.",
                        workout.description,
                        derived_label(workout.kind()),
                        workout.derived_metric()
                    );
                }
                Err(e) => bail!("Error editing workout '{id}': {e}"),
            }
        }
        cli::Commands::Delete { ids } => {
            for identifier in ids {
                let full_id = app.resolve_workout(&identifier)?.id.clone();
                match app.delete_workout(&full_id) {
                    Ok(removed) => println!(
                        "Successfully deleted workout '{}' ID: {}",
                        removed.description, removed.id
                    ),
                    Err(e) => bail!("Error deleting workout '{identifier}': {e}"),
                }
            }
        }
        cli::Commands::Clear => {
            let removed = app.delete_all_workouts()?;
            println!("Deleted {removed} workout(s).");
        }
        cli::Commands::Goto { id } => {
            let full_id = app.resolve_workout(&id)?.id.clone();
            app.move_map_to(&full_id)?;
        }
        cli::Commands::Reset => {
            app.reset()?;
            println!("Cleared persisted workouts; starting from empty.");
        }
        cli::Commands::SetHome { lat, lng } => match app.set_home(lat, lng) {
            Ok(()) => println!("Home position set to ({lat}, {lng})."),
            Err(e) => bail!("Error setting home position: {e}"),
        },
        cli::Commands::SetZoom { zoom } => match app.set_map_zoom(zoom) {
            Ok(()) => println!("Map zoom level set to {zoom}."),
            Err(e) => bail!("Error setting zoom level: {e}"),
        },
        cli::Commands::StoragePath => {
            println!("{}", storage_path.display());
        }
    }

    Ok(())
}

const fn kind_cli_to_kind(kind: cli::KindCli) -> WorkoutKind {
    match kind {
        cli::KindCli::Running => WorkoutKind::Running,
        cli::KindCli::Cycling => WorkoutKind::Cycling,
    }
}

const fn derived_label(kind: WorkoutKind) -> &'static str {
    match kind {
        WorkoutKind::Running => "pace min/km",
        WorkoutKind::Cycling => "speed km/h",
    }
}

/// Resolves against the configured home position; a terminal has no
/// geolocation hardware to ask.
struct HomeGeolocator {
    home: Option<Coordinates>,
}

impl Geolocator for HomeGeolocator {
    fn current_position(&mut self) -> Result<Coordinates, GeolocationError> {
        self.home.ok_or_else(|| {
            GeolocationError(
                "no home position configured. Run 'maptrack set-home <lat> <lng>'.".to_string(),
            )
        })
    }
}

/// Console stand-in for the map widget.
struct ConsoleMap;

impl MapWidget for ConsoleMap {
    fn init(&mut self, center: Coordinates, zoom: u8, tile_url: &str) {
        println!("Map initialized at {center} (zoom {zoom}, tiles {tile_url})");
    }

    fn add_marker(&mut self, _workout_id: &str, at: Coordinates, popup: &str) {
        println!("📍 {popup} at {at}");
    }

    fn remove_marker(&mut self, _workout_id: &str) {}

    fn pan_to(&mut self, center: Coordinates, zoom: u8) {
        println!("🗺  Map centered on {center} (zoom {zoom})");
    }
}

/// Console rendering surface. A one-shot CLI has no live list to patch;
/// `list` prints the current collection instead, so most notifications are
/// no-ops and only alerts reach the terminal.
struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn show_form(&mut self) {}
    fn hide_form(&mut self) {}
    fn render_workout(&mut self, _workout: &Workout) {}
    fn remove_workout(&mut self, _workout_id: &str) {}
    fn clear_workouts(&mut self) {}
    fn show_clear_all(&mut self) {}
    fn hide_clear_all(&mut self) {}
    fn show_field_editor(&mut self, _workout_id: &str, _field: EditableField, _current: f64) {}
    fn remove_field_editor(&mut self) {}
    fn set_field_text(&mut self, _workout_id: &str, _field: EditableField, _value: f64) {}
    fn set_derived_text(&mut self, _workout_id: &str, _value: f64) {}

    fn alert(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

fn print_workout_table(workouts: &[Workout]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
            Cell::new("Distance (km)").add_attribute(Attribute::Bold),
            Cell::new("Duration (min)").add_attribute(Attribute::Bold),
            Cell::new("Cadence (spm)").add_attribute(Attribute::Bold),
            Cell::new("Elev. gain (m)").add_attribute(Attribute::Bold),
            Cell::new("Pace / Speed").add_attribute(Attribute::Bold),
            Cell::new("Coordinates").add_attribute(Attribute::Bold),
            Cell::new("Logged").add_attribute(Attribute::Bold),
        ]);

    for workout in workouts {
        let (cadence, elevation, derived) = match workout.metrics {
            Metrics::Running {
                cadence_spm,
                pace_min_per_km,
            } => (
                cadence_spm.to_string(),
                "-".to_string(),
                format!("{pace_min_per_km:.1} min/km"),
            ),
            Metrics::Cycling {
                elevation_gain_m,
                speed_km_per_h,
            } => (
                "-".to_string(),
                elevation_gain_m.to_string(),
                format!("{speed_km_per_h:.1} km/h"),
            ),
        };
        table.add_row(vec![
            short_id(&workout.id),
            workout.description.clone(),
            workout.distance_km.to_string(),
            workout.duration_min.to_string(),
            cadence,
            elevation,
            derived,
            workout.coords.to_string(),
            workout.created_at.format("%Y-%m-%d").to_string(),
        ]);
    }
    println!("{table}");
}

fn print_workout_csv(workouts: &[Workout]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(stdout());
    writer.write_record([
        "id",
        "description",
        "kind",
        "distance_km",
        "duration_min",
        "cadence_spm",
        "elevation_gain_m",
        "pace_min_per_km",
        "speed_km_per_h",
        "lat",
        "lng",
        "created_at",
    ])?;
    for workout in workouts {
        let (cadence, elevation, pace, speed) = match workout.metrics {
            Metrics::Running {
                cadence_spm,
                pace_min_per_km,
            } => (
                cadence_spm.to_string(),
                String::new(),
                pace_min_per_km.to_string(),
                String::new(),
            ),
            Metrics::Cycling {
                elevation_gain_m,
                speed_km_per_h,
            } => (
                String::new(),
                elevation_gain_m.to_string(),
                String::new(),
                speed_km_per_h.to_string(),
            ),
        };
        writer.write_record([
            workout.id.clone(),
            workout.description.clone(),
            workout.kind().to_string(),
            workout.distance_km.to_string(),
            workout.duration_min.to_string(),
            cadence,
            elevation,
            pace,
            speed,
            workout.coords.lat.to_string(),
            workout.coords.lng.to_string(),
            workout.created_at.to_rfc3339(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

// First block of a UUID is plenty to disambiguate a personal log.
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}
