use anyhow::{bail, Context, Result};
// Use anyhow::Result as standard Result for service layer
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;

// --- Declare modules ---
mod config;
pub mod storage;
pub mod surface;
pub mod workout;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util,
    load as load_config_util,
    save as save_config_util,
    Config,
    ConfigError,
    MAX_ZOOM_LEVEL,
};

pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, STORAGE_KEY};
pub use surface::{GeolocationError, Geolocator, MapWidget, Renderer};
pub use workout::{
    validate_field, Coordinates, EditableField, Metrics, ValidationError, Workout, WorkoutKind,
};

/// Errors the store controller reports beyond plain validation failures.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("No workout found with ID '{0}'")]
    WorkoutNotFound(String),
    #[error("Workout ID '{0}' is ambiguous; give more characters")]
    AmbiguousId(String),
    #[error("No location selected. Click the map before submitting the form.")]
    NoLocationSelected,
    #[error("{kind} workouts do not track {field}")]
    FieldNotTracked {
        kind: WorkoutKind,
        field: EditableField,
    },
    #[error("No edit in progress")]
    NoActiveEdit,
}

/// Raw form values as the entry form hands them over. The kind-specific
/// field that does not apply to `kind` is ignored.
#[derive(Debug, Clone, Copy)]
pub struct WorkoutForm {
    pub kind: WorkoutKind,
    pub distance_km: f64,
    pub duration_min: f64,
    /// Steps per minute; read for running.
    pub cadence_spm: Option<f64>,
    /// Metres climbed; read for cycling.
    pub elevation_gain_m: Option<f64>,
}

// The single system-wide inline edit. Holding the pre-edit value makes
// cancellation a pure display restore.
struct EditSession {
    workout_id: String,
    field: EditableField,
    original_value: f64,
}

/// The workout store controller. Sole owner of the in-memory collection,
/// the pending map-click location and the exclusive inline-edit slot; every
/// mutating operation applies to memory, display and storage together.
pub struct App {
    pub config: Config,
    pub config_path: PathBuf,
    store: Box<dyn KeyValueStore>,
    map: Box<dyn MapWidget>,
    renderer: Box<dyn Renderer>,
    workouts: Vec<Workout>,
    selected_coords: Option<Coordinates>,
    edit_slot: Option<EditSession>,
    map_ready: bool,
}

impl App {
    /// Initializes the controller against the given backends, loading (or
    /// creating) the config file on disk.
    ///
    /// # Errors
    /// Returns `anyhow::Error` if config path determination or loading fails.
    pub fn initialize(
        store: Box<dyn KeyValueStore>,
        map: Box<dyn MapWidget>,
        renderer: Box<dyn Renderer>,
    ) -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;
        Ok(Self::new(config, config_path, store, map, renderer))
    }

    /// Builds a controller from explicit parts. Used by tests and by anyone
    /// who manages configuration themselves.
    pub fn new(
        config: Config,
        config_path: PathBuf,
        store: Box<dyn KeyValueStore>,
        map: Box<dyn MapWidget>,
        renderer: Box<dyn Renderer>,
    ) -> Self {
        Self {
            config,
            config_path,
            store,
            map,
            renderer,
            workouts: Vec::new(),
            selected_coords: None,
            edit_slot: None,
            map_ready: false,
        }
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn workouts(&self) -> &[Workout] {
        &self.workouts
    }

    pub fn find_workout(&self, workout_id: &str) -> Option<&Workout> {
        self.workouts.iter().find(|w| w.id == workout_id)
    }

    pub fn editing(&self) -> bool {
        self.edit_slot.is_some()
    }

    pub fn selected_coordinates(&self) -> Option<Coordinates> {
        self.selected_coords
    }

    pub const fn map_ready(&self) -> bool {
        self.map_ready
    }

    /// Restores persisted state, then asks the environment for a position.
    /// Returns the number of restored workouts.
    ///
    /// # Errors
    /// Returns `anyhow::Error` if the store cannot be read. Geolocation
    /// failure is not an error; it is surfaced as an alert and the map stays
    /// uninitialized.
    pub fn bootstrap(&mut self, geolocator: &mut dyn Geolocator) -> Result<usize> {
        let restored = self.restore()?;
        self.request_location(geolocator);
        Ok(restored)
    }

    /// One-shot geolocation request. No retry on failure.
    pub fn request_location(&mut self, geolocator: &mut dyn Geolocator) {
        match geolocator.current_position() {
            Ok(position) => self.on_location_resolved(position),
            Err(err) => self.renderer.alert(&err.to_string()),
        }
    }

    /// Initializes the map view at `position` and places a marker for every
    /// workout already in the collection.
    pub fn on_location_resolved(&mut self, position: Coordinates) {
        self.map
            .init(position, self.config.map_zoom_level, &self.config.tile_url);
        self.map_ready = true;
        for workout in &self.workouts {
            self.map
                .add_marker(&workout.id, workout.coords, &workout.popup_label());
        }
    }

    /// Records the clicked location and reveals the entry form. Clicking
    /// again before submitting retargets the pending entry; the last click
    /// is the location the user meant.
    pub fn on_map_clicked(&mut self, at: Coordinates) {
        self.selected_coords = Some(at);
        self.renderer.show_form();
    }

    /// Creates a workout from the form against the last clicked location.
    /// On success the entry is appended, rendered as a marker and a list
    /// item, the form is hidden, and the collection is persisted. Returns
    /// the new workout's id.
    ///
    /// # Errors
    /// - `AppError::NoLocationSelected` if no pin has been dropped.
    /// - `ValidationError` (alert surfaced, state untouched) on bad numbers.
    /// - `anyhow::Error` wrapping `StorageError` if persisting fails.
    pub fn submit_new_workout(&mut self, form: &WorkoutForm) -> Result<String> {
        let Some(coords) = self.selected_coords else {
            bail!(AppError::NoLocationSelected);
        };

        // An absent kind-specific field never validates, same as an empty
        // form input coercing to a non-number.
        let built = match form.kind {
            WorkoutKind::Running => Workout::new_running(
                coords,
                form.distance_km,
                form.duration_min,
                form.cadence_spm.unwrap_or(f64::NAN),
                Utc::now(),
            ),
            WorkoutKind::Cycling => Workout::new_cycling(
                coords,
                form.distance_km,
                form.duration_min,
                form.elevation_gain_m.unwrap_or(f64::NAN),
                Utc::now(),
            ),
        };
        let workout = match built {
            Ok(workout) => workout,
            Err(err) => {
                self.renderer.alert(&err.to_string());
                return Err(err.into());
            }
        };

        self.selected_coords = None;
        if self.map_ready {
            self.map
                .add_marker(&workout.id, workout.coords, &workout.popup_label());
        }
        self.renderer.render_workout(&workout);
        self.renderer.show_clear_all();
        self.renderer.hide_form();

        let id = workout.id.clone();
        self.workouts.push(workout);
        self.persist()?;
        Ok(id)
    }

    /// Swaps the field's displayed value for an editor control. A no-op
    /// while another edit is in progress; the slot is exclusive.
    ///
    /// # Errors
    /// - `AppError::WorkoutNotFound` for an unknown id.
    /// - `AppError::FieldNotTracked` for a field the kind does not carry.
    pub fn begin_field_edit(&mut self, workout_id: &str, field: EditableField) -> Result<()> {
        if self.edit_slot.is_some() {
            return Ok(());
        }
        let (value, kind) = {
            let workout = self
                .find_workout(workout_id)
                .ok_or_else(|| AppError::WorkoutNotFound(workout_id.to_string()))?;
            (workout.field_value(field), workout.kind())
        };
        let Some(original_value) = value else {
            bail!(AppError::FieldNotTracked { kind, field });
        };

        self.edit_slot = Some(EditSession {
            workout_id: workout_id.to_string(),
            field,
            original_value,
        });
        self.renderer
            .show_field_editor(workout_id, field, original_value);
        Ok(())
    }

    /// Commits the in-progress edit with the raw editor text. On a failed
    /// parse or validation the edit is cancelled (display reverted, editor
    /// removed) and the error reported; on success the model field is
    /// mutated, the derived metric recomputed and patched, and the
    /// collection persisted. Exactly one of commit or cancel runs per edit
    /// session.
    ///
    /// # Errors
    /// - `AppError::NoActiveEdit` if no edit is in progress.
    /// - `ValidationError` on a value failing the creation rule.
    /// - `anyhow::Error` wrapping `StorageError` if persisting fails.
    pub fn commit_field_edit(&mut self, raw_value: &str) -> Result<()> {
        // Taking the slot up front keeps a late lost-focus notification
        // from cancelling a second time.
        let Some(session) = self.edit_slot.take() else {
            bail!(AppError::NoActiveEdit);
        };

        let parsed = raw_value.trim().parse::<f64>().unwrap_or(f64::NAN);
        if let Err(err) = workout::validate_field(session.field, parsed) {
            self.renderer.alert(&err.to_string());
            self.restore_edited_field(&session);
            return Err(err.into());
        }

        // The slot is exclusive, so the entry cannot have been deleted out
        // from under an active session; guard anyway.
        let Some(pos) = self
            .workouts
            .iter()
            .position(|w| w.id == session.workout_id)
        else {
            self.renderer.remove_field_editor();
            bail!(AppError::WorkoutNotFound(session.workout_id));
        };

        {
            let workout = &mut self.workouts[pos];
            workout.set_field(session.field, parsed);
            workout.recompute_derived();
        }
        let workout = &self.workouts[pos];
        let derived = workout.derived_metric();
        let id = workout.id.clone();
        self.renderer.set_field_text(&id, session.field, parsed);
        self.renderer.set_derived_text(&id, derived);
        self.renderer.remove_field_editor();
        self.persist()?;
        Ok(())
    }

    /// Abandons the in-progress edit, restoring the original displayed
    /// value. Idempotent: the environment fires the lost-focus notification
    /// twice, and the second call finds the slot already empty.
    pub fn cancel_field_edit(&mut self) {
        if let Some(session) = self.edit_slot.take() {
            self.restore_edited_field(&session);
        }
    }

    fn restore_edited_field(&mut self, session: &EditSession) {
        self.renderer
            .set_field_text(&session.workout_id, session.field, session.original_value);
        self.renderer.remove_field_editor();
    }

    /// Removes a workout from memory, display and storage. Returns the
    /// removed entry.
    ///
    /// # Errors
    /// - `AppError::WorkoutNotFound` for an unknown id.
    /// - `anyhow::Error` wrapping `StorageError` if persisting fails.
    pub fn delete_workout(&mut self, workout_id: &str) -> Result<Workout> {
        let Some(pos) = self.workouts.iter().position(|w| w.id == workout_id) else {
            bail!(AppError::WorkoutNotFound(workout_id.to_string()));
        };
        // An in-flight edit on the removed entry would dangle; drop it.
        if self
            .edit_slot
            .as_ref()
            .is_some_and(|s| s.workout_id == workout_id)
        {
            self.edit_slot = None;
            self.renderer.remove_field_editor();
        }
        self.map.remove_marker(workout_id);
        self.renderer.remove_workout(workout_id);
        let removed = self.workouts.remove(pos);
        self.persist()?;
        Ok(removed)
    }

    /// Clears every marker, every list entry, the collection and the
    /// clear-all affordance, and persists the empty collection. Returns how
    /// many entries were removed.
    ///
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StorageError` if persisting fails.
    pub fn delete_all_workouts(&mut self) -> Result<usize> {
        for workout in &self.workouts {
            self.map.remove_marker(&workout.id);
        }
        if self.edit_slot.take().is_some() {
            self.renderer.remove_field_editor();
        }
        self.renderer.clear_workouts();
        self.renderer.hide_clear_all();
        let removed = self.workouts.len();
        self.workouts.clear();
        self.persist()?;
        Ok(removed)
    }

    /// Pans the map to the entry's coordinates at the configured zoom.
    ///
    /// # Errors
    /// `AppError::WorkoutNotFound` for an unknown id.
    pub fn move_map_to(&mut self, workout_id: &str) -> Result<()> {
        let Some(workout) = self.find_workout(workout_id) else {
            bail!(AppError::WorkoutNotFound(workout_id.to_string()));
        };
        let coords = workout.coords;
        self.map.pan_to(coords, self.config.map_zoom_level);
        Ok(())
    }

    /// Resolves a workout by full id or unique id prefix.
    ///
    /// # Errors
    /// - `AppError::WorkoutNotFound` when nothing matches.
    /// - `AppError::AmbiguousId` when the prefix matches several entries.
    /// - `anyhow::Error` for an empty identifier.
    pub fn resolve_workout(&self, identifier: &str) -> Result<&Workout> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            bail!("Workout identifier cannot be empty.");
        }
        if let Some(workout) = self.find_workout(trimmed) {
            return Ok(workout);
        }
        let mut matches = self.workouts.iter().filter(|w| w.id.starts_with(trimmed));
        match (matches.next(), matches.next()) {
            (Some(workout), None) => Ok(workout),
            (Some(_), Some(_)) => bail!(AppError::AmbiguousId(trimmed.to_string())),
            (None, _) => bail!(AppError::WorkoutNotFound(trimmed.to_string())),
        }
    }

    /// Serializes the whole collection to the store under the fixed key.
    /// Full overwrite on every mutating operation, never incremental.
    ///
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StorageError` if the write fails.
    pub fn persist(&mut self) -> Result<()> {
        let payload =
            serde_json::to_string(&self.workouts).context("Failed to serialize workouts")?;
        self.store
            .set(STORAGE_KEY, &payload)
            .context("Failed to write workouts to storage")?;
        Ok(())
    }

    /// Loads the persisted collection and renders every entry. An absent or
    /// malformed payload restores as "no prior workouts"; it is never
    /// fatal. Returns the number of restored entries.
    ///
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StorageError` if the store itself
    /// cannot be read.
    pub fn restore(&mut self) -> Result<usize> {
        let raw = self
            .store
            .get(STORAGE_KEY)
            .context("Failed to read workouts from storage")?;
        let Some(raw) = raw else {
            return Ok(0);
        };
        self.workouts = serde_json::from_str(&raw).unwrap_or_default();
        for workout in &self.workouts {
            self.renderer.render_workout(workout);
        }
        if !self.workouts.is_empty() {
            self.renderer.show_clear_all();
        }
        Ok(self.workouts.len())
    }

    /// Drops the persisted collection and reloads application state from
    /// empty.
    ///
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StorageError` if the store cannot
    /// be written.
    pub fn reset(&mut self) -> Result<()> {
        self.store
            .remove(STORAGE_KEY)
            .context("Failed to clear storage")?;
        self.workouts.clear();
        self.selected_coords = None;
        self.edit_slot = None;
        self.renderer.clear_workouts();
        self.renderer.hide_clear_all();
        Ok(())
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// Sets the map zoom level used for init and pans.
    /// # Errors
    /// - `ConfigError::InvalidZoomLevel` if `zoom` is 0 or above the max.
    /// - `ConfigError` variants if saving fails.
    pub fn set_map_zoom(&mut self, zoom: u8) -> Result<(), ConfigError> {
        if zoom == 0 || zoom > MAX_ZOOM_LEVEL {
            return Err(ConfigError::InvalidZoomLevel(zoom));
        }
        self.config.map_zoom_level = zoom;
        self.save_config()
    }

    /// Sets the home position the CLI geolocator resolves to.
    /// # Errors
    /// - `ConfigError::InvalidCoordinate` for out-of-range values.
    /// - `ConfigError` variants if saving fails.
    pub fn set_home(&mut self, lat: f64, lng: f64) -> Result<(), ConfigError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ConfigError::InvalidCoordinate(format!(
                "latitude {lat} must be within [-90, 90]"
            )));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(ConfigError::InvalidCoordinate(format!(
                "longitude {lng} must be within [-180, 180]"
            )));
        }
        self.config.home_lat = Some(lat);
        self.config.home_lng = Some(lng);
        self.save_config()
    }
}
