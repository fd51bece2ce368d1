// src/surface.rs
//
// The controller's view of the outside world: geolocation, the map widget
// and the rendering surface. The library never touches a real UI; the
// binary (and the tests) supply implementations.
use crate::workout::{Coordinates, EditableField, Workout};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Couldn't get your position: {0}")]
pub struct GeolocationError(pub String);

/// One-shot position provider. No retry, no polling.
pub trait Geolocator {
    /// # Errors
    /// `GeolocationError` when the environment cannot produce a position.
    fn current_position(&mut self) -> Result<Coordinates, GeolocationError>;
}

/// Map widget: accepts a center and zoom, markers with popup content, and
/// pan requests. Click events flow the other way, into
/// `App::on_map_clicked`.
pub trait MapWidget {
    fn init(&mut self, center: Coordinates, zoom: u8, tile_url: &str);
    fn add_marker(&mut self, workout_id: &str, at: Coordinates, popup: &str);
    fn remove_marker(&mut self, workout_id: &str);
    fn pan_to(&mut self, center: Coordinates, zoom: u8);
}

/// List and form surface. Entries are addressed by workout id; the surface
/// owns the mapping from id to whatever it renders.
pub trait Renderer {
    /// Reveal the entry form and focus the distance input.
    fn show_form(&mut self);
    /// Clear the inputs and hide the form.
    fn hide_form(&mut self);
    fn render_workout(&mut self, workout: &Workout);
    fn remove_workout(&mut self, workout_id: &str);
    fn clear_workouts(&mut self);
    /// Show the clear-all affordance. Must be idempotent; it is requested
    /// once per rendered entry.
    fn show_clear_all(&mut self);
    fn hide_clear_all(&mut self);
    /// Swap the field's displayed value for an editor control pre-filled
    /// with `current`, and move focus to it.
    fn show_field_editor(&mut self, workout_id: &str, field: EditableField, current: f64);
    fn remove_field_editor(&mut self);
    fn set_field_text(&mut self, workout_id: &str, field: EditableField, value: f64);
    /// Patch the derived-metric text (pace or speed) of an entry.
    fn set_derived_text(&mut self, workout_id: &str, value: f64);
    fn alert(&mut self, message: &str);
}
