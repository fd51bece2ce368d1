// src/workout.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid {0}: inputs have to be positive, finite numbers.")]
    NotPositive(EditableField),
    #[error("Invalid {0}: inputs have to be finite numbers.")]
    NotFinite(EditableField),
}

/// Latitude/longitude pair, fixed for the lifetime of a workout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lng)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum WorkoutKind {
    Running,
    Cycling,
}

impl WorkoutKind {
    pub const fn capitalized(self) -> &'static str {
        match self {
            WorkoutKind::Running => "Running",
            WorkoutKind::Cycling => "Cycling",
        }
    }

    pub const fn icon(self) -> &'static str {
        match self {
            WorkoutKind::Running => "🏃",
            WorkoutKind::Cycling => "🚴",
        }
    }
}

/// The fields a list entry exposes for inline editing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EditableField {
    Distance,
    Duration,
    Cadence,
    Elevation,
}

/// Kind-specific raw field plus its derived metric. Internally tagged so the
/// persisted record carries a plain `"kind"` label next to the shared fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Metrics {
    Running {
        cadence_spm: f64,
        pace_min_per_km: f64,
    },
    Cycling {
        elevation_gain_m: f64,
        speed_km_per_h: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub coords: Coordinates,
    pub distance_km: f64,
    pub duration_min: f64,
    pub description: String,
    #[serde(flatten)]
    pub metrics: Metrics,
}

/// Checks a single field value against the creation rule.
///
/// Distance, duration and cadence must be finite and strictly positive.
/// Elevation gain only has to be finite: a net descent is a legitimate ride,
/// and zero means a flat one.
///
/// # Errors
/// `ValidationError::NotFinite` or `ValidationError::NotPositive`.
pub fn validate_field(field: EditableField, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite(field));
    }
    if field != EditableField::Elevation && value <= 0.0 {
        return Err(ValidationError::NotPositive(field));
    }
    Ok(())
}

impl Workout {
    /// Creates a running workout and computes its pace.
    ///
    /// # Errors
    /// `ValidationError` if distance, duration or cadence is non-finite or not
    /// strictly positive.
    pub fn new_running(
        coords: Coordinates,
        distance_km: f64,
        duration_min: f64,
        cadence_spm: f64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        validate_field(EditableField::Distance, distance_km)?;
        validate_field(EditableField::Duration, duration_min)?;
        validate_field(EditableField::Cadence, cadence_spm)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            created_at,
            coords,
            distance_km,
            duration_min,
            description: compose_description(WorkoutKind::Running, created_at),
            metrics: Metrics::Running {
                cadence_spm,
                pace_min_per_km: duration_min / distance_km,
            },
        })
    }

    /// Creates a cycling workout and computes its speed.
    ///
    /// # Errors
    /// `ValidationError` if distance or duration is non-finite or not strictly
    /// positive, or elevation gain is non-finite.
    pub fn new_cycling(
        coords: Coordinates,
        distance_km: f64,
        duration_min: f64,
        elevation_gain_m: f64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        validate_field(EditableField::Distance, distance_km)?;
        validate_field(EditableField::Duration, duration_min)?;
        validate_field(EditableField::Elevation, elevation_gain_m)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            created_at,
            coords,
            distance_km,
            duration_min,
            description: compose_description(WorkoutKind::Cycling, created_at),
            metrics: Metrics::Cycling {
                elevation_gain_m,
                speed_km_per_h: distance_km / (duration_min / 60.0),
            },
        })
    }

    pub const fn kind(&self) -> WorkoutKind {
        match self.metrics {
            Metrics::Running { .. } => WorkoutKind::Running,
            Metrics::Cycling { .. } => WorkoutKind::Cycling,
        }
    }

    /// Pace (min/km) for running, speed (km/h) for cycling.
    pub const fn derived_metric(&self) -> f64 {
        match self.metrics {
            Metrics::Running {
                pace_min_per_km, ..
            } => pace_min_per_km,
            Metrics::Cycling {
                speed_km_per_h, ..
            } => speed_km_per_h,
        }
    }

    /// Re-derives pace or speed from the current distance and duration.
    /// Leaves `description` alone.
    pub fn recompute_derived(&mut self) {
        match &mut self.metrics {
            Metrics::Running {
                pace_min_per_km, ..
            } => *pace_min_per_km = self.duration_min / self.distance_km,
            Metrics::Cycling {
                speed_km_per_h, ..
            } => *speed_km_per_h = self.distance_km / (self.duration_min / 60.0),
        }
    }

    /// Current value of an editable field, or `None` when this kind does not
    /// track the field (cadence on a ride, elevation on a run).
    pub fn field_value(&self, field: EditableField) -> Option<f64> {
        match (field, self.metrics) {
            (EditableField::Distance, _) => Some(self.distance_km),
            (EditableField::Duration, _) => Some(self.duration_min),
            (EditableField::Cadence, Metrics::Running { cadence_spm, .. }) => Some(cadence_spm),
            (
                EditableField::Elevation,
                Metrics::Cycling {
                    elevation_gain_m, ..
                },
            ) => Some(elevation_gain_m),
            _ => None,
        }
    }

    /// Writes an editable field. Returns `false` when the field is not
    /// tracked by this kind; the caller is expected to have checked with
    /// `field_value` first.
    pub fn set_field(&mut self, field: EditableField, value: f64) -> bool {
        match (field, &mut self.metrics) {
            (EditableField::Distance, _) => self.distance_km = value,
            (EditableField::Duration, _) => self.duration_min = value,
            (EditableField::Cadence, Metrics::Running { cadence_spm, .. }) => {
                *cadence_spm = value;
            }
            (
                EditableField::Elevation,
                Metrics::Cycling {
                    elevation_gain_m, ..
                },
            ) => *elevation_gain_m = value,
            _ => return false,
        }
        true
    }

    /// Popup label for the map marker, e.g. "🏃 Running on April 5".
    pub fn popup_label(&self) -> String {
        format!("{} {}", self.kind().icon(), self.description)
    }
}

/// "<Capitalized kind> on <Month> <Day>", fixed at construction.
fn compose_description(kind: WorkoutKind, created_at: DateTime<Utc>) -> String {
    format!("{} on {}", kind.capitalized(), created_at.format("%B %-d"))
}
