use serde::{Deserialize, Serialize};

pub const SEISMIC_MIN_RADIUS: f64 = 4.0;
pub const SEISMIC_MAX_RADIUS: f64 = 16.0;
pub const SEISMIC_STROKE_WEIGHT: f64 = 1.0;
pub const SEISMIC_FILL_OPACITY: f64 = 0.6;

/// How a single point is drawn.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointStyle {
    /// Fixed pin marker; brand layers cluster these.
    Marker,
    /// Circle sized in screen pixels.
    Circle {
        radius: f64,
        weight: f64,
        fill_opacity: f64,
    },
}

impl PointStyle {
    pub const fn circle(radius: f64, weight: f64, fill_opacity: f64) -> Self {
        PointStyle::Circle {
            radius,
            weight,
            fill_opacity,
        }
    }

    /// Circle for a seismic event of magnitude `mag`.
    pub fn seismic(mag: Option<f64>) -> Self {
        Self::circle(
            seismic_radius(mag),
            SEISMIC_STROKE_WEIGHT,
            SEISMIC_FILL_OPACITY,
        )
    }
}

/// `mag * 2` clamped to `[4, 16]`; an unknown magnitude counts as zero.
pub fn seismic_radius(mag: Option<f64>) -> f64 {
    let mag = mag.filter(|m| m.is_finite()).unwrap_or(0.0);
    (mag * 2.0).clamp(SEISMIC_MIN_RADIUS, SEISMIC_MAX_RADIUS)
}
