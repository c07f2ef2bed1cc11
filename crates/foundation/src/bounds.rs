use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fractional digits used when a bounding box is rendered for a query.
pub const BBOX_PRECISION: usize = 5;

/// Geographic position, latitude first (render order).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// South/west/north/east bounds of a map view.
///
/// Built fresh from the live viewport on every refresh and never mutated
/// afterwards; the `Display` form is the wire format both query endpoints
/// accept (`south,west,north,east`, five fractional digits each).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Returns a copy with every edge rounded to `places` decimal places.
    pub fn rounded(&self, places: i32) -> Self {
        let scale = 10f64.powi(places);
        let r = |v: f64| (v * scale).round() / scale;
        Self::new(r(self.south), r(self.west), r(self.north), r(self.east))
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = BBOX_PRECISION;
        write!(
            f,
            "{:.p$},{:.p$},{:.p$},{:.p$}",
            fixed(self.south),
            fixed(self.west),
            fixed(self.north),
            fixed(self.east),
        )
    }
}

// `{:.5}` renders tiny negatives as "-0.00000"; snap them to zero first.
fn fixed(v: f64) -> f64 {
    let scale = 10f64.powi(BBOX_PRECISION as i32);
    let r = (v * scale).round() / scale;
    if r == 0.0 { 0.0 } else { r }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundsParseError {
    WrongArity(usize),
    NotANumber(String),
}

impl fmt::Display for BoundsParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundsParseError::WrongArity(n) => {
                write!(f, "bbox needs 4 values (south,west,north,east), got {n}")
            }
            BoundsParseError::NotANumber(v) => write!(f, "bbox value is not a number: {v:?}"),
        }
    }
}

impl std::error::Error for BoundsParseError {}

impl FromStr for BoundingBox {
    type Err = BoundsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BoundsParseError::WrongArity(parts.len()));
        }
        let mut v = [0.0f64; 4];
        for (slot, part) in v.iter_mut().zip(&parts) {
            *slot = part
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .ok_or_else(|| BoundsParseError::NotANumber(part.to_string()))?;
        }
        Ok(Self::new(v[0], v[1], v[2], v[3]))
    }
}
