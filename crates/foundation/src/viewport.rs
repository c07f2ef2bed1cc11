use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bounds::{BoundingBox, LatLng};

/// Pixel size of one Web Mercator tile at zoom 0.
pub const TILE_SIZE_PX: f64 = 256.0;

/// Latitude beyond which Web Mercator is undefined.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Zoom used when jumping to a random location.
pub const JUMP_ZOOM: f64 = 11.0;

/// Metro areas the "jump to random location" action picks from.
pub const JUMP_LOCATIONS: &[(&str, LatLng)] = &[
    ("New York", LatLng::new(40.7128, -74.0060)),
    ("Los Angeles", LatLng::new(34.0522, -118.2437)),
    ("Chicago", LatLng::new(41.8781, -87.6298)),
    ("Houston", LatLng::new(29.7604, -95.3698)),
    ("Phoenix", LatLng::new(33.4484, -112.0740)),
    ("Seattle", LatLng::new(47.6062, -122.3321)),
    ("Denver", LatLng::new(39.7392, -104.9903)),
    ("Atlanta", LatLng::new(33.7490, -84.3880)),
    ("Miami", LatLng::new(25.7617, -80.1918)),
    ("Nashville", LatLng::new(36.1627, -86.7816)),
    ("San Francisco", LatLng::new(37.7749, -122.4194)),
    ("Anchorage", LatLng::new(61.2181, -149.9003)),
];

/// Anything that can report the geographic extent currently on screen.
///
/// The real map engine implements this; [`Viewport`] is the headless model.
pub trait MapView {
    fn visible_bounds(&self) -> BoundingBox;
}

/// Reads the live extent of `view` as the query bounding box.
///
/// Always call this at refresh time; the result must not be cached across
/// refreshes because the view may have moved.
pub fn current_bounding_box<V: MapView + ?Sized>(view: &V) -> BoundingBox {
    view.visible_bounds()
}

/// Web Mercator map view: a center, a fractional zoom and a pixel size.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
    pub width_px: f64,
    pub height_px: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        // Contiguous US at a glance.
        Self::new(LatLng::new(39.5, -98.35), 4.0, 1280.0, 720.0)
    }
}

impl Viewport {
    pub fn new(center: LatLng, zoom: f64, width_px: f64, height_px: f64) -> Self {
        Self {
            center: clamp_center(center),
            zoom: zoom.max(0.0),
            width_px: width_px.max(1.0),
            height_px: height_px.max(1.0),
        }
    }

    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.center = clamp_center(center);
        self.zoom = zoom.max(0.0);
    }

    pub fn resize(&mut self, width_px: f64, height_px: f64) {
        self.width_px = width_px.max(1.0);
        self.height_px = height_px.max(1.0);
    }

    /// Recenters on a random entry of [`JUMP_LOCATIONS`] and returns its name.
    pub fn jump_to_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &'static str {
        let (name, center) = JUMP_LOCATIONS[rng.gen_range(0..JUMP_LOCATIONS.len())];
        self.set_view(center, JUMP_ZOOM);
        name
    }

    fn world_size_px(&self) -> f64 {
        TILE_SIZE_PX * 2f64.powf(self.zoom)
    }
}

impl MapView for Viewport {
    fn visible_bounds(&self) -> BoundingBox {
        let world = self.world_size_px();
        let cx = lng_to_x(self.center.lng) * world;
        let cy = lat_to_y(self.center.lat) * world;
        let half_w = self.width_px / 2.0;
        let half_h = self.height_px / 2.0;

        let west = x_to_lng((cx - half_w) / world).max(-180.0);
        let east = x_to_lng((cx + half_w) / world).min(180.0);
        // Screen y grows southward.
        let north = y_to_lat(((cy - half_h) / world).max(0.0));
        let south = y_to_lat(((cy + half_h) / world).min(1.0));

        BoundingBox::new(south, west, north, east)
    }
}

fn clamp_center(c: LatLng) -> LatLng {
    LatLng::new(
        c.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT),
        c.lng.clamp(-180.0, 180.0),
    )
}

fn lng_to_x(lng: f64) -> f64 {
    (lng + 180.0) / 360.0
}

fn x_to_lng(x: f64) -> f64 {
    x * 360.0 - 180.0
}

fn lat_to_y(lat: f64) -> f64 {
    let phi = lat.to_radians();
    (1.0 - (phi.tan() + 1.0 / phi.cos()).ln() / PI) / 2.0
}

fn y_to_lat(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees()
}
