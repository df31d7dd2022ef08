//! Local tangent-plane approximation around a GPS anchor.
//!
//! One degree of latitude is taken as [`METERS_PER_DEGREE`] metres and one degree
//! of longitude as `METERS_PER_DEGREE * cos(reference latitude)`. This is only
//! valid for sub-kilometre extents; accuracy degrades with span and depends on
//! which latitude is used as reference. It is not an ellipsoidal computation.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Metres per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// A latitude / longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoord {
    pub lat: f64,
    pub lon: f64,
}

impl GpsCoord {
    pub fn new(lat: f64, lon: f64) -> Self {
        GpsCoord { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

fn meters_per_degree_lon(reference_lat: f64) -> f64 {
    METERS_PER_DEGREE * reference_lat.to_radians().cos()
}

/// East / north offset in metres of `point` relative to `reference`.
///
/// The longitude scale uses `reference.lat`.
pub fn offset_m(reference: &GpsCoord, point: &GpsCoord) -> Vector2<f64> {
    Vector2::new(
        meters_per_degree_lon(reference.lat) * (point.lon - reference.lon),
        METERS_PER_DEGREE * (point.lat - reference.lat),
    )
}

/// Inverse of [`offset_m`]: the GPS point at `offset` (east, north) from `anchor`.
pub fn gps_from_offset(anchor: &GpsCoord, offset: &Vector2<f64>) -> GpsCoord {
    GpsCoord {
        lat: anchor.lat + offset.y / METERS_PER_DEGREE,
        lon: anchor.lon + offset.x / meters_per_degree_lon(anchor.lat),
    }
}

/// Local 3D point (east, north, up) of a GPS point at a given elevation.
pub fn space_from_gps(anchor: &GpsCoord, point: &GpsCoord, elevation_m: f64) -> Vector3<f64> {
    let offset = offset_m(anchor, point);
    Vector3::new(offset.x, offset.y, elevation_m)
}

/// Planar distance in metres between two GPS points.
///
/// Uses the mean latitude of the pair as reference so the result does not
/// depend on argument order.
pub fn distance_m(a: &GpsCoord, b: &GpsCoord) -> f64 {
    let mean_lat = (a.lat + b.lat) / 2.0;
    let d_east = meters_per_degree_lon(mean_lat) * (b.lon - a.lon);
    let d_north = METERS_PER_DEGREE * (b.lat - a.lat);
    (d_east * d_east + d_north * d_north).sqrt()
}

/// Generate a grid of sample points that are evenly distributed across the image
///
/// # Arguments
///
/// * `width` - The width of the image in pixels
/// * `height` - The height of the image in pixels
/// * `n` - The approximate number of points to generate
///
/// # Returns
///
/// A vector of 2D points representing pixel coordinates
pub fn sample_pixel_grid(width: f64, height: f64, n: usize) -> Vec<Vector2<f64>> {
    let mut points = Vec::new();

    let num_cells_x = ((n as f64 * (width / height)).sqrt().round() as i32).max(1);
    let num_cells_y = ((n as f64 * (height / width)).sqrt().round() as i32).max(1);

    let cell_width = width / num_cells_x as f64;
    let cell_height = height / num_cells_y as f64;

    // One point at the center of each cell
    for i in 0..num_cells_y {
        for j in 0..num_cells_x {
            let x = (j as f64 + 0.5) * cell_width;
            let y = (i as f64 + 0.5) * cell_height;
            points.push(Vector2::new(x, y));
        }
    }

    points
}
