//! Pixel <-> GPS correspondences used to fit a camera.

use crate::camera::CameraModelError;
use crate::geometry::GpsCoord;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ImageCoords {
    px_x: f64,
    px_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct GpsCoords {
    lat: f64,
    lon: f64,
    elevation_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct LandmarkRecord {
    image_coords: ImageCoords,
    gps_coords: GpsCoords,
}

/// A single pixel observed in the image together with its surveyed position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "LandmarkRecord", into = "LandmarkRecord")]
pub struct Landmark {
    pub pixel: Vector2<f64>,
    pub gps: GpsCoord,
    pub elevation_m: f64,
}

impl Landmark {
    pub fn new(pixel: Vector2<f64>, gps: GpsCoord, elevation_m: f64) -> Self {
        Landmark {
            pixel,
            gps,
            elevation_m,
        }
    }

    fn is_finite(&self) -> bool {
        self.pixel.x.is_finite()
            && self.pixel.y.is_finite()
            && self.gps.is_finite()
            && self.elevation_m.is_finite()
    }
}

impl From<LandmarkRecord> for Landmark {
    fn from(record: LandmarkRecord) -> Self {
        Landmark {
            pixel: Vector2::new(record.image_coords.px_x, record.image_coords.px_y),
            gps: GpsCoord::new(record.gps_coords.lat, record.gps_coords.lon),
            elevation_m: record.gps_coords.elevation_m,
        }
    }
}

impl From<Landmark> for LandmarkRecord {
    fn from(landmark: Landmark) -> Self {
        LandmarkRecord {
            image_coords: ImageCoords {
                px_x: landmark.pixel.x,
                px_y: landmark.pixel.y,
            },
            gps_coords: GpsCoords {
                lat: landmark.gps.lat,
                lon: landmark.gps.lon,
                elevation_m: landmark.elevation_m,
            },
        }
    }
}

/// Ordered, non-empty, read-only collection of landmarks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    landmarks: Vec<Landmark>,
}

impl LandmarkSet {
    /// # Errors
    ///
    /// * [`CameraModelError::InvalidConfiguration`] if `landmarks` is empty or
    ///   holds a non-finite value.
    pub fn new(landmarks: Vec<Landmark>) -> Result<Self, CameraModelError> {
        if landmarks.is_empty() {
            return Err(CameraModelError::InvalidConfiguration(
                "landmark set must not be empty".to_string(),
            ));
        }
        if let Some(index) = landmarks.iter().position(|l| !l.is_finite()) {
            return Err(CameraModelError::InvalidConfiguration(format!(
                "landmark {index} has a non-finite coordinate"
            )));
        }
        Ok(LandmarkSet { landmarks })
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    /// Always false; kept for the `len` / `is_empty` pair.
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Landmark> {
        self.landmarks.iter()
    }

    pub fn as_slice(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn pixels(&self) -> Vec<Vector2<f64>> {
        self.landmarks.iter().map(|l| l.pixel).collect()
    }

    pub fn gps(&self) -> Vec<GpsCoord> {
        self.landmarks.iter().map(|l| l.gps).collect()
    }

    pub fn elevations(&self) -> Vec<f64> {
        self.landmarks.iter().map(|l| l.elevation_m).collect()
    }
}

impl<'de> Deserialize<'de> for LandmarkSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let landmarks = Vec::<Landmark>::deserialize(deserializer)?;
        LandmarkSet::new(landmarks).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a LandmarkSet {
    type Item = &'a Landmark;
    type IntoIter = std::slice::Iter<'a, Landmark>;

    fn into_iter(self) -> Self::IntoIter {
        self.landmarks.iter()
    }
}
