//! Camera description, lens model and pixel <-> GPS projection.
//!
//! A camera is described in two stages:
//!
//! * [`CameraParameters`] is the persisted / configurable document. Every tunable
//!   attribute is a [`Parameter`], either fixed or free within bounds.
//! * [`Projector`] is the fully resolved camera. It owns a [`RectilinearLens`]
//!   (intrinsics and Brown radial distortion) plus the pose and GPS anchor and
//!   performs the forward (pixel -> GPS) and inverse (GPS -> pixel) mapping.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

pub mod lens;
pub mod model;
pub mod parameter;
pub mod projector;

pub use lens::{BrownDistortion, RectilinearLens};
pub use model::{
    BrownLensDistortion, CameraParameters, GpsLocation, RectilinearProjection, SpatialOrientation,
};
pub use parameter::{FitConstraint, FreeParameter, Parameter, ParameterName};
pub use projector::Projector;

/// Pinhole intrinsics in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

/// Image size in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Returns `true` when the pixel lies inside `[0, width) x [0, height)`.
    pub fn contains(&self, pixel: &Vector2<f64>) -> bool {
        pixel.x >= 0.0
            && pixel.x < self.width as f64
            && pixel.y >= 0.0
            && pixel.y < self.height as f64
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CameraModelError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Parameter {name} has initial value {initial} outside its bounds [{lower}, {upper}]")]
    OutOfRangeParameter {
        name: String,
        initial: f64,
        lower: f64,
        upper: f64,
    },
    #[error("{landmarks} landmarks cannot determine {free_parameters} free parameters")]
    InsufficientLandmarks {
        landmarks: usize,
        free_parameters: usize,
    },
    #[error("Viewing ray does not intersect the target plane")]
    NoIntersection,
    #[error("Point lies behind the camera")]
    PointBehindCamera,
    #[error("Numerical divergence: {0}")]
    NumericalDivergence(String),
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
    #[error("Failed to parse JSON: {0}")]
    JsonError(String),
    #[error("Failed to load YAML: {0}")]
    YamlError(String),
    #[error("Image error: {0}")]
    ImageError(String),
    #[error("IO Error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for CameraModelError {
    fn from(err: std::io::Error) -> Self {
        CameraModelError::IOError(err.to_string())
    }
}

impl From<serde_json::Error> for CameraModelError {
    fn from(err: serde_json::Error) -> Self {
        CameraModelError::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for CameraModelError {
    fn from(err: serde_yaml::Error) -> Self {
        CameraModelError::YamlError(err.to_string())
    }
}

impl From<csv::Error> for CameraModelError {
    fn from(err: csv::Error) -> Self {
        CameraModelError::IOError(err.to_string())
    }
}

impl From<image::ImageError> for CameraModelError {
    fn from(err: image::ImageError) -> Self {
        CameraModelError::ImageError(err.to_string())
    }
}

/// Trait defining the core functionality for lens models
pub trait CameraModel {
    /// Project a point in camera coordinates (z along the optical axis) to pixels
    fn project(&self, point_3d: &Vector3<f64>) -> Result<Vector2<f64>, CameraModelError>;

    /// Unproject a pixel to a unit viewing ray in camera coordinates
    fn unproject(&self, point_2d: &Vector2<f64>) -> Result<Vector3<f64>, CameraModelError>;

    /// Validate lens parameters
    fn validate_params(&self) -> Result<(), CameraModelError>;
}

/// Common validation functions for camera parameters
pub mod validation {
    use super::*;

    pub fn validate_intrinsics(intrinsics: &Intrinsics) -> Result<(), CameraModelError> {
        if !(intrinsics.fx > 0.0 && intrinsics.fy > 0.0) || !intrinsics.fx.is_finite() {
            return Err(CameraModelError::InvalidParams(
                "Focal length must be positive".to_string(),
            ));
        }
        if !intrinsics.cx.is_finite() || !intrinsics.cy.is_finite() {
            return Err(CameraModelError::InvalidParams(
                "Principal point must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
