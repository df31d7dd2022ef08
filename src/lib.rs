//! GeoCam Tools Library
//!
//! Geo-registration of a fixed camera: fit a rectilinear camera with Brown
//! radial distortion to a handful of pixel <-> GPS landmarks, then convert
//! between image pixels and GPS coordinates. The library provides:
//! - Camera parameter documents with fixed and free attributes (JSON)
//! - Forward (pixel -> GPS) and inverse (GPS -> pixel) projection
//! - A seedable Metropolis optimizer with best-of-N and view-angle sweeps
//! - Fit evaluation in metres
//! - Top-view and diagnostic rasters
//!
//! GPS handling uses a local flat-earth approximation around the camera's GPS
//! anchor, which is only meant for sub-kilometre scenes.

pub mod camera;
pub mod config;
pub mod evaluation;
pub mod geometry;
pub mod landmark;
pub mod optimization;
pub mod session;
pub mod visualization;

// Re-export commonly used types
pub use camera::{
    CameraModel, CameraModelError, CameraParameters, FitConstraint, Intrinsics, Parameter,
    ParameterName, Projector, RectilinearLens, Resolution,
};
pub use config::FitConfig;
pub use geometry::GpsCoord;
pub use landmark::{Landmark, LandmarkSet};
pub use optimization::{FitResult, MetropolisOptimizer, Optimizer, OptimizerConfig};
pub use session::CameraFit;
pub use visualization::{TopViewConfig, TopViewRenderer};
