//! Fit quality in metres: distance between each landmark's forward projection
//! and its surveyed GPS position.

use crate::camera::{CameraModelError, Projector};
use crate::geometry::{self, GpsCoord};
use crate::landmark::LandmarkSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-landmark forward projection and its distance to the surveyed position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkResidual {
    pub predicted: GpsCoord,
    pub distance_m: f64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct FitStatistics {
    pub rmse: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    pub median: f64,
    pub per_landmark: Vec<LandmarkResidual>,
}

impl fmt::Debug for FitStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fit Error [ rmse: {}, min: {}, max: {}, mean: {}, stddev: {}, median: {} ] (m, {} landmarks)",
            self.rmse,
            self.min,
            self.max,
            self.mean,
            self.stddev,
            self.median,
            self.per_landmark.len()
        )
    }
}

/// Forward-projects every landmark pixel onto the plane at its surveyed elevation.
///
/// # Errors
///
/// Any projection failure is returned as is.
pub fn landmark_residuals(
    projector: &Projector,
    landmarks: &LandmarkSet,
) -> Result<Vec<LandmarkResidual>, CameraModelError> {
    landmarks
        .iter()
        .map(|landmark| {
            let predicted = projector.gps_from_image(&landmark.pixel, landmark.elevation_m)?;
            Ok(LandmarkResidual {
                predicted,
                distance_m: geometry::distance_m(&predicted, &landmark.gps),
            })
        })
        .collect()
}

/// Mean planar distance in metres between predicted and surveyed landmark positions.
pub fn average_distance_m(
    projector: &Projector,
    landmarks: &LandmarkSet,
) -> Result<f64, CameraModelError> {
    let residuals = landmark_residuals(projector, landmarks)?;
    let sum: f64 = residuals.iter().map(|r| r.distance_m).sum();
    Ok(sum / residuals.len() as f64)
}

pub fn fit_statistics(
    projector: &Projector,
    landmarks: &LandmarkSet,
) -> Result<FitStatistics, CameraModelError> {
    let per_landmark = landmark_residuals(projector, landmarks)?;
    let errors: Vec<f64> = per_landmark.iter().map(|r| r.distance_m).collect();

    let n = errors.len() as f64;
    let mean = errors.iter().sum::<f64>() / n;

    let variance = errors.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let rmse = (errors.iter().map(|x| x.powi(2)).sum::<f64>() / n).sqrt();

    let min = errors.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = errors.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

    let mut sorted = errors.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Ok(FitStatistics {
        rmse,
        min,
        max,
        mean,
        stddev,
        median,
        per_landmark,
    })
}
