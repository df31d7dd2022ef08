//! Rectilinear lens with Brown radial distortion.
//!
//! This module provides the [`RectilinearLens`] struct, the intrinsic half of a
//! geo-registered camera. It maps points given in camera coordinates (x right,
//! y down, z along the optical axis) to pixels and back, applying the radial
//! Brown model `x_d = x_u * (1 + k1 r^2 + k2 r^4 + k3 r^6)` on focal-normalised
//! coordinates. It adheres to the [`CameraModel`] trait defined in the parent
//! `camera` module ([`crate::camera`]).

use crate::camera::{validation, CameraModel, CameraModelError, Intrinsics, Resolution};
use nalgebra::{Matrix2, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Radial distortion coefficients `k1`, `k2`, `k3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownDistortion {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
}

impl BrownDistortion {
    /// Tolerance for the iterative inversion.
    const EPS: f64 = 1e-10;
    /// Iteration cap for the iterative inversion.
    const MAX_ITERATIONS: u32 = 100;

    pub fn new(k1: f64, k2: f64, k3: f64) -> Self {
        BrownDistortion { k1, k2, k3 }
    }

    pub fn is_identity(&self) -> bool {
        self.k1 == 0.0 && self.k2 == 0.0 && self.k3 == 0.0
    }

    fn radial_factor(&self, r2: f64) -> f64 {
        1.0 + self.k1 * r2 + self.k2 * r2 * r2 + self.k3 * r2 * r2 * r2
    }

    /// `d(r * radial) / dr` expressed in `s = r^2`.
    fn radial_slope(&self, s: f64) -> f64 {
        1.0 + 3.0 * self.k1 * s + 5.0 * self.k2 * s * s + 7.0 * self.k3 * s * s * s
    }

    /// Returns `true` when the distorted radius grows strictly with the ideal
    /// radius on `[0, sqrt(r2)]`, i.e. the point lies before the fold of the model.
    pub fn is_monotonic_within(&self, r2: f64) -> bool {
        if !r2.is_finite() || self.radial_slope(r2) <= 0.0 {
            return false;
        }
        // The slope is a cubic in s; its extrema on (0, r2) sit at roots of
        // 21 k3 s^2 + 10 k2 s + 3 k1 = 0.
        let (a, b, c) = (21.0 * self.k3, 10.0 * self.k2, 3.0 * self.k1);
        let critical = if a == 0.0 {
            [-c / b, f64::NAN]
        } else {
            let root = (b * b - 4.0 * a * c).sqrt();
            [(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)]
        };
        critical
            .into_iter()
            .filter(|s| *s > 0.0 && *s < r2)
            .all(|s| self.radial_slope(s) > 0.0)
    }

    /// Applies the distortion to an ideal normalised point.
    pub fn distort(&self, point: &Vector2<f64>) -> Vector2<f64> {
        point * self.radial_factor(point.norm_squared())
    }

    /// Recovers the ideal normalised point from a distorted one.
    ///
    /// Newton iteration on `distort(p) - target`, starting from the distorted
    /// point itself. Only the root before the fold of the model is accepted.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::NumericalDivergence`]: singular Jacobian, non-finite
    ///   iterate, no convergence within the iteration cap, or a target that has
    ///   no ideal point before the fold.
    pub fn undistort(&self, target: &Vector2<f64>) -> Result<Vector2<f64>, CameraModelError> {
        if self.is_identity() {
            return Ok(*target);
        }

        let mut point = *target;

        for _ in 0..Self::MAX_ITERATIONS {
            let x = point.x;
            let y = point.y;
            let r2 = x * x + y * y;
            let radial = self.radial_factor(r2);

            let error = point * radial - target;
            if error.norm() < Self::EPS {
                return self.check_unfolded(point);
            }

            // d(radial)/d(r^2), chained through r^2 = x^2 + y^2
            let d_radial = self.k1 + 2.0 * self.k2 * r2 + 3.0 * self.k3 * r2 * r2;
            let d_radial_dx = d_radial * 2.0 * x;
            let d_radial_dy = d_radial * 2.0 * y;

            let jacobian = Matrix2::new(
                radial + x * d_radial_dx,
                x * d_radial_dy,
                y * d_radial_dx,
                radial + y * d_radial_dy,
            );

            let Some(inv_jacobian) = jacobian.try_inverse() else {
                return Err(CameraModelError::NumericalDivergence(
                    "distortion Jacobian is singular".to_string(),
                ));
            };

            let delta = inv_jacobian * error;
            point -= delta;

            if !point.x.is_finite() || !point.y.is_finite() {
                return Err(CameraModelError::NumericalDivergence(
                    "undistortion produced a non-finite point".to_string(),
                ));
            }
            if delta.norm() < Self::EPS {
                return self.check_unfolded(point);
            }
        }

        Err(CameraModelError::NumericalDivergence(format!(
            "undistortion did not converge after {} iterations",
            Self::MAX_ITERATIONS
        )))
    }

    fn check_unfolded(&self, point: Vector2<f64>) -> Result<Vector2<f64>, CameraModelError> {
        let r2 = point.norm_squared();
        if self.radial_factor(r2) > 0.0 && self.is_monotonic_within(r2) {
            Ok(point)
        } else {
            Err(CameraModelError::NumericalDivergence(format!(
                "point ({}, {}) lies beyond the fold of the distortion model",
                point.x, point.y
            )))
        }
    }
}

/// Rectilinear (pinhole) lens with radial distortion.
///
/// # Examples
///
/// ```rust
/// use geocam_tools::camera::{BrownDistortion, CameraModel, Intrinsics, RectilinearLens, Resolution};
/// use nalgebra::Vector3;
///
/// let lens = RectilinearLens::new(
///     Intrinsics { fx: 500.0, fy: 500.0, cx: 320.0, cy: 240.0 },
///     Resolution { width: 640, height: 480 },
///     BrownDistortion::default(),
/// )
/// .unwrap();
///
/// let pixel = lens.project(&Vector3::new(0.0, 0.0, 2.0)).unwrap();
/// assert_eq!((pixel.x, pixel.y), (320.0, 240.0));
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct RectilinearLens {
    pub intrinsics: Intrinsics,
    pub resolution: Resolution,
    pub distortion: BrownDistortion,
}

impl RectilinearLens {
    pub fn new(
        intrinsics: Intrinsics,
        resolution: Resolution,
        distortion: BrownDistortion,
    ) -> Result<Self, CameraModelError> {
        let lens = RectilinearLens {
            intrinsics,
            resolution,
            distortion,
        };
        lens.validate_params()?;
        Ok(lens)
    }

    /// Pixel -> focal-normalised (still distorted) coordinates.
    pub fn normalize(&self, pixel: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new(
            (pixel.x - self.intrinsics.cx) / self.intrinsics.fx,
            (pixel.y - self.intrinsics.cy) / self.intrinsics.fy,
        )
    }

    /// Focal-normalised coordinates -> pixel.
    pub fn denormalize(&self, point: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new(
            self.intrinsics.fx * point.x + self.intrinsics.cx,
            self.intrinsics.fy * point.y + self.intrinsics.cy,
        )
    }

    /// Horizontal field of view in degrees.
    pub fn view_x_deg(&self) -> f64 {
        (2.0 * (self.resolution.width as f64 / (2.0 * self.intrinsics.fx)).atan()).to_degrees()
    }

    /// Vertical field of view in degrees.
    pub fn view_y_deg(&self) -> f64 {
        (2.0 * (self.resolution.height as f64 / (2.0 * self.intrinsics.fy)).atan()).to_degrees()
    }
}

impl fmt::Debug for RectilinearLens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RectilinearLens [fx: {} fy: {} cx: {} cy: {} k1: {} k2: {} k3: {}]",
            self.intrinsics.fx,
            self.intrinsics.fy,
            self.intrinsics.cx,
            self.intrinsics.cy,
            self.distortion.k1,
            self.distortion.k2,
            self.distortion.k3,
        )
    }
}

impl CameraModel for RectilinearLens {
    /// Projects a point in camera coordinates to (distorted) pixel coordinates.
    ///
    /// No image-bounds check is applied; callers test with [`Resolution::contains`].
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::PointBehindCamera`]: z is not strictly positive.
    /// * [`CameraModelError::NumericalDivergence`]: the point lies beyond the fold
    ///   of the distortion model or the pixel is not finite.
    fn project(&self, point_3d: &Vector3<f64>) -> Result<Vector2<f64>, CameraModelError> {
        if point_3d.z < f64::EPSILON.sqrt() {
            return Err(CameraModelError::PointBehindCamera);
        }

        let ideal = Vector2::new(point_3d.x / point_3d.z, point_3d.y / point_3d.z);
        if !self.distortion.is_monotonic_within(ideal.norm_squared()) {
            return Err(CameraModelError::NumericalDivergence(format!(
                "point ({}, {}) lies beyond the fold of the distortion model",
                ideal.x, ideal.y
            )));
        }
        let distorted = self.distortion.distort(&ideal);
        let pixel = self.denormalize(&distorted);

        if !pixel.x.is_finite() || !pixel.y.is_finite() {
            return Err(CameraModelError::NumericalDivergence(
                "projection produced a non-finite pixel".to_string(),
            ));
        }
        Ok(pixel)
    }

    /// Unprojects a pixel to a unit ray, removing the radial distortion first.
    fn unproject(&self, point_2d: &Vector2<f64>) -> Result<Vector3<f64>, CameraModelError> {
        let distorted = self.normalize(point_2d);
        let ideal = self.distortion.undistort(&distorted)?;
        Ok(Vector3::new(ideal.x, ideal.y, 1.0).normalize())
    }

    fn validate_params(&self) -> Result<(), CameraModelError> {
        validation::validate_intrinsics(&self.intrinsics)?;
        let d = &self.distortion;
        if !d.k1.is_finite() || !d.k2.is_finite() || !d.k3.is_finite() {
            return Err(CameraModelError::InvalidParams(
                "Distortion coefficients must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
