//! Pixel <-> GPS projection for a fully resolved camera.
//!
//! World coordinates are a local tangent plane at the GPS anchor: x east, y
//! north, z up, all in metres. The camera frame has x to the image right, y to
//! the image bottom and z along the optical axis. Orientation follows a compass
//! heading (0 = north, 90 = east), a tilt measured from nadir (0 = straight
//! down, 90 = horizon) and a roll about the optical axis.

use crate::camera::model::{BrownLensDistortion, SpatialOrientation};
use crate::camera::{
    CameraModel, CameraModelError, CameraParameters, Parameter, RectilinearLens,
    RectilinearProjection,
};
use crate::geometry::{self, GpsCoord};
use log::info;
use nalgebra::{Rotation3, Vector2, Vector3};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

/// Below this magnitude a ray's vertical component counts as parallel to the plane.
const PARALLEL_EPS: f64 = 1e-12;

/// Orientation and position of a resolved camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub heading_deg: f64,
    pub tilt_deg: f64,
    pub roll_deg: f64,
    pub elevation_m: f64,
    pub pos_x_m: f64,
    pub pos_y_m: f64,
}

impl CameraPose {
    fn validate(&self) -> Result<(), CameraModelError> {
        let values = [
            self.heading_deg,
            self.tilt_deg,
            self.roll_deg,
            self.elevation_m,
            self.pos_x_m,
            self.pos_y_m,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CameraModelError::InvalidConfiguration(
                "camera pose values must be finite".to_string(),
            ));
        }
        if self.elevation_m <= 0.0 {
            return Err(CameraModelError::InvalidConfiguration(format!(
                "elevation_m must be positive, got {}",
                self.elevation_m
            )));
        }
        if !(0.0..=90.0).contains(&self.tilt_deg) {
            return Err(CameraModelError::InvalidConfiguration(format!(
                "tilt_deg must lie in [0, 90], got {}",
                self.tilt_deg
            )));
        }
        Ok(())
    }

    /// Rotation taking camera-frame vectors into the world frame.
    fn world_from_camera(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), -self.heading_deg.to_radians())
            * Rotation3::from_axis_angle(&Vector3::x_axis(), PI + self.tilt_deg.to_radians())
            * Rotation3::from_axis_angle(&Vector3::z_axis(), self.roll_deg.to_radians())
    }
}

/// A fully resolved, geo-registered camera.
#[derive(Clone)]
pub struct Projector {
    lens: RectilinearLens,
    projection: RectilinearProjection,
    pose: CameraPose,
    anchor: GpsCoord,
    world_from_camera: Rotation3<f64>,
    center: Vector3<f64>,
}

impl Projector {
    /// Builds a projector; the heading is normalised into `[0, 360)`.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::InvalidConfiguration`]: non-finite pose, elevation not positive,
    ///   tilt outside `[0, 90]` or an invalid anchor latitude.
    pub fn new(
        lens: RectilinearLens,
        projection: RectilinearProjection,
        mut pose: CameraPose,
        anchor: GpsCoord,
    ) -> Result<Self, CameraModelError> {
        pose.validate()?;
        if !anchor.is_finite() || anchor.lat.abs() >= 90.0 {
            return Err(CameraModelError::InvalidConfiguration(format!(
                "invalid GPS anchor ({}, {})",
                anchor.lat, anchor.lon
            )));
        }
        pose.heading_deg = pose.heading_deg.rem_euclid(360.0);

        Ok(Projector {
            world_from_camera: pose.world_from_camera(),
            center: Vector3::new(pose.pos_x_m, pose.pos_y_m, pose.elevation_m),
            lens,
            projection,
            pose,
            anchor,
        })
    }

    pub fn lens(&self) -> &RectilinearLens {
        &self.lens
    }

    pub fn anchor(&self) -> &GpsCoord {
        &self.anchor
    }

    pub fn heading_deg(&self) -> f64 {
        self.pose.heading_deg
    }

    pub fn tilt_deg(&self) -> f64 {
        self.pose.tilt_deg
    }

    pub fn elevation_m(&self) -> f64 {
        self.pose.elevation_m
    }

    /// Unit viewing ray of a pixel in world coordinates.
    pub fn ray_from_image(&self, pixel: &Vector2<f64>) -> Result<Vector3<f64>, CameraModelError> {
        let ray_camera = self.lens.unproject(pixel)?;
        Ok(self.world_from_camera * ray_camera)
    }

    /// Intersects the pixel's viewing ray with the plane `z = target_elevation_m`.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::NoIntersection`]: the ray is parallel to the plane or
    ///   meets it behind the camera.
    /// * [`CameraModelError::NumericalDivergence`]: undistortion failed or the
    ///   intersection is not finite.
    pub fn space_from_image(
        &self,
        pixel: &Vector2<f64>,
        target_elevation_m: f64,
    ) -> Result<Vector3<f64>, CameraModelError> {
        let ray = self.ray_from_image(pixel)?;
        if ray.z.abs() < PARALLEL_EPS {
            return Err(CameraModelError::NoIntersection);
        }

        let t = (target_elevation_m - self.center.z) / ray.z;
        if !(t > 0.0) {
            return Err(CameraModelError::NoIntersection);
        }

        let point = self.center + ray * t;
        if !point.iter().all(|v| v.is_finite()) {
            return Err(CameraModelError::NumericalDivergence(format!(
                "ground intersection of pixel ({}, {}) is not finite",
                pixel.x, pixel.y
            )));
        }
        Ok(point)
    }

    /// Forward projection: pixel -> GPS on the plane at `target_elevation_m`.
    pub fn gps_from_image(
        &self,
        pixel: &Vector2<f64>,
        target_elevation_m: f64,
    ) -> Result<GpsCoord, CameraModelError> {
        let point = self.space_from_image(pixel, target_elevation_m)?;
        Ok(geometry::gps_from_offset(
            &self.anchor,
            &Vector2::new(point.x, point.y),
        ))
    }

    /// Projects a local world point to pixels.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::PointBehindCamera`]: the point is not in front of the camera.
    pub fn image_from_space(&self, point: &Vector3<f64>) -> Result<Vector2<f64>, CameraModelError> {
        let point_camera = self.world_from_camera.inverse() * (point - self.center);
        self.lens.project(&point_camera)
    }

    /// Inverse projection: GPS at `reference_elevation_m` -> pixel.
    pub fn image_from_gps(
        &self,
        gps: &GpsCoord,
        reference_elevation_m: f64,
    ) -> Result<Vector2<f64>, CameraModelError> {
        let point = geometry::space_from_gps(&self.anchor, gps, reference_elevation_m);
        self.image_from_space(&point)
    }

    /// The fitted camera as an all-fixed document.
    pub fn to_parameters(&self) -> CameraParameters {
        let d = &self.lens.distortion;
        CameraParameters {
            rectilinear_projection: self.projection.clone(),
            spatial_orientation: SpatialOrientation {
                heading_deg: Parameter::Fixed(self.pose.heading_deg),
                tilt_deg: Parameter::Fixed(self.pose.tilt_deg),
                roll_deg: Parameter::Fixed(self.pose.roll_deg),
                elevation_m: Parameter::Fixed(self.pose.elevation_m),
                pos_x_m: self.pose.pos_x_m,
                pos_y_m: self.pose.pos_y_m,
            },
            brown_lens_distortion: BrownLensDistortion {
                k1: Parameter::Fixed(d.k1),
                k2: Parameter::Fixed(d.k2),
                k3: Parameter::Fixed(d.k3),
            },
            gps_location: self.anchor,
        }
    }

    /// Every resolved camera value by name.
    pub fn parameter_map(&self) -> BTreeMap<String, f64> {
        let intrinsics = &self.lens.intrinsics;
        let d = &self.lens.distortion;
        [
            ("heading_deg", self.pose.heading_deg),
            ("tilt_deg", self.pose.tilt_deg),
            ("roll_deg", self.pose.roll_deg),
            ("elevation_m", self.pose.elevation_m),
            ("pos_x_m", self.pose.pos_x_m),
            ("pos_y_m", self.pose.pos_y_m),
            ("k1", d.k1),
            ("k2", d.k2),
            ("k3", d.k3),
            ("focallength_x_px", intrinsics.fx),
            ("focallength_y_px", intrinsics.fy),
            ("center_x_px", intrinsics.cx),
            ("center_y_px", intrinsics.cy),
            ("view_x_deg", self.lens.view_x_deg()),
            ("view_y_deg", self.lens.view_y_deg()),
            ("image_width_px", self.lens.resolution.width as f64),
            ("image_height_px", self.lens.resolution.height as f64),
            ("lat", self.anchor.lat),
            ("lon", self.anchor.lon),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }

    pub fn log_parameters(&self) {
        info!("Camera parameters:");
        for (name, value) in self.parameter_map() {
            info!("  {name}: {value}");
        }
    }
}

impl fmt::Debug for Projector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Projector [heading: {} tilt: {} roll: {} elevation: {} pos: ({}, {}) anchor: ({}, {}) lens: {:?}]",
            self.pose.heading_deg,
            self.pose.tilt_deg,
            self.pose.roll_deg,
            self.pose.elevation_m,
            self.pose.pos_x_m,
            self.pose.pos_y_m,
            self.anchor.lat,
            self.anchor.lon,
            self.lens,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{BrownDistortion, Intrinsics, Resolution};
    use crate::geometry::sample_pixel_grid;
    use approx::assert_relative_eq;

    fn square_lens(distortion: BrownDistortion) -> RectilinearLens {
        RectilinearLens::new(
            Intrinsics {
                fx: 500.0,
                fy: 500.0,
                cx: 500.0,
                cy: 500.0,
            },
            Resolution {
                width: 1000,
                height: 1000,
            },
            distortion,
        )
        .unwrap()
    }

    fn projector(heading: f64, tilt: f64, roll: f64, distortion: BrownDistortion) -> Projector {
        Projector::new(
            square_lens(distortion),
            RectilinearProjection {
                view_x_deg: Some(90.0),
                image_width_px: Some(1000),
                image_height_px: Some(1000),
                ..Default::default()
            },
            CameraPose {
                heading_deg: heading,
                tilt_deg: tilt,
                roll_deg: roll,
                elevation_m: 10.0,
                pos_x_m: 0.0,
                pos_y_m: 0.0,
            },
            GpsCoord::new(0.0, 0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_center_pixel_at_45_deg() {
        let camera = projector(0.0, 45.0, 0.0, BrownDistortion::default());
        let point = camera
            .space_from_image(&Vector2::new(500.0, 500.0), 0.0)
            .unwrap();
        assert_relative_eq!(point.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(point.y, 10.0, epsilon = 1e-9);
        assert_relative_eq!(point.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_image_axes_at_45_deg() {
        let camera = projector(0.0, 45.0, 0.0, BrownDistortion::default());

        // Right of centre lands east, rows below centre land closer.
        let right = camera.space_from_image(&Vector2::new(750.0, 500.0), 0.0).unwrap();
        assert_relative_eq!(right.x, 10.0 * 0.5 / (0.5f64).sqrt(), epsilon = 1e-9);
        assert_relative_eq!(right.y, 10.0, epsilon = 1e-9);

        let below = camera.space_from_image(&Vector2::new(500.0, 750.0), 0.0).unwrap();
        assert_relative_eq!(below.y, 10.0 / 3.0, epsilon = 1e-9);

        let above = camera.space_from_image(&Vector2::new(500.0, 250.0), 0.0).unwrap();
        assert_relative_eq!(above.y, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_heading_east() {
        let camera = projector(90.0, 45.0, 0.0, BrownDistortion::default());
        let point = camera
            .space_from_image(&Vector2::new(500.0, 500.0), 0.0)
            .unwrap();
        assert_relative_eq!(point.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(point.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_nadir_view() {
        let camera = projector(0.0, 0.0, 0.0, BrownDistortion::default());
        let point = camera
            .space_from_image(&Vector2::new(500.0, 500.0), 2.0)
            .unwrap();
        assert_relative_eq!(point, Vector3::new(0.0, 0.0, 2.0), epsilon = 1e-9);

        // Image top is north when looking straight down.
        let top = camera.space_from_image(&Vector2::new(500.0, 0.0), 0.0).unwrap();
        assert!(top.y > 0.0);
    }

    #[test]
    fn test_no_intersection_at_horizon() {
        let camera = projector(0.0, 90.0, 0.0, BrownDistortion::default());
        let result = camera.gps_from_image(&Vector2::new(500.0, 500.0), 0.0);
        assert!(matches!(result, Err(CameraModelError::NoIntersection)));

        let sky = camera.gps_from_image(&Vector2::new(500.0, 100.0), 0.0);
        assert!(matches!(sky, Err(CameraModelError::NoIntersection)));

        let ground = camera.gps_from_image(&Vector2::new(500.0, 900.0), 0.0);
        assert!(ground.is_ok());
    }

    #[test]
    fn test_target_plane_above_camera() {
        let camera = projector(0.0, 45.0, 0.0, BrownDistortion::default());
        let result = camera.space_from_image(&Vector2::new(500.0, 500.0), 15.0);
        assert!(matches!(result, Err(CameraModelError::NoIntersection)));
    }

    #[test]
    fn test_point_behind_camera() {
        let camera = projector(0.0, 45.0, 0.0, BrownDistortion::default());
        let behind = geometry::gps_from_offset(camera.anchor(), &Vector2::new(0.0, -50.0));
        assert!(matches!(
            camera.image_from_gps(&behind, 10.0),
            Err(CameraModelError::PointBehindCamera)
        ));
    }

    #[test]
    fn test_round_trip_grid() {
        let lens = square_lens(BrownDistortion::new(-0.05, 0.01, 0.0));
        let camera = Projector::new(
            lens,
            RectilinearProjection::default(),
            CameraPose {
                heading_deg: 237.0,
                tilt_deg: 55.0,
                roll_deg: 4.0,
                elevation_m: 14.5,
                pos_x_m: 3.0,
                pos_y_m: -2.0,
            },
            GpsCoord::new(48.137154, 11.576124),
        )
        .unwrap();

        let target_elevation = 0.5;
        let pixels = sample_pixel_grid(1000.0, 1000.0, 100);
        let mut checked = 0;
        for pixel in &pixels {
            let gps = match camera.gps_from_image(pixel, target_elevation) {
                Ok(gps) => gps,
                Err(CameraModelError::NoIntersection) => continue,
                Err(e) => panic!("unexpected error for {:?}: {}", pixel, e),
            };
            let back = camera.image_from_gps(&gps, target_elevation).unwrap();
            assert!(
                (back - pixel).norm() < 1e-3,
                "pixel {:?} came back as {:?}",
                pixel,
                back
            );
            checked += 1;
        }
        assert!(checked > pixels.len() / 2, "only {} pixels intersected", checked);
    }

    #[test]
    fn test_strong_barrel_never_flips_sides() {
        let camera = projector(0.0, 45.0, 0.0, BrownDistortion::new(-0.4, 0.0, 0.0));

        let west = camera.space_from_image(&Vector2::new(400.0, 500.0), 0.0).unwrap();
        assert!(west.x < 0.0);

        // Normalised x = -0.7 is past the largest distorted radius of the model.
        assert!(matches!(
            camera.gps_from_image(&Vector2::new(150.0, 500.0), 0.0),
            Err(CameraModelError::NumericalDivergence(_))
        ));
        assert!(matches!(
            camera.image_from_space(&Vector3::new(-100.0, 10.0, 0.0)),
            Err(CameraModelError::NumericalDivergence(_))
        ));
    }

    #[test]
    fn test_heading_normalised() {
        let camera = projector(-90.0, 45.0, 0.0, BrownDistortion::default());
        assert_relative_eq!(camera.heading_deg(), 270.0);
    }

    #[test]
    fn test_invalid_pose() {
        let result = Projector::new(
            square_lens(BrownDistortion::default()),
            RectilinearProjection::default(),
            CameraPose {
                heading_deg: 0.0,
                tilt_deg: 45.0,
                roll_deg: 0.0,
                elevation_m: 0.0,
                pos_x_m: 0.0,
                pos_y_m: 0.0,
            },
            GpsCoord::new(0.0, 0.0),
        );
        assert!(matches!(
            result,
            Err(CameraModelError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_parameter_map() {
        let camera = projector(10.0, 45.0, 1.0, BrownDistortion::new(0.1, 0.0, 0.0));
        let map = camera.parameter_map();
        assert_eq!(map["heading_deg"], 10.0);
        assert_eq!(map["elevation_m"], 10.0);
        assert_eq!(map["k1"], 0.1);
        assert_relative_eq!(map["view_x_deg"], 90.0, epsilon = 1e-9);
    }
}
