//! The persisted camera document.
//!
//! [`CameraParameters`] mirrors the JSON / YAML layout used by the fitting
//! tools: a rectilinear projection block, a spatial orientation block, a Brown
//! lens-distortion block and the GPS anchor. Orientation and distortion entries
//! are [`Parameter`]s so the same document describes a fit problem (some entries
//! free) and a fitted camera (every entry fixed).

use crate::camera::parameter::{FreeParameter, Parameter, ParameterName};
use crate::camera::projector::CameraPose;
use crate::camera::{
    BrownDistortion, CameraModelError, Intrinsics, Projector, RectilinearLens, Resolution,
};
use crate::geometry::GpsCoord;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// GPS anchor of the local tangent plane.
pub type GpsLocation = GpsCoord;

/// Conventional bound on `|k1|` beyond which the radial model tends to fold over.
pub const K1_CONVENTIONAL_LIMIT: f64 = 1.5;
/// Conventional bound on `|k2|` and `|k3|`.
pub const K23_CONVENTIONAL_LIMIT: f64 = 0.2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RectilinearProjection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focallength_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_x_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_y_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_width_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_height_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_width_px: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_height_px: Option<u32>,
}

impl RectilinearProjection {
    pub fn resolution(&self) -> Result<Resolution, CameraModelError> {
        match (self.image_width_px, self.image_height_px) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Ok(Resolution { width, height })
            }
            _ => Err(CameraModelError::InvalidConfiguration(
                "image_width_px and image_height_px must both be set and positive".to_string(),
            )),
        }
    }

    /// Pixel focal lengths and image-centre principal point.
    ///
    /// View angles take precedence over `focallength_mm` + sensor size. When only
    /// one axis can be derived the other reuses it (square pixels).
    pub fn intrinsics(&self) -> Result<(Intrinsics, Resolution), CameraModelError> {
        let resolution = self.resolution()?;
        let width = resolution.width as f64;
        let height = resolution.height as f64;

        let from_view = |size: f64, view_deg: f64| -> Result<f64, CameraModelError> {
            if !(view_deg > 0.0 && view_deg < 180.0) {
                return Err(CameraModelError::InvalidConfiguration(format!(
                    "view angle {view_deg} deg must lie in (0, 180)"
                )));
            }
            Ok(size / (2.0 * (view_deg.to_radians() / 2.0).tan()))
        };

        let view_fx = self.view_x_deg.map(|v| from_view(width, v)).transpose()?;
        let view_fy = self.view_y_deg.map(|v| from_view(height, v)).transpose()?;
        let (fx, fy) = match (view_fx, view_fy) {
            (Some(fx), Some(fy)) => (fx, fy),
            (Some(f), None) | (None, Some(f)) => (f, f),
            (None, None) => self.focal_from_sensor(width, height)?,
        };

        let intrinsics = Intrinsics {
            fx,
            fy,
            cx: width / 2.0,
            cy: height / 2.0,
        };
        Ok((intrinsics, resolution))
    }

    fn focal_from_sensor(&self, width: f64, height: f64) -> Result<(f64, f64), CameraModelError> {
        let Some(focal_mm) = self.focallength_mm else {
            return Err(CameraModelError::InvalidConfiguration(
                "projection needs view_x_deg/view_y_deg or focallength_mm with a sensor size"
                    .to_string(),
            ));
        };
        let fx = self.sensor_width_mm.map(|sw| focal_mm / sw * width);
        let fy = self.sensor_height_mm.map(|sh| focal_mm / sh * height);
        match (fx, fy) {
            (Some(fx), Some(fy)) => Ok((fx, fy)),
            (Some(f), None) | (None, Some(f)) => Ok((f, f)),
            (None, None) => Err(CameraModelError::InvalidConfiguration(
                "focallength_mm requires sensor_width_mm or sensor_height_mm".to_string(),
            )),
        }
    }
}

fn default_heading() -> Parameter {
    Parameter::free(0.0, 360.0, 0.0)
}

fn default_tilt() -> Parameter {
    Parameter::free(0.0, 90.0, 45.0)
}

fn default_roll() -> Parameter {
    Parameter::free(-90.0, 90.0, 0.0)
}

fn default_elevation() -> Parameter {
    Parameter::free(0.0, 25.0, 10.0)
}

fn default_k1() -> Parameter {
    Parameter::free(-K1_CONVENTIONAL_LIMIT, K1_CONVENTIONAL_LIMIT, 0.0)
}

fn default_k23() -> Parameter {
    Parameter::free(-K23_CONVENTIONAL_LIMIT, K23_CONVENTIONAL_LIMIT, 0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialOrientation {
    #[serde(default = "default_heading")]
    pub heading_deg: Parameter,
    #[serde(default = "default_tilt")]
    pub tilt_deg: Parameter,
    #[serde(default = "default_roll")]
    pub roll_deg: Parameter,
    #[serde(default = "default_elevation")]
    pub elevation_m: Parameter,
    #[serde(default)]
    pub pos_x_m: f64,
    #[serde(default)]
    pub pos_y_m: f64,
}

impl Default for SpatialOrientation {
    fn default() -> Self {
        SpatialOrientation {
            heading_deg: default_heading(),
            tilt_deg: default_tilt(),
            roll_deg: default_roll(),
            elevation_m: default_elevation(),
            pos_x_m: 0.0,
            pos_y_m: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrownLensDistortion {
    #[serde(default = "default_k1")]
    pub k1: Parameter,
    #[serde(default = "default_k23")]
    pub k2: Parameter,
    #[serde(default = "default_k23")]
    pub k3: Parameter,
}

impl Default for BrownLensDistortion {
    fn default() -> Self {
        BrownLensDistortion {
            k1: default_k1(),
            k2: default_k23(),
            k3: default_k23(),
        }
    }
}

impl BrownLensDistortion {
    /// All three coefficients fixed at zero.
    pub fn none() -> Self {
        BrownLensDistortion {
            k1: Parameter::Fixed(0.0),
            k2: Parameter::Fixed(0.0),
            k3: Parameter::Fixed(0.0),
        }
    }
}

/// Camera description with fixed and free attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraParameters {
    pub rectilinear_projection: RectilinearProjection,
    #[serde(default)]
    pub spatial_orientation: SpatialOrientation,
    #[serde(default)]
    pub brown_lens_distortion: BrownLensDistortion,
    pub gps_location: GpsLocation,
}

impl CameraParameters {
    pub fn parameter(&self, name: ParameterName) -> &Parameter {
        let orientation = &self.spatial_orientation;
        let lens = &self.brown_lens_distortion;
        match name {
            ParameterName::ElevationM => &orientation.elevation_m,
            ParameterName::TiltDeg => &orientation.tilt_deg,
            ParameterName::RollDeg => &orientation.roll_deg,
            ParameterName::HeadingDeg => &orientation.heading_deg,
            ParameterName::K1 => &lens.k1,
            ParameterName::K2 => &lens.k2,
            ParameterName::K3 => &lens.k3,
        }
    }

    /// Free parameters in [`ParameterName::ALL`] order, each validated.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::OutOfRangeParameter`] if an initial value lies outside its bounds.
    pub fn free_parameters(&self) -> Result<Vec<FreeParameter>, CameraModelError> {
        let mut free = Vec::new();
        for name in ParameterName::ALL {
            if let Parameter::Free(constraint) = self.parameter(name) {
                let param = FreeParameter {
                    name,
                    constraint: *constraint,
                };
                param.validate()?;
                free.push(param);
            }
        }
        Ok(free)
    }

    pub fn num_free(&self) -> usize {
        ParameterName::ALL
            .iter()
            .filter(|name| self.parameter(**name).is_free())
            .count()
    }

    pub fn is_fully_fixed(&self) -> bool {
        self.num_free() == 0
    }

    /// Initial values of the free parameters, in extraction order.
    pub fn initial_values(&self) -> Vec<f64> {
        ParameterName::ALL
            .iter()
            .map(|name| self.parameter(*name))
            .filter(|param| param.is_free())
            .map(|param| param.initial_value())
            .collect()
    }

    /// Substitutes `values` for the free parameters and builds the concrete camera.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::InvalidParams`] if `values` does not hold one entry per free parameter.
    /// * [`CameraModelError::InvalidConfiguration`] if the projection block is incomplete or a
    ///   resolved value breaks a camera invariant (elevation > 0, tilt in [0, 90]).
    pub fn resolve(&self, values: &[f64]) -> Result<Projector, CameraModelError> {
        let expected = self.num_free();
        if values.len() != expected {
            return Err(CameraModelError::InvalidParams(format!(
                "expected {} free values, got {}",
                expected,
                values.len()
            )));
        }

        let mut free_values = values.iter();
        let mut resolved = [0.0; 7];
        for (slot, name) in resolved.iter_mut().zip(ParameterName::ALL) {
            *slot = match self.parameter(name) {
                Parameter::Fixed(value) => *value,
                // Length was checked above.
                Parameter::Free(_) => *free_values.next().unwrap_or(&f64::NAN),
            };
        }
        let [elevation_m, tilt_deg, roll_deg, heading_deg, k1, k2, k3] = resolved;

        let (intrinsics, resolution) = self.rectilinear_projection.intrinsics()?;
        let lens = RectilinearLens::new(intrinsics, resolution, BrownDistortion::new(k1, k2, k3))?;

        let pose = CameraPose {
            heading_deg,
            tilt_deg,
            roll_deg,
            elevation_m,
            pos_x_m: self.spatial_orientation.pos_x_m,
            pos_y_m: self.spatial_orientation.pos_y_m,
        };
        Projector::new(lens, self.rectilinear_projection.clone(), pose, self.gps_location)
    }

    /// Resolves the camera at the initial values of its free parameters.
    pub fn resolve_initial(&self) -> Result<Projector, CameraModelError> {
        self.resolve(&self.initial_values())
    }

    /// Checks the free constraints and logs values outside the conventional
    /// distortion ranges.
    pub fn validate(&self) -> Result<(), CameraModelError> {
        let free = self.free_parameters()?;
        self.rectilinear_projection.intrinsics()?;

        for (name, limit) in [
            (ParameterName::K1, K1_CONVENTIONAL_LIMIT),
            (ParameterName::K2, K23_CONVENTIONAL_LIMIT),
            (ParameterName::K3, K23_CONVENTIONAL_LIMIT),
        ] {
            let exceeds = match self.parameter(name) {
                Parameter::Fixed(value) => value.abs() > limit,
                Parameter::Free(c) => c.lower < -limit || c.upper > limit,
            };
            if exceeds {
                warn!("{} exceeds the conventional range [-{}, {}]", name, limit, limit);
            }
        }
        debug!("camera parameters valid, {} free", free.len());
        Ok(())
    }

    /// Copy with the horizontal view angle replaced (used by view-angle sweeps).
    pub fn with_view_x_deg(&self, view_x_deg: f64) -> Self {
        let mut params = self.clone();
        params.rectilinear_projection.view_x_deg = Some(view_x_deg);
        params
    }

    pub fn from_json_str(contents: &str) -> Result<Self, CameraModelError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn to_json_string(&self) -> Result<String, CameraModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a camera document from a JSON file.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::IOError`]: If there's an issue reading the file.
    /// * [`CameraModelError::JsonError`]: If the document is malformed.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, CameraModelError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraModelError> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
