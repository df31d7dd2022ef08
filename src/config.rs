//! YAML fit configuration.
//!
//! ```yaml
//! image_path: camera.png
//! camera_parameters: { ... }      # CameraParameters document
//! landmarks:
//!   - image_coords: {px_x: 812, px_y: 455}
//!     gps_coords: {lat: 48.1371, lon: 11.5754, elevation_m: 0.0}
//! iteration_num: 5000
//! top_view: {do_plot: true, extent: [-50, 50, -10, 90], m_per_pixel: 0.1}
//! save_cam: true
//! optimizer: {step_scale: 0.02, landmark_sigma_m: [0.001, 0.001, 0.01], temperature: 1.0, seed: 7}
//! ```
//!
//! The `optimizer` block is optional; every key in it defaults.

use crate::camera::{CameraModelError, CameraParameters};
use crate::landmark::LandmarkSet;
use crate::optimization::{OptimizerConfig, DEFAULT_LANDMARK_SIGMA_M};
use crate::visualization::TopViewConfig;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Search settings other than the iteration count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub step_scale: f64,
    pub landmark_sigma_m: [f64; 3],
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        let defaults = OptimizerConfig::default();
        OptimizerSettings {
            step_scale: defaults.step_scale,
            landmark_sigma_m: DEFAULT_LANDMARK_SIGMA_M,
            temperature: defaults.temperature,
            seed: defaults.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub image_path: PathBuf,
    pub camera_parameters: CameraParameters,
    pub landmarks: LandmarkSet,
    pub iteration_num: usize,
    pub top_view: TopViewConfig,
    pub save_cam: bool,
    #[serde(default)]
    pub optimizer: OptimizerSettings,
}

impl FitConfig {
    /// Parses a configuration without touching the file system.
    pub fn from_yaml_str(contents: &str) -> Result<Self, CameraModelError> {
        let config: FitConfig = serde_yaml::from_str(contents)?;
        config.top_view.validate()?;
        config.camera_parameters.free_parameters()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// A relative `image_path` is taken relative to the configuration file. When
    /// the projection block has no image size, it is read from the image header.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::IOError`]: the file cannot be read.
    /// * [`CameraModelError::YamlError`]: the document is malformed.
    /// * [`CameraModelError::ImageError`]: the image size is needed but the image cannot be read.
    pub fn load_yaml<P: AsRef<Path>>(path: P) -> Result<Self, CameraModelError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&contents)?;

        if config.image_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.image_path = dir.join(&config.image_path);
            }
        }
        config.fill_image_size()?;
        config.camera_parameters.validate()?;

        info!(
            "loaded fit configuration {}: {} landmarks, {} free parameters",
            path.display(),
            config.landmarks.len(),
            config.camera_parameters.num_free()
        );
        Ok(config)
    }

    /// Sets the projection's image size from the image header if it is missing.
    pub fn fill_image_size(&mut self) -> Result<(), CameraModelError> {
        let projection = &mut self.camera_parameters.rectilinear_projection;
        if projection.image_width_px.is_some() && projection.image_height_px.is_some() {
            return Ok(());
        }
        let (width, height) = image::image_dimensions(&self.image_path)?;
        debug!(
            "image size {}x{} read from {}",
            width,
            height,
            self.image_path.display()
        );
        projection.image_width_px.get_or_insert(width);
        projection.image_height_px.get_or_insert(height);
        Ok(())
    }

    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            iterations: self.iteration_num,
            step_scale: self.optimizer.step_scale,
            landmark_sigma_m: self.optimizer.landmark_sigma_m,
            temperature: self.optimizer.temperature,
            seed: self.optimizer.seed,
        }
    }
}
