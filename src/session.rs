//! A camera ready for geolocation: loaded from a fitted camera document or
//! fitted from a [`FitConfig`], plus the outputs of a fit.

use crate::camera::{CameraModelError, CameraParameters, Projector};
use crate::config::FitConfig;
use crate::evaluation::{self, FitStatistics};
use crate::geometry::GpsCoord;
use crate::landmark::LandmarkSet;
use crate::optimization::{FitResult, MetropolisOptimizer, Optimizer};
use crate::visualization::{self, TopViewRenderer};
use image::RgbImage;
use log::{info, warn};
use nalgebra::Vector2;
use std::path::Path;

pub const FITTED_CAMERA_FILE: &str = "fitted_cam.json";
pub const TOP_VIEW_FILE: &str = "topview.jpg";
pub const TRACE_PLOT_FILE: &str = "trace.png";
pub const TRACE_CSV_FILE: &str = "trace.csv";
pub const FIT_INFORMATION_FILE: &str = "info.png";
pub const UNDISTORTED_FILE: &str = "undistorted.png";

pub struct CameraFit {
    projector: Projector,
    config: Option<FitConfig>,
    image: Option<RgbImage>,
    fit: Option<FitResult>,
}

fn load_rgb(path: &Path) -> Result<RgbImage, CameraModelError> {
    Ok(image::open(path)?.to_rgb8())
}

impl CameraFit {
    /// Loads `camera_json` when given, otherwise fits the camera described by `fit_config`.
    ///
    /// A configuration passed together with a camera document only supplies the
    /// landmarks, image and output settings.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::InvalidConfiguration`] if neither input is supplied.
    /// * Any error of loading, image decoding or fitting.
    pub fn new(
        camera_json: Option<&Path>,
        fit_config: Option<FitConfig>,
    ) -> Result<Self, CameraModelError> {
        match (camera_json, fit_config) {
            (Some(path), config) => {
                let params = CameraParameters::load_json(path)?;
                if !params.is_fully_fixed() {
                    warn!(
                        "{} has {} free parameters, using their initial values",
                        path.display(),
                        params.num_free()
                    );
                }
                let projector = params.resolve_initial()?;
                info!("camera loaded from {}", path.display());
                let image = match &config {
                    Some(config) => Some(load_rgb(&config.image_path)?),
                    None => None,
                };
                Ok(CameraFit {
                    projector,
                    config,
                    image,
                    fit: None,
                })
            }
            (None, Some(mut config)) => {
                let image = load_rgb(&config.image_path)?;
                config.fill_image_size()?;
                let optimizer = MetropolisOptimizer::new(config.optimizer_config());
                let fit = optimizer.optimize(&config.camera_parameters, &config.landmarks)?;
                Ok(Self::from_fit(config, fit, Some(image)))
            }
            (None, None) => Err(CameraModelError::InvalidConfiguration(
                "either a camera document or a fit configuration is required".to_string(),
            )),
        }
    }

    /// Wraps a fit produced elsewhere (for example by a best-of batch).
    pub fn from_fit(config: FitConfig, fit: FitResult, image: Option<RgbImage>) -> Self {
        CameraFit {
            projector: fit.projector.clone(),
            config: Some(config),
            image,
            fit: Some(fit),
        }
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn fit_result(&self) -> Option<&FitResult> {
        self.fit.as_ref()
    }

    pub fn config(&self) -> Option<&FitConfig> {
        self.config.as_ref()
    }

    pub fn gps_from_image(
        &self,
        pixel: &Vector2<f64>,
        target_elevation_m: f64,
    ) -> Result<GpsCoord, CameraModelError> {
        self.projector.gps_from_image(pixel, target_elevation_m)
    }

    pub fn image_from_gps(
        &self,
        gps: &GpsCoord,
        reference_elevation_m: f64,
    ) -> Result<Vector2<f64>, CameraModelError> {
        self.projector.image_from_gps(gps, reference_elevation_m)
    }

    fn require_config(&self) -> Result<&FitConfig, CameraModelError> {
        self.config.as_ref().ok_or_else(|| {
            CameraModelError::InvalidConfiguration("no fit configuration supplied".to_string())
        })
    }

    fn require_image(&self) -> Result<&RgbImage, CameraModelError> {
        self.image.as_ref().ok_or_else(|| {
            CameraModelError::InvalidConfiguration("no camera image loaded".to_string())
        })
    }

    fn landmarks(&self) -> Result<&LandmarkSet, CameraModelError> {
        Ok(&self.require_config()?.landmarks)
    }

    /// Mean distance in metres between predicted and surveyed landmarks.
    pub fn average_distance_m(&self) -> Result<f64, CameraModelError> {
        evaluation::average_distance_m(&self.projector, self.landmarks()?)
    }

    pub fn fit_statistics(&self) -> Result<FitStatistics, CameraModelError> {
        evaluation::fit_statistics(&self.projector, self.landmarks()?)
    }

    /// The top view, or `None` when the configuration disables it.
    pub fn top_view(&self) -> Result<Option<RgbImage>, CameraModelError> {
        let config = self.require_config()?;
        if !config.top_view.do_plot {
            return Ok(None);
        }
        let renderer = TopViewRenderer::new(config.top_view.clone())?;
        renderer
            .render(&self.projector, self.image.as_ref(), Some(&config.landmarks))
            .map(Some)
    }

    pub fn trace_plot(&self) -> Result<RgbImage, CameraModelError> {
        let fit = self.fit.as_ref().ok_or_else(|| {
            CameraModelError::InvalidConfiguration("camera was loaded, not fitted".to_string())
        })?;
        visualization::render_trace_plot(&fit.trace, &fit.parameter_names())
    }

    pub fn fit_information(&self) -> Result<RgbImage, CameraModelError> {
        visualization::render_fit_information(&self.projector, self.landmarks()?, self.require_image()?)
    }

    pub fn undistorted_image(&self) -> Result<RgbImage, CameraModelError> {
        visualization::undistort_image(self.projector.lens(), self.require_image()?)
    }

    pub fn save_camera<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraModelError> {
        let path = path.as_ref();
        self.projector.to_parameters().save_json(path)?;
        info!("fitted camera saved to {}", path.display());
        Ok(())
    }

    /// Writes every available output into `dir`.
    ///
    /// The camera document is written only when `save_cam` is set; rasters that
    /// need a fit, an image or a configuration are skipped without one.
    pub fn write_outputs<P: AsRef<Path>>(&self, dir: P) -> Result<(), CameraModelError> {
        let dir = dir.as_ref();
        visualization::ensure_output_dir(dir)?;

        if self.image.is_some() && self.config.is_some() {
            self.fit_information()?.save(dir.join(FIT_INFORMATION_FILE))?;
        }
        if let Some(fit) = &self.fit {
            self.trace_plot()?.save(dir.join(TRACE_PLOT_FILE))?;
            fit.export_trace_csv(dir.join(TRACE_CSV_FILE))?;
        }
        if self.image.is_some() {
            self.undistorted_image()?.save(dir.join(UNDISTORTED_FILE))?;
        }
        if let Some(config) = &self.config {
            if let Some(top_view) = self.top_view()? {
                top_view.save(dir.join(TOP_VIEW_FILE))?;
            }
            if config.save_cam {
                self.save_camera(dir.join(FITTED_CAMERA_FILE))?;
            }
        }
        info!("outputs written to {}", dir.display());
        Ok(())
    }
}
