//! Orthographic top-down raster of the ground plane around the GPS anchor.
//!
//! The raster covers `extent = [min_east, max_east, min_north, max_north]`
//! (metres, relative to the anchor) at `m_per_pixel`. Columns grow east and
//! rows grow south, so the anchor sits at
//! `origin_px = (-min_east / scale, max_north / scale)`.

use crate::camera::{CameraModelError, Projector};
use crate::geometry::{self, GpsCoord};
use crate::landmark::LandmarkSet;
use crate::visualization::{
    draw_disc, draw_line, ANCHOR_COLOR, BACKGROUND_COLOR, COVERAGE_COLOR, PREDICTED_COLOR,
    SURVEYED_COLOR,
};
use image::RgbImage;
use log::{info, warn};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

const ANCHOR_RADIUS_PX: i64 = 10;
const LANDMARK_RADIUS_PX: i64 = 5;
const RESIDUAL_THICKNESS_PX: i64 = 2;
/// Largest raster side accepted, in pixels.
const MAX_SIDE_PX: f64 = 20_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopViewConfig {
    pub do_plot: bool,
    /// `[min_east, max_east, min_north, max_north]` in metres.
    pub extent: [f64; 4],
    pub m_per_pixel: f64,
}

impl TopViewConfig {
    pub fn validate(&self) -> Result<(), CameraModelError> {
        let [min_east, max_east, min_north, max_north] = self.extent;
        if !self.extent.iter().all(|v| v.is_finite()) || min_east >= max_east || min_north >= max_north
        {
            return Err(CameraModelError::InvalidConfiguration(format!(
                "invalid top view extent {:?}",
                self.extent
            )));
        }
        if !(self.m_per_pixel.is_finite() && self.m_per_pixel > 0.0) {
            return Err(CameraModelError::InvalidConfiguration(format!(
                "m_per_pixel must be positive, got {}",
                self.m_per_pixel
            )));
        }
        let (width, height) = self.raster_size_f();
        if width > MAX_SIDE_PX || height > MAX_SIDE_PX {
            return Err(CameraModelError::InvalidConfiguration(format!(
                "top view of {width}x{height} pixels is too large"
            )));
        }
        Ok(())
    }

    fn raster_size_f(&self) -> (f64, f64) {
        let [min_east, max_east, min_north, max_north] = self.extent;
        (
            ((max_east - min_east) / self.m_per_pixel).ceil(),
            ((max_north - min_north) / self.m_per_pixel).ceil(),
        )
    }
}

pub struct TopViewRenderer {
    config: TopViewConfig,
}

impl TopViewRenderer {
    pub fn new(config: TopViewConfig) -> Result<Self, CameraModelError> {
        config.validate()?;
        Ok(TopViewRenderer { config })
    }

    pub fn config(&self) -> &TopViewConfig {
        &self.config
    }

    /// Raster size `(width, height)` in pixels.
    pub fn raster_size(&self) -> (u32, u32) {
        let (width, height) = self.config.raster_size_f();
        (width as u32, height as u32)
    }

    /// Raster position of the anchor.
    pub fn origin_px(&self) -> Vector2<f64> {
        let scale = self.config.m_per_pixel;
        Vector2::new(-self.config.extent[0] / scale, self.config.extent[3] / scale)
    }

    /// Raster position of a local (east, north) offset in metres.
    pub fn pixel_from_offset(&self, offset: &Vector2<f64>) -> Vector2<f64> {
        let scale = self.config.m_per_pixel;
        self.origin_px() + Vector2::new(offset.x / scale, -offset.y / scale)
    }

    pub fn offset_from_pixel(&self, pixel: &Vector2<f64>) -> Vector2<f64> {
        let scale = self.config.m_per_pixel;
        let delta = pixel - self.origin_px();
        Vector2::new(delta.x * scale, -delta.y * scale)
    }

    pub fn pixel_from_gps(&self, anchor: &GpsCoord, gps: &GpsCoord) -> Vector2<f64> {
        self.pixel_from_offset(&geometry::offset_m(anchor, gps))
    }

    /// Integer raster position of a GPS point (rounded).
    pub fn raster_px(&self, anchor: &GpsCoord, gps: &GpsCoord) -> (i64, i64) {
        let pixel = self.pixel_from_gps(anchor, gps);
        (pixel.x.round() as i64, pixel.y.round() as i64)
    }

    /// Renders the ground plane (z = 0) as seen by `projector`.
    ///
    /// Raster pixels whose ground point projects inside the camera image take the
    /// nearest source pixel, or [`COVERAGE_COLOR`] without a source image. The
    /// anchor and, when given, the landmarks (surveyed, predicted and the residual
    /// segment between them) are drawn on top.
    pub fn render(
        &self,
        projector: &Projector,
        source: Option<&RgbImage>,
        landmarks: Option<&LandmarkSet>,
    ) -> Result<RgbImage, CameraModelError> {
        let (width, height) = self.raster_size();
        let resolution = projector.lens().resolution.clone();
        if let Some(image) = source {
            if image.width() != resolution.width || image.height() != resolution.height {
                return Err(CameraModelError::InvalidParams(format!(
                    "source image is {}x{}, camera expects {}x{}",
                    image.width(),
                    image.height(),
                    resolution.width,
                    resolution.height
                )));
            }
        }

        let mut raster = RgbImage::from_pixel(width, height, BACKGROUND_COLOR);
        for (x, y, pixel) in raster.enumerate_pixels_mut() {
            let offset = self.offset_from_pixel(&Vector2::new(x as f64, y as f64));
            let ground = Vector3::new(offset.x, offset.y, 0.0);
            let Ok(image_px) = projector.image_from_space(&ground) else {
                continue;
            };
            if !resolution.contains(&image_px) {
                continue;
            }
            *pixel = match source {
                Some(image) => {
                    let sx = (image_px.x.round() as u32).min(image.width() - 1);
                    let sy = (image_px.y.round() as u32).min(image.height() - 1);
                    *image.get_pixel(sx, sy)
                }
                None => COVERAGE_COLOR,
            };
        }

        let anchor = projector.anchor();
        draw_disc(&mut raster, &self.origin_px(), ANCHOR_RADIUS_PX, ANCHOR_COLOR);

        if let Some(landmarks) = landmarks {
            for (index, landmark) in landmarks.iter().enumerate() {
                let surveyed = self.pixel_from_gps(anchor, &landmark.gps);
                draw_disc(&mut raster, &surveyed, LANDMARK_RADIUS_PX, SURVEYED_COLOR);

                match projector.gps_from_image(&landmark.pixel, landmark.elevation_m) {
                    Ok(predicted_gps) => {
                        let predicted = self.pixel_from_gps(anchor, &predicted_gps);
                        draw_line(
                            &mut raster,
                            &predicted,
                            &surveyed,
                            RESIDUAL_THICKNESS_PX,
                            SURVEYED_COLOR,
                        );
                        draw_disc(&mut raster, &predicted, LANDMARK_RADIUS_PX, PREDICTED_COLOR);
                    }
                    Err(e) => warn!("landmark {index} has no ground position: {e}"),
                }
            }
        }

        info!("rendered {}x{} top view", width, height);
        Ok(raster)
    }
}
