//! Diagnostic rasters of a fit: parameter trace, landmark overlay on the camera
//! image and the undistorted camera image.

use crate::camera::{CameraModelError, Projector, RectilinearLens};
use crate::landmark::LandmarkSet;
use crate::optimization::TraceSample;
use crate::visualization::{
    draw_disc, draw_line, BACKGROUND_COLOR, PREDICTED_COLOR, REPROJECTED_COLOR, SURVEYED_COLOR,
};
use image::{Rgb, RgbImage};
use log::{info, warn};
use nalgebra::Vector2;

const PANEL_WIDTH: u32 = 800;
const PANEL_HEIGHT: u32 = 160;
const PANEL_MARGIN: f64 = 10.0;
const PANEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const FRAME_COLOR: Rgb<u8> = Rgb([160, 160, 160]);
const SAMPLE_COLOR: Rgb<u8> = Rgb([70, 110, 200]);
const MARKER_RADIUS_PX: i64 = 4;

/// Plots one series into the panel whose top edge is at row `top`.
fn plot_panel(image: &mut RgbImage, top: u32, series: &[f64], connect: bool) {
    for y in top..top + PANEL_HEIGHT {
        for x in 0..PANEL_WIDTH {
            image.put_pixel(x, y, PANEL_COLOR);
        }
    }

    let top = top as f64;
    let left = PANEL_MARGIN;
    let right = PANEL_WIDTH as f64 - PANEL_MARGIN;
    let upper = top + PANEL_MARGIN;
    let lower = top + PANEL_HEIGHT as f64 - PANEL_MARGIN;
    for (from, to) in [
        ((left, upper), (right, upper)),
        ((right, upper), (right, lower)),
        ((right, lower), (left, lower)),
        ((left, lower), (left, upper)),
    ] {
        draw_line(
            image,
            &Vector2::new(from.0, from.1),
            &Vector2::new(to.0, to.1),
            1,
            FRAME_COLOR,
        );
    }

    let finite = series.iter().filter(|v| v.is_finite());
    let (mut min, mut max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(*v), hi.max(*v))
    });
    if !min.is_finite() {
        return;
    }
    if max - min < f64::EPSILON {
        min -= 0.5;
        max += 0.5;
    }

    let last = series.len().saturating_sub(1).max(1) as f64;
    let to_pixel = |index: usize, value: f64| {
        Vector2::new(
            left + index as f64 / last * (right - left),
            upper + (max - value) / (max - min) * (lower - upper),
        )
    };

    let mut previous: Option<Vector2<f64>> = None;
    for (index, value) in series.iter().enumerate() {
        if !value.is_finite() {
            previous = None;
            continue;
        }
        let point = to_pixel(index, *value);
        match (connect, previous) {
            (true, Some(from)) => draw_line(image, &from, &point, 1, SAMPLE_COLOR),
            _ => draw_line(image, &point, &point, 1, SAMPLE_COLOR),
        }
        previous = Some(point);
    }
}

/// One panel per free parameter (proposed values over iterations) followed by
/// a panel of `log10` of the best energy.
///
/// # Errors
///
/// * [`CameraModelError::InvalidParams`] if the trace is empty or its samples do
///   not match `names`.
pub fn render_trace_plot(
    trace: &[TraceSample],
    names: &[String],
) -> Result<RgbImage, CameraModelError> {
    if trace.is_empty() {
        return Err(CameraModelError::InvalidParams(
            "cannot plot an empty trace".to_string(),
        ));
    }
    if trace.iter().any(|s| s.values.len() != names.len()) {
        return Err(CameraModelError::InvalidParams(format!(
            "trace samples do not carry {} values",
            names.len()
        )));
    }

    let panels = names.len() as u32 + 1;
    let mut image = RgbImage::from_pixel(PANEL_WIDTH, PANEL_HEIGHT * panels, BACKGROUND_COLOR);

    for (column, name) in names.iter().enumerate() {
        let series: Vec<f64> = trace.iter().map(|s| s.values[column]).collect();
        plot_panel(&mut image, column as u32 * PANEL_HEIGHT, &series, false);
        info!("trace panel {column}: {name}");
    }

    let energy: Vec<f64> = trace.iter().map(|s| s.best_energy.max(1e-300).log10()).collect();
    plot_panel(&mut image, names.len() as u32 * PANEL_HEIGHT, &energy, true);

    Ok(image)
}

/// The camera image with, per landmark, the observed pixel, the reprojected
/// surveyed position and the segment between them.
pub fn render_fit_information(
    projector: &Projector,
    landmarks: &LandmarkSet,
    image: &RgbImage,
) -> Result<RgbImage, CameraModelError> {
    let mut overlay = image.clone();
    for (index, landmark) in landmarks.iter().enumerate() {
        match projector.image_from_gps(&landmark.gps, landmark.elevation_m) {
            Ok(reprojected) => {
                draw_line(&mut overlay, &landmark.pixel, &reprojected, 2, SURVEYED_COLOR);
                draw_disc(&mut overlay, &reprojected, MARKER_RADIUS_PX, REPROJECTED_COLOR);
            }
            Err(e) => warn!("landmark {index} does not reproject into the image: {e}"),
        }
        draw_disc(&mut overlay, &landmark.pixel, MARKER_RADIUS_PX, PREDICTED_COLOR);
    }
    Ok(overlay)
}

/// Removes the radial distortion from an image taken with `lens`.
///
/// Each output pixel is the ideal (undistorted) position; its colour is taken
/// from the nearest pixel at the distorted position in `image`. Ideal positions
/// beyond the fold of the distortion model stay background.
pub fn undistort_image(lens: &RectilinearLens, image: &RgbImage) -> Result<RgbImage, CameraModelError> {
    let resolution = &lens.resolution;
    if image.width() != resolution.width || image.height() != resolution.height {
        return Err(CameraModelError::InvalidParams(format!(
            "image is {}x{}, lens expects {}x{}",
            image.width(),
            image.height(),
            resolution.width,
            resolution.height
        )));
    }

    let mut output = RgbImage::from_pixel(image.width(), image.height(), BACKGROUND_COLOR);
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let ideal = lens.normalize(&Vector2::new(x as f64, y as f64));
        if !lens.distortion.is_monotonic_within(ideal.norm_squared()) {
            continue;
        }
        let source = lens.denormalize(&lens.distortion.distort(&ideal));
        let sx = source.x.round();
        let sy = source.y.round();
        if sx >= 0.0 && sy >= 0.0 && sx < image.width() as f64 && sy < image.height() as f64 {
            *pixel = *image.get_pixel(sx as u32, sy as u32);
        }
    }
    Ok(output)
}
