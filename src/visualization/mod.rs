//! Raster outputs: the top view and the diagnostic images of a fit.
//!
//! Drawing is done directly on `image::RgbImage` buffers with a few primitives
//! shared by the renderers.

use crate::camera::CameraModelError;
use image::{Rgb, RgbImage};
use nalgebra::Vector2;
use std::fs;
use std::path::Path;

pub mod diagnostics;
pub mod topview;

pub use diagnostics::{render_fit_information, render_trace_plot, undistort_image};
pub use topview::{TopViewConfig, TopViewRenderer};

pub const BACKGROUND_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
pub const ANCHOR_COLOR: Rgb<u8> = Rgb([128, 128, 255]);
pub const SURVEYED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const PREDICTED_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const REPROJECTED_COLOR: Rgb<u8> = Rgb([255, 0, 255]);
pub const COVERAGE_COLOR: Rgb<u8> = Rgb([96, 96, 96]);

/// Creates `dir` (and parents) if it does not exist yet.
pub fn ensure_output_dir<P: AsRef<Path>>(dir: P) -> Result<(), CameraModelError> {
    let dir = dir.as_ref();
    if !dir.as_os_str().is_empty() && !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            CameraModelError::IOError(format!(
                "Failed to create output directory {}: {e}",
                dir.display()
            ))
        })?;
    }
    Ok(())
}

fn put_pixel_checked(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < image.width() as i64 && y < image.height() as i64 {
        image.put_pixel(x as u32, y as u32, color);
    }
}

/// Filled disc; parts outside the image are clipped.
pub fn draw_disc(image: &mut RgbImage, center: &Vector2<f64>, radius: i64, color: Rgb<u8>) {
    if !center.x.is_finite() || !center.y.is_finite() {
        return;
    }
    let center_x = center.x.round() as i64;
    let center_y = center.y.round() as i64;

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_checked(image, center_x + dx, center_y + dy, color);
            }
        }
    }
}

/// Straight segment of the given thickness, clipped to the image.
pub fn draw_line(
    image: &mut RgbImage,
    from: &Vector2<f64>,
    to: &Vector2<f64>,
    thickness: i64,
    color: Rgb<u8>,
) {
    let delta = to - from;
    if !delta.x.is_finite() || !delta.y.is_finite() {
        return;
    }
    // Guard against segments spanning far outside any raster.
    let steps = delta.x.abs().max(delta.y.abs()).ceil().min(1e6) as usize;
    let radius = (thickness / 2).max(0);
    for i in 0..=steps {
        let t = if steps == 0 { 0.0 } else { i as f64 / steps as f64 };
        let point = from + delta * t;
        if radius == 0 {
            put_pixel_checked(image, point.x.round() as i64, point.y.round() as i64, color);
        } else {
            draw_disc(image, &point, radius, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_disc_clipped() {
        let mut image = RgbImage::new(10, 10);
        draw_disc(&mut image, &Vector2::new(0.0, 0.0), 2, SURVEYED_COLOR);
        assert_eq!(*image.get_pixel(0, 0), SURVEYED_COLOR);
        assert_eq!(*image.get_pixel(2, 0), SURVEYED_COLOR);
        assert_eq!(*image.get_pixel(2, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_line() {
        let mut image = RgbImage::new(20, 20);
        draw_line(
            &mut image,
            &Vector2::new(2.0, 5.0),
            &Vector2::new(17.0, 5.0),
            1,
            PREDICTED_COLOR,
        );
        for x in 2..=17 {
            assert_eq!(*image.get_pixel(x, 5), PREDICTED_COLOR);
        }
        assert_eq!(*image.get_pixel(10, 6), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_ensure_output_dir() {
        let dir = std::env::temp_dir().join("geocam_tools_output_dir_test/nested");
        ensure_output_dir(&dir).unwrap();
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(dir.parent().unwrap());
    }
}
