//! Camera Geo-Registration Tool
//!
//! Fits a camera to the landmarks of a YAML fit configuration and writes the
//! diagnostics (info.png, trace.png, trace.csv, undistorted.png, topview.jpg)
//! plus the fitted camera document into the output directory.
//!
//! With `--lower-angle-x` / `--upper-angle-x` the horizontal view angle is
//! swept over `[lower, upper)` in `--step-size` increments, fitting each grid
//! value `--runs` times and keeping the best camera overall.
//!
//! Usage:
//! ```bash
//! cargo run --release --example geo_fit -- samples/fit_config.yaml
//! cargo run --release --example geo_fit -- -l 60 -u 80 -s 2 samples/fit_config.yaml
//! ```

use clap::Parser;
use geocam_tools::optimization::{fit_best_of, sweep_view_x, view_x_grid};
use geocam_tools::{CameraFit, FitConfig};
use image::RgbImage;
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Camera geo-registration tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Lower value of view_x_deg for the view angle search
    #[arg(short = 'l', long, requires = "upper_angle_x")]
    lower_angle_x: Option<f64>,

    /// Upper value (exclusive) of view_x_deg for the view angle search
    #[arg(short = 'u', long, requires = "lower_angle_x")]
    upper_angle_x: Option<f64>,

    /// Step size for the view angle search
    #[arg(short = 's', long, default_value = "1")]
    step_size: f64,

    /// Independent fits per view angle (or in total without a search)
    #[arg(short = 'r', long, default_value = "5")]
    runs: usize,

    /// Output directory
    #[arg(short = 'o', long, default_value = "output")]
    output_dir: PathBuf,

    /// Path to the fit configuration YAML
    config_path: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let config = FitConfig::load_yaml(&cli.config_path)?;
    let optimizer_config = config.optimizer_config();
    let image: Option<RgbImage> = match image::open(&config.image_path) {
        Ok(image) => Some(image.to_rgb8()),
        Err(e) => {
            warn!("{:?} not readable ({e}), rendering without it", config.image_path);
            None
        }
    };

    println!("📷 CAMERA GEO-REGISTRATION");
    println!("==========================");
    println!("Config: {:?}", cli.config_path);
    println!(
        "Landmarks: {}, free parameters: {}, iterations per run: {}\n",
        config.landmarks.len(),
        config.camera_parameters.num_free(),
        config.iteration_num
    );

    let start = Instant::now();
    let (fit, best_view_x) = match (cli.lower_angle_x, cli.upper_angle_x) {
        (Some(lower), Some(upper)) => {
            let grid = view_x_grid(lower, upper, cli.step_size)?;
            let report = sweep_view_x(
                &config.camera_parameters,
                &config.landmarks,
                &optimizer_config,
                &grid,
                cli.runs,
            )?;
            println!("Best average distance per view_x_deg:");
            for point in &report.points {
                println!("  {:>7.2}: {:.2} m", point.view_x_deg, point.residual_m);
            }
            (report.best, Some(report.best_view_x_deg))
        }
        _ => {
            let fit = fit_best_of(
                &config.camera_parameters,
                &config.landmarks,
                &optimizer_config,
                cli.runs,
            )?;
            (fit, config.camera_parameters.rectilinear_projection.view_x_deg)
        }
    };
    info!(
        "fitting took {:.2?}, acceptance rate of the best run {:.1}%",
        start.elapsed(),
        100.0 * fit.acceptance_rate()
    );

    let session = CameraFit::from_fit(config, fit, image);
    println!(
        "\nBest solution: Average Distance {:.2} meters (view_x_deg={:?})",
        session.average_distance_m()?,
        best_view_x
    );
    println!("{:?}", session.fit_statistics()?);
    session.projector().log_parameters();

    session.write_outputs(&cli.output_dir)?;
    println!("\n💾 Outputs written to {:?}", cli.output_dir);
    Ok(())
}
