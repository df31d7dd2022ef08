use approx::assert_relative_eq;
use geocam_tools::evaluation;
use geocam_tools::geometry::{self, sample_pixel_grid};
use geocam_tools::optimization::fit_best_of;
use geocam_tools::{
    CameraFit, CameraModelError, CameraParameters, FitConfig, MetropolisOptimizer, Optimizer,
    OptimizerConfig, Parameter, TopViewRenderer,
};
use nalgebra::Vector2;
use std::path::Path;

const FIT_CONFIG: &str = include_str!("../samples/fit_config.yaml");
const CAMERA: &str = include_str!("../samples/camera.json");

#[test]
fn sample_camera_explains_sample_landmarks() {
    let camera = CameraParameters::from_json_str(CAMERA).unwrap();
    assert!(camera.is_fully_fixed());
    let projector = camera.resolve(&[]).unwrap();

    let config = FitConfig::from_yaml_str(FIT_CONFIG).unwrap();
    let average = evaluation::average_distance_m(&projector, &config.landmarks).unwrap();
    // Landmark coordinates are rounded to 1e-8 degrees.
    assert!(average < 0.01, "average distance {average}");
}

#[test]
fn sample_camera_round_trips_pixels() {
    let projector = CameraParameters::from_json_str(CAMERA)
        .unwrap()
        .resolve(&[])
        .unwrap();

    let mut checked = 0;
    for pixel in sample_pixel_grid(1920.0, 1080.0, 200) {
        match projector.gps_from_image(&pixel, 0.0) {
            Ok(gps) => {
                let back = projector.image_from_gps(&gps, 0.0).unwrap();
                assert!((back - pixel).norm() < 1e-3, "{pixel:?} -> {back:?}");
                checked += 1;
            }
            Err(CameraModelError::NoIntersection) => {}
            Err(e) => panic!("unexpected error at {pixel:?}: {e}"),
        }
    }
    assert!(checked > 100);
}

#[test]
fn fitting_sample_config_improves_energy() {
    let config = FitConfig::from_yaml_str(FIT_CONFIG).unwrap();
    let optimizer = MetropolisOptimizer::new(OptimizerConfig {
        iterations: 1500,
        ..config.optimizer_config()
    });
    let fit = optimizer
        .optimize(&config.camera_parameters, &config.landmarks)
        .unwrap();

    assert_eq!(fit.free_parameters.len(), 4);
    assert!(fit.best_energy <= fit.initial_energy);
    for pair in fit.trace.windows(2) {
        assert!(pair[1].best_energy <= pair[0].best_energy);
    }

    let fitted = fit.fitted_parameters();
    assert!(fitted.is_fully_fixed());
    let reloaded = CameraParameters::from_json_str(&fitted.to_json_string().unwrap()).unwrap();
    assert_eq!(reloaded, fitted);
}

#[test]
fn best_of_batch_is_reproducible() {
    let config = FitConfig::from_yaml_str(FIT_CONFIG).unwrap();
    let optimizer_config = OptimizerConfig {
        iterations: 200,
        ..config.optimizer_config()
    };
    let a = fit_best_of(&config.camera_parameters, &config.landmarks, &optimizer_config, 3).unwrap();
    let b = fit_best_of(&config.camera_parameters, &config.landmarks, &optimizer_config, 3).unwrap();
    assert_eq!(a.values, b.values);
    assert_relative_eq!(a.residual_m, b.residual_m);
}

#[test]
fn too_few_landmarks_for_free_parameters() {
    let mut config = FitConfig::from_yaml_str(FIT_CONFIG).unwrap();
    let params = &mut config.camera_parameters;
    params.spatial_orientation.roll_deg = Parameter::free(-10.0, 10.0, 0.0);
    params.brown_lens_distortion.k2 = Parameter::free(-0.2, 0.2, 0.0);
    params.brown_lens_distortion.k3 = Parameter::free(-0.2, 0.2, 0.0);
    assert_eq!(params.num_free(), 7);

    let result = MetropolisOptimizer::default().optimize(&config.camera_parameters, &config.landmarks);
    assert!(matches!(
        result,
        Err(CameraModelError::InsufficientLandmarks {
            landmarks: 6,
            free_parameters: 7
        })
    ));
}

#[test]
fn top_view_places_anchor_at_origin() {
    let config = FitConfig::from_yaml_str(FIT_CONFIG).unwrap();
    let renderer = TopViewRenderer::new(config.top_view.clone()).unwrap();
    let anchor = config.camera_parameters.gps_location;

    assert_eq!(renderer.raster_size(), (240, 240));
    assert_eq!(renderer.raster_px(&anchor, &anchor), (80, 200));

    let scale = config.top_view.m_per_pixel;
    let east = geometry::gps_from_offset(&anchor, &Vector2::new(10.0 * scale, 0.0));
    assert_eq!(renderer.raster_px(&anchor, &east), (90, 200));
}

#[test]
fn session_needs_an_input() {
    let missing: Option<&Path> = None;
    assert!(matches!(
        CameraFit::new(missing, None),
        Err(CameraModelError::InvalidConfiguration(_))
    ));
}
