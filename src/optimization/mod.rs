//! The `optimization` module fits the free camera parameters to a landmark set.
//!
//! The [`Optimizer`] trait is the seam between callers and a search strategy.
//! [`MetropolisOptimizer`] implements it as a bounded random walk with Metropolis
//! acceptance: improving proposals are always taken, worsening ones with a
//! probability that shrinks with the energy increase. The best vector seen over
//! the whole run is returned, not the last accepted one.
//!
//! The energy of a candidate camera is the sum of squared, per-axis weighted
//! distances (east, north, up) between each landmark's forward projection and
//! its surveyed position, in local metres.
//!
//! [`batch`] runs independent seeded fits in parallel (best-of-N, view-angle sweeps).

use crate::camera::{CameraModelError, CameraParameters, FreeParameter, Projector};
use crate::evaluation;
use crate::geometry;
use crate::landmark::LandmarkSet;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod batch;

pub use batch::{fit_best_of, sweep_view_x, view_x_grid, SweepPoint, SweepReport};

/// Default per-axis landmark standard deviations (east, north, up) in metres.
pub const DEFAULT_LANDMARK_SIGMA_M: [f64; 3] = [1e-3, 1e-3, 1e-2];

/// Settings of a Metropolis fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Number of proposals per run.
    pub iterations: usize,
    /// Proposal standard deviation as a fraction of each parameter's range.
    pub step_scale: f64,
    pub landmark_sigma_m: [f64; 3],
    pub temperature: f64,
    /// Fixed seed for reproducible runs; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            iterations: 5000,
            step_scale: 0.02,
            landmark_sigma_m: DEFAULT_LANDMARK_SIGMA_M,
            temperature: 1.0,
            seed: None,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), CameraModelError> {
        if !(self.step_scale.is_finite() && self.step_scale > 0.0) {
            return Err(CameraModelError::InvalidConfiguration(format!(
                "step_scale must be positive, got {}",
                self.step_scale
            )));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(CameraModelError::InvalidConfiguration(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }
        if self
            .landmark_sigma_m
            .iter()
            .any(|s| !(s.is_finite() && *s > 0.0))
        {
            return Err(CameraModelError::InvalidConfiguration(format!(
                "landmark_sigma_m must be positive, got {:?}",
                self.landmark_sigma_m
            )));
        }
        Ok(())
    }
}

/// One step of a run, recorded for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSample {
    pub iteration: usize,
    /// Proposed free values, in extraction order.
    pub values: Vec<f64>,
    pub energy: f64,
    /// Lowest energy seen up to and including this step.
    pub best_energy: f64,
    pub accepted: bool,
}

/// Outcome of a fit run.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub projector: Projector,
    pub free_parameters: Vec<FreeParameter>,
    /// Best free values, in extraction order.
    pub values: Vec<f64>,
    pub trace: Vec<TraceSample>,
    pub initial_energy: f64,
    pub best_energy: f64,
    /// Average landmark distance of the fitted camera in metres.
    pub residual_m: f64,
    pub accepted: usize,
    pub seed: Option<u64>,
}

impl FitResult {
    /// The fitted camera as an all-fixed document.
    pub fn fitted_parameters(&self) -> CameraParameters {
        self.projector.to_parameters()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.free_parameters
            .iter()
            .map(|p| p.name.to_string())
            .collect()
    }

    pub fn acceptance_rate(&self) -> f64 {
        let proposals = self.trace.len().saturating_sub(1);
        if proposals == 0 {
            0.0
        } else {
            self.accepted as f64 / proposals as f64
        }
    }

    /// Writes the trace as CSV: `iteration, <free names...>, energy, best_energy, accepted`.
    pub fn export_trace_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraModelError> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["iteration".to_string()];
        header.extend(self.parameter_names());
        header.extend(["energy", "best_energy", "accepted"].map(String::from));
        writer.write_record(&header)?;

        for sample in &self.trace {
            let mut record = vec![sample.iteration.to_string()];
            record.extend(sample.values.iter().map(|v| v.to_string()));
            record.push(sample.energy.to_string());
            record.push(sample.best_energy.to_string());
            record.push(sample.accepted.to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// A strategy that fits the free parameters of a camera to landmarks.
pub trait Optimizer {
    /// Runs the fit.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::OutOfRangeParameter`] if a free parameter starts outside its bounds.
    /// * [`CameraModelError::InsufficientLandmarks`] if there are fewer landmarks than free parameters.
    /// * [`CameraModelError::NumericalDivergence`] if no candidate produced a finite energy.
    fn optimize(
        &self,
        params: &CameraParameters,
        landmarks: &LandmarkSet,
    ) -> Result<FitResult, CameraModelError>;
}

/// Weighted squared landmark error of a resolved camera.
///
/// Returns `+inf` if any landmark fails to project or yields a non-finite value.
pub fn landmark_energy(projector: &Projector, landmarks: &LandmarkSet, sigma_m: &[f64; 3]) -> f64 {
    let mut energy = 0.0;
    for landmark in landmarks {
        let Ok(predicted) = projector.space_from_image(&landmark.pixel, landmark.elevation_m) else {
            return f64::INFINITY;
        };
        let truth = geometry::space_from_gps(projector.anchor(), &landmark.gps, landmark.elevation_m);
        let residual = predicted - truth;
        for axis in 0..3 {
            let r = residual[axis] / sigma_m[axis];
            energy += r * r;
        }
    }
    if energy.is_finite() {
        energy
    } else {
        f64::INFINITY
    }
}

/// Wraps `value` into `[lower, upper)`.
fn wrap_into(value: f64, lower: f64, upper: f64) -> f64 {
    let width = upper - lower;
    if width <= 0.0 {
        return lower;
    }
    let wrapped = lower + (value - lower).rem_euclid(width);
    // rem_euclid may round up to `width` for tiny negative offsets
    if wrapped >= upper {
        lower
    } else {
        wrapped
    }
}

/// Reflects `value` back into `[lower, upper]`.
fn reflect_into(value: f64, lower: f64, upper: f64) -> f64 {
    let width = upper - lower;
    if width <= 0.0 {
        return lower;
    }
    let mut offset = (value - lower).rem_euclid(2.0 * width);
    if offset > width {
        offset = 2.0 * width - offset;
    }
    lower + offset
}

/// Bounded random-walk optimizer with Metropolis acceptance.
#[derive(Debug, Clone, Default)]
pub struct MetropolisOptimizer {
    config: OptimizerConfig,
}

impl MetropolisOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        MetropolisOptimizer { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    fn energy_of(&self, params: &CameraParameters, values: &[f64], landmarks: &LandmarkSet) -> f64 {
        match params.resolve(values) {
            Ok(projector) => landmark_energy(&projector, landmarks, &self.config.landmark_sigma_m),
            Err(_) => f64::INFINITY,
        }
    }

    /// Runs the fit drawing randomness from `rng`.
    pub fn optimize_with_rng<R: Rng>(
        &self,
        params: &CameraParameters,
        landmarks: &LandmarkSet,
        rng: &mut R,
    ) -> Result<FitResult, CameraModelError> {
        self.run(params, landmarks, rng, None)
    }

    fn run<R: Rng>(
        &self,
        params: &CameraParameters,
        landmarks: &LandmarkSet,
        rng: &mut R,
        seed: Option<u64>,
    ) -> Result<FitResult, CameraModelError> {
        self.config.validate()?;
        let free = params.free_parameters()?;
        if landmarks.len() < free.len() {
            return Err(CameraModelError::InsufficientLandmarks {
                landmarks: landmarks.len(),
                free_parameters: free.len(),
            });
        }

        // An incomplete projection block fails every candidate alike.
        params.rectilinear_projection.intrinsics()?;

        let initial_values = params.initial_values();
        let initial_energy = self.energy_of(params, &initial_values, landmarks);

        let steps = free
            .iter()
            .map(|p| Normal::new(0.0, self.config.step_scale * p.constraint.range()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CameraModelError::InvalidConfiguration(e.to_string()))?;

        let iterations = if free.is_empty() { 0 } else { self.config.iterations };
        info!(
            "Metropolis fit: {} free parameters, {} landmarks, {} iterations, initial energy {:.6e}",
            free.len(),
            landmarks.len(),
            iterations,
            initial_energy
        );

        let mut current = initial_values.clone();
        let mut current_energy = initial_energy;
        let mut best = initial_values.clone();
        let mut best_energy = initial_energy;
        let mut accepted = 0;

        let mut trace = Vec::with_capacity(iterations + 1);
        trace.push(TraceSample {
            iteration: 0,
            values: initial_values,
            energy: initial_energy,
            best_energy,
            accepted: true,
        });

        for iteration in 1..=iterations {
            let candidate: Vec<f64> = current
                .iter()
                .zip(&free)
                .zip(&steps)
                .map(|((value, param), step)| {
                    let c = &param.constraint;
                    let proposal = value + step.sample(rng);
                    if param.is_periodic() {
                        wrap_into(proposal, c.lower, c.upper)
                    } else {
                        reflect_into(proposal, c.lower, c.upper)
                    }
                })
                .collect();
            let energy = self.energy_of(params, &candidate, landmarks);

            let take = energy <= current_energy
                || rng.random::<f64>()
                    < (-(energy - current_energy) / (2.0 * self.config.temperature)).exp();

            if take {
                accepted += 1;
                current = candidate.clone();
                current_energy = energy;
                if energy < best_energy {
                    best = candidate.clone();
                    best_energy = energy;
                }
            }

            if iteration % 1000 == 0 {
                debug!("iteration {iteration}: best energy {best_energy:.6e}");
            }

            trace.push(TraceSample {
                iteration,
                values: candidate,
                energy,
                best_energy,
                accepted: take,
            });
        }

        if !best_energy.is_finite() {
            return Err(CameraModelError::NumericalDivergence(format!(
                "no candidate out of {} produced a finite energy",
                iterations + 1
            )));
        }

        let projector = params.resolve(&best)?;
        let residual_m = evaluation::average_distance_m(&projector, landmarks)?;

        let fit = FitResult {
            projector,
            free_parameters: free,
            values: best,
            trace,
            initial_energy,
            best_energy,
            residual_m,
            accepted,
            seed,
        };
        info!(
            "Metropolis fit done: best energy {:.6e}, average distance {:.4} m, acceptance {:.1}%",
            fit.best_energy,
            fit.residual_m,
            100.0 * fit.acceptance_rate()
        );
        Ok(fit)
    }
}

impl Optimizer for MetropolisOptimizer {
    fn optimize(
        &self,
        params: &CameraParameters,
        landmarks: &LandmarkSet,
    ) -> Result<FitResult, CameraModelError> {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        self.run(params, landmarks, &mut rng, Some(seed))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::camera::model::{BrownLensDistortion, SpatialOrientation};
    use crate::camera::{Parameter, RectilinearProjection};
    use crate::geometry::GpsCoord;
    use crate::landmark::Landmark;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    pub(crate) fn fixed_camera(elevation: Parameter) -> CameraParameters {
        CameraParameters {
            rectilinear_projection: RectilinearProjection {
                view_x_deg: Some(90.0),
                image_width_px: Some(1000),
                image_height_px: Some(1000),
                ..Default::default()
            },
            spatial_orientation: SpatialOrientation {
                heading_deg: Parameter::Fixed(0.0),
                tilt_deg: Parameter::Fixed(45.0),
                roll_deg: Parameter::Fixed(0.0),
                elevation_m: elevation,
                pos_x_m: 0.0,
                pos_y_m: 0.0,
            },
            brown_lens_distortion: BrownLensDistortion::none(),
            gps_location: GpsCoord::new(0.0, 0.0),
        }
    }

    /// Landmarks seen by the fixed 45 degree camera at `true_elevation`.
    pub(crate) fn synthetic_landmarks(true_elevation: f64) -> LandmarkSet {
        let truth = fixed_camera(Parameter::Fixed(true_elevation))
            .resolve(&[])
            .unwrap();
        let pixels = [
            Vector2::new(250.0, 500.0),
            Vector2::new(750.0, 500.0),
            Vector2::new(500.0, 750.0),
            Vector2::new(500.0, 250.0),
        ];
        LandmarkSet::new(
            pixels
                .iter()
                .map(|p| Landmark::new(*p, truth.gps_from_image(p, 0.0).unwrap(), 0.0))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_reflect_into() {
        assert_eq!(reflect_into(5.0, 0.0, 10.0), 5.0);
        assert_relative_eq!(reflect_into(-2.0, 0.0, 10.0), 2.0);
        assert_relative_eq!(reflect_into(12.5, 0.0, 10.0), 7.5);
        assert_relative_eq!(reflect_into(23.0, 0.0, 10.0), 3.0);
        assert_eq!(reflect_into(1.0, 4.0, 4.0), 4.0);
    }

    #[test]
    fn test_wrap_into() {
        assert_eq!(wrap_into(5.0, 0.0, 360.0), 5.0);
        assert_relative_eq!(wrap_into(-3.0, 0.0, 360.0), 357.0);
        assert_relative_eq!(wrap_into(363.5, 0.0, 360.0), 3.5);
        assert_eq!(wrap_into(360.0, 0.0, 360.0), 0.0);
    }

    /// Accepted proposals whose energy exceeds the energy of the state they left.
    fn accepted_uphill_moves(fit: &FitResult) -> usize {
        let mut current = fit.trace[0].energy;
        let mut uphill = 0;
        for sample in &fit.trace[1..] {
            if sample.accepted {
                if sample.energy > current {
                    uphill += 1;
                }
                current = sample.energy;
            }
        }
        uphill
    }

    #[test]
    fn test_worse_proposals_accepted_when_warm() {
        let landmarks = synthetic_landmarks(12.0);
        let params = fixed_camera(Parameter::free(0.0, 25.0, 10.0));
        let fit = MetropolisOptimizer::new(OptimizerConfig {
            iterations: 2000,
            landmark_sigma_m: [1.0, 1.0, 1.0],
            temperature: 5.0,
            seed: Some(3),
            ..Default::default()
        })
        .optimize(&params, &landmarks)
        .unwrap();

        assert!(accepted_uphill_moves(&fit) > 0);
        assert!(fit.acceptance_rate() > 0.0);
        // The result is still the best sample, not the last accepted one.
        let lowest = fit
            .trace
            .iter()
            .map(|s| s.energy)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(fit.best_energy, lowest);
    }

    #[test]
    fn test_no_worse_proposals_accepted_when_cold() {
        let landmarks = synthetic_landmarks(12.0);
        let params = fixed_camera(Parameter::free(0.0, 25.0, 10.0));
        let fit = MetropolisOptimizer::new(OptimizerConfig {
            iterations: 2000,
            temperature: f64::MIN_POSITIVE,
            seed: Some(3),
            ..Default::default()
        })
        .optimize(&params, &landmarks)
        .unwrap();

        assert_eq!(accepted_uphill_moves(&fit), 0);
    }

    #[test]
    fn test_heading_wraps_across_north() {
        let landmarks = synthetic_landmarks(12.0);
        let mut params = fixed_camera(Parameter::Fixed(12.0));
        params.spatial_orientation.heading_deg = Parameter::free(0.0, 360.0, 350.0);
        let fit = MetropolisOptimizer::new(OptimizerConfig {
            iterations: 1000,
            seed: Some(9),
            ..Default::default()
        })
        .optimize(&params, &landmarks)
        .unwrap();

        for sample in &fit.trace {
            assert!((0.0..360.0).contains(&sample.values[0]));
        }
        // Proposals past 360 come back just east of north.
        assert!(fit.trace.iter().any(|s| s.values[0] < 10.0));
        let heading = fit.values[0];
        assert!(heading.min(360.0 - heading) < 0.5, "heading {heading}");
    }

    #[test]
    fn test_start_on_invalid_bound() {
        // Elevation 0 is not a valid camera, but the walk can leave it.
        let landmarks = synthetic_landmarks(12.0);
        let params = fixed_camera(Parameter::free(0.0, 25.0, 0.0));
        let fit = MetropolisOptimizer::new(OptimizerConfig {
            iterations: 1000,
            seed: Some(13),
            ..Default::default()
        })
        .optimize(&params, &landmarks)
        .unwrap();

        assert_eq!(fit.initial_energy, f64::INFINITY);
        assert_eq!(fit.trace[0].energy, f64::INFINITY);
        assert!(fit.best_energy.is_finite());
        assert!(fit.values[0] > 0.0);
    }

    #[test]
    fn test_incomplete_projection_fails_fast() {
        let landmarks = synthetic_landmarks(12.0);
        let mut params = fixed_camera(Parameter::free(0.0, 25.0, 10.0));
        params.rectilinear_projection.image_width_px = None;
        assert!(matches!(
            MetropolisOptimizer::default().optimize(&params, &landmarks),
            Err(CameraModelError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_energy_zero_for_true_camera() {
        let landmarks = synthetic_landmarks(12.0);
        let truth = fixed_camera(Parameter::Fixed(12.0)).resolve(&[]).unwrap();
        let energy = landmark_energy(&truth, &landmarks, &DEFAULT_LANDMARK_SIGMA_M);
        assert!(energy < 1e-6, "energy {energy}");
    }

    #[test]
    fn test_energy_infinite_on_failed_projection() {
        let landmarks = LandmarkSet::new(vec![Landmark::new(
            Vector2::new(500.0, 100.0),
            GpsCoord::new(0.0, 0.0),
            0.0,
        )])
        .unwrap();
        let mut params = fixed_camera(Parameter::Fixed(10.0));
        params.spatial_orientation.tilt_deg = Parameter::Fixed(90.0);
        let projector = params.resolve(&[]).unwrap();
        assert_eq!(
            landmark_energy(&projector, &landmarks, &DEFAULT_LANDMARK_SIGMA_M),
            f64::INFINITY
        );
    }

    #[test]
    fn test_fit_elevation_does_not_worsen() {
        let landmarks = synthetic_landmarks(12.0);
        let params = fixed_camera(Parameter::free(0.0, 25.0, 10.0));
        let initial = evaluation::average_distance_m(&params.resolve_initial().unwrap(), &landmarks)
            .unwrap();

        let optimizer = MetropolisOptimizer::new(OptimizerConfig {
            seed: Some(7),
            ..Default::default()
        });
        let fit = optimizer.optimize(&params, &landmarks).unwrap();

        assert!(fit.residual_m <= initial);
        assert!((fit.values[0] - 12.0).abs() < 0.05, "elevation {}", fit.values[0]);
        assert_eq!(fit.trace.len(), 5001);
        assert_eq!(fit.seed, Some(7));
    }

    #[test]
    fn test_best_energy_non_increasing() {
        let landmarks = synthetic_landmarks(8.0);
        let mut params = fixed_camera(Parameter::free(0.0, 25.0, 10.0));
        params.spatial_orientation.tilt_deg = Parameter::free(20.0, 70.0, 45.0);
        let optimizer = MetropolisOptimizer::new(OptimizerConfig {
            iterations: 500,
            seed: Some(3),
            ..Default::default()
        });
        let fit = optimizer.optimize(&params, &landmarks).unwrap();

        for pair in fit.trace.windows(2) {
            assert!(pair[1].best_energy <= pair[0].best_energy);
        }
        assert_eq!(fit.trace.last().unwrap().best_energy, fit.best_energy);
        assert!(fit.best_energy <= fit.initial_energy);
        for sample in &fit.trace {
            assert!((0.0..=25.0).contains(&sample.values[0]));
            assert!((20.0..=70.0).contains(&sample.values[1]));
        }
    }

    #[test]
    fn test_same_seed_same_fit() {
        let landmarks = synthetic_landmarks(12.0);
        let params = fixed_camera(Parameter::free(0.0, 25.0, 10.0));
        let optimizer = MetropolisOptimizer::new(OptimizerConfig {
            iterations: 200,
            seed: Some(42),
            ..Default::default()
        });
        let a = optimizer.optimize(&params, &landmarks).unwrap();
        let b = optimizer.optimize(&params, &landmarks).unwrap();
        assert_eq!(a.values, b.values);
        assert_eq!(a.trace, b.trace);

        let mut rng = StdRng::seed_from_u64(42);
        let c = optimizer
            .optimize_with_rng(&params, &landmarks, &mut rng)
            .unwrap();
        assert_eq!(a.values, c.values);
        assert_eq!(c.seed, None);
    }

    #[test]
    fn test_insufficient_landmarks() {
        let landmarks = LandmarkSet::new(vec![Landmark::new(
            Vector2::new(500.0, 500.0),
            GpsCoord::new(0.0001, 0.0),
            0.0,
        )])
        .unwrap();
        let mut params = fixed_camera(Parameter::free(0.0, 25.0, 10.0));
        params.spatial_orientation.tilt_deg = Parameter::free(0.0, 90.0, 45.0);

        let result = MetropolisOptimizer::default().optimize(&params, &landmarks);
        match result {
            Err(CameraModelError::InsufficientLandmarks {
                landmarks,
                free_parameters,
            }) => {
                assert_eq!(landmarks, 1);
                assert_eq!(free_parameters, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_initial() {
        let landmarks = synthetic_landmarks(12.0);
        let params = fixed_camera(Parameter::free(0.0, 25.0, 30.0));
        assert!(matches!(
            MetropolisOptimizer::default().optimize(&params, &landmarks),
            Err(CameraModelError::OutOfRangeParameter { .. })
        ));
    }

    #[test]
    fn test_no_free_parameters() {
        let landmarks = synthetic_landmarks(12.0);
        let params = fixed_camera(Parameter::Fixed(12.0));
        let fit = MetropolisOptimizer::default()
            .optimize(&params, &landmarks)
            .unwrap();
        assert_eq!(fit.trace.len(), 1);
        assert!(fit.values.is_empty());
        assert!(fit.residual_m < 1e-9);
    }

    #[test]
    fn test_all_candidates_diverge() {
        // Every landmark sits above the horizon of a camera looking level.
        let landmarks = LandmarkSet::new(vec![
            Landmark::new(Vector2::new(500.0, 10.0), GpsCoord::new(0.001, 0.0), 0.0),
            Landmark::new(Vector2::new(400.0, 20.0), GpsCoord::new(0.001, 0.0), 0.0),
        ])
        .unwrap();
        let mut params = fixed_camera(Parameter::free(1.0, 25.0, 10.0));
        params.spatial_orientation.tilt_deg = Parameter::Fixed(90.0);
        let optimizer = MetropolisOptimizer::new(OptimizerConfig {
            iterations: 50,
            seed: Some(1),
            ..Default::default()
        });
        assert!(matches!(
            optimizer.optimize(&params, &landmarks),
            Err(CameraModelError::NumericalDivergence(_))
        ));
    }

    #[test]
    fn test_export_trace_csv() {
        let landmarks = synthetic_landmarks(12.0);
        let params = fixed_camera(Parameter::free(0.0, 25.0, 10.0));
        let fit = MetropolisOptimizer::new(OptimizerConfig {
            iterations: 10,
            seed: Some(5),
            ..Default::default()
        })
        .optimize(&params, &landmarks)
        .unwrap();

        let path = std::env::temp_dir().join("geocam_tools_trace_test.csv");
        fit.export_trace_csv(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "iteration,elevation_m,energy,best_energy,accepted"
        );
        assert_eq!(lines.count(), 11);
        let _ = std::fs::remove_file(&path);
    }
}
