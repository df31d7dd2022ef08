//! Fixed / free camera attributes.
//!
//! Every tunable scalar of a camera is a [`Parameter`]: either a known value or a
//! search interval with a starting point. On disk a fixed parameter is a plain
//! number and a free parameter is a `{min, max, init}` object.

use crate::camera::CameraModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Search interval and starting value of a free parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitConstraint {
    #[serde(rename = "min")]
    pub lower: f64,
    #[serde(rename = "max")]
    pub upper: f64,
    #[serde(rename = "init")]
    pub initial: f64,
}

impl FitConstraint {
    pub fn new(lower: f64, upper: f64, initial: f64) -> Self {
        FitConstraint {
            lower,
            upper,
            initial,
        }
    }

    pub fn range(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parameter {
    Fixed(f64),
    Free(FitConstraint),
}

impl Parameter {
    pub fn free(lower: f64, upper: f64, initial: f64) -> Self {
        Parameter::Free(FitConstraint::new(lower, upper, initial))
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Parameter::Free(_))
    }

    /// The fixed value, or the initial value of a free parameter.
    pub fn initial_value(&self) -> f64 {
        match self {
            Parameter::Fixed(value) => *value,
            Parameter::Free(constraint) => constraint.initial,
        }
    }
}

impl From<f64> for Parameter {
    fn from(value: f64) -> Self {
        Parameter::Fixed(value)
    }
}

/// Names of the attributes that may be free, in extraction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterName {
    ElevationM,
    TiltDeg,
    RollDeg,
    HeadingDeg,
    K1,
    K2,
    K3,
}

impl ParameterName {
    pub const ALL: [ParameterName; 7] = [
        ParameterName::ElevationM,
        ParameterName::TiltDeg,
        ParameterName::RollDeg,
        ParameterName::HeadingDeg,
        ParameterName::K1,
        ParameterName::K2,
        ParameterName::K3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterName::ElevationM => "elevation_m",
            ParameterName::TiltDeg => "tilt_deg",
            ParameterName::RollDeg => "roll_deg",
            ParameterName::HeadingDeg => "heading_deg",
            ParameterName::K1 => "k1",
            ParameterName::K2 => "k2",
            ParameterName::K3 => "k3",
        }
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A free parameter as seen by the optimiser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeParameter {
    pub name: ParameterName,
    pub constraint: FitConstraint,
}

impl FreeParameter {
    /// Checks `lower <= initial <= upper` (and finiteness of all three).
    pub fn validate(&self) -> Result<(), CameraModelError> {
        let c = &self.constraint;
        let finite = c.lower.is_finite() && c.upper.is_finite() && c.initial.is_finite();
        if !finite || c.lower > c.upper || !c.contains(c.initial) {
            return Err(CameraModelError::OutOfRangeParameter {
                name: self.name.to_string(),
                initial: c.initial,
                lower: c.lower,
                upper: c.upper,
            });
        }
        Ok(())
    }

    /// A heading whose bounds cover the full circle wraps around instead of
    /// having edges.
    pub fn is_periodic(&self) -> bool {
        self.name == ParameterName::HeadingDeg && self.constraint.range() >= 360.0
    }
}
