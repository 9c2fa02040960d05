//! Controller parameters.

use crate::estimator::DEFAULT_RHO2;
use crate::ConfigError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Which control law computes the attitude command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LawKind {
    /// Small-angle inversion around hover
    #[default]
    Linear,
    /// Thrust vector alignment on SO(3)
    Geometric,
}

/// Per-axis position and velocity gains
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gains {
    pub kp: Vector3<f64>,
    pub kv: Vector3<f64>,
}

impl Default for Gains {
    fn default() -> Self {
        Self {
            kp: Vector3::new(1.5, 1.5, 1.5),
            kv: Vector3::new(1.5, 1.5, 1.5),
        }
    }
}

impl Gains {
    /// Create the gains from the individual `Kp0..Kp2` and `Kv0..Kv2` parameters.
    pub fn from_axes(kp: [f64; 3], kv: [f64; 3]) -> Self {
        Self {
            kp: Vector3::from(kp),
            kv: Vector3::from(kv),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrustMapConfig {
    /// Normalized thrust needed to hover, used to seed the thrust mapping
    pub hover_percentage: f64,
    /// Forgetting factor of the thrust mapping estimator
    pub rho2: f64,
    /// Log the estimated mapping on every update
    pub print_value: bool,
}

impl Default for ThrustMapConfig {
    fn default() -> Self {
        Self {
            hover_percentage: 0.5,
            rho2: DEFAULT_RHO2,
            print_value: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Gravity (m/s^2)
    pub gravity: f64,
    pub gains: Gains,
    pub thrust_map: ThrustMapConfig,
    pub law: LawKind,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            gains: Gains::default(),
            thrust_map: ThrustMapConfig::default(),
            law: LawKind::default(),
        }
    }
}

impl ControlConfig {
    /// Check the parameters before any estimator is built from them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gravity.is_finite() || self.gravity <= 0. {
            return Err(ConfigError::InvalidGravity(self.gravity));
        }

        let hover = self.thrust_map.hover_percentage;
        if !(hover > 0. && hover <= 1.) {
            return Err(ConfigError::InvalidHoverPercentage(hover));
        }

        let rho2 = self.thrust_map.rho2;
        if !(rho2 > 0. && rho2 <= 1.) {
            return Err(ConfigError::InvalidForgettingFactor(rho2));
        }

        let mut gains = self.gains.kp.iter().chain(self.gains.kv.iter());
        if gains.any(|gain| !gain.is_finite()) {
            return Err(ConfigError::InvalidGain);
        }

        Ok(())
    }
}
