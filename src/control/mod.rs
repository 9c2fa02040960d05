//! Control laws turning a desired state into a thrust and attitude command.
//!
//! Both laws run the same position/velocity feedback to get a desired acceleration,
//! convert it to normalized thrust with the [`ThrustEstimator`] they own, and record the
//! commanded thrust back into it for the next estimator update.

use crate::{
    ControlConfig, ControlOutput, DebugRecord, DegenerateGeometry, DesiredState, Gains, ImuState,
    LawKind, OdomState, ThrustEstimator,
};
use embedded_time::duration::Microseconds;
use nalgebra::Vector3;

mod geometric;
pub use geometric::GeometricControl;

mod linear;
pub use linear::LinearControl;

/// A control law run once per control tick.
pub trait ControlLaw {
    /// Compute the command for the current tick at time `now`.
    ///
    /// On success the commanded thrust has been recorded into the estimator.
    /// On error the estimator is left untouched.
    fn calculate_control(
        &mut self,
        des: &DesiredState,
        odom: &OdomState,
        imu: &ImuState,
        now: Microseconds<u64>,
    ) -> Result<(ControlOutput, DebugRecord), DegenerateGeometry>;

    fn estimator(&self) -> &ThrustEstimator;

    fn estimator_mut(&mut self) -> &mut ThrustEstimator;
}

/// Calculate the desired acceleration (in m/s^2) including gravity compensation.
pub fn desired_acceleration(
    des: &DesiredState,
    odom: &OdomState,
    gains: &Gains,
    gravity: f64,
) -> Vector3<f64> {
    des.a
        + gains.kv.component_mul(&(des.v - odom.v))
        + gains.kp.component_mul(&(des.p - odom.p))
        + Vector3::new(0., 0., gravity)
}

/// The control law selected by [`LawKind`].
#[derive(Clone, Debug)]
pub enum Law {
    Linear(LinearControl),
    Geometric(GeometricControl),
}

impl Law {
    /// Build the law selected by `config`, owning `estimator`.
    pub fn from_config(config: &ControlConfig, estimator: ThrustEstimator) -> Self {
        match config.law {
            LawKind::Linear => {
                Law::Linear(LinearControl::new(config.gravity, config.gains, estimator))
            }
            LawKind::Geometric => {
                Law::Geometric(GeometricControl::new(config.gravity, config.gains, estimator))
            }
        }
    }

    pub fn kind(&self) -> LawKind {
        match self {
            Law::Linear(_) => LawKind::Linear,
            Law::Geometric(_) => LawKind::Geometric,
        }
    }
}

impl ControlLaw for Law {
    fn calculate_control(
        &mut self,
        des: &DesiredState,
        odom: &OdomState,
        imu: &ImuState,
        now: Microseconds<u64>,
    ) -> Result<(ControlOutput, DebugRecord), DegenerateGeometry> {
        match self {
            Law::Linear(law) => law.calculate_control(des, odom, imu, now),
            Law::Geometric(law) => law.calculate_control(des, odom, imu, now),
        }
    }

    fn estimator(&self) -> &ThrustEstimator {
        match self {
            Law::Linear(law) => law.estimator(),
            Law::Geometric(law) => law.estimator(),
        }
    }

    fn estimator_mut(&mut self) -> &mut ThrustEstimator {
        match self {
            Law::Linear(law) => law.estimator_mut(),
            Law::Geometric(law) => law.estimator_mut(),
        }
    }
}
