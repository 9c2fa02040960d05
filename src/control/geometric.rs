use super::{desired_acceleration, ControlLaw};
use crate::attitude::command_frame_correction;
use crate::{
    ControlOutput, DebugRecord, DegenerateGeometry, DesiredState, Gains, ImuState, OdomState,
    ThrustEstimator,
};
use embedded_time::duration::Microseconds;
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use num_traits::Float;

/// Vectors shorter than this are not normalized.
pub const MIN_NORM: f64 = 1e-6;

/// Geometric controller on SO(3).
///
/// The desired body z-axis is aligned with the desired acceleration and the thrust is the
/// projection of the desired acceleration onto the current body z-axis.
#[derive(Clone, Debug)]
pub struct GeometricControl {
    pub gravity: f64,
    pub gains: Gains,
    estimator: ThrustEstimator,
}

impl GeometricControl {
    pub fn new(gravity: f64, gains: Gains, estimator: ThrustEstimator) -> Self {
        Self {
            gravity,
            gains,
            estimator,
        }
    }

    /// Calculate the attitude whose z-axis is along `des_acc` and whose heading is `yaw`.
    pub fn desired_attitude(
        des_acc: &Vector3<f64>,
        yaw: f64,
    ) -> Result<UnitQuaternion<f64>, DegenerateGeometry> {
        // 1. Align b3 with the desired acceleration
        let b3c = des_acc
            .try_normalize(MIN_NORM)
            .ok_or(DegenerateGeometry::ZeroAcceleration)?;

        // 2. b2c is perpendicular to both b3c and the heading
        let (sin, cos) = Float::sin_cos(yaw);
        let a_yaw = Vector3::new(cos, sin, 0.);
        let b2c = b3c
            .cross(&a_yaw)
            .try_normalize(MIN_NORM)
            .ok_or(DegenerateGeometry::ThrustAlignedWithHeading)?;

        // 3. Complete the right-handed frame
        let b1c = b2c.cross(&b3c);

        let r_des = Matrix3::from_columns(&[b1c, b2c, b3c]);
        Ok(UnitQuaternion::from_rotation_matrix(
            &Rotation3::from_matrix_unchecked(r_des),
        ))
    }
}

impl ControlLaw for GeometricControl {
    fn calculate_control(
        &mut self,
        des: &DesiredState,
        odom: &OdomState,
        imu: &ImuState,
        now: Microseconds<u64>,
    ) -> Result<(ControlOutput, DebugRecord), DegenerateGeometry> {
        let des_acc = desired_acceleration(des, odom, &self.gains, self.gravity);

        // Project the desired acceleration onto the current body z-axis
        let b3 = odom.q * Vector3::z();
        let thrust = self.estimator.acceleration_to_thrust(des_acc.dot(&b3));

        let q = Self::desired_attitude(&des_acc, des.yaw)?;

        let u = ControlOutput {
            thrust,
            q: command_frame_correction(&imu.q, &odom.q, &q),
        };
        let debug = DebugRecord::new(des, &des_acc, &u, self.estimator.thr2acc());

        self.estimator.record_sample(u.thrust, now);

        Ok((u, debug))
    }

    fn estimator(&self) -> &ThrustEstimator {
        &self.estimator
    }

    fn estimator_mut(&mut self) -> &mut ThrustEstimator {
        &mut self.estimator
    }
}
