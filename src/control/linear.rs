use super::{desired_acceleration, ControlLaw};
use crate::attitude::{command_frame_correction, yaw_from_quaternion};
use crate::{
    ControlOutput, DebugRecord, DegenerateGeometry, DesiredState, Gains, ImuState, OdomState,
    ThrustEstimator,
};
use embedded_time::duration::Microseconds;
use nalgebra::{UnitQuaternion, Vector3};
use num_traits::Float;

/// Small-angle controller.
///
/// Roll and pitch are a first order inversion of the horizontal desired acceleration around
/// hover and the thrust assumes the vehicle is level.
#[derive(Clone, Debug)]
pub struct LinearControl {
    pub gravity: f64,
    pub gains: Gains,
    estimator: ThrustEstimator,
}

impl LinearControl {
    pub fn new(gravity: f64, gains: Gains, estimator: ThrustEstimator) -> Self {
        Self {
            gravity,
            gains,
            estimator,
        }
    }

    /// Calculate the roll and pitch (in radians) for a desired acceleration at the current yaw.
    pub fn roll_pitch(&self, des_acc: &Vector3<f64>, yaw: f64) -> (f64, f64) {
        let (sin, cos) = Float::sin_cos(yaw);
        let roll = (des_acc.x * sin - des_acc.y * cos) / self.gravity;
        let pitch = (des_acc.x * cos + des_acc.y * sin) / self.gravity;
        (roll, pitch)
    }
}

impl ControlLaw for LinearControl {
    fn calculate_control(
        &mut self,
        des: &DesiredState,
        odom: &OdomState,
        imu: &ImuState,
        now: Microseconds<u64>,
    ) -> Result<(ControlOutput, DebugRecord), DegenerateGeometry> {
        let des_acc = desired_acceleration(des, odom, &self.gains, self.gravity);
        let thrust = self.estimator.acceleration_to_thrust(des_acc.z);

        let (roll, pitch) = self.roll_pitch(&des_acc, yaw_from_quaternion(&odom.q));
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), des.yaw)
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), pitch)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), roll);

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
