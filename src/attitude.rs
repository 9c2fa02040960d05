//! Attitude helpers shared by the control laws.

use nalgebra::UnitQuaternion;
use num_traits::Float;

/// Extract the yaw angle (in radians, within (-PI, PI]) from an attitude quaternion.
pub fn yaw_from_quaternion(q: &UnitQuaternion<f64>) -> f64 {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    Float::atan2(2. * (x * y + w * z), w * w + x * x - y * y - z * z)
}

/// Express a desired attitude, computed in the odometry frame, in the flight controller's command frame.
///
/// The raw attitude interface takes commands relative to the IMU attitude rather than the
/// odometry attitude, so the estimator/IMU misalignment `imu * odom^-1` is applied on top of
/// the desired attitude.
pub fn command_frame_correction(
    imu: &UnitQuaternion<f64>,
    odom: &UnitQuaternion<f64>,
    desired: &UnitQuaternion<f64>,
) -> UnitQuaternion<f64> {
    imu * odom.inverse() * desired
}
