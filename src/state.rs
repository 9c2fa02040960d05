use nalgebra::{UnitQuaternion, Vector3};

/// Desired state from the trajectory planner for a single tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DesiredState {
    /// Position (m)
    pub p: Vector3<f64>,
    /// Velocity (m/s)
    pub v: Vector3<f64>,
    /// Feed forward acceleration (m/s^2)
    pub a: Vector3<f64>,
    /// Yaw (radians)
    pub yaw: f64,
}

impl DesiredState {
    /// Hold `position` with the given heading.
    pub fn hover(position: Vector3<f64>, yaw: f64) -> Self {
        Self {
            p: position,
            v: Vector3::zeros(),
            a: Vector3::zeros(),
            yaw,
        }
    }
}

/// Current state estimate from odometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OdomState {
    pub p: Vector3<f64>,
    pub v: Vector3<f64>,
    pub q: UnitQuaternion<f64>,
}

impl Default for OdomState {
    fn default() -> Self {
        Self {
            p: Vector3::zeros(),
            v: Vector3::zeros(),
            q: UnitQuaternion::identity(),
        }
    }
}

/// Attitude reported by the inertial sensor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImuState {
    pub q: UnitQuaternion<f64>,
}

impl Default for ImuState {
    fn default() -> Self {
        Self {
            q: UnitQuaternion::identity(),
        }
    }
}

/// Command for the flight controller's attitude and thrust interface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlOutput {
    /// Normalized collective thrust, nominally in [0, 1].
    pub thrust: f64,
    /// Commanded attitude in the command frame.
    pub q: UnitQuaternion<f64>,
}

/// Telemetry snapshot of a control tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DebugRecord {
    pub des_v_x: f64,
    pub des_v_y: f64,
    pub des_v_z: f64,

    pub des_a_x: f64,
    pub des_a_y: f64,
    pub des_a_z: f64,

    pub des_q_x: f64,
    pub des_q_y: f64,
    pub des_q_z: f64,
    pub des_q_w: f64,

    pub des_thr: f64,

    /// Thrust to acceleration ratio used for this tick.
    pub thr2acc: f64,

    /// Set when the thrust mapping was updated since the previous tick.
    pub thrust_model_updated: bool,

    /// Set when the law could not build an attitude and the last good command was reused.
    pub fallback: bool,
}

impl DebugRecord {
    pub fn new(des: &DesiredState, des_acc: &Vector3<f64>, u: &ControlOutput, thr2acc: f64) -> Self {
        let q = u.q.quaternion();
        Self {
            des_v_x: des.v.x,
            des_v_y: des.v.y,
            des_v_z: des.v.z,
            des_a_x: des_acc.x,
            des_a_y: des_acc.y,
            des_a_z: des_acc.z,
            des_q_x: q.i,
            des_q_y: q.j,
            des_q_z: q.k,
            des_q_w: q.w,
            des_thr: u.thrust,
            thr2acc,
            thrust_model_updated: false,
            fallback: false,
        }
    }
}
