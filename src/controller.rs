use crate::attitude::command_frame_correction;
use crate::control::{desired_acceleration, ControlLaw, Law};
use crate::{
    ConfigError, ControlConfig, ControlError, ControlOutput, DebugRecord, DegenerateGeometry,
    DesiredState, ImuState, OdomState, ThrustEstimator, ThrustModelUpdate,
};
use embedded_time::{duration::Microseconds, Clock};
use nalgebra::{UnitQuaternion, Vector3};

/// Thrust and attitude controller run by the flight control loop.
///
/// Owns the configured control law (and through it the thrust estimator) and the clock
/// used to timestamp thrust commands.
#[derive(Debug)]
pub struct Controller<C> {
    config: ControlConfig,
    law: Law,
    clock: C,
    last_output: Option<ControlOutput>,

    /// Set when the thrust mapping changed since the last tick
    thrust_model_updated: bool,
}

impl<C> Controller<C>
where
    C: Clock<T = u64>,
{
    /// Create a new controller from a configuration and clock.
    /// The configuration is validated before the thrust mapping is initialized.
    pub fn new(config: ControlConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let estimator = ThrustEstimator::new(
            config.gravity,
            config.thrust_map.hover_percentage,
            config.thrust_map.rho2,
        )
        .with_print_value(config.thrust_map.print_value);

        Ok(Self {
            law: Law::from_config(&config, estimator),
            config,
            clock,
            last_output: None,
            thrust_model_updated: false,
        })
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn law(&self) -> &Law {
        &self.law
    }

    pub fn estimator(&self) -> &ThrustEstimator {
        self.law.estimator()
    }

    /// The last command output by [`Controller::update`].
    pub fn last_output(&self) -> Option<&ControlOutput> {
        self.last_output.as_ref()
    }

    /// Reset the thrust mapping to the configured hover thrust.
    pub fn reset_thrust_mapping(&mut self) {
        self.law.estimator_mut().reset(
            self.config.gravity,
            self.config.thrust_map.hover_percentage,
        );
    }

    /// Update the thrust mapping from the measured acceleration (in m/s^2, including gravity).
    pub fn estimate_thrust_model(
        &mut self,
        measured_acc: &Vector3<f64>,
    ) -> Result<ThrustModelUpdate, ControlError> {
        let now = self.now()?;
        let update = self.law.estimator_mut().update(measured_acc.z, now);
        self.thrust_model_updated |= update.is_updated();
        Ok(update)
    }

    /// Calculate the thrust and attitude command for the current tick.
    ///
    /// If the control law can't build an attitude the last command (or level at the desired
    /// yaw) is held with hover thrust and the debug record is flagged.
    ///
    /// The debug record reports whether the thrust mapping was updated since the previous tick.
    pub fn update(
        &mut self,
        des: &DesiredState,
        odom: &OdomState,
        imu: &ImuState,
    ) -> Result<(ControlOutput, DebugRecord), ControlError> {
        let now = self.now()?;

        let (u, mut debug) = match self.law.calculate_control(des, odom, imu, now) {
            Ok(command) => command,
            Err(degenerate) => self.fallback(des, odom, imu, now, degenerate),
        };
        debug.thrust_model_updated = core::mem::take(&mut self.thrust_model_updated);

        self.last_output = Some(u);
        Ok((u, debug))
    }

    fn fallback(
        &mut self,
        des: &DesiredState,
        odom: &OdomState,
        imu: &ImuState,
        now: Microseconds<u64>,
        degenerate: DegenerateGeometry,
    ) -> (ControlOutput, DebugRecord) {
        log::warn!("{}, holding last attitude at hover thrust", degenerate);

        let q = match self.last_output {
            Some(last) => last.q,
            None => {
                let level = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), des.yaw);
                command_frame_correction(&imu.q, &odom.q, &level)
            }
        };

        let estimator = self.law.estimator_mut();
        let u = ControlOutput {
            thrust: estimator.acceleration_to_thrust(self.config.gravity),
            q,
        };

        let des_acc = desired_acceleration(des, odom, &self.config.gains, self.config.gravity);
        let mut debug = DebugRecord::new(des, &des_acc, &u, estimator.thr2acc());
        debug.fallback = true;

        estimator.record_sample(u.thrust, now);

        (u, debug)
    }

    fn now(&self) -> Result<Microseconds<u64>, ControlError> {
        let instant = self.clock.try_now()?;
        Microseconds::try_from(instant.duration_since_epoch()).map_err(Into::into)
    }
}
