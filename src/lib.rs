//! # embedded-flight-ctrl
//! A `#![no_std]` thrust and attitude command library for multi-copters.
//!
//! Each control tick a [`Controller`] turns the planner's [`DesiredState`], the current
//! [`OdomState`] and the IMU attitude into a normalized collective thrust and an attitude
//! command for the flight controller.
//!
//! # Components
//! [`ThrustEstimator`] calibrates the thrust to acceleration mapping online with a recursive
//! least squares filter, no offline thrust calibration is needed.
//!
//! [`control`] contains the two control laws:
//! [`LinearControl`] (small-angle inversion) and [`GeometricControl`] (SO(3) thrust alignment),
//! selected with [`LawKind`].
//!
//! [`attitude`] contains the yaw extraction and command frame conversion.
//!
//! ```
//! use embedded_flight_ctrl::{
//!     control::ControlLaw, ControlConfig, DesiredState, ImuState, LinearControl, OdomState,
//!     ThrustEstimator,
//! };
//! use embedded_time::duration::Microseconds;
//!
//! let config = ControlConfig::default();
//! let estimator = ThrustEstimator::new(config.gravity, 0.5, config.thrust_map.rho2);
//! let mut control = LinearControl::new(config.gravity, config.gains, estimator);
//!
//! let odom = OdomState::default();
//! let des = DesiredState::hover(odom.p, 0.);
//! let (output, _debug) = control
//!     .calculate_control(&des, &odom, &ImuState::default(), Microseconds(0))
//!     .unwrap();
//!
//! assert!((output.thrust - 0.5).abs() < 1e-9);
//! ```

#![cfg_attr(not(test), no_std)]

pub mod attitude;

pub mod config;
pub use config::{ControlConfig, Gains, LawKind, ThrustMapConfig};

pub mod control;
pub use control::{ControlLaw, GeometricControl, Law, LinearControl};

mod controller;
pub use controller::Controller;

mod error;
pub use error::{ConfigError, ControlError, DegenerateGeometry};

pub mod estimator;
pub use estimator::{ThrustEstimator, ThrustModelUpdate, ThrustSample};

mod state;
pub use state::{ControlOutput, DebugRecord, DesiredState, ImuState, OdomState};
