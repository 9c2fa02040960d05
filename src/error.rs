use embedded_time::{clock, ConversionError};
use thiserror::Error;

/// A configuration rejected before the controller is built.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("hover thrust percentage must be in (0, 1], got {0}")]
    InvalidHoverPercentage(f64),

    #[error("gravity must be finite and positive, got {0}")]
    InvalidGravity(f64),

    #[error("forgetting factor must be in (0, 1], got {0}")]
    InvalidForgettingFactor(f64),

    #[error("position and velocity gains must be finite")]
    InvalidGain,
}

/// The desired attitude cannot be built from the desired acceleration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DegenerateGeometry {
    /// The desired acceleration is (close to) the zero vector.
    #[error("desired acceleration is too small to define a thrust axis")]
    ZeroAcceleration,

    /// The desired thrust axis is parallel to the desired heading.
    #[error("desired thrust axis is parallel to the desired heading")]
    ThrustAlignedWithHeading,
}

/// An error raised during a control tick.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("clock error: {0:?}")]
    Clock(clock::Error),

    #[error("time conversion error: {0:?}")]
    Time(ConversionError),
}

impl From<clock::Error> for ControlError {
    fn from(clock_error: clock::Error) -> Self {
        ControlError::Clock(clock_error)
    }
}

impl From<ConversionError> for ControlError {
    fn from(time_error: ConversionError) -> Self {
        ControlError::Time(time_error)
    }
}
