//! Online calibration of the thrust to acceleration mapping.
//!
//! Each commanded thrust is stored with the time it was issued. Once the actuation delay has
//! elapsed (35 ~ 45ms) the oldest sample is paired with the measured vertical acceleration and
//! fed to a recursive least squares filter with vanishing memory, modeling
//! `acceleration = thr2acc * thrust`.

use embedded_time::duration::Microseconds;
use heapless::Deque;

/// Maximum number of thrust samples kept for estimation.
pub const SAMPLE_CAPACITY: usize = 100;

/// Samples younger than this have not had time to affect the measured acceleration.
pub const MIN_SAMPLE_AGE: Microseconds<u64> = Microseconds(35_000);

/// Samples older than this no longer correlate with the measured acceleration.
pub const MAX_SAMPLE_AGE: Microseconds<u64> = Microseconds(45_000);

/// Covariance after a reset.
pub const INITIAL_COVARIANCE: f64 = 1e6;

/// Default forgetting factor.
pub const DEFAULT_RHO2: f64 = 0.998;

/// A thrust command and the time it was issued.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThrustSample {
    pub timestamp: Microseconds<u64>,
    pub thrust: f64,
}

impl ThrustSample {
    fn age(&self, now: Microseconds<u64>) -> u64 {
        now.0.saturating_sub(self.timestamp.0)
    }
}

/// Result of [`ThrustEstimator::update`].
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ThrustModelUpdate {
    /// One sample was consumed and the mapping is now `ratio`.
    Updated { ratio: f64 },
    /// No sample is old enough yet, the mapping is unchanged.
    InsufficientHistory,
    /// A sample was consumed but the step would make the mapping non-positive,
    /// the mapping and covariance are unchanged.
    Rejected { thrust: f64, measured_acc: f64 },
}

impl ThrustModelUpdate {
    pub fn is_updated(&self) -> bool {
        matches!(self, ThrustModelUpdate::Updated { .. })
    }
}

#[derive(Clone, Debug)]
pub struct ThrustEstimator {
    /// Acceleration (m/s^2) per unit of normalized thrust
    thr2acc: f64,

    /// Estimator covariance
    p: f64,

    /// Forgetting factor, in (0, 1]
    rho2: f64,

    /// Log each update at debug level
    print_value: bool,

    timed_thrust: Deque<ThrustSample, SAMPLE_CAPACITY>,
}

impl ThrustEstimator {
    /// Create an estimator initialized for hovering at `hover_percentage` thrust.
    ///
    /// `hover_percentage` must be positive, see [`ControlConfig::validate`](crate::ControlConfig::validate).
    pub fn new(gravity: f64, hover_percentage: f64, rho2: f64) -> Self {
        let mut estimator = Self {
            thr2acc: 0.,
            p: INITIAL_COVARIANCE,
            rho2,
            print_value: false,
            timed_thrust: Deque::new(),
        };
        estimator.reset(gravity, hover_percentage);
        estimator
    }

    /// Builder method to set `print_value` and return `self`
    pub fn with_print_value(mut self, print_value: bool) -> Self {
        self.print_value = print_value;
        self
    }

    /// Reset the mapping to `gravity / hover_percentage` with a large covariance.
    pub fn reset(&mut self, gravity: f64, hover_percentage: f64) {
        debug_assert!(hover_percentage > 0.);

        self.thr2acc = gravity / hover_percentage;
        self.p = INITIAL_COVARIANCE;
        log::info!("thrust mapping reset, thr2acc = {:.3}", self.thr2acc);
    }

    /// The current thrust to acceleration ratio.
    pub fn thr2acc(&self) -> f64 {
        self.thr2acc
    }

    pub fn covariance(&self) -> f64 {
        self.p
    }

    pub fn rho2(&self) -> f64 {
        self.rho2
    }

    /// Pending samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &ThrustSample> + '_ {
        self.timed_thrust.iter()
    }

    pub fn len(&self) -> usize {
        self.timed_thrust.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timed_thrust.is_empty()
    }

    /// Compute the normalized thrust for a desired acceleration along the thrust axis.
    pub fn acceleration_to_thrust(&self, acceleration: f64) -> f64 {
        acceleration / self.thr2acc
    }

    /// Record a commanded thrust, dropping the oldest sample when full.
    pub fn record_sample(&mut self, thrust: f64, timestamp: Microseconds<u64>) {
        if self.timed_thrust.is_full() {
            self.timed_thrust.pop_front();
        }

        // Can't fail after making room
        let _ = self.timed_thrust.push_back(ThrustSample { timestamp, thrust });
    }

    /// Update the mapping from the measured vertical acceleration (m/s^2) at `now`.
    ///
    /// Stale samples are discarded. At most one sample in the acceptance window is consumed,
    /// a step that would leave the mapping non-positive is rejected.
    pub fn update(&mut self, measured_acc: f64, now: Microseconds<u64>) -> ThrustModelUpdate {
        while let Some(sample) = self.timed_thrust.front().copied() {
            let age = sample.age(now);

            if age > MAX_SAMPLE_AGE.0 {
                log::trace!("discarding stale thrust sample ({}us old)", age);
                self.timed_thrust.pop_front();
                continue;
            }

            if age < MIN_SAMPLE_AGE.0 {
                return ThrustModelUpdate::InsufficientHistory;
            }

            self.timed_thrust.pop_front();

            return if self.apply(sample.thrust, measured_acc) {
                ThrustModelUpdate::Updated {
                    ratio: self.thr2acc,
                }
            } else {
                log::warn!(
                    "rejected thrust sample (thrust = {:.3}, acc = {:.3})",
                    sample.thrust,
                    measured_acc
                );
                ThrustModelUpdate::Rejected {
                    thrust: sample.thrust,
                    measured_acc,
                }
            };
        }

        ThrustModelUpdate::InsufficientHistory
    }

    // Recursive least squares with vanishing memory.
    // Returns false, leaving the state untouched, if the mapping would not stay positive.
    fn apply(&mut self, thr: f64, measured_acc: f64) -> bool {
        let gamma = 1. / (self.rho2 + thr * self.p * thr);
        let k = gamma * self.p * thr;
        let thr2acc = self.thr2acc + k * (measured_acc - thr * self.thr2acc);
        let p = (1. - k * thr) * self.p / self.rho2;

        if !(thr2acc.is_finite() && thr2acc > 0. && p.is_finite()) {
            return false;
        }

        self.thr2acc = thr2acc;
        self.p = p;

        if self.print_value {
            log::debug!(
                "thr2acc = {:6.3}, gamma = {:6.3}, K = {:6.3}, P = {:6.3}",
                self.thr2acc,
                gamma,
                k,
                self.p
            );
        }

        true
    }
}
