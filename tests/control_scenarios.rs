use approx::assert_relative_eq;
use core::f64::consts::PI;
use embedded_flight_ctrl::{
    ConfigError, ControlConfig, ControlError, Controller, DesiredState, ImuState, LawKind,
    OdomState, ThrustMapConfig, ThrustModelUpdate,
};
use embedded_time::{clock, rate::Fraction, Clock, Instant};
use nalgebra::{UnitQuaternion, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{cell::Cell, rc::Rc};

/// Microsecond clock advanced by hand.
#[derive(Clone, Debug, Default)]
struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    fn advance_ms(&self, millis: u64) {
        self.0.set(self.0.get() + millis * 1_000);
    }
}

impl Clock for ManualClock {
    type T = u64;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, clock::Error> {
        Ok(Instant::new(self.0.get()))
    }
}

#[derive(Debug)]
struct StoppedClock;

impl Clock for StoppedClock {
    type T = u64;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, clock::Error> {
        Err(clock::Error::NotRunning)
    }
}

fn config(law: LawKind, hover_percentage: f64) -> ControlConfig {
    ControlConfig {
        gravity: 9.8,
        thrust_map: ThrustMapConfig {
            hover_percentage,
            ..ThrustMapConfig::default()
        },
        law,
        ..ControlConfig::default()
    }
}

#[test]
fn both_laws_agree_at_hover() {
    for law in [LawKind::Linear, LawKind::Geometric] {
        let clock = ManualClock::default();
        let mut controller = Controller::new(config(law, 0.5), clock).unwrap();
        assert_eq!(controller.estimator().thr2acc(), 19.6);

        let odom = OdomState {
            p: Vector3::new(1., 2., 3.),
            ..OdomState::default()
        };
        let des = DesiredState::hover(odom.p, 0.);
        let (u, debug) = controller
            .update(&des, &odom, &ImuState::default())
            .unwrap();

        assert_relative_eq!(u.thrust, 0.5, epsilon = 1e-12);
        assert_relative_eq!(u.q, UnitQuaternion::identity(), epsilon = 1e-12);
        assert_eq!(debug.des_a_z, 9.8);
        assert!(!debug.fallback);
    }
}

#[test]
fn laws_differ_when_tilted() {
    let tilted = OdomState {
        q: UnitQuaternion::from_euler_angles(0.3, 0.2, 0.),
        ..OdomState::default()
    };
    let imu = ImuState { q: tilted.q };
    let des = DesiredState::hover(tilted.p, 0.);

    let mut linear = Controller::new(config(LawKind::Linear, 0.5), ManualClock::default()).unwrap();
    let mut geometric =
        Controller::new(config(LawKind::Geometric, 0.5), ManualClock::default()).unwrap();

    let (linear_u, _) = linear.update(&des, &tilted, &imu).unwrap();
    let (geometric_u, _) = geometric.update(&des, &tilted, &imu).unwrap();

    assert_relative_eq!(linear_u.thrust, 0.5, epsilon = 1e-12);
    assert!(geometric_u.thrust < linear_u.thrust);
}

#[test]
fn thrust_model_updates_after_actuation_delay() {
    let clock = ManualClock::default();
    let mut controller = Controller::new(config(LawKind::Linear, 0.4), clock.clone()).unwrap();
    let prior = controller.estimator().thr2acc();

    let odom = OdomState::default();
    let des = DesiredState::hover(odom.p, 0.);
    let (u, _) = controller
        .update(&des, &odom, &ImuState::default())
        .unwrap();
    assert_relative_eq!(u.thrust, 0.4, epsilon = 1e-12);

    let measured = Vector3::new(0., 0., 11.);

    clock.advance_ms(20);
    assert_eq!(
        controller.estimate_thrust_model(&measured).unwrap(),
        ThrustModelUpdate::InsufficientHistory
    );

    clock.advance_ms(20);
    let update = controller.estimate_thrust_model(&measured).unwrap();
    assert!(update.is_updated());

    let delta = controller.estimator().thr2acc() - prior;
    assert!(delta != 0.);
    assert_eq!(delta.signum(), (11. - u.thrust * prior).signum());
    assert!(controller.estimator().is_empty());

    controller.reset_thrust_mapping();
    assert_eq!(controller.estimator().thr2acc(), prior);
}

#[test]
fn debug_record_reports_thrust_model_update_once() {
    let clock = ManualClock::default();
    let mut controller = Controller::new(config(LawKind::Linear, 0.5), clock.clone()).unwrap();
    let odom = OdomState::default();
    let imu = ImuState::default();
    let des = DesiredState::hover(odom.p, 0.);

    let (_, debug) = controller.update(&des, &odom, &imu).unwrap();
    assert!(!debug.thrust_model_updated);

    clock.advance_ms(40);
    assert!(controller
        .estimate_thrust_model(&Vector3::new(0., 0., 10.))
        .unwrap()
        .is_updated());

    let (_, debug) = controller.update(&des, &odom, &imu).unwrap();
    assert!(debug.thrust_model_updated);
    assert_eq!(debug.thr2acc, controller.estimator().thr2acc());

    // A rejected sample leaves the mapping, and the flag, untouched
    clock.advance_ms(40);
    assert!(matches!(
        controller
            .estimate_thrust_model(&Vector3::new(0., 0., -20.))
            .unwrap(),
        ThrustModelUpdate::Rejected { .. }
    ));

    let (_, debug) = controller.update(&des, &odom, &imu).unwrap();
    assert!(!debug.thrust_model_updated);
    assert!(controller.estimator().thr2acc() > 0.);
}

#[test]
fn controller_is_debug() {
    let controller =
        Controller::new(config(LawKind::Geometric, 0.5), ManualClock::default()).unwrap();
    let formatted = format!("{:?}", controller);
    assert!(formatted.starts_with("Controller"));
    assert!(formatted.contains("Geometric"));
}

#[test]
fn thrust_model_converges_to_true_ratio() {
    let true_ratio = 15.;
    let mut rng = StdRng::seed_from_u64(7);
    let clock = ManualClock::default();
    let mut controller = Controller::new(config(LawKind::Linear, 0.5), clock.clone()).unwrap();
    let odom = OdomState::default();

    let initial_error = (controller.estimator().thr2acc() - true_ratio).abs();

    for _ in 0..500 {
        // Vary the commanded thrust with the altitude setpoint
        let des = DesiredState::hover(Vector3::new(0., 0., rng.gen_range(-1.0..1.0)), 0.);
        let (u, _) = controller
            .update(&des, &odom, &ImuState::default())
            .unwrap();

        clock.advance_ms(40);
        let measured = Vector3::new(0., 0., true_ratio * u.thrust + rng.gen_range(-0.2..0.2));
        assert!(controller.estimate_thrust_model(&measured).unwrap().is_updated());

        clock.advance_ms(10);
    }

    let final_error = (controller.estimator().thr2acc() - true_ratio).abs();
    assert!(final_error < 0.05, "final error {}", final_error);
    assert!(final_error < 0.1 * initial_error);
}

#[test]
fn commanded_quaternion_is_unit_norm() {
    let mut rng = StdRng::seed_from_u64(42);

    for law in [LawKind::Linear, LawKind::Geometric] {
        let clock = ManualClock::default();
        let mut controller = Controller::new(config(law, 0.45), clock.clone()).unwrap();

        for _ in 0..200 {
            let odom = OdomState {
                p: Vector3::from_fn(|_, _| rng.gen_range(-1.0..1.0)),
                v: Vector3::from_fn(|_, _| rng.gen_range(-0.5..0.5)),
                q: UnitQuaternion::from_euler_angles(
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-PI..PI),
                ),
            };
            let imu = ImuState {
                q: odom.q
                    * UnitQuaternion::from_euler_angles(
                        rng.gen_range(-0.05..0.05),
                        rng.gen_range(-0.05..0.05),
                        rng.gen_range(-0.05..0.05),
                    ),
            };
            let des = DesiredState {
                p: Vector3::from_fn(|_, _| rng.gen_range(-1.0..1.0)),
                v: Vector3::from_fn(|_, _| rng.gen_range(-0.5..0.5)),
                a: Vector3::from_fn(|_, _| rng.gen_range(-1.0..1.0)),
                yaw: rng.gen_range(-PI..PI),
            };

            let (u, debug) = controller.update(&des, &odom, &imu).unwrap();
            assert!(!debug.fallback);
            assert!((u.q.norm() - 1.).abs() < 1e-6);

            clock.advance_ms(2);
        }
    }
}

#[test]
fn degenerate_geometry_holds_last_attitude() {
    let clock = ManualClock::default();
    let mut controller = Controller::new(config(LawKind::Geometric, 0.5), clock.clone()).unwrap();
    let odom = OdomState::default();
    let imu = ImuState::default();

    let des = DesiredState::hover(Vector3::new(0.5, 0., 0.), 0.3);
    let (good, _) = controller.update(&des, &odom, &imu).unwrap();

    clock.advance_ms(2);
    // Free fall requested: zero desired acceleration
    let free_fall = DesiredState {
        a: Vector3::new(0., 0., -9.8),
        ..DesiredState::hover(odom.p, 0.)
    };
    let (u, debug) = controller.update(&free_fall, &odom, &imu).unwrap();

    assert!(debug.fallback);
    assert_eq!(u.q, good.q);
    assert_relative_eq!(u.thrust, 0.5, epsilon = 1e-12);
    assert!(u.q.coords.iter().all(|c| c.is_finite()));
    assert_eq!(controller.estimator().len(), 2);
    assert_eq!(controller.last_output(), Some(&u));
}

#[test]
fn degenerate_geometry_without_history_levels_out() {
    let mut controller =
        Controller::new(config(LawKind::Geometric, 0.5), ManualClock::default()).unwrap();
    let odom = OdomState::default();

    let des = DesiredState {
        a: Vector3::new(0., 0., -9.8),
        ..DesiredState::hover(odom.p, 1.)
    };
    let (u, debug) = controller
        .update(&des, &odom, &ImuState::default())
        .unwrap();

    assert!(debug.fallback);
    assert_relative_eq!(
        u.q,
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.),
        epsilon = 1e-12
    );
}

#[test]
fn rejects_invalid_hover_percentage() {
    let result = Controller::new(config(LawKind::Linear, 0.), ManualClock::default());
    assert!(matches!(
        result,
        Err(ConfigError::InvalidHoverPercentage(h)) if h == 0.
    ));
}

#[test]
fn clock_errors_propagate() {
    let mut controller = Controller::new(config(LawKind::Linear, 0.5), StoppedClock).unwrap();
    let odom = OdomState::default();

    let result = controller.update(
        &DesiredState::hover(odom.p, 0.),
        &odom,
        &ImuState::default(),
    );
    assert!(matches!(result, Err(ControlError::Clock(_))));
    assert!(controller.estimator().is_empty());
}
