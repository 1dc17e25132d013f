// ---------------------------------------------------------------------------
// Position PID controller with anti-windup and overshoot reset
// ---------------------------------------------------------------------------

use super::config::PidConfig;
use super::feedback::FeedbackSource;

/// Magnitude the scaled integral term `integral * ki` is clamped to.
/// Matches the half-range of an 8-bit signed PWM command.
pub const INTEGRAL_TERM_LIMIT: f64 = 127.0;

/// Closed-loop position controller stepped on an externally driven clock.
///
/// The timestep is measured between consecutive calls to [`step`](Self::step)
/// from the millisecond tick passed in, so the controller tolerates jitter in
/// the scheduling loop. A call within the same tick as the previous one is a
/// no-op returning 0.
#[derive(Debug, Clone)]
pub struct PositionController<'a> {
    config: PidConfig,
    source: FeedbackSource<'a>,

    target: f64,
    error: f64,
    prev_error: f64,
    integral: f64,
    derivative: f64,
    out_val: f64,

    dt: f64,        // s
    prev_time: u32, // ms
}

impl<'a> PositionController<'a> {
    /// Bind a feedback source and gains. The target starts at the current
    /// feedback reading so the first step produces no error.
    pub fn new(source: FeedbackSource<'a>, config: PidConfig) -> Self {
        let target = source.read();
        tracing::debug!(
            target: "position_pid::pid",
            ?source,
            kp = config.kp,
            ki = config.ki,
            kd = config.kd,
            bias = config.bias,
            "controller bound, holding position {}",
            target
        );
        Self {
            config,
            source,
            target,
            error: 0.0,
            prev_error: 0.0,
            integral: 0.0,
            derivative: 0.0,
            out_val: 0.0,
            dt: 0.0,
            prev_time: 0,
        }
    }

    pub fn set_target_position(&mut self, target: f64) {
        self.target = target;
    }

    pub fn target_position(&self) -> f64 {
        self.target
    }

    /// Error computed by the last active step.
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Output computed by the last active step, before truncation.
    pub fn output(&self) -> f64 {
        self.out_val
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn derivative(&self) -> f64 {
        self.derivative
    }

    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }

    /// Timestep of the last call in seconds (0 after an idle call).
    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    pub fn source(&self) -> &FeedbackSource<'a> {
        &self.source
    }

    /// Run one control step reading the bound feedback source.
    ///
    /// `now_ms` is the platform tick counter; wrap-around is handled.
    pub fn step(&mut self, now_ms: u32) -> i32 {
        if !self.advance_clock(now_ms) {
            return 0;
        }
        let value = self.source.read();
        self.update(value)
    }

    /// Run one control step with a process value supplied by the caller
    /// instead of the bound source.
    pub fn step_with_value(&mut self, now_ms: u32, value: f64) -> i32 {
        if !self.advance_clock(now_ms) {
            return 0;
        }
        self.update(value)
    }

    /// Returns false when no time has elapsed since the previous call.
    fn advance_clock(&mut self, now_ms: u32) -> bool {
        self.dt = now_ms.wrapping_sub(self.prev_time) as f64 / 1000.0;
        self.prev_time = now_ms;
        self.dt != 0.0
    }

    fn update(&mut self, value: f64) -> i32 {
        let dt = self.dt;
        self.error = self.target - value;

        // Anti-windup: only integrate outside the deadband and below the raw cap
        if self.error.abs() > self.config.error_threshold as f64
            && self.integral.abs() < self.config.integral_limit as f64
        {
            self.integral += self.error * dt;

            if self.error == 0.0 || sgn(self.error) != sgn(self.prev_error) {
                // Target reached or overshot: drop the accumulated history
                if self.integral != 0.0 {
                    tracing::trace!(
                        target: "position_pid::pid",
                        error = self.error,
                        prev_error = self.prev_error,
                        "integral reset"
                    );
                }
                self.integral = 0.0;
            } else if self.config.ki != 0.0 {
                let ki = self.config.ki;
                if self.integral * ki > INTEGRAL_TERM_LIMIT {
                    self.integral = INTEGRAL_TERM_LIMIT / ki;
                    tracing::trace!(
                        target: "position_pid::pid",
                        integral = self.integral,
                        "integral clamped"
                    );
                }
                if self.integral * ki < -INTEGRAL_TERM_LIMIT {
                    self.integral = -INTEGRAL_TERM_LIMIT / ki;
                    tracing::trace!(
                        target: "position_pid::pid",
                        integral = self.integral,
                        "integral clamped"
                    );
                }
            }
        }

        self.derivative = (self.error - self.prev_error) / dt;
        self.prev_error = self.error;

        let c = &self.config;
        self.out_val =
            c.kp * self.error + c.ki * self.integral + c.kd * self.derivative + c.bias;

        // Saturating float-to-int cast; range limiting is left to the driver
        self.out_val as i32
    }
}

impl super::Controller for PositionController<'_> {
    fn control(&mut self, now_ms: u32, position: f64) -> i32 {
        self.step_with_value(now_ms, position)
    }

    fn set_target(&mut self, target: f64) {
        self.set_target_position(target);
    }

    fn name(&self) -> &str {
        "PositionController"
    }
}

/// Sign with sgn(0) == 0, so crossing into or out of zero error counts as a change.
fn sgn(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::feedback::{EncoderTable, MotorPort, SensorPort, SensorTable};
    use std::cell::Cell;

    const EPS: f64 = 1e-9;

    fn external(pv: &Cell<f64>, config: PidConfig) -> PositionController<'_> {
        PositionController::new(FeedbackSource::External(pv), config)
    }

    #[test]
    fn pure_proportional_step() {
        let pv = Cell::new(0.0);
        let mut pid = external(&pv, PidConfig::new(1.0, 0.0, 0.0));
        pid.set_target_position(100.0);

        let out = pid.step(20);
        assert!((pid.dt() - 0.02).abs() < EPS);
        assert_eq!(pid.error(), 100.0);
        assert_eq!(pid.integral(), 0.0);
        assert!((pid.derivative() - 5000.0).abs() < 1e-6);
        assert_eq!(out, 100);

        // Same feedback again: no change in error, no derivative
        let out = pid.step(40);
        assert_eq!(pid.prev_error(), 100.0);
        assert!(pid.derivative().abs() < EPS);
        assert_eq!(out, 100);
    }

    #[test]
    fn integral_clamps_to_term_limit() {
        let pv = Cell::new(0.0);
        let config = PidConfig::new(0.0, 1.0, 0.0)
            .with_error_threshold(0)
            .with_integral_limit(1000);
        let mut pid = PositionController::new(FeedbackSource::External(&pv), config);
        pid.set_target_position(200.0);

        let mut now = 0;
        let mut clamped_at = None;
        for i in 0..200 {
            now += 10;
            pid.step(now);
            assert!(pid.integral() * 1.0 <= INTEGRAL_TERM_LIMIT + EPS);
            if clamped_at.is_none() && (pid.integral() - 127.0).abs() < EPS {
                clamped_at = Some(i);
            }
        }
        assert!((pid.integral() - 127.0).abs() < EPS);
        assert_eq!(pid.step(now + 10), 127);
        // First step resets (prev error 0), then 2.0 per step until past 127
        assert_eq!(clamped_at, Some(64));
    }

    #[test]
    fn sign_change_resets_integral() {
        let pv = Cell::new(50.0);
        let mut pid = external(&pv, PidConfig::new(0.0, 1.0, 0.0));
        pid.set_target_position(100.0);

        pid.step(10);
        pid.step(20);
        pid.step(30);
        assert!(pid.integral() > 0.0);
        assert_eq!(pid.prev_error(), 50.0);

        pv.set(110.0);
        pid.step(40);
        assert_eq!(pid.error(), -10.0);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn target_starts_at_current_feedback() {
        let sensors = SensorTable::new();
        sensors.set(SensorPort(2), 42);
        let mut pid = PositionController::new(
            FeedbackSource::Sensor { bank: &sensors, port: SensorPort(2) },
            PidConfig::new(2.0, 0.5, 0.1),
        );
        assert_eq!(pid.target_position(), 42.0);
        assert_eq!(pid.step(15), 0);
        assert_eq!(pid.error(), 0.0);
    }

    #[test]
    fn encoder_feedback_drives_error() {
        let encoders = EncoderTable::new();
        let mut pid = PositionController::new(
            FeedbackSource::Encoder { bank: &encoders, motor: MotorPort(4) },
            PidConfig::new(0.5, 0.0, 0.0),
        );
        pid.set_target_position(360.0);
        encoders.set(MotorPort(4), 160);
        assert_eq!(pid.step(20), 100);
        assert_eq!(pid.error(), 200.0);
    }

    #[test]
    fn zero_dt_is_a_no_op() {
        let pv = Cell::new(0.0);
        let mut pid = external(&pv, PidConfig::new(1.0, 1.0, 1.0).with_bias(5.0));
        pid.set_target_position(30.0);

        // prev_time starts at 0
        assert_eq!(pid.step(0), 0);
        assert_eq!(pid.error(), 0.0);

        pid.step(20);
        pid.step(40);
        let state = |p: &PositionController| {
            (p.error(), p.integral(), p.derivative(), p.prev_error(), p.output())
        };
        let snapshot = state(&pid);

        pv.set(12.0);
        assert_eq!(pid.step(40), 0);
        assert_eq!(pid.step_with_value(40, -1000.0), 0);
        assert_eq!(pid.dt(), 0.0);
        assert_eq!(snapshot, state(&pid));
    }

    #[test]
    fn threshold_blocks_accumulation() {
        let pv = Cell::new(0.0);
        let config = PidConfig::new(0.0, 1.0, 0.0).with_error_threshold(10);
        let mut pid = PositionController::new(FeedbackSource::External(&pv), config);
        pid.set_target_position(50.0);
        pid.step(10);
        pid.step(20);
        let before = pid.integral();
        assert!(before > 0.0);

        pv.set(45.0); // |error| == 5 <= 10
        pid.step(30);
        assert_eq!(pid.integral(), before);

        pv.set(40.0); // |error| == threshold, still gated
        pid.step(40);
        assert_eq!(pid.integral(), before);
    }

    #[test]
    fn integral_limit_freezes_accumulator() {
        let pv = Cell::new(0.0);
        let config = PidConfig::new(0.0, 0.01, 0.0).with_integral_limit(3);
        let mut pid = PositionController::new(FeedbackSource::External(&pv), config);
        pid.set_target_position(100.0);

        let mut now = 0;
        for _ in 0..10 {
            now += 10;
            pid.step(now);
        }
        // Accumulation stops at the first value >= 3 (1.0 per step)
        assert!((pid.integral() - 3.0).abs() < EPS);

        // Frozen accumulator is not reset on overshoot either
        pv.set(150.0);
        pid.step(now + 10);
        assert!((pid.integral() - 3.0).abs() < EPS);
    }

    #[test]
    fn zero_ki_skips_clamp() {
        let pv = Cell::new(0.0);
        let mut pid = external(&pv, PidConfig::new(0.0, 0.0, 0.0));
        pid.set_target_position(10_000.0);
        let mut now = 0;
        for _ in 0..50 {
            now += 100;
            pid.step(now);
        }
        assert!(pid.integral().is_finite());
        assert!(pid.integral() > 127.0);
        assert_eq!(pid.output(), 0.0);
    }

    #[test]
    fn negative_ki_still_bounds_term() {
        let pv = Cell::new(0.0);
        let mut pid = external(&pv, PidConfig::new(0.0, -2.0, 0.0));
        pid.set_target_position(-500.0);
        let mut now = 0;
        for _ in 0..100 {
            now += 50;
            pid.step(now);
            assert!((pid.integral() * -2.0).abs() <= INTEGRAL_TERM_LIMIT + EPS);
        }
    }

    #[test]
    fn derivative_and_output_formula_hold() {
        let pv = Cell::new(0.0);
        let config = PidConfig::new(0.8, 0.3, 0.05)
            .with_bias(4.0)
            .with_error_threshold(2)
            .with_integral_limit(400);
        let mut pid = PositionController::new(FeedbackSource::External(&pv), config);
        pid.set_target_position(250.0);

        // Deterministic pseudo-random feedback and jittered ticks
        let mut seed: u32 = 12345;
        let mut now: u32 = 0;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            pv.set((seed >> 16) as f64 % 500.0);
            now += 5 + (seed % 20);

            let prev_error = pid.prev_error();
            let out = pid.step(now);
            let expected_d = (pid.error() - prev_error) / pid.dt();
            assert!((pid.derivative() - expected_d).abs() < 1e-9);

            let expected_out =
                0.8 * pid.error() + 0.3 * pid.integral() + 0.05 * pid.derivative() + 4.0;
            assert!((pid.output() - expected_out).abs() < 1e-9);
            assert_eq!(out, expected_out as i32);
            assert!((pid.integral() * 0.3).abs() <= INTEGRAL_TERM_LIMIT + 1e-9);
        }
    }

    #[test]
    fn tick_counter_wraparound() {
        let pv = Cell::new(0.0);
        let mut pid = external(&pv, PidConfig::new(1.0, 0.0, 0.0));
        pid.set_target_position(10.0);
        pid.step(u32::MAX - 9);
        pid.step(10);
        assert!((pid.dt() - 0.02).abs() < EPS);
    }

    #[test]
    fn step_with_value_ignores_bound_source() {
        let pv = Cell::new(0.0);
        let mut pid = external(&pv, PidConfig::new(1.0, 0.0, 0.0));
        pid.set_target_position(20.0);
        assert_eq!(pid.step_with_value(10, 5.0), 15);
        assert_eq!(pid.error(), 15.0);
    }

    #[test]
    fn drives_through_controller_trait() {
        use crate::control::Controller;

        let pv = Cell::new(0.0);
        let mut pid = external(&pv, PidConfig::new(2.0, 0.0, 0.0));
        let ctrl: &mut dyn Controller = &mut pid;
        assert_eq!(ctrl.name(), "PositionController");
        ctrl.set_target(10.0);
        assert_eq!(ctrl.control(10, 4.0), 12);
    }
}
