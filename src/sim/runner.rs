use std::cell::Cell;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::integrator::rk4_step;
use super::plant::MotorPlant;
use crate::control::{Controller, FeedbackSource, PidConfig, PositionController};

// ---------------------------------------------------------------------------
// Simulation config and output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimConfig {
    pub dt_ms: u32,
    pub duration_s: f64,
    pub initial_position: f64,
    pub target: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt_ms: 10,        // 100 Hz control loop
            duration_s: 5.0,
            initial_position: 0.0,
            target: 1000.0,   // ticks
        }
    }
}

/// Longest run, in control ticks, a simulation will allocate for.
pub const MAX_STEPS: u32 = 10_000_000;

impl SimConfig {
    /// Number of control ticks after t = 0, capped at [`MAX_STEPS`].
    pub fn steps(&self) -> u32 {
        if self.dt_ms == 0 {
            return 0;
        }
        let ticks = (self.duration_s * 1000.0 / self.dt_ms as f64).ceil().max(0.0);
        ticks.min(MAX_STEPS as f64) as u32
    }
}

/// One control tick: plant state before the command is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time_s: f64,
    pub target: f64,
    pub position: f64,
    pub velocity: f64,
    pub command: i32,
}

// ---------------------------------------------------------------------------
// Closed-loop simulation
// ---------------------------------------------------------------------------

fn run(
    plant: &MotorPlant,
    config: &SimConfig,
    mut control: impl FnMut(u32, f64) -> i32,
) -> Vec<Sample> {
    let dt = config.dt_ms as f64 / 1000.0;
    let steps = config.steps();
    let mut state = Vector2::new(config.initial_position, 0.0);
    let mut samples = Vec::with_capacity((steps as usize + 1).min(1_000_000));

    for i in 0..=steps {
        let now_ms = i.wrapping_mul(config.dt_ms);
        let command = control(now_ms, state.x);
        samples.push(Sample {
            time_s: i as f64 * dt,
            target: config.target,
            position: state.x,
            velocity: state.y,
            command,
        });
        state = rk4_step(plant, &state, command, dt);
    }

    samples
}

/// Drive the plant with a custom controller.
pub fn simulate_with(
    controller: &mut dyn Controller,
    plant: &MotorPlant,
    config: &SimConfig,
) -> Vec<Sample> {
    controller.set_target(config.target);
    tracing::debug!(
        target: "position_pid::sim",
        controller = controller.name(),
        steps = config.steps(),
        "starting simulation"
    );
    let samples = run(plant, config, |now_ms, position| controller.control(now_ms, position));
    log_finish(controller.name(), &samples);
    samples
}

/// Drive the plant with a [`PositionController`] that reads the plant's
/// position through an externally maintained variable, the way firmware
/// wires a fused position estimate into the loop.
pub fn simulate(pid: &PidConfig, plant: &MotorPlant, config: &SimConfig) -> Vec<Sample> {
    let position = Cell::new(config.initial_position);
    let mut controller = PositionController::new(FeedbackSource::External(&position), *pid);
    controller.set_target_position(config.target);
    tracing::debug!(
        target: "position_pid::sim",
        controller = "PositionController",
        steps = config.steps(),
        "starting simulation"
    );

    let samples = run(plant, config, |now_ms, measured| {
        position.set(measured);
        controller.step(now_ms)
    });
    log_finish("PositionController", &samples);
    samples
}

fn log_finish(name: &str, samples: &[Sample]) {
    if let Some(last) = samples.last() {
        tracing::info!(
            target: "position_pid::sim",
            "{} ran {} ticks, final position {:.2} (error {:.2})",
            name,
            samples.len(),
            last.position,
            last.target - last.position
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
