use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DC motor position plant
// ---------------------------------------------------------------------------

/// Lumped model of a geared DC motor driven by a PWM command.
///
/// Position and velocity are in encoder ticks and ticks/s, so the controller
/// sees the same units it would read from a real encoder.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MotorPlant {
    pub inertia: f64,       // effective, command-units normalized
    pub damping: f64,       // viscous friction, per tick/s
    pub gain: f64,          // torque per command unit
    pub friction: f64,      // Coulomb friction torque
    pub command_limit: i32, // driver saturation (PWM range)
}

impl MotorPlant {
    pub fn new(inertia: f64, damping: f64, gain: f64) -> Self {
        Self {
            inertia,
            damping,
            gain,
            friction: 0.0,
            command_limit: 127,
        }
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_command_limit(mut self, limit: i32) -> Self {
        self.command_limit = limit;
        self
    }

    /// Command actually applied by the driver after saturation.
    pub fn saturate(&self, command: i32) -> i32 {
        let limit = self.command_limit.saturating_abs();
        command.clamp(-limit, limit)
    }

    /// State derivative `[velocity, acceleration]` for state `[position, velocity]`.
    pub fn derivatives(&self, state: &Vector2<f64>, command: i32) -> Vector2<f64> {
        let vel = state.y;
        let drive = self.gain * self.saturate(command) as f64 - self.damping * vel;

        // Coulomb friction opposes motion; at rest it holds until overcome
        let net = if vel.abs() > 1e-9 {
            drive - self.friction * vel.signum()
        } else if drive.abs() <= self.friction {
            0.0
        } else {
            drive - self.friction * drive.signum()
        };

        Vector2::new(vel, net / self.inertia)
    }

    /// Velocity the motor settles at under a constant command.
    pub fn terminal_velocity(&self, command: i32) -> f64 {
        if self.damping <= 0.0 {
            return f64::INFINITY;
        }
        let drive = (self.gain * self.saturate(command) as f64).abs() - self.friction;
        (drive.max(0.0) / self.damping).copysign(command as f64)
    }
}

impl Default for MotorPlant {
    fn default() -> Self {
        Self {
            inertia: 1.0,
            damping: 4.0,
            gain: 40.0,
            friction: 80.0,
            command_limit: 127,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_saturated() {
        let plant = MotorPlant::default();
        assert_eq!(plant.saturate(500), 127);
        assert_eq!(plant.saturate(-500), -127);
        assert_eq!(plant.saturate(60), 60);
    }

    #[test]
    fn most_negative_limit_does_not_overflow() {
        let plant = MotorPlant::default().with_command_limit(i32::MIN);
        assert_eq!(plant.saturate(10), 10);
        assert_eq!(plant.saturate(i32::MIN), -i32::MAX);
    }

    #[test]
    fn friction_holds_at_rest() {
        let plant = MotorPlant::new(1.0, 4.0, 40.0).with_friction(100.0);
        let d = plant.derivatives(&Vector2::new(0.0, 0.0), 2);
        assert_eq!(d.y, 0.0);
        let d = plant.derivatives(&Vector2::new(0.0, 0.0), 10);
        assert!((d.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn damping_opposes_velocity() {
        let plant = MotorPlant::new(1.0, 4.0, 40.0);
        let d = plant.derivatives(&Vector2::new(0.0, 100.0), 0);
        assert_eq!(d.x, 100.0);
        assert!((d.y + 400.0).abs() < 1e-9);
    }

    #[test]
    fn terminal_velocity_matches_balance() {
        let plant = MotorPlant::new(1.0, 4.0, 40.0);
        assert!((plant.terminal_velocity(127) - 1270.0).abs() < 1e-9);
        assert!((plant.terminal_velocity(-1000) + 1270.0).abs() < 1e-9);

        // Friction eats into the drive
        let plant = MotorPlant::default();
        assert!((plant.terminal_velocity(127) - 1250.0).abs() < 1e-9);
    }
}
