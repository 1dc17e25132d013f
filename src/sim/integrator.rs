use nalgebra::Vector2;

use super::plant::MotorPlant;

// ---------------------------------------------------------------------------
// RK4 integrator with constant actuator command over the step
// ---------------------------------------------------------------------------

/// Single RK4 step of `[position, velocity]` with the command held constant.
pub fn rk4_step(plant: &MotorPlant, state: &Vector2<f64>, command: i32, dt: f64) -> Vector2<f64> {
    let k1 = plant.derivatives(state, command);
    let k2 = plant.derivatives(&(state + k1 * (dt * 0.5)), command);
    let k3 = plant.derivatives(&(state + k2 * (dt * 0.5)), command);
    let k4 = plant.derivatives(&(state + k3 * dt), command);

    state + (k1 + 2.0 * k2 + 2.0 * k3 + k4) * (dt / 6.0)
}
