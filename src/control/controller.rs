/// Trait for position regulators.
///
/// Implement this to drive a custom control law through the
/// simulation loop in place of [`PositionController`](super::PositionController).
pub trait Controller {
    /// Compute an actuator command from the current tick and measured position.
    fn control(&mut self, now_ms: u32, position: f64) -> i32;

    /// Move the setpoint.
    fn set_target(&mut self, target: f64);

    /// Human-readable name for logging/display.
    fn name(&self) -> &str;
}
