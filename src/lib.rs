//! Discrete-time PID position control.
//!
//! [`control::PositionController`] is the controller itself: a PID filter with
//! deadband-gated integration, an integral clamp and integral reset on
//! overshoot, stepped from an external millisecond clock. The remaining
//! modules are a host-side harness for exercising it against a simulated
//! DC motor.

pub mod config;
pub mod control;
pub mod io;
pub mod sim;

pub use config::Settings;
pub use control::{Controller, FeedbackSource, PidConfig, PositionController};
