use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Gains and anti-windup limits
// ---------------------------------------------------------------------------

/// Construction parameters of a [`PositionController`](super::PositionController).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Constant feed-forward added to every output.
    pub bias: f64,
    /// |error| must exceed this before the integral accumulates.
    pub error_threshold: i32,
    /// Accumulation stops once |integral| reaches this (raw, before `ki`).
    pub integral_limit: i32,
}

impl PidConfig {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd, ..Self::default() }
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_error_threshold(mut self, threshold: i32) -> Self {
        self.error_threshold = threshold;
        self
    }

    pub fn with_integral_limit(mut self, limit: i32) -> Self {
        self.integral_limit = limit;
        self
    }
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            bias: 0.0,
            error_threshold: 0,
            integral_limit: i32::MAX,
        }
    }
}
