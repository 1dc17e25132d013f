use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::control::PidConfig;
use crate::sim::runner::MAX_STEPS;
use crate::sim::{MotorPlant, SimConfig};

/// Everything needed for a step-response run, as read from a TOML file.
///
/// Missing sections fall back to [`Settings::default`]; missing keys inside
/// a present section fall back to that section's own default.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub name: String,
    pub pid: PidConfig,
    pub plant: MotorPlant,
    pub sim: SimConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            pid: PidConfig::new(1.0, 1.0, 0.2).with_integral_limit(1000),
            plant: MotorPlant::default(),
            sim: SimConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the simulation cannot run with. Gains are not checked.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.sim.dt_ms > 0, "sim.dt_ms must be positive");
        ensure!(
            self.sim.duration_s.is_finite() && self.sim.duration_s >= 0.0,
            "sim.duration_s must be a non-negative number, got {}",
            self.sim.duration_s
        );
        let ticks = self.sim.duration_s * 1000.0 / self.sim.dt_ms as f64;
        ensure!(
            ticks <= MAX_STEPS as f64,
            "sim.duration_s / sim.dt_ms gives {:.0} ticks, at most {} allowed",
            ticks.ceil(),
            MAX_STEPS
        );
        ensure!(
            self.plant.inertia > 0.0,
            "plant.inertia must be positive, got {}",
            self.plant.inertia
        );
        ensure!(
            self.plant.command_limit > 0,
            "plant.command_limit must be positive, got {}",
            self.plant.command_limit
        );
        Ok(())
    }
}
