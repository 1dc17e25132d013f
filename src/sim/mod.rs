pub mod event;
pub mod integrator;
pub mod plant;
pub mod runner;

pub use event::{
    CrossingDetector, EventDetector, EventKind, ResponseEvent, SaturationDetector, SettleDetector,
};
pub use integrator::rk4_step;
pub use plant::MotorPlant;
pub use runner::{simulate, simulate_with, Sample, SimConfig};
