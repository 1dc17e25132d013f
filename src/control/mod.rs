pub mod config;
pub mod controller;
pub mod feedback;
pub mod pid;

pub use config::PidConfig;
pub use controller::Controller;
pub use feedback::{
    EncoderBank, EncoderTable, FeedbackSource, MotorPort, SensorBank, SensorPort, SensorTable,
};
pub use pid::PositionController;
