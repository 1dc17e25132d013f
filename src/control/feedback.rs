use std::cell::Cell;
use std::fmt;

// ---------------------------------------------------------------------------
// Hardware ports
// ---------------------------------------------------------------------------

/// Number of analog/digital sensor ports mirrored by a [`SensorTable`].
pub const SENSOR_PORTS: usize = 20;
/// Number of motor ports (and thus integrated encoders) mirrored by an [`EncoderTable`].
pub const MOTOR_PORTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorPort(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MotorPort(pub u8);

// ---------------------------------------------------------------------------
// Reader abstractions
// ---------------------------------------------------------------------------

/// Read access to the current value of every sensor port.
pub trait SensorBank {
    fn sensor_value(&self, port: SensorPort) -> i32;
}

/// Read access to the tick count of every motor encoder.
pub trait EncoderBank {
    fn encoder_ticks(&self, motor: MotorPort) -> i32;
}

/// Where a [`PositionController`](super::PositionController) gets its process value from.
///
/// All variants borrow; the controller never writes through them.
#[derive(Clone, Copy)]
pub enum FeedbackSource<'a> {
    /// Raw sensor reading.
    Sensor {
        bank: &'a dyn SensorBank,
        port: SensorPort,
    },
    /// Motor encoder tick count.
    Encoder {
        bank: &'a dyn EncoderBank,
        motor: MotorPort,
    },
    /// A process variable maintained elsewhere (e.g. a fused or derived signal).
    /// The cell must outlive the controller.
    External(&'a Cell<f64>),
}

impl FeedbackSource<'_> {
    /// Current process value.
    pub fn read(&self) -> f64 {
        match self {
            FeedbackSource::Sensor { bank, port } => bank.sensor_value(*port) as f64,
            FeedbackSource::Encoder { bank, motor } => bank.encoder_ticks(*motor) as f64,
            FeedbackSource::External(var) => var.get(),
        }
    }
}

impl fmt::Debug for FeedbackSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackSource::Sensor { port, .. } => f.debug_tuple("Sensor").field(port).finish(),
            FeedbackSource::Encoder { motor, .. } => f.debug_tuple("Encoder").field(motor).finish(),
            FeedbackSource::External(var) => f.debug_tuple("External").field(&var.get()).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory hardware tables
// ---------------------------------------------------------------------------

/// Fixed-size sensor table. Out-of-range ports read as 0 and ignore writes.
#[derive(Debug, Default)]
pub struct SensorTable {
    values: [Cell<i32>; SENSOR_PORTS],
}

impl SensorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, port: SensorPort, value: i32) {
        if let Some(slot) = self.values.get(port.0 as usize) {
            slot.set(value);
        }
    }
}

impl SensorBank for SensorTable {
    fn sensor_value(&self, port: SensorPort) -> i32 {
        self.values.get(port.0 as usize).map_or(0, Cell::get)
    }
}

/// Fixed-size encoder table. Out-of-range motors read as 0 and ignore writes.
#[derive(Debug, Default)]
pub struct EncoderTable {
    ticks: [Cell<i32>; MOTOR_PORTS],
}

impl EncoderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, motor: MotorPort, ticks: i32) {
        if let Some(slot) = self.ticks.get(motor.0 as usize) {
            slot.set(ticks);
        }
    }

    /// Zero the encoder, as done after homing.
    pub fn reset(&self, motor: MotorPort) {
        self.set(motor, 0);
    }
}

impl EncoderBank for EncoderTable {
    fn encoder_ticks(&self, motor: MotorPort) -> i32 {
        self.ticks.get(motor.0 as usize).map_or(0, Cell::get)
    }
}
