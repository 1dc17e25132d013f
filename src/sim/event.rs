use super::runner::Sample;

// ---------------------------------------------------------------------------
// Step-response events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Commanded output exceeds the driver range.
    SaturationStart,
    SaturationEnd,
    /// Position crossed the target (overshoot on the first crossing).
    TargetCrossed { crossing: usize },
    /// Position entered the tolerance band and stayed for the hold time.
    Settled,
}

/// An event found in a simulated response.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    pub time_s: f64,
    pub kind: EventKind,
    pub sample: Sample,
}

/// Passive detectors that inspect consecutive samples.
pub trait EventDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind>;
}

/// Detects the error changing sign.
#[derive(Debug, Default)]
pub struct CrossingDetector {
    crossings: usize,
}

impl EventDetector for CrossingDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind> {
        let e0 = prev.target - prev.position;
        let e1 = current.target - current.position;
        if (e0 > 0.0 && e1 < 0.0) || (e0 < 0.0 && e1 > 0.0) {
            self.crossings += 1;
            Some(EventKind::TargetCrossed { crossing: self.crossings })
        } else {
            None
        }
    }
}

/// Detects the command leaving and re-entering the driver range.
#[derive(Debug)]
pub struct SaturationDetector {
    pub limit: i32,
    saturated: bool,
}

impl SaturationDetector {
    pub fn new(limit: i32) -> Self {
        Self { limit: limit.saturating_abs(), saturated: false }
    }
}

impl EventDetector for SaturationDetector {
    fn check(&mut self, _prev: &Sample, current: &Sample) -> Option<EventKind> {
        let over = current.command.saturating_abs() > self.limit;
        match (self.saturated, over) {
            (false, true) => {
                self.saturated = true;
                Some(EventKind::SaturationStart)
            }
            (true, false) => {
                self.saturated = false;
                Some(EventKind::SaturationEnd)
            }
            _ => None,
        }
    }
}

/// Fires once, when the position has stayed within `tolerance` of the
/// target for `hold_s` seconds.
#[derive(Debug)]
pub struct SettleDetector {
    pub tolerance: f64,
    pub hold_s: f64,
    entered: Option<f64>,
    fired: bool,
}

impl SettleDetector {
    pub fn new(tolerance: f64, hold_s: f64) -> Self {
        Self { tolerance, hold_s, entered: None, fired: false }
    }
}

impl EventDetector for SettleDetector {
    fn check(&mut self, _prev: &Sample, current: &Sample) -> Option<EventKind> {
        if self.fired {
            return None;
        }
        if (current.target - current.position).abs() > self.tolerance {
            self.entered = None;
            return None;
        }
        let entered = *self.entered.get_or_insert(current.time_s);
        if current.time_s - entered >= self.hold_s {
            self.fired = true;
            Some(EventKind::Settled)
        } else {
            None
        }
    }
}

/// Run every detector over a response, in time order.
pub fn scan(samples: &[Sample], detectors: &mut [&mut dyn EventDetector]) -> Vec<ResponseEvent> {
    let mut events = Vec::new();
    for pair in samples.windows(2) {
        for det in detectors.iter_mut() {
            if let Some(kind) = det.check(&pair[0], &pair[1]) {
                events.push(ResponseEvent { time_s: pair[1].time_s, kind, sample: pair[1] });
            }
        }
    }
    events
}
