use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::sim::Sample;

/// Step-response metrics computed from a simulated run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSummary {
    pub initial_position: f64,
    pub target: f64,
    pub final_position: f64,
    /// 10% to 90% of the step. `None` if the response never got there.
    pub rise_time_s: Option<f64>,
    /// Peak excursion past the target, in percent of the step.
    pub overshoot_pct: f64,
    /// Time after which the position stays within the tolerance band.
    /// `None` if it is still outside at the end of the run.
    pub settling_time_s: Option<f64>,
    pub steady_state_error: f64,
    pub peak_command: i32,
    pub duration_s: f64,
}

impl ResponseSummary {
    /// Compute metrics from a response. Returns `None` for an empty run.
    pub fn from_samples(samples: &[Sample], tolerance: f64) -> Option<Self> {
        let first = samples.first()?;
        let last = samples.last()?;
        let start = first.position;
        let target = last.target;
        let step = target - start;

        // Progress along the step: 0 at start, 1 at target
        let progress = |s: &Sample| if step != 0.0 { (s.position - start) / step } else { 1.0 };

        let t10 = samples.iter().find(|&s| progress(s) >= 0.1).map(|s| s.time_s);
        let t90 = samples.iter().find(|&s| progress(s) >= 0.9).map(|s| s.time_s);
        let rise_time_s = match (t10, t90) {
            (Some(a), Some(b)) => Some(b - a),
            _ => None,
        };

        let overshoot_pct = if step != 0.0 {
            let peak = samples.iter().map(progress).fold(f64::MIN, f64::max);
            ((peak - 1.0) * 100.0).max(0.0)
        } else {
            0.0
        };

        let outside = |s: &Sample| (s.target - s.position).abs() > tolerance;
        let settling_time_s = match samples.iter().rposition(outside) {
            None => Some(first.time_s),
            Some(i) if i + 1 < samples.len() => Some(samples[i + 1].time_s),
            Some(_) => None,
        };

        let peak_command = samples
            .iter()
            .map(|s| s.command.saturating_abs())
            .max()
            .unwrap_or(0);

        Some(ResponseSummary {
            initial_position: start,
            target,
            final_position: last.position,
            rise_time_s,
            overshoot_pct,
            settling_time_s,
            steady_state_error: target - last.position,
            peak_command,
            duration_s: last.time_s - first.time_s,
        })
    }
}

#[derive(Serialize)]
struct Report<'a> {
    name: &'a str,
    response: &'a ResponseSummary,
}

/// Write a response summary as JSON to a writer.
pub fn write_summary<W: Write>(
    writer: &mut W,
    name: &str,
    summary: &ResponseSummary,
) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &Report { name, response: summary })?;
    writeln!(writer)
}

/// Write a response summary JSON to a file.
pub fn write_summary_file(
    path: impl AsRef<Path>,
    name: &str,
    summary: &ResponseSummary,
) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_summary(&mut file, name, summary)
}
