use std::io::{self, Write};
use std::path::Path;

use crate::sim::Sample;

/// Write a simulated response in CSV format.
///
/// Columns: time_s, target, position, velocity, command
pub fn write_response<W: Write>(writer: &mut W, samples: &[Sample]) -> io::Result<()> {
    writeln!(writer, "time_s,target,position,velocity,command")?;

    for s in samples {
        writeln!(
            writer,
            "{:.3},{:.4},{:.4},{:.4},{}",
            s.time_s, s.target, s.position, s.velocity, s.command,
        )?;
    }

    Ok(())
}

/// Write a simulated response to a CSV file at the given path.
pub fn write_response_file(path: impl AsRef<Path>, samples: &[Sample]) -> io::Result<()> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    write_response(&mut file, samples)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_output_has_header_and_rows() {
        let samples = vec![
            Sample { time_s: 0.0, target: 100.0, position: 0.0, velocity: 0.0, command: 0 },
            Sample { time_s: 0.01, target: 100.0, position: 1.5, velocity: 150.0, command: 127 },
        ];

        let mut buf = Vec::new();
        write_response(&mut buf, &samples).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "time_s,target,position,velocity,command");
        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert_eq!(lines[2], "0.010,100.0000,1.5000,150.0000,127");
    }
}
