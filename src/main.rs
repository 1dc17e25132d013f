use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use position_pid::io::{csv, json, ResponseSummary};
use position_pid::sim::{
    self, CrossingDetector, EventDetector, EventKind, SaturationDetector, SettleDetector,
};
use position_pid::Settings;

#[derive(Parser)]
#[command(name = "position-pid")]
#[command(version, about = "Step-response simulation of the PID position controller")]
struct Cli {
    /// TOML file with [pid], [plant] and [sim] sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the setpoint (ticks)
    #[arg(short, long)]
    target: Option<f64>,

    /// Settling band around the target (ticks)
    #[arg(long, default_value_t = 5.0)]
    tolerance: f64,

    /// Write the full response as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the response summary as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Skip the sampled response table
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(target) = cli.target {
        settings.sim.target = target;
    }

    tracing::info!(
        "position-pid v{} ({}: kp={} ki={} kd={} bias={})",
        env!("CARGO_PKG_VERSION"),
        settings.name,
        settings.pid.kp,
        settings.pid.ki,
        settings.pid.kd,
        settings.pid.bias
    );

    let samples = sim::simulate(&settings.pid, &settings.plant, &settings.sim);
    let summary = ResponseSummary::from_samples(&samples, cli.tolerance)
        .context("simulation produced no samples")?;

    let mut crossing = CrossingDetector::default();
    let mut saturation = SaturationDetector::new(settings.plant.command_limit);
    let mut settle = SettleDetector::new(cli.tolerance, 0.5);
    let mut detectors: [&mut dyn EventDetector; 3] = [&mut crossing, &mut saturation, &mut settle];
    let events = sim::event::scan(&samples, &mut detectors);

    // -----------------------------------------------------------------------
    // Report
    // -----------------------------------------------------------------------
    let pid = &settings.pid;
    let plant = &settings.plant;
    println!();
    println!("====================================================================");
    println!("  POSITION PID STEP RESPONSE — {}", settings.name);
    println!("====================================================================");
    println!();
    println!("  Controller");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  kP:            {:>8.3}       kI:           {:>8.3}", pid.kp, pid.ki);
    println!("  kD:            {:>8.3}       bias:         {:>8.3}", pid.kd, pid.bias);
    println!(
        "  Deadband:      {:>8}       Integral cap: {:>8}",
        pid.error_threshold, pid.integral_limit
    );
    println!();
    println!("  Plant");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Inertia:       {:>8.3}       Damping:      {:>8.3}", plant.inertia, plant.damping);
    println!("  Gain:          {:>8.3}       Friction:     {:>8.3}", plant.gain, plant.friction);
    println!(
        "  Command limit: {:>8}       Top speed:    {:>8.1} ticks/s",
        plant.command_limit,
        plant.terminal_velocity(plant.command_limit)
    );
    println!();

    println!("  Events");
    println!("  ──────────────────────────────────────────────────────────────────");
    for ev in &events {
        let label = match &ev.kind {
            EventKind::SaturationStart => "SATURATED".to_string(),
            EventKind::SaturationEnd => "UNSATURATED".to_string(),
            EventKind::TargetCrossed { crossing } => format!("CROSSING {}", crossing),
            EventKind::Settled => "SETTLED".to_string(),
        };
        println!(
            "  {:<12} t={:>6.2}s   pos={:>9.1}   vel={:>8.1}   cmd={:>6}",
            label, ev.time_s, ev.sample.position, ev.sample.velocity, ev.sample.command
        );
    }
    println!();

    println!("  Response Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Step:          {:>8.1} -> {:.1}", summary.initial_position, summary.target);
    println!("  Rise time:     {:>8}", fmt_time(summary.rise_time_s));
    println!("  Overshoot:     {:>8.2} %", summary.overshoot_pct);
    println!(
        "  Settling:      {:>8}   (±{} ticks)",
        fmt_time(summary.settling_time_s),
        cli.tolerance
    );
    println!("  Final error:   {:>8.3}", summary.steady_state_error);
    println!("  Peak command:  {:>8}", summary.peak_command);
    println!();

    if !cli.quiet {
        println!("  Response");
        println!("  ──────────────────────────────────────────────────────────────────");
        println!(
            "  {:>7}  {:>10}  {:>10}  {:>10}  {:>7}",
            "t (s)", "target", "position", "velocity", "cmd"
        );
        println!("  {}", "─".repeat(52));

        let sample_interval = (samples.len() / 30).max(1);
        for (i, s) in samples.iter().enumerate() {
            if i % sample_interval != 0 && i != samples.len() - 1 {
                continue;
            }
            println!(
                "  {:>7.2}  {:>10.1}  {:>10.2}  {:>10.1}  {:>7}",
                s.time_s, s.target, s.position, s.velocity, s.command
            );
        }
        println!();
    }

    println!(
        "  Simulation: {} ticks, dt={} ms",
        samples.len(),
        settings.sim.dt_ms
    );
    println!("====================================================================");
    println!();

    if let Some(path) = &cli.csv {
        csv::write_response_file(path, &samples)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("response written to {}", path.display());
    }
    if let Some(path) = &cli.json {
        json::write_summary_file(path, &settings.name, &summary)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("summary written to {}", path.display());
    }

    Ok(())
}

fn fmt_time(t: Option<f64>) -> String {
    match t {
        Some(t) => format!("{:.2} s", t),
        None => "n/a".to_string(),
    }
}
