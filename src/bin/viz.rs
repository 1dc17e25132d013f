use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};

use position_pid::io::ResponseSummary;
use position_pid::sim::{self, Sample};
use position_pid::Settings;

fn main() -> eframe::Result {
    // Optional first argument: TOML settings file
    let settings = match std::env::args().nth(1) {
        Some(path) => match Settings::load(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{:#}", e);
                std::process::exit(1);
            }
        },
        None => Settings::default(),
    };
    let samples = sim::simulate(&settings.pid, &settings.plant, &settings.sim);
    let summary = ResponseSummary::from_samples(&samples, 5.0);

    let app = PidViz { settings, samples, summary };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Position PID Step Response", options, Box::new(|_| Ok(Box::new(app))))
}

struct PidViz {
    settings: Settings,
    samples: Vec<Sample>,
    summary: Option<ResponseSummary>,
}

impl eframe::App for PidViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            let pid = &self.settings.pid;
            ui.heading(format!("Controller: {}", self.settings.name));
            ui.label(format!(
                "kP {:.3}  |  kI {:.3}  |  kD {:.3}  |  bias {:.1}  |  \
                 deadband {}  |  integral cap {}",
                pid.kp, pid.ki, pid.kd, pid.bias, pid.error_threshold, pid.integral_limit
            ));
            if let Some(s) = &self.summary {
                ui.label(format!(
                    "Overshoot: {:.2} %  |  Settling: {}  |  Final error: {:.3}",
                    s.overshoot_pct,
                    s.settling_time_s.map_or("n/a".to_string(), |t| format!("{:.2} s", t)),
                    s.steady_state_error,
                ));
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_h = available.y / 2.0 - 8.0;

            // Position and target vs Time
            ui.label("Position (ticks)");
            let position: PlotPoints =
                self.samples.iter().map(|s| [s.time_s, s.position]).collect();
            let target: PlotPoints = self.samples.iter().map(|s| [s.time_s, s.target]).collect();
            Plot::new("position")
                .height(half_h)
                .x_axis_label("Time (s)")
                .show(ui, |plot_ui| {
                    plot_ui.line(Line::new("Target", target));
                    plot_ui.line(Line::new("Position", position));
                });

            // Command after driver saturation vs Time
            ui.label("Applied command");
            let plant = &self.settings.plant;
            let command: PlotPoints = self
                .samples
                .iter()
                .map(|s| [s.time_s, plant.saturate(s.command) as f64])
                .collect();
            Plot::new("command")
                .height(half_h)
                .x_axis_label("Time (s)")
                .show(ui, |plot_ui| {
                    plot_ui.line(Line::new("Command", command));
                });
        });
    }
}
