use eframe::egui;

use crate::config::AnalysisConfig;
use crate::pipeline::PipelineOutcome;
use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DimuonApp {
    pub state: AppState,
}

impl DimuonApp {
    pub fn new(config: AnalysisConfig, outcome: PipelineOutcome) -> Self {
        let mut state = AppState::new(config);
        state.set_outcome(outcome);
        Self { state }
    }
}

impl eframe::App for DimuonApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: spectrum selection ----
        egui::SidePanel::left("spectra_panel")
            .default_width(200.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::histogram_plot(ui, &self.state);
        });
    }
}

/// Open the viewer window on a finished run. Blocks until it is closed.
pub fn run_viewer(config: AnalysisConfig, outcome: PipelineOutcome) -> eframe::Result {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 700.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "CMS Open Data – Dimuon Spectra",
        options,
        Box::new(move |_cc| Ok(Box::new(DimuonApp::new(config, outcome)))),
    )
}
