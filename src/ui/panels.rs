use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::{AppState, View};

// ---------------------------------------------------------------------------
// Left side panel – spectrum selection
// ---------------------------------------------------------------------------

/// Render the left selection panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Spectra");
    ui.separator();

    let Some(bundle) = &state.bundle else {
        ui.label("No histograms loaded.");
        return;
    };

    let ranges = bundle.ranges.clone();
    let stats = bundle.stats;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.strong("Dimuon mass");
            for (i, range) in ranges.iter().enumerate() {
                ui.radio_value(&mut state.view, View::Mass(i), range);
            }
            ui.add_space(4.0);

            ui.strong("Muon pT");
            ui.radio_value(&mut state.view, View::Pt, "μ⁺ / μ⁻");
            ui.radio_value(&mut state.view, View::PtDiff, "μ⁺ - μ⁻");
            ui.separator();

            ui.checkbox(&mut state.log_y, "Log scale");
            ui.checkbox(&mut state.show_same_sign, "Same-sign overlay");
            ui.separator();

            egui::CollapsingHeader::new(RichText::new("Run summary").strong())
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.label(format!("records: {}", stats.records));
                    ui.label(format!("opposite sign: {}", stats.opposite_sign));
                    ui.label(format!("same sign: {}", stats.same_sign));
                    if let Some(ps) = state.pipeline_state {
                        ui.label(format!("source: {ps}"));
                    }
                });
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Recompute").clicked() {
                let input = state.config.input.clone();
                state.recompute(input);
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(state.config.input.display().to_string());

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open dimuon CSV")
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.recompute(path);
    }
}
