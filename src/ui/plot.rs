use eframe::egui::{Align2, Color32, RichText, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, MarkerShape, Plot, PlotPoint, PlotPoints, PlotUi, Points, Text};

use crate::color::{SeriesColors, generate_palette};
use crate::data::bundle::{HistogramBundle, names};
use crate::data::histogram::{BinSlot, Histogram};
use crate::state::{AppState, View};

// ---------------------------------------------------------------------------
// Known dimuon resonances
// ---------------------------------------------------------------------------

struct Resonance {
    name: &'static str,
    mass: f64,
    /// Only labelled on zoomed ranges; too crowded on the full spectrum.
    zoom_only: bool,
}

const RESONANCES: [Resonance; 6] = [
    Resonance { name: "J/ψ", mass: 3.097, zoom_only: false },
    Resonance { name: "ψ(2S)", mass: 3.686, zoom_only: true },
    Resonance { name: "Υ(1S)", mass: 9.46, zoom_only: false },
    Resonance { name: "Υ(2S)", mass: 10.02, zoom_only: true },
    Resonance { name: "Υ(3S)", mass: 10.36, zoom_only: true },
    Resonance { name: "Z", mass: 91.2, zoom_only: false },
];

// ---------------------------------------------------------------------------
// Histogram plot (central panel)
// ---------------------------------------------------------------------------

/// Render the selected histogram view in the central panel.
pub fn histogram_plot(ui: &mut Ui, state: &AppState) {
    let bundle = match &state.bundle {
        Some(b) => b,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a CSV file to analyse  (File → Open…)");
            });
            return;
        }
    };

    let colors = SeriesColors::default();
    match state.view {
        View::Mass(i) => {
            let Some(range) = bundle.ranges.get(i) else {
                return;
            };
            mass_plot(ui, state, bundle, range, colors);
        }
        View::Pt => pt_plot(ui, state, bundle, colors),
        View::PtDiff => pt_diff_plot(ui, bundle, colors),
    }
}

fn mass_plot(ui: &mut Ui, state: &AppState, bundle: &HistogramBundle, range: &str, colors: SeriesColors) {
    let (Some(all), Some(same_sign)) = (
        bundle.get(&names::all_events(range)),
        bundle.get(&names::same_sign(range)),
    ) else {
        missing(ui);
        return;
    };

    let log_y = state.log_y;
    let zoomed = range != "full";
    let label_colors = generate_palette(RESONANCES.len());

    let y_label = format!("entries per {:.2} GeV", all.bin_width());
    show_plot(ui, &format!("mass_{range}"), "m(μμ) [GeV]", &y_label, log_y, |plot_ui| {
        if state.show_same_sign {
            draw_bars(plot_ui, same_sign, log_y, "μμ data (same sign events)", colors.secondary);
        }
        draw_points(plot_ui, all, log_y, "μμ data (all events)", colors.primary);

        for (res, color) in RESONANCES.iter().zip(label_colors) {
            if res.zoom_only && !zoomed {
                continue;
            }
            resonance_label(plot_ui, all, res, log_y, color);
        }
    });
}

fn pt_plot(ui: &mut Ui, state: &AppState, bundle: &HistogramBundle, colors: SeriesColors) {
    let (Some(pos), Some(neg)) = (bundle.get(names::PT_POS), bundle.get(names::PT_NEG)) else {
        missing(ui);
        return;
    };
    let log_y = state.log_y;

    show_plot(ui, "pt", "pT(μ) [GeV]", "muons per GeV", log_y, |plot_ui| {
        draw_bars(plot_ui, neg, log_y, "μ⁻", colors.secondary);
        draw_points(plot_ui, pos, log_y, "μ⁺", colors.primary);
    });
}

/// Always linear: the difference can be negative.
fn pt_diff_plot(ui: &mut Ui, bundle: &HistogramBundle, colors: SeriesColors) {
    let Some(diff) = bundle.get(names::PT_DIFF) else {
        missing(ui);
        return;
    };

    show_plot(ui, "pt_diff", "pT(μ) [GeV]", "N(μ⁺) - N(μ⁻) per GeV", false, |plot_ui| {
        draw_points(plot_ui, diff, false, "μ⁺ - μ⁻", colors.primary);
        if let Some(errors) = &diff.errors {
            for (i, (&y, &e)) in diff.contents.iter().zip(errors).enumerate() {
                let x = diff.bin_center(i);
                plot_ui.line(Line::new(PlotPoints::from(vec![[x, y - e], [x, y + e]])).color(colors.primary));
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

fn show_plot(
    ui: &mut Ui,
    id: &str,
    x_label: &str,
    y_label: &str,
    log_y: bool,
    add_contents: impl FnOnce(&mut PlotUi),
) {
    let y_label = if log_y { format!("log₁₀ {y_label}") } else { y_label.to_string() };
    let mut plot = Plot::new(id.to_string())
        .legend(Legend::default())
        .x_axis_label(x_label.to_string())
        .y_axis_label(y_label)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);
    if log_y {
        plot = plot.y_axis_formatter(|mark, _range| format!("{:.0}", 10f64.powf(mark.value)));
    }
    plot.show(ui, add_contents);
}

/// Plotted height of a bin. On a log axis empty bins are hidden.
fn display_value(content: f64, log_y: bool) -> Option<f64> {
    if !log_y {
        Some(content)
    } else if content >= 1.0 {
        Some(content.log10())
    } else {
        None
    }
}

fn draw_points(plot_ui: &mut PlotUi, h: &Histogram, log_y: bool, name: &str, color: Color32) {
    let pts: PlotPoints = h
        .contents
        .iter()
        .enumerate()
        .filter_map(|(i, &c)| display_value(c, log_y).map(|y| [h.bin_center(i), y]))
        .collect();
    plot_ui.points(
        Points::new(pts)
            .name(name)
            .color(color)
            .shape(MarkerShape::Circle)
            .radius(2.5_f32),
    );
}

fn draw_bars(plot_ui: &mut PlotUi, h: &Histogram, log_y: bool, name: &str, color: Color32) {
    let width = h.bin_width();
    let bars: Vec<Bar> = h
        .contents
        .iter()
        .enumerate()
        .filter_map(|(i, &c)| display_value(c, log_y).map(|y| Bar::new(h.bin_center(i), y).width(width)))
        .collect();
    plot_ui.bar_chart(BarChart::new(bars).name(name).color(color));
}

/// Vertical line from the axis up to the bin containing the resonance, with
/// its name beside the top.
fn resonance_label(plot_ui: &mut PlotUi, h: &Histogram, res: &Resonance, log_y: bool, color: Color32) {
    let BinSlot::Bin(bin) = h.find_bin(res.mass) else {
        return;
    };
    let Some(top) = h.contents.get(bin).and_then(|&c| display_value(c, log_y)) else {
        return;
    };

    plot_ui.line(Line::new(PlotPoints::from(vec![[res.mass, 0.0], [res.mass, top]])).color(color).width(2.0_f32));
    plot_ui.text(
        Text::new(
            PlotPoint::new(res.mass + 4.0 * h.bin_width(), top),
            RichText::new(format!("{} (m={:.1} GeV)", res.name, res.mass)).color(color),
        )
        .anchor(Align2::LEFT_CENTER),
    );
}

fn missing(ui: &mut Ui) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.label("Histogram not present in this bundle.");
    });
}
