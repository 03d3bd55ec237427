use eframe::egui::{self, Color32, Ui};
use egui_plot::{Corner, GridInput, GridMark, Legend, Line, MarkerShape, Plot, PlotPoints, Points};
use tracescope::color::parse_hex;
use tracescope::config::LegendPosition;
use tracescope::data::dataline::{Dataline, LineStyle, MarkerStyle};
use tracescope::data::ticks::{tick_marks, TickStrategy};
use tracescope::transfer::PoleZeroMap;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Stacked trace plots (central panel)
// ---------------------------------------------------------------------------

fn legend_corner(position: LegendPosition) -> Corner {
    match position {
        LegendPosition::TopRight => Corner::RightTop,
        LegendPosition::TopLeft => Corner::LeftTop,
        LegendPosition::BottomRight => Corner::RightBottom,
        LegendPosition::BottomLeft => Corner::LeftBottom,
    }
}

fn grid_spacer(strategy: TickStrategy) -> impl Fn(GridInput) -> Vec<GridMark> + 'static {
    move |input: GridInput| {
        let (marks, step) = tick_marks(strategy, input.bounds.0, input.bounds.1);
        marks
            .into_iter()
            .map(|value| GridMark {
                value,
                step_size: step,
            })
            .collect()
    }
}

fn line_style(style: LineStyle) -> Option<egui_plot::LineStyle> {
    match style {
        LineStyle::Solid => Some(egui_plot::LineStyle::Solid),
        LineStyle::Dashed => Some(egui_plot::LineStyle::Dashed { length: 10.0 }),
        LineStyle::DashDot => Some(egui_plot::LineStyle::Dashed { length: 5.0 }),
        LineStyle::Dotted => Some(egui_plot::LineStyle::Dotted { spacing: 5.0 }),
        LineStyle::None => None,
    }
}

fn marker_shape(marker: MarkerStyle) -> Option<(MarkerShape, bool)> {
    match marker {
        MarkerStyle::None => None,
        MarkerStyle::Point | MarkerStyle::Circle => Some((MarkerShape::Circle, marker == MarkerStyle::Point)),
        MarkerStyle::Square => Some((MarkerShape::Square, true)),
        MarkerStyle::Diamond => Some((MarkerShape::Diamond, true)),
        MarkerStyle::Plus => Some((MarkerShape::Plus, false)),
        MarkerStyle::Cross => Some((MarkerShape::Cross, false)),
        MarkerStyle::Triangle => Some((MarkerShape::Up, true)),
    }
}

fn draw_series(plot_ui: &mut egui_plot::PlotUi, line: &Dataline, x: &[f64], y: &[f64]) {
    let color = parse_hex(&line.color).unwrap_or(Color32::DARK_GRAY);
    let name = if line.in_legend() { line.name.as_str() } else { "" };
    let points = || x.iter().zip(y).map(|(&xi, &yi)| [xi, yi]).collect::<PlotPoints>();

    if let Some(style) = line_style(line.line_style) {
        plot_ui.line(
            Line::new(points())
                .name(name)
                .color(color)
                .style(style)
                .width(line.line_width),
        );
    }
    if let Some((shape, filled)) = marker_shape(line.marker) {
        plot_ui.points(
            Points::new(points())
                .name(name)
                .color(color)
                .shape(shape)
                .filled(filled)
                .radius(line.marker_size),
        );
    }
}

/// Render every plot the session is configured for, stacked vertically.
pub fn trace_plots(ui: &mut Ui, state: &AppState) {
    if state.session.dataline_count() == 0 {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Import a file or define a transfer function  (File → Import…)");
        });
        return;
    }

    let settings = &state.session.settings;
    let plots = state.session.evaluate_plots();
    let spacing = ui.spacing().item_spacing.y;
    let height = (ui.available_height() - spacing * (plots.len() as f32 - 1.0)) / plots.len() as f32;

    for (i, series) in plots.iter().enumerate() {
        let strategy = series
            .first()
            .map(|s| s.line.transform.tick_strategy())
            .unwrap_or(TickStrategy::Auto);

        Plot::new(("trace_plot", i))
            .height(height.max(80.0))
            .legend(Legend::default().position(legend_corner(settings.legend_position)))
            .show_grid(settings.grid)
            .set_margin_fraction(egui::vec2(settings.margin_x, settings.margin_y))
            .y_grid_spacer(grid_spacer(strategy))
            .allow_boxed_zoom(true)
            .allow_drag(true)
            .allow_scroll(true)
            .allow_zoom(true)
            .show(ui, |plot_ui| {
                for s in series {
                    if let Ok((x, y)) = &s.points {
                        draw_series(plot_ui, &s.line, x, y);
                    }
                }
            });
    }
}

// ---------------------------------------------------------------------------
// Pole/zero map
// ---------------------------------------------------------------------------

pub fn pole_zero_window(ctx: &egui::Context, state: &mut AppState) {
    if !state.show_pole_zero {
        return;
    }
    let Some(tf) = state
        .selected_dataset
        .and_then(|id| state.session.dataset(id))
        .and_then(|ds| ds.transfer())
    else {
        state.show_pole_zero = false;
        return;
    };
    let map = PoleZeroMap::new(tf.poles(), tf.zeros(), state.session.settings.frequency_unit);
    let poles = map.scaled_poles();
    let zeros = map.scaled_zeros();

    let mut open = true;
    egui::Window::new("Poles and zeros")
        .open(&mut open)
        .default_size([420.0, 420.0])
        .show(ctx, |ui: &mut Ui| {
            Plot::new("pole_zero_plot")
                .height(320.0)
                .data_aspect(1.0)
                .x_axis_label(map.axis_label("Re"))
                .y_axis_label(map.axis_label("Im"))
                .legend(Legend::default())
                .show(ui, |plot_ui| {
                    let pole_points: PlotPoints = poles.iter().map(|(p, _)| [p.re, p.im]).collect();
                    let zero_points: PlotPoints = zeros.iter().map(|z| [z.re, z.im]).collect();
                    plot_ui.points(
                        Points::new(pole_points)
                            .name("poles")
                            .shape(MarkerShape::Cross)
                            .radius(6.0)
                            .color(Color32::RED),
                    );
                    plot_ui.points(
                        Points::new(zero_points)
                            .name("zeros")
                            .shape(MarkerShape::Circle)
                            .filled(false)
                            .radius(6.0)
                            .color(Color32::LIGHT_BLUE),
                    );
                });

            egui::Grid::new("pole_table").striped(true).show(ui, |ui: &mut Ui| {
                ui.strong("pole");
                ui.strong("Q");
                ui.end_row();
                for (p, q) in &poles {
                    ui.label(format!("{:.4} {:+.4}j", p.re, p.im));
                    ui.label(format!("{q:.3}"));
                    ui.end_row();
                }
            });
        });
    state.show_pole_zero = open;
}
