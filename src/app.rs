use eframe::egui;
use tracescope::config::Settings;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct TracescopeApp {
    pub state: AppState,
}

impl TracescopeApp {
    pub fn new(settings: Settings) -> Self {
        Self {
            state: AppState::new(settings),
        }
    }
}

impl eframe::App for TracescopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: datasets and datalines ----
        egui::SidePanel::left("session_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Floating windows ----
        panels::transfer_function_window(ctx, &mut self.state);
        panels::response_window(ctx, &mut self.state);
        panels::case_window(ctx, &mut self.state);
        plot::pole_zero_window(ctx, &mut self.state);

        // ---- Central panel: stacked plots ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::trace_plots(ui, &self.state);
        });
    }
}
