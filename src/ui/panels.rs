use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use tracescope::color::{parse_hex, to_hex};
use tracescope::data::dataline::{LineStyle, MarkerStyle, TransformKind, DEFAULT_COLOR};
use tracescope::session::{CaseColoring, DatasetId};
use tracescope::symbolic::RationalExpression;
use tracescope::transfer::FrequencyUnit;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Small widgets
// ---------------------------------------------------------------------------

fn choice<T: Copy + PartialEq>(
    ui: &mut Ui,
    id: &str,
    value: &mut T,
    options: &[T],
    label: impl Fn(T) -> String,
) -> bool {
    let mut changed = false;
    egui::ComboBox::from_id_salt(id)
        .selected_text(label(*value))
        .show_ui(ui, |ui: &mut Ui| {
            for &opt in options {
                changed |= ui.selectable_value(value, opt, label(opt)).changed();
            }
        });
    changed
}

fn field_combo(ui: &mut Ui, id: &str, value: &mut String, fields: &[String]) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(value.as_str())
        .show_ui(ui, |ui: &mut Ui| {
            for f in fields {
                ui.selectable_value(value, f.clone(), f.as_str());
            }
        });
}

fn color_button(ui: &mut Ui, hex: &mut String) {
    let c = parse_hex(hex).unwrap_or(Color32::DARK_GRAY);
    let mut rgb = [c.r(), c.g(), c.b()];
    if ui.color_edit_button_srgb(&mut rgb).changed() {
        *hex = to_hex(Color32::from_rgb(rgb[0], rgb[1], rgb[2]));
    }
}

// ---------------------------------------------------------------------------
// Left side panel – datasets and datalines
// ---------------------------------------------------------------------------

/// Render the left session panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Datasets");
    ui.separator();

    if state.session.datasets().next().is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            dataset_list(ui, state);
            let Some(id) = state.selected_dataset else {
                return;
            };
            ui.separator();
            dataset_details(ui, state, id);
            ui.separator();
            dataline_list(ui, state, id);
            ui.separator();
            dataline_editor(ui, state);
        });
}

fn dataset_list(ui: &mut Ui, state: &mut AppState) {
    let entries: Vec<(DatasetId, String, &'static str)> = state
        .session
        .datasets()
        .map(|(id, ds)| (id, ds.title.clone(), ds.kind.label()))
        .collect();
    for (id, title, kind) in entries {
        let selected = state.selected_dataset == Some(id);
        if ui
            .selectable_label(selected, format!("{title}  [{kind}]"))
            .clicked()
        {
            state.selected_dataset = Some(id);
            state.selected_dataline = None;
        }
    }
}

fn dataset_details(ui: &mut Ui, state: &mut AppState, id: DatasetId) {
    let Some(ds) = state.session.dataset(id) else {
        state.selected_dataset = None;
        return;
    };
    let mut title = ds.title.clone();
    let fields = ds.fields().to_vec();
    let cases = ds.case_count();
    let misc = ds.misc_info().to_string();
    let expression = ds.transfer().map(|tf| tf.expression().to_string());

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Title");
        if ui.text_edit_singleline(&mut title).changed() {
            if let Err(e) = state.session.rename_dataset(id, &title) {
                log::error!("rename failed: {e}");
            }
        }
    });
    if let Some(expr) = &expression {
        ui.label(RichText::new(format!("H(s) = {expr}")).monospace());
    }
    if !misc.is_empty() {
        ui.label(RichText::new(misc).italics());
    }

    egui::CollapsingHeader::new(RichText::new(format!("Fields ({})  ·  {cases} case(s)", fields.len())).strong())
        .id_salt(("fields", id))
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            for f in &fields {
                ui.label(f);
            }
        });

    ui.horizontal_wrapped(|ui: &mut Ui| {
        if ui.button("New dataline").clicked() {
            state.new_dataline();
        }
        if ui.button("Per case…").clicked() {
            state.open_case_dialog();
        }
        if expression.is_some() {
            if ui.button("Response…").clicked() {
                state.response_dialog.open = true;
            }
            if ui.button("Poles/zeros").clicked() {
                state.show_pole_zero = true;
            }
        }
        if ui.button(RichText::new("Remove").color(Color32::RED)).clicked() {
            state.remove_selected_dataset();
        }
    });
}

fn dataline_list(ui: &mut Ui, state: &mut AppState, id: DatasetId) {
    ui.strong("Datalines");
    let lines: Vec<_> = state
        .session
        .datalines_of(id)
        .map(|(lid, line)| (lid, line.name.clone()))
        .collect();
    if lines.is_empty() {
        ui.label("None yet.");
    }
    for (lid, name) in lines {
        if ui
            .selectable_label(state.selected_dataline == Some(lid), name)
            .clicked()
        {
            state.selected_dataline = Some(lid);
        }
    }
}

fn dataline_editor(ui: &mut Ui, state: &mut AppState) {
    let Some(lid) = state.selected_dataline else {
        return;
    };
    let Some(ds) = state
        .session
        .dataline_owner(lid)
        .and_then(|owner| state.session.dataset(owner))
    else {
        state.selected_dataline = None;
        return;
    };
    let fields = ds.fields().to_vec();
    let last_case = ds.case_count().saturating_sub(1);
    let last_plot = state.session.settings.plot_count.max(1) - 1;

    let mut remove = false;
    if let Some(line) = state.session.dataline_mut(lid) {
        egui::Grid::new("dataline_editor")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui: &mut Ui| {
                ui.label("Name");
                ui.text_edit_singleline(&mut line.name);
                ui.end_row();

                ui.label("x");
                field_combo(ui, "dl_x", &mut line.x_field, &fields);
                ui.end_row();

                ui.label("y");
                field_combo(ui, "dl_y", &mut line.y_field, &fields);
                ui.end_row();

                ui.label("Case");
                ui.add(egui::DragValue::new(&mut line.case).range(0..=last_case));
                ui.end_row();

                ui.label("Transform");
                choice(ui, "dl_transform", &mut line.transform, &TransformKind::ALL, |t| {
                    t.label().to_string()
                });
                ui.end_row();

                ui.label("x scale / offset");
                ui.horizontal(|ui: &mut Ui| {
                    ui.add(egui::DragValue::new(&mut line.x_scale).speed(0.01));
                    ui.add(egui::DragValue::new(&mut line.x_offset).speed(0.01));
                });
                ui.end_row();

                ui.label("y scale / offset");
                ui.horizontal(|ui: &mut Ui| {
                    ui.add(egui::DragValue::new(&mut line.y_scale).speed(0.01));
                    ui.add(egui::DragValue::new(&mut line.y_offset).speed(0.01));
                });
                ui.end_row();

                ui.label("Smoothing");
                ui.horizontal(|ui: &mut Ui| {
                    ui.add(
                        egui::DragValue::new(&mut line.smoothing_window)
                            .range(0..=2001)
                            .prefix("window "),
                    );
                    ui.add(
                        egui::DragValue::new(&mut line.smoothing_order)
                            .range(0..=8)
                            .prefix("order "),
                    );
                });
                ui.end_row();

                ui.label("Colour");
                color_button(ui, &mut line.color);
                ui.end_row();

                ui.label("Line");
                ui.horizontal(|ui: &mut Ui| {
                    choice(ui, "dl_style", &mut line.line_style, &LineStyle::ALL, |s| {
                        format!("{s:?}")
                    });
                    ui.add(egui::DragValue::new(&mut line.line_width).range(0.5..=10.0).speed(0.1));
                });
                ui.end_row();

                ui.label("Marker");
                ui.horizontal(|ui: &mut Ui| {
                    choice(ui, "dl_marker", &mut line.marker, &MarkerStyle::ALL, |m| {
                        format!("{m:?}")
                    });
                    ui.add(egui::DragValue::new(&mut line.marker_size).range(0.5..=12.0).speed(0.1));
                });
                ui.end_row();

                ui.label("Plot");
                ui.add(egui::DragValue::new(&mut line.plot).range(0..=last_plot));
                ui.end_row();
            });
        remove = ui.button("Remove dataline").clicked();
    }
    if remove {
        state.remove_selected_dataline();
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Import…").clicked() {
                import_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Open session…").clicked() {
                open_session_dialog(state);
                ui.close_menu();
            }
            if ui.button("Save session…").clicked() {
                save_session_dialog(state);
                ui.close_menu();
            }
        });

        if ui.button("Transfer function…").clicked() {
            state.tf_dialog.open = true;
        }

        ui.separator();

        let settings = &mut state.session.settings;
        ui.label("Plots");
        ui.add(egui::DragValue::new(&mut settings.plot_count).range(1..=6));
        choice(
            ui,
            "frequency_unit",
            &mut settings.frequency_unit,
            &[FrequencyUnit::RadPerSecond, FrequencyUnit::Hertz],
            |u| u.suffix().to_string(),
        );
        ui.checkbox(&mut settings.grid, "Grid");

        ui.separator();
        ui.label(format!("{} dataline(s)", state.session.dataline_count()));

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

pub fn transfer_function_window(ctx: &egui::Context, state: &mut AppState) {
    let mut open = state.tf_dialog.open;
    egui::Window::new("Transfer function")
        .open(&mut open)
        .resizable(true)
        .show(ctx, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Title");
                ui.text_edit_singleline(&mut state.tf_dialog.title);
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("H(s) =");
                ui.text_edit_singleline(&mut state.tf_dialog.expression);
            });

            let message = state.tf_dialog.validation();
            if let Ok(latex) = RationalExpression::display_form(&state.tf_dialog.expression) {
                ui.label(RichText::new(latex).monospace());
            }
            if !message.is_empty() {
                ui.label(RichText::new(&message).color(Color32::RED));
            }
            if ui
                .add_enabled(message.is_empty(), egui::Button::new("Define"))
                .clicked()
            {
                state.define_transfer_function();
            }
        });
    state.tf_dialog.open &= open;
}

pub fn response_window(ctx: &egui::Context, state: &mut AppState) {
    let mut open = state.response_dialog.open;
    egui::Window::new("Input response")
        .open(&mut open)
        .show(ctx, |ui: &mut Ui| {
            let d = &mut state.response_dialog;
            egui::Grid::new("response_grid").num_columns(2).show(ui, |ui: &mut Ui| {
                ui.label("Name");
                ui.text_edit_singleline(&mut d.title);
                ui.end_row();
                ui.label("u(t) =");
                ui.text_edit_singleline(&mut d.input);
                ui.end_row();
                ui.label("Start / stop");
                ui.horizontal(|ui: &mut Ui| {
                    ui.add(egui::DragValue::new(&mut d.start).speed(0.1));
                    ui.add(egui::DragValue::new(&mut d.stop).speed(0.1));
                });
                ui.end_row();
                ui.label("Samples");
                ui.add(egui::DragValue::new(&mut d.samples).range(2..=1_000_000));
                ui.end_row();
            });
            if ui.button("Simulate").clicked() {
                state.add_response();
            }
        });
    state.response_dialog.open &= open;
}

pub fn case_window(ctx: &egui::Context, state: &mut AppState) {
    let Some(fields) = state
        .selected_dataset
        .and_then(|id| state.session.dataset(id))
        .map(|ds| ds.fields().to_vec())
    else {
        return;
    };
    let last_plot = state.session.settings.plot_count.max(1) - 1;

    let mut open = state.case_dialog.open;
    let mut create = false;
    egui::Window::new("Datalines per case")
        .open(&mut open)
        .show(ctx, |ui: &mut Ui| {
            let dialog = &mut state.case_dialog;
            let Some(t) = dialog.template.as_mut() else {
                return;
            };
            egui::Grid::new("case_grid").num_columns(2).show(ui, |ui: &mut Ui| {
                ui.label("Cases");
                ui.horizontal(|ui: &mut Ui| {
                    ui.add(egui::DragValue::new(&mut dialog.first));
                    ui.label("to");
                    ui.add(egui::DragValue::new(&mut dialog.last));
                });
                ui.end_row();
                ui.label("x");
                field_combo(ui, "case_x", &mut t.x_field, &fields);
                ui.end_row();
                ui.label("y");
                field_combo(ui, "case_y", &mut t.y_field, &fields);
                ui.end_row();
                ui.label("Transform");
                choice(ui, "case_transform", &mut t.transform, &TransformKind::ALL, |k| {
                    k.label().to_string()
                });
                ui.end_row();
                ui.label("Line");
                choice(ui, "case_style", &mut t.line_style, &LineStyle::ALL, |s| format!("{s:?}"));
                ui.end_row();
                ui.label("Marker");
                choice(ui, "case_marker", &mut t.marker, &MarkerStyle::ALL, |m| format!("{m:?}"));
                ui.end_row();
                ui.label("Plot");
                ui.add(egui::DragValue::new(&mut t.plot).range(0..=last_plot));
                ui.end_row();
                ui.label("Colour");
                ui.horizontal(|ui: &mut Ui| {
                    let mut palette = t.coloring == CaseColoring::Palette;
                    if ui.checkbox(&mut palette, "Palette").changed() {
                        t.coloring = if palette {
                            CaseColoring::Palette
                        } else {
                            CaseColoring::Fixed(DEFAULT_COLOR.to_string())
                        };
                    }
                    if let CaseColoring::Fixed(hex) = &mut t.coloring {
                        color_button(ui, hex);
                    }
                });
                ui.end_row();
            });
            ui.checkbox(&mut t.name_from_case_labels, "Name from case labels");
            ui.checkbox(&mut t.in_legend, "Show in legend");
            create = ui.button("Create").clicked();
        });
    state.case_dialog.open &= open;
    if create {
        state.create_case_datalines();
    }
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn import_dialog(state: &mut AppState) {
    let files = rfd::FileDialog::new()
        .set_title("Import traces")
        .add_filter("Supported files", &["raw", "txt", "csv"])
        .add_filter("SPICE raw", &["raw"])
        .add_filter("Text export", &["txt"])
        .add_filter("CSV", &["csv"])
        .pick_files();

    if let Some(paths) = files {
        state.import_paths(&paths);
    }
}

fn open_session_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open session")
        .add_filter("Session", &["json"])
        .pick_file();
    if let Some(path) = file {
        state.load_session(&path);
    }
}

fn save_session_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Save session")
        .add_filter("Session", &["json"])
        .set_file_name("session.json")
        .save_file();
    if let Some(path) = file {
        state.save_session(&path);
    }
}
