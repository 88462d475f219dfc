use eframe::egui::{self, Color32, DragValue, RichText, ScrollArea, Ui};

use natality_weeks::data::filter::Interval;
use natality_weeks::data::model::{bmi_label, education_label};
use natality_weeks::report::chart::save_chart;
use natality_weeks::report::export::{WeeklyExport, write_json};
use natality_weeks::report::summary::thousands;

use crate::state::{AppState, CodeField};

const AGE_LIMITS: std::ops::RangeInclusive<u8> = 10..=64;
const WEEK_LIMITS: std::ops::RangeInclusive<u8> = 17..=47;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            age_controls(ui, state);
            ui.separator();
            week_controls(ui, state);
            ui.separator();
            code_group(ui, state, CodeField::Bmi, "BMI category", bmi_label);
            code_group(ui, state, CodeField::Education, "Education", education_label);
        });
}

fn range_editor(ui: &mut Ui, range: &mut Interval, limits: std::ops::RangeInclusive<u8>) -> bool {
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        changed |= ui
            .add(DragValue::new(&mut range.min).range(limits.clone()).prefix("from "))
            .changed();
        changed |= ui
            .add(DragValue::new(&mut range.max).range(limits).prefix("to "))
            .changed();
    });
    changed
}

fn age_controls(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Mother's age");
    let mut enabled = state.filter.age.is_some();
    let mut range = state.filter.age.unwrap_or(Interval { min: 39, max: 42 });

    let mut changed = ui.checkbox(&mut enabled, "Restrict age").changed();
    ui.add_enabled_ui(enabled, |ui: &mut Ui| {
        changed |= range_editor(ui, &mut range, AGE_LIMITS);
    });

    if changed {
        state.set_age(enabled.then_some(range));
    }
}

fn week_controls(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Gestational weeks");
    let mut range = state.filter.weeks;
    if range_editor(ui, &mut range, WEEK_LIMITS) {
        state.set_weeks(range);
    }
}

/// Collapsible checkbox list for one coded field.
fn code_group(
    ui: &mut Ui,
    state: &mut AppState,
    field: CodeField,
    title: &str,
    label: fn(u8) -> &'static str,
) {
    // Show count of selected / total in the header
    let n_selected = field
        .codes()
        .iter()
        .filter(|c| state.is_selected(field, **c))
        .count();
    let header_text = format!("{title}  ({n_selected}/{})", field.codes().len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(title)
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all(field);
                }
                if ui.small_button("None").clicked() {
                    state.select_none(field);
                }
            });

            for &code in field.codes() {
                let mut checked = state.is_selected(field, code);
                if ui
                    .checkbox(&mut checked, format!("{code}  {}", label(code)))
                    .changed()
                {
                    state.toggle_code(field, code);
                }
            }
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
            ui.add_enabled_ui(state.table.is_some(), |ui: &mut Ui| {
                if ui.button("Export weekly JSON…").clicked() {
                    export_json_dialog(state);
                    ui.close_menu();
                }
                if ui.button("Export chart PNG…").clicked() {
                    export_png_dialog(state);
                    ui.close_menu();
                }
            });
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            let population = state.table.as_ref().map_or(0, |t| t.population);
            ui.label(format!(
                "{} records loaded, population {}",
                thousands(ds.len() as u64),
                thousands(population)
            ));
        }
        if let Some(name) = state.source.as_ref().and_then(|p| p.file_name()) {
            ui.separator();
            ui.label(name.to_string_lossy().into_owned());
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open natality data")
        .add_filter("Supported files", &["txt", "parquet", "pq", "csv"])
        .add_filter("Fixed-width", &["txt"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("All files", &["*"])
        .pick_file();

    if let Some(path) = file {
        state.open(&path);
    }
}

fn export_json_dialog(state: &mut AppState) {
    let Some(table) = &state.table else { return };
    let Some(path) = rfd::FileDialog::new()
        .set_title("Export weekly table")
        .set_file_name("delivery_weeks.json")
        .add_filter("JSON", &["json"])
        .save_file()
    else {
        return;
    };

    if let Err(e) = write_json(&WeeklyExport::new(table, &state.filter), &path) {
        log::error!("Export failed: {e:#}");
        state.status_message = Some(format!("Error: {e:#}"));
    }
}

fn export_png_dialog(state: &mut AppState) {
    let Some(table) = &state.table else { return };
    let Some(path) = rfd::FileDialog::new()
        .set_title("Export chart")
        .set_file_name("delivery_analysis.png")
        .add_filter("PNG", &["png"])
        .save_file()
    else {
        return;
    };

    if let Err(e) = save_chart(table, &state.filter, &path) {
        log::error!("Export failed: {e:#}");
        state.status_message = Some(format!("Error: {e:#}"));
    }
}
