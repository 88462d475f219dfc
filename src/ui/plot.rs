use std::ops::RangeInclusive;

use eframe::egui::{Stroke, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, GridMark, Legend, Plot};

use natality_weeks::analysis::WeeklyTable;
use natality_weeks::color::{self, category_style};
use natality_weeks::data::model::DeliveryCategory;
use natality_weeks::report::summary::thousands;

use super::to_color32;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Delivery charts (central panel)
// ---------------------------------------------------------------------------

fn percent_axis(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    format!("{:.1}%", mark.value)
}

/// Render both charts and the weekly table in the central panel.
pub fn delivery_plots(ui: &mut Ui, state: &AppState) {
    let table = match &state.table {
        Some(t) => t,
        None => {
            let hint = if state.dataset.is_some() {
                "Fix the filter to view deliveries"
            } else {
                "Open a natality file to view deliveries  (File → Open…)"
            };
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading(hint);
            });
            return;
        }
    };

    ui.heading(state.filter.describe());
    ui.label(format!(
        "Total population ({}+ weeks): {}",
        table.weeks.min,
        thousands(table.population)
    ));

    let height = ui.available_height();
    weekly_plot(ui, table, height * 0.28);
    ui.add_space(8.0);
    category_plot(ui, table, height * 0.45);

    eframe::egui::CollapsingHeader::new("Weekly statistics")
        .default_open(false)
        .show(ui, |ui: &mut Ui| weekly_table(ui, table));
}

/// Top chart: share of the population delivering in each week.
fn weekly_plot(ui: &mut Ui, table: &WeeklyTable, height: f32) {
    let bars: Vec<Bar> = table
        .rows
        .iter()
        .map(|row| Bar::new(f64::from(row.week), table.week_percent(row)).width(0.8))
        .collect();
    let chart = BarChart::new(bars)
        .color(to_color32(color::WEEK_BAR))
        .name("All deliveries");

    Plot::new("weekly_probability")
        .height(height)
        .y_axis_label("Probability of Delivery (%)")
        .y_axis_formatter(percent_axis)
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

/// Bottom chart: the six categories stacked per week, in percent of population.
fn category_plot(ui: &mut Ui, table: &WeeklyTable, height: f32) {
    let mut charts: Vec<BarChart> = Vec::with_capacity(DeliveryCategory::ALL.len());

    for category in DeliveryCategory::ALL {
        let style = category_style(category);
        let fill = to_color32(style.fill);
        let bars: Vec<Bar> = table
            .rows
            .iter()
            .map(|row| {
                let bar = Bar::new(
                    f64::from(row.week),
                    table.category_percent(row, category),
                )
                .width(0.8);
                match style.hatch {
                    // egui_plot has no hatch fill; induced bars get a heavy outline instead
                    Some(hatch) => bar.fill(fill).stroke(Stroke::new(2.0, to_color32(hatch))),
                    None => bar,
                }
            })
            .collect();

        let below: Vec<&BarChart> = charts.iter().collect();
        let chart = BarChart::new(bars)
            .color(fill)
            .name(category.label())
            .stack_on(&below);
        charts.push(chart);
    }

    Plot::new("delivery_methods")
        .height(height)
        .legend(Legend::default())
        .x_axis_label("Gestational Week")
        .y_axis_label("% of Total Population")
        .y_axis_formatter(percent_axis)
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

/// Per-week counts, mirroring the console report.
fn weekly_table(ui: &mut Ui, table: &WeeklyTable) {
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto())
        .columns(Column::auto().at_least(60.0), 2 + DeliveryCategory::ALL.len())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("Week");
            });
            header.col(|ui| {
                ui.strong("Births");
            });
            header.col(|ui| {
                ui.strong("% of population");
            });
            for category in DeliveryCategory::ALL {
                header.col(|ui| {
                    ui.strong(category.label());
                });
            }
        })
        .body(|mut body| {
            for row in &table.rows {
                body.row(18.0, |mut cells| {
                    cells.col(|ui| {
                        ui.label(row.week.to_string());
                    });
                    cells.col(|ui| {
                        ui.label(thousands(row.births()));
                    });
                    cells.col(|ui| {
                        ui.label(format!("{:.1}%", table.week_percent(row)));
                    });
                    for (category, count) in row.counts.iter() {
                        cells.col(|ui| {
                            ui.label(format!(
                                "{} ({:.1}%)",
                                thousands(count),
                                table.category_percent(row, category)
                            ));
                        });
                    }
                });
            }
        });
}
