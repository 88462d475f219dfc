use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow, bail};
use image::{ImageFormat, Rgb, RgbImage};
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};

use crate::analysis::WeeklyTable;
use crate::color::{self, Rgb8, category_style};
use crate::data::filter::RecordFilter;
use crate::data::model::DeliveryCategory;

// ---------------------------------------------------------------------------
// Two-panel delivery chart, drawn with plotters into an RGB buffer
// ---------------------------------------------------------------------------
//
//  ┌──────────────────────────────────┐
//  │ weekly share of population (grey)│  1/3 height
//  ├──────────────────────────────────┤
//  │ six stacked delivery categories  │  2/3 height     legend
//  └──────────────────────────────────┘

pub const WIDTH: u32 = 1500;
pub const HEIGHT: u32 = 1200;

const FONT: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

const LEGEND_WIDTH: i32 = 300;
const HALF_BAR: f64 = 0.4;
const HATCH_SPACING: u32 = 10;

/// Pixel rectangle that gets diagonal hatching after plotters is done.
#[derive(Debug, Clone, Copy)]
struct HatchArea {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
    color: Rgb8,
}

impl HatchArea {
    fn from_corners(a: (i32, i32), b: (i32, i32), color: Rgb8) -> Self {
        let clamp = |v: i32| u32::try_from(v).unwrap_or(0);
        HatchArea {
            x0: clamp(a.0.min(b.0)),
            y0: clamp(a.1.min(b.1)),
            x1: clamp(a.0.max(b.0)),
            y1: clamp(a.1.max(b.1)),
            color,
        }
    }
}

/// The chart font is compiled in, so rendering never depends on system fonts.
fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED
        .get_or_init(|| register_font(FONT, FontStyle::Normal, FONT_BYTES).is_ok());
    if !ok {
        bail!("bundled chart font could not be loaded");
    }
    Ok(())
}

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("drawing chart: {e}")
}

fn rgb(c: Rgb8) -> RGBColor {
    RGBColor(c[0], c[1], c[2])
}

fn headroom(max: f64) -> f64 {
    if max > 0.0 { max * 1.05 } else { 1.0 }
}

fn percent_label(y: &f64) -> String {
    format!("{y:.1}%")
}

/// Tick labels only on whole weeks.
fn week_label(x: &f64) -> String {
    if (x - x.round()).abs() < 1e-6 {
        format!("{:.0}", x)
    } else {
        String::new()
    }
}

/// Diagonal `///` lines over a rectangle.
fn hatch_rect(img: &mut RgbImage, area: HatchArea) {
    let (x1, y1) = (area.x1.min(img.width()), area.y1.min(img.height()));
    for y in area.y0..y1 {
        for x in area.x0..x1 {
            if (x + y) % HATCH_SPACING < 2 {
                img.put_pixel(x, y, Rgb(area.color));
            }
        }
    }
}

/// Render the two-panel chart for a weekly table. `filter` supplies the
/// population description in the title.
pub fn render_chart(table: &WeeklyTable, filter: &RecordFilter) -> Result<RgbImage> {
    ensure_font()?;

    let mut buf = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    let mut hatches: Vec<HatchArea> = Vec::new();
    {
        let root = BitMapBackend::with_buffer(&mut buf, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&rgb(color::BACKGROUND)).map_err(draw_err)?;
        let (upper, lower) = root.split_vertically((HEIGHT / 3) as i32);

        let x_range = f64::from(table.weeks.min) - 0.5..f64::from(table.weeks.max) + 0.5;
        let y_max = headroom(table.max_week_percent());
        let ticks = table.rows.len();

        let mut weekly = ChartBuilder::on(&upper)
            .caption(
                format!("Weekly Delivery Probability: {}", filter.describe()),
                (FONT, 24),
            )
            .margin(15)
            .margin_right(LEGEND_WIDTH)
            .x_label_area_size(35)
            .y_label_area_size(80)
            .build_cartesian_2d(x_range.clone(), 0f64..y_max)
            .map_err(draw_err)?;
        weekly
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(rgb(color::GRID).stroke_width(1))
            .axis_style(rgb(color::AXIS).stroke_width(2))
            .x_labels(ticks)
            .x_label_formatter(&week_label)
            .y_label_formatter(&percent_label)
            .y_desc("Probability of Delivery (%)")
            .label_style((FONT, 14))
            .axis_desc_style((FONT, 16))
            .draw()
            .map_err(draw_err)?;
        weekly
            .draw_series(table.rows.iter().map(|row| {
                let x = f64::from(row.week);
                Rectangle::new(
                    [(x - HALF_BAR, 0.0), (x + HALF_BAR, table.week_percent(row))],
                    rgb(color::WEEK_BAR).filled(),
                )
            }))
            .map_err(draw_err)?;

        let mut methods = ChartBuilder::on(&lower)
            .caption(
                "Delivery Method Distribution by Week (% of Total Population)",
                (FONT, 24),
            )
            .margin(15)
            .margin_right(LEGEND_WIDTH)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d(x_range, 0f64..y_max)
            .map_err(draw_err)?;
        methods
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(rgb(color::GRID).stroke_width(1))
            .axis_style(rgb(color::AXIS).stroke_width(2))
            .x_labels(ticks)
            .x_label_formatter(&week_label)
            .y_label_formatter(&percent_label)
            .x_desc("Gestational Week")
            .y_desc("% of Total Population")
            .label_style((FONT, 14))
            .axis_desc_style((FONT, 16))
            .draw()
            .map_err(draw_err)?;

        for row in &table.rows {
            let x = f64::from(row.week);
            let mut base = 0.0;
            for category in DeliveryCategory::ALL {
                let value = table.category_percent(row, category);
                if value <= 0.0 {
                    continue;
                }
                let style = category_style(category);
                let bottom_left = (x - HALF_BAR, base);
                let top_right = (x + HALF_BAR, base + value);
                methods
                    .draw_series(std::iter::once(Rectangle::new(
                        [bottom_left, top_right],
                        rgb(style.fill).filled(),
                    )))
                    .map_err(draw_err)?;
                if let Some(hatch) = style.hatch {
                    hatches.push(HatchArea::from_corners(
                        methods.backend_coord(&bottom_left),
                        methods.backend_coord(&top_right),
                        hatch,
                    ));
                }
                base += value;
            }
        }

        // legend, top entry = top of the stack
        let legend_x = WIDTH as i32 - LEGEND_WIDTH + 30;
        let legend_top = (HEIGHT / 3 + 80) as i32;
        for (i, category) in DeliveryCategory::ALL.iter().rev().enumerate() {
            let style = category_style(*category);
            let y = legend_top + i as i32 * 40;
            let corners = ((legend_x, y), (legend_x + 40, y + 24));
            root.draw(&Rectangle::new(
                [corners.0, corners.1],
                rgb(style.fill).filled(),
            ))
            .map_err(draw_err)?;
            if let Some(hatch) = style.hatch {
                hatches.push(HatchArea::from_corners(corners.0, corners.1, hatch));
            }
            root.draw(&Text::new(
                category.label(),
                (legend_x + 52, y + 4),
                (FONT, 16).into_font(),
            ))
            .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
    }

    let mut img = RgbImage::from_raw(WIDTH, HEIGHT, buf)
        .context("chart buffer does not match the image size")?;
    for area in hatches {
        hatch_rect(&mut img, area);
    }
    Ok(img)
}

/// Render and write the chart as PNG.
pub fn save_chart(table: &WeeklyTable, filter: &RecordFilter, path: &Path) -> Result<()> {
    let img = render_chart(table, filter)?;
    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("writing chart to {}", path.display()))?;
    log::info!("Wrote chart {}x{} to {}", WIDTH, HEIGHT, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tabulate::tabulate_records;
    use crate::data::model::{BirthRecord, DeliveryRoute, Induction};

    fn single_week_table(induction: Induction) -> WeeklyTable {
        let record = BirthRecord {
            mother_age: Some(40),
            bmi_category: Some(2),
            education: Some(7),
            gestation_weeks: Some(34),
            delivery_route: Some(DeliveryRoute::Cesarean),
            induction: Some(induction),
            ..Default::default()
        };
        tabulate_records(&[record], &RecordFilter::default())
    }

    fn count_pixels(img: &RgbImage, color: Rgb8) -> usize {
        img.pixels().filter(|p| p.0 == color).count()
    }

    #[test]
    fn test_bars_are_painted_in_category_colours() {
        let filter = RecordFilter::default();
        let salmon = category_style(DeliveryCategory::CesareanNotInduced).fill;

        let empty = render_chart(&WeeklyTable::empty(filter.weeks), &filter).unwrap();
        let full = render_chart(&single_week_table(Induction::NotInduced), &filter).unwrap();
        assert_eq!(full.dimensions(), (WIDTH, HEIGHT));

        // the empty chart only has legend swatches in salmon
        let legend_only = count_pixels(&empty, salmon);
        assert!(legend_only > 0);
        assert!(count_pixels(&full, salmon) > legend_only + 10_000);
    }

    #[test]
    fn test_induced_bars_are_hatched() {
        let filter = RecordFilter::default();
        let hatch = category_style(DeliveryCategory::CesareanInduced)
            .hatch
            .unwrap();

        let plain = render_chart(&single_week_table(Induction::NotInduced), &filter).unwrap();
        let induced = render_chart(&single_week_table(Induction::Induced), &filter).unwrap();
        assert!(count_pixels(&induced, hatch) > count_pixels(&plain, hatch) + 1_000);
    }

    #[test]
    fn test_titles_and_labels_are_drawn() {
        let filter = RecordFilter::default();
        let img = render_chart(&WeeklyTable::empty(filter.weeks), &filter).unwrap();
        let dark = |x0: u32, y0: u32, x1: u32, y1: u32| {
            (y0..y1)
                .flat_map(|y| (x0..x1).map(move |x| (x, y)))
                .filter(|&(x, y)| img.get_pixel(x, y).0.iter().all(|c| *c < 120))
                .count()
        };

        // caption band of the upper panel
        let plot_right = WIDTH - LEGEND_WIDTH as u32;
        assert!(dark(0, 0, plot_right, 50) > 100);
        // legend labels
        assert!(dark(plot_right + 80, HEIGHT / 3 + 70, WIDTH, HEIGHT / 3 + 330) > 100);
    }

    #[test]
    fn test_week_labels_only_on_whole_weeks() {
        assert_eq!(week_label(&39.0), "39");
        assert_eq!(week_label(&39.5), "");
        assert_eq!(percent_label(&12.345), "12.3%");
    }

    #[test]
    fn test_save_chart_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("delivery_analysis.png");
        let filter = RecordFilter::default();
        save_chart(&single_week_table(Induction::Induced), &filter, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
