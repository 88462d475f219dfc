pub mod panels;
pub mod plot;

use eframe::egui::Color32;
use natality_weeks::color::Rgb8;

pub fn to_color32(color: Rgb8) -> Color32 {
    Color32::from_rgb(color[0], color[1], color[2])
}
