use palette::{Darken, Hsl, IntoColor, Srgb};

use crate::data::model::{DeliveryCategory, RouteFamily};

// ---------------------------------------------------------------------------
// Category styling shared by the PNG chart and the viewer
// ---------------------------------------------------------------------------

pub type Rgb8 = [u8; 3];

pub const WEEK_BAR: Rgb8 = [211, 211, 211];
pub const GRID: Rgb8 = [225, 225, 225];
pub const AXIS: Rgb8 = [90, 90, 90];
pub const BACKGROUND: Rgb8 = [255, 255, 255];

/// Fill colour per route family: light blue, light green, salmon.
pub fn family_color(family: RouteFamily) -> Rgb8 {
    match family {
        RouteFamily::Spontaneous => [173, 216, 230],
        RouteFamily::Operative => [144, 238, 144],
        RouteFamily::Cesarean => [250, 128, 114],
    }
}

/// How a category is drawn: induced categories share the family fill and
/// add diagonal hatching in a darker shade of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryStyle {
    pub fill: Rgb8,
    pub hatch: Option<Rgb8>,
}

pub fn category_style(category: DeliveryCategory) -> CategoryStyle {
    let fill = family_color(category.family());
    CategoryStyle {
        fill,
        hatch: category.is_induced().then(|| darken(fill, 0.4)),
    }
}

/// Darken an sRGB colour in HSL space.
pub fn darken(color: Rgb8, amount: f32) -> Rgb8 {
    let rgb = Srgb::new(color[0], color[1], color[2]).into_format::<f32>();
    let hsl: Hsl = rgb.into_color();
    let out: Srgb = hsl.darken(amount).into_color();
    let out = out.into_format::<u8>();
    [out.red, out.green, out.blue]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_induced_categories_are_hatched() {
        for category in DeliveryCategory::ALL {
            let style = category_style(category);
            assert_eq!(style.hatch.is_some(), category.is_induced());
            assert_eq!(style.fill, family_color(category.family()));
        }
    }

    #[test]
    fn test_darken_reduces_brightness() {
        let [r, g, b] = darken([250, 128, 114], 0.4);
        assert!(u32::from(r) + u32::from(g) + u32::from(b) < 250 + 128 + 114);
    }
}
