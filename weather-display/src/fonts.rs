// Font definitions for the weather screen

use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use epd_7in5_v2::GlyphTable;

// Small proportional font for the "updated" stamp
pub use u8g2_fonts::fonts::u8g2_font_helvR08_tf as FONT_STAMP;

/// Large digit tables for the main readings, baked once per run.
pub struct Fonts {
    /// 30x50, forecast strip
    pub small: GlyphTable,
    /// 40x80, indoor and outdoor readings
    pub medium: GlyphTable,
    /// 50x100, weekday and date
    pub large: GlyphTable,
}

impl Fonts {
    pub fn new() -> Self {
        let narrow = GlyphTable::from_mono_font(&FONT_6X10);
        let wide = GlyphTable::from_mono_font(&FONT_10X20);
        Self {
            small: narrow.scaled(5),
            medium: wide.scaled(4),
            large: wide.scaled(5),
        }
    }
}

impl Default for Fonts {
    fn default() -> Self {
        Self::new()
    }
}
