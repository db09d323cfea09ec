use crate::error::{EpdResult, Error};
use core::convert::Infallible;
use embedded_graphics::{
    Drawable,
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, OriginDimensions, Pixel, Point, Size},
    text::{Baseline, Text},
};

const FIRST_CHAR: u32 = ' ' as u32;
const LAST_CHAR: u32 = '~' as u32;

/// Fixed-size glyph bitmaps indexed from the space character.
///
/// Each glyph is `height` rows of `ceil(width / 8)` bytes, MSB first.
#[derive(Clone, Debug)]
pub struct GlyphTable {
    data: Box<[u8]>,
    width: u32,
    height: u32,
}

impl GlyphTable {
    pub fn new(data: impl Into<Vec<u8>>, width: u32, height: u32) -> EpdResult<Self> {
        let data = data.into();
        if width == 0 || height == 0 {
            return Err(Error::MalformedFont(format!(
                "glyph size {width}x{height} is empty"
            )));
        }
        let glyph_len = glyph_len(width, height);
        if data.is_empty() || data.len() % glyph_len != 0 {
            return Err(Error::MalformedFont(format!(
                "{} bytes is not a whole number of {glyph_len} byte glyphs",
                data.len()
            )));
        }
        Ok(Self {
            data: data.into_boxed_slice(),
            width,
            height,
        })
    }

    /// Bakes printable ASCII from an embedded-graphics mono font.
    pub fn from_mono_font(font: &MonoFont<'_>) -> Self {
        let Size { width, height } = font.character_size;
        let glyph_len = glyph_len(width, height);
        let count = (LAST_CHAR - FIRST_CHAR + 1) as usize;
        let mut data = vec![0u8; glyph_len * count];
        let style = MonoTextStyle::new(font, BinaryColor::On);

        for (code, glyph) in (FIRST_CHAR..=LAST_CHAR).zip(data.chunks_exact_mut(glyph_len)) {
            let Some(ch) = char::from_u32(code) else {
                continue;
            };
            let mut encoded = [0u8; 4];
            let mut target = GlyphTarget {
                bits: glyph,
                width,
                height,
            };
            Text::with_baseline(
                ch.encode_utf8(&mut encoded),
                Point::zero(),
                style,
                Baseline::Top,
            )
            .draw(&mut target)
            .unwrap_or_else(|never| match never {});
        }

        Self {
            data: data.into_boxed_slice(),
            width,
            height,
        }
    }

    /// Pixel-replicates every glyph by an integer factor.
    #[must_use]
    pub fn scaled(&self, factor: u32) -> Self {
        let factor = factor.max(1);
        let width = self.width * factor;
        let height = self.height * factor;
        let src_row_bytes = self.row_bytes();
        let dst_row_bytes = width.div_ceil(8) as usize;
        let dst_glyph_len = glyph_len(width, height);
        let mut data = vec![0u8; self.glyph_count() * dst_glyph_len];

        for (src, dst) in self
            .data
            .chunks_exact(self.glyph_len())
            .zip(data.chunks_exact_mut(dst_glyph_len))
        {
            for y in 0..height {
                let src_row = &src[(y / factor) as usize * src_row_bytes..][..src_row_bytes];
                let dst_row = &mut dst[y as usize * dst_row_bytes..][..dst_row_bytes];
                for x in 0..width {
                    let sx = x / factor;
                    if src_row[(sx >> 3) as usize] & (0x80 >> (sx & 7)) != 0 {
                        dst_row[(x >> 3) as usize] |= 0x80 >> (x & 7);
                    }
                }
            }
        }

        Self {
            data: data.into_boxed_slice(),
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row_bytes(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    pub fn glyph_count(&self) -> usize {
        self.data.len() / self.glyph_len()
    }

    fn glyph_len(&self) -> usize {
        glyph_len(self.width, self.height)
    }

    /// Bitmap rows for `ch`, or `None` when the table does not cover it.
    pub fn glyph(&self, ch: char) -> Option<&[u8]> {
        let index = (ch as u32).checked_sub(FIRST_CHAR)? as usize;
        let len = self.glyph_len();
        self.data.get(index * len..(index + 1) * len)
    }

    /// Total advance of `text` in pixels.
    pub fn text_width(&self, text: &str) -> i32 {
        let chars = i32::try_from(text.chars().count()).unwrap_or(i32::MAX);
        chars.saturating_mul(self.width.cast_signed())
    }
}

fn glyph_len(width: u32, height: u32) -> usize {
    width.div_ceil(8) as usize * height as usize
}

struct GlyphTarget<'a> {
    bits: &'a mut [u8],
    width: u32,
    height: u32,
}

impl DrawTarget for GlyphTarget<'_> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let row_bytes = self.width.div_ceil(8) as usize;
        for Pixel(coord, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(coord.x), u32::try_from(coord.y)) else {
                continue;
            };
            if color.is_on() && x < self.width && y < self.height {
                self.bits[y as usize * row_bytes + (x >> 3) as usize] |= 0x80 >> (x & 7);
            }
        }
        Ok(())
    }
}

impl OriginDimensions for GlyphTarget<'_> {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}
