use crate::buffer::FrameBuffer;
use crate::common::Rotation;
use crate::font::GlyphTable;
use core::convert::Infallible;
use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, OriginDimensions, Pixel, Size},
};

// Distance beyond the canvas edges where line endpoints get clipped and past
// which a radius counts as wide.
const GUARD: i64 = 4096;

/// Rotated drawing surface over a [`FrameBuffer`].
///
/// Every primitive ends in the same per-pixel check, which drops points
/// outside the logical bounds and then maps them to native coordinates.
/// Coordinates anywhere in the `i32` range are accepted.
/// Drawing is additive: nothing here clears a pixel.
pub struct Canvas<'a> {
    buffer: &'a mut FrameBuffer,
    rotation: Rotation,
    width: i32,
    height: i32,
}

impl<'a> Canvas<'a> {
    pub fn new(buffer: &'a mut FrameBuffer, rotation: Rotation) -> Self {
        let (width, height) = rotation.logical_size();
        Self {
            buffer,
            rotation,
            width,
            height,
        }
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn set_pixel(&mut self, x: i32, y: i32) {
        self.plot(i64::from(x), i64::from(y));
    }

    // Primitives work in i64 so offsets from any i32 coordinate stay exact.
    fn plot(&mut self, x: i64, y: i64) {
        let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
            return;
        };
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return;
        }
        let (x, y) = self.rotation.to_native(x, y);
        self.buffer.set_absolute_pixel(x, y);
    }

    /// Row `y` from `x0` up to but excluding `x1`, clipped to the canvas.
    fn span(&mut self, x0: i64, x1: i64, y: i64) {
        if y < 0 || y >= i64::from(self.height) {
            return;
        }
        for x in x0.max(0)..x1.min(i64::from(self.width)) {
            self.plot(x, y);
        }
    }

    /// Column `x` from `y0` up to but excluding `y1`, clipped to the canvas.
    fn column(&mut self, x: i64, y0: i64, y1: i64) {
        if x < 0 || x >= i64::from(self.width) {
            return;
        }
        for y in y0.max(0)..y1.min(i64::from(self.height)) {
            self.plot(x, y);
        }
    }

    /// Whether the pixel at a logical coordinate is black.
    pub fn is_set(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return false;
        }
        let (x, y) = self.rotation.to_native(x, y);
        self.buffer.is_set(x, y)
    }

    /// Bresenham line including both endpoints.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let Some((x0, y0, x1, y1)) = self.clip_line(
            i64::from(x0),
            i64::from(y0),
            i64::from(x1),
            i64::from(y1),
        ) else {
            return;
        };
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            self.plot(x, y);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Pulls endpoints lying beyond [`GUARD`] of the canvas back along the
    /// line. Lines with both ends inside the guard band are left untouched.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn clip_line(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> Option<(i64, i64, i64, i64)> {
        let (min_x, max_x) = (-GUARD, i64::from(self.width) + GUARD);
        let (min_y, max_y) = (-GUARD, i64::from(self.height) + GUARD);
        let inside =
            |x: i64, y: i64| (min_x..=max_x).contains(&x) && (min_y..=max_y).contains(&y);
        if inside(x0, y0) && inside(x1, y1) {
            return Some((x0, y0, x1, y1));
        }

        // Liang-Barsky
        let (dx, dy) = (x1 - x0, y1 - y0);
        let (mut enter, mut leave) = (0.0_f64, 1.0_f64);
        for (p, q) in [
            (-dx, x0 - min_x),
            (dx, max_x - x0),
            (-dy, y0 - min_y),
            (dy, max_y - y0),
        ] {
            if p == 0 {
                if q < 0 {
                    return None;
                }
                continue;
            }
            let t = q as f64 / p as f64;
            if p < 0 {
                enter = enter.max(t);
            } else {
                leave = leave.min(t);
            }
        }
        if enter > leave {
            return None;
        }
        let at = |t: f64| {
            (
                x0 + (t * dx as f64).round() as i64,
                y0 + (t * dy as f64).round() as i64,
            )
        };
        let ((ax, ay), (bx, by)) = (at(enter), at(leave));
        Some((ax, ay, bx, by))
    }

    pub fn draw_horizontal_line(&mut self, x: i32, y: i32, width: i32) {
        let x = i64::from(x);
        self.span(x, x + i64::from(width), i64::from(y));
    }

    pub fn draw_vertical_line(&mut self, x: i32, y: i32, height: i32) {
        let y = i64::from(y);
        self.column(i64::from(x), y, y + i64::from(height));
    }

    /// Outline of the closed rectangle spanned by two corners.
    pub fn draw_rectangle(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let (min_x, max_x) = (i64::from(x0.min(x1)), i64::from(x0.max(x1)));
        let (min_y, max_y) = (i64::from(y0.min(y1)), i64::from(y0.max(y1)));
        self.span(min_x, max_x + 1, min_y);
        self.span(min_x, max_x + 1, max_y);
        self.column(min_x, min_y, max_y + 1);
        self.column(max_x, min_y, max_y + 1);
    }

    /// Fills the closed rectangle spanned by two corners.
    pub fn draw_filled_rectangle(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let min_x = i64::from(x0.min(x1)).max(0);
        let max_x = i64::from(x0.max(x1)).min(i64::from(self.width) - 1);
        let (min_y, max_y) = (i64::from(y0.min(y1)), i64::from(y0.max(y1)));
        for x in min_x..=max_x {
            self.column(x, min_y, max_y + 1);
        }
    }

    pub fn draw_circle(&mut self, x: i32, y: i32, radius: i32) {
        self.circle(i64::from(x), i64::from(y), i64::from(radius), false);
    }

    pub fn draw_filled_circle(&mut self, x: i32, y: i32, radius: i32) {
        self.circle(i64::from(x), i64::from(y), i64::from(radius), true);
    }

    fn circle(&mut self, x: i64, y: i64, radius: i64, filled: bool) {
        let (width, height) = (i64::from(self.width), i64::from(self.height));
        if x >= width || y >= height || radius < 0 {
            return;
        }
        if x + radius < 0 || y + radius < 0 {
            return;
        }
        if radius > GUARD {
            self.wide_circle(x, y, radius, filled);
            return;
        }

        // Midpoint circle walked one quadrant at a time, mirrored four ways.
        let mut x_pos = -radius;
        let mut y_pos = 0;
        let mut err = 2 - 2 * radius;

        loop {
            self.plot(x - x_pos, y + y_pos);
            self.plot(x + x_pos, y + y_pos);
            self.plot(x + x_pos, y - y_pos);
            self.plot(x - x_pos, y - y_pos);
            if filled {
                self.span(x + x_pos, x - x_pos + 1, y + y_pos);
                self.span(x + x_pos, x - x_pos + 1, y - y_pos);
            }

            let mut e2 = err;
            if e2 <= y_pos {
                y_pos += 1;
                err += y_pos * 2 + 1;
                if -x_pos == y_pos && e2 <= x_pos {
                    e2 = 0;
                }
            }
            if e2 > x_pos {
                x_pos += 1;
                err += x_pos * 2 + 1;
            }
            if x_pos > 0 {
                break;
            }
        }
    }

    // Radii past the guard band are solved per canvas row and column instead
    // of walking the whole circumference.
    fn wide_circle(&mut self, x: i64, y: i64, radius: i64, filled: bool) {
        let r2 = i128::from(radius).pow(2);
        let half = |offset: i64| {
            let d2 = i128::from(offset).pow(2);
            (d2 <= r2).then(|| i64::try_from((r2 - d2).isqrt()).unwrap_or(i64::MAX))
        };

        for row in 0..i64::from(self.height) {
            let Some(h) = half(row - y) else { continue };
            if filled {
                self.span(x - h, x + h + 1, row);
            } else {
                self.plot(x - h, row);
                self.plot(x + h, row);
            }
        }
        if !filled {
            for col in 0..i64::from(self.width) {
                let Some(h) = half(col - x) else { continue };
                self.plot(col, y - h);
                self.plot(col, y + h);
            }
        }
    }

    /// Composites one glyph with its top-left corner at (x, y). Only set
    /// glyph bits are drawn. Characters missing from the table draw nothing.
    pub fn draw_char_at(&mut self, x: i32, y: i32, ch: char, font: &GlyphTable) {
        self.glyph(i64::from(x), i64::from(y), ch, font);
    }

    fn glyph(&mut self, x: i64, y: i64, ch: char, font: &GlyphTable) {
        let Some(glyph) = font.glyph(ch) else {
            return;
        };
        let row_bytes = font.row_bytes();
        for (j, row) in (0..font.height()).zip(glyph.chunks_exact(row_bytes)) {
            for i in 0..font.width() {
                let byte = row[(i >> 3) as usize];
                if byte & (0x80 >> (i & 7)) != 0 {
                    self.plot(x + i64::from(i), y + i64::from(j));
                }
            }
        }
    }

    /// Lays glyphs out left to right at the font's fixed advance.
    pub fn draw_string_at(&mut self, x: i32, y: i32, text: &str, font: &GlyphTable) {
        let advance = i64::from(font.width());
        let mut column = i64::from(x);
        for ch in text.chars() {
            if column >= i64::from(self.width) {
                break;
            }
            self.glyph(column, i64::from(y), ch, font);
            column += advance;
        }
    }
}

impl DrawTarget for Canvas<'_> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            if color.is_on() {
                self.set_pixel(coord.x, coord.y);
            }
        }
        Ok(())
    }
}

impl OriginDimensions for Canvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.width.cast_unsigned(), self.height.cast_unsigned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{HEIGHT, WIDTH};
    use embedded_graphics::{
        prelude::{Point, Primitive},
        primitives::{Line, PrimitiveStyle},
        Drawable,
    };

    const ROTATIONS: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    fn set_points(buffer: &FrameBuffer) -> Vec<(i32, i32)> {
        let mut points = Vec::new();
        for y in 0..HEIGHT as i32 {
            for x in 0..WIDTH as i32 {
                if buffer.is_set(x, y) {
                    points.push((x, y));
                }
            }
        }
        points
    }

    #[test]
    fn set_pixel_ignores_out_of_bounds() {
        for rotation in ROTATIONS {
            let mut buffer = FrameBuffer::new();
            let mut canvas = buffer.canvas(rotation);
            let (w, h) = (canvas.width(), canvas.height());
            for (x, y) in [(-1, 0), (0, -1), (w, 0), (0, h), (w, h)] {
                canvas.set_pixel(x, y);
            }
            assert!(buffer.is_blank(), "{rotation:?} wrote an out-of-bounds pixel");
        }
    }

    #[test]
    fn set_pixel_reads_back_under_rotation() {
        for rotation in ROTATIONS {
            let mut buffer = FrameBuffer::new();
            let mut canvas = buffer.canvas(rotation);
            let (w, h) = (canvas.width(), canvas.height());
            for (x, y) in [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1), (17, 301)] {
                canvas.set_pixel(x, y);
                assert!(canvas.is_set(x, y), "{rotation:?} lost ({x}, {y})");
            }
            assert_eq!(buffer.count_set(), 5);
        }
    }

    #[test]
    fn filled_rectangle_sets_exactly_its_area() {
        for rotation in ROTATIONS {
            let mut buffer = FrameBuffer::new();
            let mut canvas = buffer.canvas(rotation);
            canvas.draw_filled_rectangle(30, 12, 3, 40);

            let mut expected: Vec<(i32, i32)> = (12..=40)
                .flat_map(|y| (3..=30).map(move |x| rotation.to_native(x, y)))
                .collect();
            expected.sort_by_key(|&(x, y)| (y, x));

            assert_eq!(set_points(&buffer), expected, "{rotation:?}");
        }
    }

    #[test]
    fn rectangle_outline_leaves_interior_clear() {
        let mut buffer = FrameBuffer::new();
        let mut canvas = buffer.canvas(Rotation::Deg0);
        canvas.draw_rectangle(10, 10, 20, 15);
        assert!(canvas.is_set(10, 10));
        assert!(canvas.is_set(20, 15));
        assert!(canvas.is_set(15, 10));
        assert!(canvas.is_set(10, 13));
        assert!(!canvas.is_set(15, 13));
        assert_eq!(buffer.count_set(), 2 * 11 + 2 * 4);
    }

    #[test]
    fn axis_aligned_lines_are_drawn_in_full() {
        let mut buffer = FrameBuffer::new();
        let mut canvas = buffer.canvas(Rotation::Deg0);
        canvas.draw_line(5, 5, 15, 5);
        canvas.draw_line(40, 30, 40, 20);
        for x in 5..=15 {
            assert!(canvas.is_set(x, 5));
        }
        for y in 20..=30 {
            assert!(canvas.is_set(40, y));
        }
        assert_eq!(buffer.count_set(), 22);
    }

    #[test]
    fn diagonal_line_hits_both_endpoints() {
        let mut buffer = FrameBuffer::new();
        let mut canvas = buffer.canvas(Rotation::Deg0);
        canvas.draw_line(0, 0, 9, 3);
        assert!(canvas.is_set(0, 0));
        assert!(canvas.is_set(9, 3));
        // One pixel per column for a shallow line.
        assert_eq!(buffer.count_set(), 10);
    }

    #[test]
    fn single_point_line() {
        let mut buffer = FrameBuffer::new();
        buffer.canvas(Rotation::Deg0).draw_line(7, 7, 7, 7);
        assert_eq!(set_points(&buffer), vec![(7, 7)]);
    }

    #[test]
    fn drawing_never_clears_earlier_bits() {
        let mut buffer = FrameBuffer::new();
        let mut canvas = buffer.canvas(Rotation::Deg0);
        canvas.draw_filled_rectangle(0, 0, 10, 10);
        canvas.draw_line(20, 0, 20, 30);
        canvas.draw_filled_circle(5, 5, 3);
        for y in 0..=10 {
            for x in 0..=10 {
                assert!(canvas.is_set(x, y), "({x}, {y}) was cleared");
            }
        }
    }

    #[test]
    fn circle_outline_is_symmetric_and_hollow() {
        let mut buffer = FrameBuffer::new();
        let mut canvas = buffer.canvas(Rotation::Deg0);
        let (cx, cy, r) = (100, 100, 10);
        canvas.draw_circle(cx, cy, r);

        assert!(canvas.is_set(cx + r, cy));
        assert!(canvas.is_set(cx - r, cy));
        assert!(canvas.is_set(cx, cy + r));
        assert!(canvas.is_set(cx, cy - r));
        assert!(!canvas.is_set(cx, cy));
        assert!(!canvas.is_set(cx + 3, cy + 3));

        for (x, y) in set_points(&buffer) {
            let (dx, dy) = (x - cx, y - cy);
            for (mx, my) in [(-dx, dy), (dx, -dy), (-dx, -dy)] {
                assert!(buffer.is_set(cx + mx, cy + my), "missing mirror of ({x}, {y})");
            }
        }
    }

    #[test]
    fn filled_circle_is_solid_and_symmetric() {
        let mut buffer = FrameBuffer::new();
        let mut canvas = buffer.canvas(Rotation::Deg0);
        let (cx, cy, r) = (200, 150, 12);
        canvas.draw_filled_circle(cx, cy, r);

        for (dx, dy) in [(0, 0), (5, 5), (-5, 5), (0, -11), (11, 0)] {
            assert!(canvas.is_set(cx + dx, cy + dy), "hole at offset ({dx}, {dy})");
        }
        assert!(!canvas.is_set(cx + r + 1, cy));

        let points = set_points(&buffer);
        for &(x, y) in &points {
            let (dx, dy) = (x - cx, y - cy);
            assert!(dx * dx + dy * dy <= (r + 1) * (r + 1), "({x}, {y}) outside disc");
            for (mx, my) in [(-dx, dy), (dx, -dy), (-dx, -dy)] {
                assert!(buffer.is_set(cx + mx, cy + my));
            }
        }

        let mut outline = FrameBuffer::new();
        outline.canvas(Rotation::Deg0).draw_circle(cx, cy, r);
        for (x, y) in set_points(&outline) {
            assert!(buffer.is_set(x, y), "filled circle misses outline ({x}, {y})");
        }
    }

    #[test]
    fn circle_with_center_past_bounds_is_skipped() {
        let mut buffer = FrameBuffer::new();
        let mut canvas = buffer.canvas(Rotation::Deg0);
        canvas.draw_filled_circle(805, 10, 20);
        canvas.draw_circle(10, 480, 20);
        assert!(buffer.is_blank());
    }

    #[test]
    fn circle_partially_off_canvas_is_clipped() {
        let mut buffer = FrameBuffer::new();
        buffer.canvas(Rotation::Deg0).draw_filled_circle(0, 0, 5);
        assert!(buffer.is_set(0, 0));
        assert!(buffer.is_set(5, 0));
        assert!(!buffer.is_set(6, 0));
    }

    #[test]
    fn lines_between_extreme_coordinates_are_clipped() {
        let mut buffer = FrameBuffer::new();
        buffer
            .canvas(Rotation::Deg0)
            .draw_line(i32::MIN, 100, i32::MAX, 100);
        assert_eq!(buffer.count_set(), WIDTH);
        assert!(buffer.is_set(0, 100) && buffer.is_set(799, 100));

        let mut buffer = FrameBuffer::new();
        buffer
            .canvas(Rotation::Deg0)
            .draw_line(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(buffer.count_set(), HEIGHT);
        assert!(buffer.is_set(0, 0) && buffer.is_set(479, 479));
        assert!(!buffer.is_set(480, 479));
    }

    #[test]
    fn spans_and_rectangles_accept_the_full_i32_range() {
        let mut buffer = FrameBuffer::new();
        let mut canvas = buffer.canvas(Rotation::Deg0);
        canvas.draw_horizontal_line(i32::MAX, 0, i32::MAX);
        canvas.draw_vertical_line(0, i32::MIN, i32::MAX);
        assert!(buffer.is_blank());

        let mut canvas = buffer.canvas(Rotation::Deg0);
        canvas.draw_vertical_line(3, -10, i32::MAX);
        assert_eq!(buffer.count_set(), HEIGHT);

        let mut buffer = FrameBuffer::new();
        buffer
            .canvas(Rotation::Deg0)
            .draw_rectangle(i32::MIN, 10, i32::MAX, 20);
        assert_eq!(buffer.count_set(), 2 * WIDTH);

        let mut buffer = FrameBuffer::new();
        buffer
            .canvas(Rotation::Deg270)
            .draw_filled_rectangle(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(buffer.count_set(), WIDTH * HEIGHT);
    }

    #[test]
    fn huge_circles_are_clipped() {
        let mut buffer = FrameBuffer::new();
        let mut canvas = buffer.canvas(Rotation::Deg0);
        canvas.draw_circle(400, 240, i32::MAX);
        canvas.draw_filled_circle(i32::MIN, i32::MIN, i32::MAX);
        assert!(buffer.is_blank());

        buffer.canvas(Rotation::Deg0).draw_filled_circle(400, 240, i32::MAX);
        assert_eq!(buffer.count_set(), WIDTH * HEIGHT);

        // Only the rightmost edge of this circle reaches the canvas.
        let mut buffer = FrameBuffer::new();
        buffer.canvas(Rotation::Deg0).draw_circle(-5000, 240, 5010);
        assert!(buffer.is_set(10, 240));
        assert!(!buffer.is_set(11, 240));
        assert!(!buffer.is_set(0, 0));
    }

    #[test]
    fn text_at_the_edge_of_the_i32_range_draws_nothing() {
        let font = GlyphTable::new(vec![0x00, 0x00, 0x80, 0x80], 3, 2).unwrap();
        let mut buffer = FrameBuffer::new();
        let mut canvas = buffer.canvas(Rotation::Deg0);
        canvas.draw_string_at(i32::MAX - 2, 0, "!!!!", &font);
        canvas.draw_char_at(i32::MAX, i32::MAX, '!', &font);
        canvas.draw_string_at(i32::MIN, 0, "!!!!", &font);
        assert!(buffer.is_blank());
    }

    #[test]
    fn glyphs_composite_without_background() {
        // 3x2 glyphs for ' ' and '!': '!' has its left column set.
        let font = GlyphTable::new(vec![0x00, 0x00, 0x80, 0x80], 3, 2).unwrap();
        let mut buffer = FrameBuffer::new();
        let mut canvas = buffer.canvas(Rotation::Deg0);
        canvas.set_pixel(1, 0);
        canvas.draw_string_at(0, 0, "!!", &font);

        assert!(canvas.is_set(0, 0));
        assert!(canvas.is_set(0, 1));
        assert!(canvas.is_set(3, 0));
        assert!(canvas.is_set(3, 1));
        // Pixel drawn before the text survives.
        assert!(canvas.is_set(1, 0));
        assert_eq!(buffer.count_set(), 5);
    }

    #[test]
    fn unknown_characters_still_advance() {
        let font = GlyphTable::new(vec![0x00, 0x00, 0x80, 0x80], 3, 2).unwrap();
        let mut buffer = FrameBuffer::new();
        buffer.canvas(Rotation::Deg0).draw_string_at(0, 0, "é!", &font);
        assert!(buffer.is_set(3, 0));
        assert!(!buffer.is_set(0, 0));
    }

    #[test]
    fn embedded_graphics_on_pixels_are_drawn() {
        let mut buffer = FrameBuffer::new();
        let mut canvas = buffer.canvas(Rotation::Deg90);
        Line::new(Point::new(0, 0), Point::new(0, 9))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut canvas)
            .unwrap();
        Line::new(Point::new(1, 0), Point::new(1, 9))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::Off, 1))
            .draw(&mut canvas)
            .unwrap();
        assert_eq!(canvas.size(), Size::new(480, 800));
        for y in 0..10 {
            assert!(canvas.is_set(0, y));
            assert!(!canvas.is_set(1, y));
        }
    }
}
