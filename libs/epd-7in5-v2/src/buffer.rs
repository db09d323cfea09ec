use crate::canvas::Canvas;
use crate::common::{BUFFER_SIZE, HEIGHT, ROW_BYTES, Rotation, WIDTH};
use std::io::{self, Write};

/// Packed 1-bit frame in native panel orientation.
///
/// Bit 7 of each byte is the leftmost of its eight pixels; a set bit is a
/// black pixel. Bits are only ever set by drawing, never cleared.
pub struct FrameBuffer {
    bytes: Box<[u8]>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: vec![0x00; BUFFER_SIZE].into_boxed_slice(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True when no pixel is black.
    pub fn is_blank(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    /// Resets every pixel to white.
    pub fn clear(&mut self) {
        self.bytes.fill(0x00);
    }

    /// Drawing surface over this buffer with a fixed rotation.
    pub fn canvas(&mut self, rotation: Rotation) -> Canvas<'_> {
        Canvas::new(self, rotation)
    }

    /// Sets the bit for a native panel coordinate. Out-of-range points are
    /// ignored.
    pub fn set_absolute_pixel(&mut self, x: i32, y: i32) {
        if let Some((index, mask)) = bit_address(x, y) {
            self.bytes[index] |= mask;
        }
    }

    /// Whether the pixel at a native panel coordinate is black.
    pub fn is_set(&self, x: i32, y: i32) -> bool {
        bit_address(x, y).is_some_and(|(index, mask)| self.bytes[index] & mask != 0)
    }

    /// Number of black pixels.
    pub fn count_set(&self) -> u32 {
        self.bytes.iter().map(|b| b.count_ones()).sum()
    }

    /// Writes the frame as a binary PBM (P4) image.
    pub fn write_pbm<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write!(writer, "P4\n{WIDTH} {HEIGHT}\n")?;
        writer.write_all(&self.bytes)?;
        writer.flush()
    }
}

fn bit_address(x: i32, y: i32) -> Option<(usize, u8)> {
    let x = u32::try_from(x).ok().filter(|&x| x < WIDTH)?;
    let y = u32::try_from(y).ok().filter(|&y| y < HEIGHT)?;
    let index = y as usize * ROW_BYTES + (x as usize >> 3);
    Some((index, 0x80 >> (x & 7)))
}
