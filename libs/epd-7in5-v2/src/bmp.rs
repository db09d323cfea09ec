//! Monochrome BMP blitting.
//!
//! Only uncompressed 1 bit per pixel, bottom-up files are accepted. Pixel rows
//! are located by walking backwards from two bytes before the declared end of
//! file, which is where the panel asset pipeline ends its pixel data.

use crate::canvas::Canvas;
use crate::error::{EpdResult, Error};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

pub const FILE_HEADER_LEN: usize = 14;
pub const INFO_HEADER_LEN: usize = 40;
const DATA_END_TRAILER: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapHeader {
    pub file_size: u32,
    pub data_offset: u32,
}

impl BitmapHeader {
    pub fn parse(bytes: &[u8; FILE_HEADER_LEN]) -> EpdResult<Self> {
        if &bytes[0..2] != b"BM" {
            return Err(Error::MalformedBitmap("missing BM signature".into()));
        }
        Ok(Self {
            file_size: le_u32(bytes, 2),
            data_offset: le_u32(bytes, 10),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapInfo {
    pub width: u32,
    pub height: u32,
    /// Bytes holding one row of pixels, without padding.
    pub width_in_bytes: usize,
    /// Bytes per stored row, padded to four.
    pub line_width: usize,
    /// Unused low bits in the last pixel byte of each row.
    pub last_byte_padding: u32,
}

impl BitmapInfo {
    pub fn parse(bytes: &[u8; INFO_HEADER_LEN]) -> EpdResult<Self> {
        let header_size = le_u32(bytes, 0);
        let width = le_i32(bytes, 4);
        let height = le_i32(bytes, 8);
        let planes = le_u16(bytes, 12);
        let bits_per_pixel = le_u16(bytes, 14);
        let compression = le_u32(bytes, 16);

        if (header_size as usize) < INFO_HEADER_LEN {
            return Err(Error::UnsupportedBitmap(format!(
                "{header_size} byte info header"
            )));
        }
        if bits_per_pixel != 1 || planes != 1 {
            return Err(Error::UnsupportedBitmap(format!(
                "{bits_per_pixel} bits per pixel across {planes} planes"
            )));
        }
        if compression != 0 {
            return Err(Error::UnsupportedBitmap(format!(
                "compression method {compression}"
            )));
        }
        if height < 0 {
            return Err(Error::UnsupportedBitmap("top-down row order".into()));
        }
        if width <= 0 || height == 0 {
            return Err(Error::MalformedBitmap(format!(
                "image size {width}x{height}"
            )));
        }

        let width = width.cast_unsigned();
        let height = height.cast_unsigned();
        Ok(Self {
            width,
            height,
            width_in_bytes: width.div_ceil(8) as usize,
            line_width: width.div_ceil(32) as usize * 4,
            last_byte_padding: (8 - width % 8) % 8,
        })
    }
}

/// Outcome of a best-effort bitmap draw.
///
/// Rows already blitted stay in the buffer when decoding fails part way.
#[derive(Debug)]
pub struct BmpDraw {
    pub rows_drawn: u32,
    pub failure: Option<Error>,
}

impl BmpDraw {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

impl Canvas<'_> {
    pub fn draw_bmp(&mut self, path: impl AsRef<Path>) -> BmpDraw {
        self.draw_bmp_at(0, 0, path)
    }

    /// Draws the bitmap file at `path` with its top-left corner at (x, y).
    ///
    /// Failures are logged and reported in the returned [`BmpDraw`], never
    /// propagated.
    pub fn draw_bmp_at(&mut self, x: i32, y: i32, path: impl AsRef<Path>) -> BmpDraw {
        let path = path.as_ref();
        if x >= self.width() || y >= self.height() {
            return BmpDraw {
                rows_drawn: 0,
                failure: None,
            };
        }
        match File::open(path) {
            Ok(file) => {
                debug!("BMP: drawing {} at ({x}, {y})", path.display());
                self.draw_bmp_from(x, y, BufReader::new(file))
            }
            Err(e) => {
                warn!("BMP: cannot open {}: {e}", path.display());
                BmpDraw {
                    rows_drawn: 0,
                    failure: Some(e.into()),
                }
            }
        }
    }

    pub fn draw_bmp_from<R: Read + Seek>(&mut self, x: i32, y: i32, mut reader: R) -> BmpDraw {
        let mut rows_drawn = 0;
        let result = self.blit_bmp(x, y, &mut reader, &mut rows_drawn);
        if let Err(e) = &result {
            warn!("BMP: decode stopped after {rows_drawn} rows: {e}");
        }
        BmpDraw {
            rows_drawn,
            failure: result.err(),
        }
    }

    fn blit_bmp<R: Read + Seek>(
        &mut self,
        x: i32,
        y: i32,
        reader: &mut R,
        rows_drawn: &mut u32,
    ) -> EpdResult<()> {
        if x >= self.width() || y >= self.height() {
            return Ok(());
        }

        let mut file_header = [0u8; FILE_HEADER_LEN];
        reader.read_exact(&mut file_header)?;
        let header = BitmapHeader::parse(&file_header)?;
        let mut info_header = [0u8; INFO_HEADER_LEN];
        reader.read_exact(&mut info_header)?;
        let info = BitmapInfo::parse(&info_header)?;

        let data_end = u64::from(header.file_size)
            .checked_sub(DATA_END_TRAILER)
            .ok_or_else(|| Error::MalformedBitmap("file size smaller than trailer".into()))?;

        // Visible image columns and rows after clipping against the canvas.
        let (x, y) = (i64::from(x), i64::from(y));
        let col_start = (-x).max(0);
        let col_end = i64::from(info.width).min(i64::from(self.width()) - x);
        let row_start = (-y).max(0);
        let row_end = i64::from(info.height).min(i64::from(self.height()) - y);
        if col_start >= col_end || row_start >= row_end {
            return Ok(());
        }

        let byte_start = (col_start / 8) as usize;
        let byte_end = (col_end as usize).div_ceil(8);
        let mut line = vec![0u8; byte_end - byte_start];
        let pad_mask = (0xFFu16 << info.last_byte_padding) as u8;

        for row in row_start..row_end {
            // Rows are found walking back from the end, so a header claiming
            // too many rows runs into the palette part way down the image.
            let row_offset = data_end
                .checked_sub((row as u64 + 1) * info.line_width as u64)
                .filter(|&offset| offset >= u64::from(header.data_offset))
                .ok_or_else(|| {
                    Error::MalformedBitmap(format!(
                        "row {row} lies before the pixel data at offset {}",
                        header.data_offset
                    ))
                })?;
            reader.seek(SeekFrom::Start(row_offset + byte_start as u64))?;
            reader.read_exact(&mut line)?;

            if info.last_byte_padding > 0 && byte_end == info.width_in_bytes {
                if let Some(last) = line.last_mut() {
                    *last &= pad_mask;
                }
            }

            for (k, &byte) in line.iter().enumerate() {
                if byte == 0 {
                    continue;
                }
                let base = ((byte_start + k) * 8) as i64;
                for bit in 0..8 {
                    let col = base + bit;
                    if col < col_start || col >= col_end || byte & (0x80 >> bit) == 0 {
                        continue;
                    }
                    self.set_pixel((x + col) as i32, (y + row) as i32);
                }
            }
            *rows_drawn += 1;
        }
        Ok(())
    }
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn le_i32(bytes: &[u8], at: usize) -> i32 {
    le_u32(bytes, at).cast_signed()
}
