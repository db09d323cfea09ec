pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 480;
/// Bytes per native panel row.
pub const ROW_BYTES: usize = (WIDTH as usize).div_ceil(8);
pub const BUFFER_SIZE: usize = ROW_BYTES * HEIGHT as usize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Parses a clockwise quarter turn given in degrees.
    pub const fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Logical (width, height) seen by drawing code under this rotation.
    #[must_use]
    pub const fn logical_size(self) -> (i32, i32) {
        match self {
            Rotation::Deg0 | Rotation::Deg180 => (WIDTH as i32, HEIGHT as i32),
            Rotation::Deg90 | Rotation::Deg270 => (HEIGHT as i32, WIDTH as i32),
        }
    }

    /// Maps a logical coordinate onto the native panel grid.
    #[must_use]
    pub const fn to_native(self, x: i32, y: i32) -> (i32, i32) {
        let w = WIDTH as i32;
        let h = HEIGHT as i32;
        match self {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (w - 1 - y, x),
            Rotation::Deg180 => (w - 1 - x, h - 1 - y),
            Rotation::Deg270 => (y, h - 1 - x),
        }
    }
}
