pub mod bmp;
pub mod buffer;
pub mod canvas;
pub mod common;
pub mod device;
pub mod display;
pub mod display_driver;
mod error;
pub mod font;
pub mod transport;

pub use bmp::BmpDraw;
pub use buffer::FrameBuffer;
pub use canvas::Canvas;
pub use common::{BUFFER_SIZE, HEIGHT, Rotation, WIDTH};
pub use device::{ChipSelect, Device, DeviceConfig, EpdResult, Error, LinuxDisplay};
pub use display::Display;
pub use display_driver::{Epd7in5v2, PowerState};
pub use font::GlyphTable;
pub use transport::Interface;
