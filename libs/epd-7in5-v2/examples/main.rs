use chrono::Local;
use embedded_graphics::{
    mono_font::{MonoTextStyle, ascii::FONT_10X20},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Circle, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use epd_7in5_v2::{Device, DeviceConfig, GlyphTable, Rotation};

const TITLE_POS: Point = Point::new(20, 20);
const CLOCK_POS: Point = Point::new(20, 400);

fn main() -> epd_7in5_v2::EpdResult<()> {
    env_logger::init();
    log::info!("EPD_7in5_V2 Demo");

    // Optional monochrome bitmap to place on the right half.
    let bitmap = std::env::args().nth(1);

    let mut device = Device::new(DeviceConfig {
        rotation: Some(Rotation::Deg0),
        ..DeviceConfig::default()
    })?;
    device.display.initialize()?;

    log::info!("Clearing");
    device.display.clear_to_white()?;

    log::info!("Drawing");
    let big = GlyphTable::from_mono_font(&FONT_10X20).scaled(3);
    {
        let mut canvas = device.display.canvas();
        let width = canvas.width();
        let height = canvas.height();

        canvas.draw_rectangle(0, 0, width - 1, height - 1);
        canvas.draw_string_at(TITLE_POS.x, TITLE_POS.y, "Hello, e-Paper", &big);
        canvas.draw_line(20, 90, width / 2 - 20, 90);
        canvas.draw_filled_rectangle(20, 120, 120, 220);
        canvas.draw_circle(220, 170, 50);
        canvas.draw_filled_circle(340, 170, 50);

        let bounding_box = canvas.bounding_box();
        log::debug!(
            "left: {}, size: {}",
            bounding_box.top_left,
            bounding_box.size
        );
        Rectangle::new(Point::new(20, 250), Size::new(340, 100))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 3))
            .draw(&mut canvas)?;
        Circle::new(Point::new(30, 260), 80)
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut canvas)?;

        let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Text::with_baseline(&now, CLOCK_POS, style, Baseline::Top).draw(&mut canvas)?;

        if let Some(path) = &bitmap {
            let drawn = canvas.draw_bmp_at(width / 2, 20, path);
            log::info!("Bitmap rows drawn: {}", drawn.rows_drawn);
        }
    }

    device.display.update()?;

    log::info!("Goto Sleep...");
    device.sleep()
}
