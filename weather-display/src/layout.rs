// Weather screen layout for the landscape 800x480 canvas.

use crate::fonts::{FONT_STAMP, Fonts};
use crate::readings::{Outdoor, Readings};
use crate::schedule::half_hours_elapsed;
use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDateTime};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::Point;
use epd_7in5_v2::Canvas;
use u8g2_fonts::FontRenderer;
use u8g2_fonts::types::{FontColor, HorizontalAlignment, VerticalPosition};

const DAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

const DAY_COLUMN: i32 = 110;
const FORECAST_DAYS: usize = 7;
const PROGRESS_STEP: i32 = 50;
const STAMP_ANCHOR: Point = Point::new(795, 478);

/// Draws the whole screen. The canvas is expected to be blank.
pub fn render(canvas: &mut Canvas<'_>, readings: &Readings, fonts: &Fonts) -> Result<()> {
    draw_header(canvas, readings, fonts);
    if let Some(outdoor) = &readings.outdoor {
        draw_outdoor(canvas, outdoor, fonts);
    }
    draw_progress(canvas, half_hours_elapsed(readings.timestamp));
    draw_stamp(canvas, readings.timestamp)
}

fn draw_header(canvas: &mut Canvas<'_>, readings: &Readings, fonts: &Fonts) {
    let timestamp = readings.timestamp;
    let weekday = DAYS[timestamp.weekday().num_days_from_sunday() as usize];
    canvas.draw_string_at(10, 5, weekday, &fonts.large);
    canvas.draw_string_at(250, 5, &timestamp.day().to_string(), &fonts.large);

    // Separators
    canvas.draw_filled_rectangle(0, 103, 800, 108);
    canvas.draw_filled_rectangle(415, 0, 420, 108);

    canvas.draw_string_at(
        450,
        10,
        &readings.indoor_fahrenheit().to_string(),
        &fonts.medium,
    );
    // Degree mark
    canvas.draw_filled_circle(570, 10, 6);
    canvas.draw_string_at(
        600,
        10,
        &format!("{}%", readings.indoor_humidity()),
        &fonts.medium,
    );
}

#[allow(clippy::cast_possible_truncation)]
fn draw_outdoor(canvas: &mut Canvas<'_>, outdoor: &Outdoor, fonts: &Fonts) {
    canvas.draw_string_at(
        150,
        130,
        &(outdoor.temperature.round_ties_even() as i32).to_string(),
        &fonts.medium,
    );
    canvas.draw_string_at(
        320,
        130,
        &format!("{}%", outdoor.humidity.round_ties_even() as i32),
        &fonts.medium,
    );
    let rain = outdoor.rain.map(|rain| rain.round_ties_even() as i32);
    if let Some(rain) = rain.filter(|&rain| rain != 0) {
        canvas.draw_string_at(580, 130, &rain.to_string(), &fonts.medium);
    }

    canvas.draw_filled_rectangle(50, 225, 750, 228);

    for (column, day) in (0..).zip(outdoor.daily.iter().take(FORECAST_DAYS)) {
        let x = DAY_COLUMN * column;
        let high = day.high.round_ties_even() as i32;
        let high_x = if high < 100 { 35 } else { 16 };
        canvas.draw_string_at(high_x + x, 260, &high.to_string(), &fonts.small);
        canvas.draw_filled_rectangle(30 + x, 325, 115 + x, 335);
        canvas.draw_string_at(
            35 + x,
            340,
            &(day.low.round_ties_even() as i32).to_string(),
            &fonts.small,
        );

        if day.precipitation > 0.0 {
            let percent = (day.precipitation * 100.0) as i32;
            if percent < 100 {
                canvas.draw_string_at(35 + x, 410, &percent.to_string(), &fonts.small);
            } else {
                canvas.draw_string_at(55 + x, 410, "!", &fonts.small);
            }
        }
    }
}

/// One marker per half hour elapsed, along the bottom edge.
fn draw_progress(canvas: &mut Canvas<'_>, half_hours: u32) {
    for step in (0..).take(half_hours as usize) {
        let x = 50 + PROGRESS_STEP * step;
        canvas.draw_filled_rectangle(x, 470, x + 10, 480);
    }
}

fn draw_stamp(canvas: &mut Canvas<'_>, timestamp: NaiveDateTime) -> Result<()> {
    let text = format!("Updated {}", timestamp.format("%H:%M"));
    FontRenderer::new::<FONT_STAMP>()
        .render_aligned(
            text.as_str(),
            STAMP_ANCHOR,
            VerticalPosition::Bottom,
            HorizontalAlignment::Right,
            FontColor::Transparent(BinaryColor::On),
            canvas,
        )
        .map_err(|e| anyhow!("Failed to draw update stamp: {e:?}"))?;
    Ok(())
}
