//! Background image synthesis for the DMG window.
//!
//! Black canvas, centered elliptical glow, seeded grain, a drag arrow
//! between the two icon positions, and a few labels. Written once to a
//! temporary PNG that Finder later uses as the window background.

use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};

use crate::config::Config;
use crate::typeset::Typesetter;

/// Grain seed. Fixed so the background regenerates byte-identically.
const GRAIN_SEED: u64 = 42;
/// Each channel gets an offset in [-GRAIN_SPAN, GRAIN_SPAN].
const GRAIN_SPAN: i16 = 4;

/// Glow falloff rate and peak intensity.
const GLOW_FALLOFF: f32 = 2.2;
const GLOW_PEAK: f32 = 12.0;
/// Horizontal / vertical spread divisors of the glow ellipse.
const GLOW_X_SPREAD: f32 = 1.6;
const GLOW_Y_SPREAD: f32 = 1.2;

/// Clearance between an icon center and the nearest arrow endpoint.
const ARROW_CLEARANCE: i64 = 72;
const ARROW_HEAD_LEN: i64 = 12;
const ARROW_HEAD_RISE: i64 = 7;

const ARROW_COLOR: Rgb<u8> = Rgb([150, 150, 150]);
const TEXT_COLOR: Rgb<u8> = Rgb([130, 130, 130]);
const MARK_COLOR: Rgb<u8> = Rgb([55, 55, 55]);

const FONT_SMALL: f32 = 9.0;
const FONT_TITLE: f32 = 11.0;

/// Synthesize the background and write it to the configured temporary path.
pub fn generate(config: &Config) -> Result<PathBuf> {
    let img = render(config);
    img.save(&config.background_png).with_context(|| {
        format!(
            "failed to write background {}",
            config.background_png.display()
        )
    })?;
    println!(
        "Background written: {} ({}x{})",
        config.background_png.display(),
        img.width(),
        img.height()
    );
    Ok(config.background_png.clone())
}

/// Render the full canvas in memory. Kept separate from [`generate`] so the
/// drawing pipeline can be exercised without touching the filesystem.
pub fn render(config: &Config) -> RgbImage {
    let mut img = RgbImage::new(config.win_w, config.win_h);
    paint_glow(&mut img);
    add_grain(&mut img, GRAIN_SEED);
    draw_arrow(&mut img, config);
    draw_labels(&mut img, config);
    img
}

/// Grayscale glow decaying with normalized elliptical distance from center.
fn paint_glow(img: &mut RgbImage) {
    let (w, h) = (img.width() as f32, img.height() as f32);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let dx = (x as f32 - w / 2.0) / (w / GLOW_X_SPREAD);
        let dy = (y as f32 - h / 2.0) / (h / GLOW_Y_SPREAD);
        let dist = (dx * dx + dy * dy).sqrt();
        let value = ((-dist * GLOW_FALLOFF).exp() * GLOW_PEAK) as u8;
        *px = Rgb([value, value, value]);
    }
}

/// Deterministic grain stream (SplitMix64). Not a crypto generator; it only
/// has to be stable across runs and crate upgrades.
struct Grain(u64);

impl Grain {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn offset(&mut self) -> i16 {
        (self.next_u64() % (2 * GRAIN_SPAN as u64 + 1)) as i16 - GRAIN_SPAN
    }
}

/// Add per-channel grain, clamping in 16-bit space before narrowing back.
fn add_grain(img: &mut RgbImage, seed: u64) {
    let mut grain = Grain::new(seed);
    for px in img.pixels_mut() {
        for chan in px.0.iter_mut() {
            *chan = (*chan as i16 + grain.offset()).clamp(0, 255) as u8;
        }
    }
}

/// Horizontal line between the icon columns plus a two-stroke arrowhead.
fn draw_arrow(img: &mut RgbImage, config: &Config) {
    let ay = config.app_icon.1 as i64;
    let ax0 = config.app_icon.0 as i64 + ARROW_CLEARANCE;
    let ax1 = config.apps_icon.0 as i64 - ARROW_CLEARANCE;
    if ax1 <= ax0 {
        // Icons too close together for an arrow to fit between them.
        return;
    }

    draw_line(img, (ax0, ay), (ax1, ay), ARROW_COLOR);
    draw_line(
        img,
        (ax1 - ARROW_HEAD_LEN, ay - ARROW_HEAD_RISE),
        (ax1, ay),
        ARROW_COLOR,
    );
    draw_line(
        img,
        (ax1 - ARROW_HEAD_LEN, ay + ARROW_HEAD_RISE),
        (ax1, ay),
        ARROW_COLOR,
    );
}

/// Integer Bresenham line, clipped to the canvas.
fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let (x1, y1) = to;
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
            img.put_pixel(x as u32, y as u32, color);
        }
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

fn draw_labels(img: &mut RgbImage, config: &Config) {
    let mut typesetter = match Typesetter::probe() {
        Some(t) => t,
        None => {
            log::warn!("no usable font available; skipping background labels");
            return;
        }
    };

    let w = img.width() as i32;
    let h = img.height() as i32;
    let arrow_y = config.app_icon.1 as i32;

    // Two-line instruction under the arrow.
    for (i, line) in ["DRAG TO APPLICATIONS", "TO INSTALL"].iter().enumerate() {
        let tw = typesetter.measure(line, FONT_SMALL);
        let tx = (w - tw as i32) / 2;
        typesetter.draw(
            img,
            tx,
            arrow_y + 14 + i as i32 * 13,
            line,
            FONT_SMALL,
            TEXT_COLOR,
        );
    }

    // Wordmark, top centered.
    let mark = "N O I R";
    let tw = typesetter.measure(mark, FONT_TITLE);
    typesetter.draw(img, (w - tw as i32) / 2, 22, mark, FONT_TITLE, MARK_COLOR);

    // Version, bottom right.
    let version = config.version_label();
    typesetter.draw(img, w - 80, h - 20, &version, FONT_SMALL, MARK_COLOR);
}

// =============================================================================
// Tests
// =============================================================================
