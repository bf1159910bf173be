//! Label rasterization for the background canvas.
//!
//! Probes a fixed list of system font files and falls back to whatever the
//! host font database offers. Font trouble is never fatal; callers skip
//! label drawing when no font resolves at all.

use std::path::Path;

use cosmic_text::{Attrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, SwashCache};
use image::{Rgb, RgbImage};

/// Font files probed in order. The first one present is loaded and its
/// family used for all labels.
pub const FONT_CANDIDATES: [&str; 4] = [
    "/System/Library/Fonts/Menlo.ttc",
    "/System/Library/Fonts/Monaco.ttf",
    "/Library/Fonts/Courier New.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
];

pub struct Typesetter {
    font_system: FontSystem,
    cache: SwashCache,
    family: Option<String>,
}

impl Typesetter {
    /// Probe the candidate font files. Returns None when the font database
    /// ends up empty (headless host with no fonts installed).
    pub fn probe() -> Option<Self> {
        Self::with_candidates(&FONT_CANDIDATES)
    }

    pub fn with_candidates(candidates: &[&str]) -> Option<Self> {
        let mut font_system = FontSystem::new();

        let mut family = None;
        for candidate in candidates {
            let path = Path::new(candidate);
            if !path.exists() {
                continue;
            }
            if let Err(err) = font_system.db_mut().load_font_file(path) {
                log::warn!("failed to load font {}: {err}", path.display());
                continue;
            }
            family = font_system.db().faces().find_map(|face| match &face.source {
                cosmic_text::fontdb::Source::File(p) if p.as_path() == path => {
                    face.families.first().map(|(name, _)| name.clone())
                }
                _ => None,
            });
            if family.is_some() {
                break;
            }
        }

        if family.is_none() {
            log::warn!("no probe font found; falling back to the system monospace family");
        }
        if font_system.db().faces().next().is_none() {
            return None;
        }

        Some(Self {
            font_system,
            cache: SwashCache::new(),
            family,
        })
    }

    /// Width in pixels the text would occupy at the given point size.
    pub fn measure(&mut self, text: &str, size: f32) -> f32 {
        let buffer = self.layout(text, size);
        buffer
            .layout_runs()
            .map(|run| run.line_w)
            .fold(0.0, f32::max)
    }

    /// Draw `text` with its top-left corner at (x, y), alpha-blending glyph
    /// coverage onto the canvas.
    pub fn draw(
        &mut self,
        img: &mut RgbImage,
        x: i32,
        y: i32,
        text: &str,
        size: f32,
        color: Rgb<u8>,
    ) {
        let buffer = self.layout(text, size);
        let text_color = Color::rgb(color.0[0], color.0[1], color.0[2]);
        let (width, height) = (img.width() as i32, img.height() as i32);

        buffer.draw(
            &mut self.font_system,
            &mut self.cache,
            text_color,
            |gx, gy, gw, gh, c| {
                let alpha = c.a() as u32;
                if alpha == 0 {
                    return;
                }
                for dy in 0..gh as i32 {
                    for dx in 0..gw as i32 {
                        let tx = x + gx + dx;
                        let ty = y + gy + dy;
                        if tx < 0 || ty < 0 || tx >= width || ty >= height {
                            continue;
                        }
                        let dst = img.get_pixel_mut(tx as u32, ty as u32);
                        for (chan, src) in dst.0.iter_mut().zip([c.r(), c.g(), c.b()]) {
                            *chan =
                                ((*chan as u32 * (255 - alpha) + src as u32 * alpha) / 255) as u8;
                        }
                    }
                }
            },
        );
    }

    fn layout(&mut self, text: &str, size: f32) -> Buffer {
        let family = self.family.clone();
        let attrs = match family.as_deref() {
            Some(name) => Attrs::new().family(Family::Name(name)),
            None => Attrs::new().family(Family::Monospace),
        };

        let metrics = Metrics::new(size, size * 1.3);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        buffer.set_size(&mut self.font_system, None, None);
        buffer.set_text(&mut self.font_system, text, attrs, Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.font_system, false);
        buffer
    }
}
