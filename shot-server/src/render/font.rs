//! Glyph source for the receipt
//!
//! A TrueType/OpenType face loaded through `rusttype`, or a built-in
//! fallback that draws every glyph as an outlined box so a host without
//! any CJK font still produces a readable layout.

use std::path::{Path, PathBuf};

use image::GrayImage;
use rusttype::{Font, Scale, point};
use tracing::{info, warn};

use super::RenderError;
use super::canvas::{Canvas, Rect};
use super::layout::TextMeasure;

/// Value of `FONT_PATH` that forces the built-in font
pub const BUILTIN_FONT: &str = "builtin";

#[cfg(windows)]
const FONT_CANDIDATES: &[&str] = &[
    "C:/Windows/Fonts/simhei.ttf",
    "C:/Windows/Fonts/msyh.ttc",
    "C:/Windows/Fonts/simsun.ttc",
];

#[cfg(target_os = "macos")]
const FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Light.ttc",
    "/System/Library/Fonts/STHeiti Medium.ttc",
    "/Library/Fonts/Arial Unicode.ttf",
];

#[cfg(not(any(windows, target_os = "macos")))]
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

pub enum GlyphFont {
    TrueType { font: Font<'static>, source: PathBuf },
    Builtin,
}

impl std::fmt::Debug for GlyphFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GlyphFont::TrueType { source, .. } => {
                f.debug_tuple("TrueType").field(source).finish()
            }
            GlyphFont::Builtin => f.write_str("Builtin"),
        }
    }
}

impl GlyphFont {
    /// Load the first face of a font file (collections included)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let font = Font::try_from_vec_and_index(bytes, 0)
            .ok_or_else(|| RenderError::Font(format!("unreadable font file {}", path.display())))?;
        Ok(GlyphFont::TrueType {
            font,
            source: path.to_path_buf(),
        })
    }

    /// Resolve the receipt font
    ///
    /// Order: the configured path, then the platform candidates, then the
    /// built-in font. Never fails.
    pub fn discover(configured: Option<&str>) -> Self {
        if let Some(configured) = configured {
            if configured.eq_ignore_ascii_case(BUILTIN_FONT) {
                info!("Using built-in box font");
                return GlyphFont::Builtin;
            }
            match Self::load(configured) {
                Ok(font) => {
                    info!(path = configured, "Loaded configured font");
                    return font;
                }
                Err(e) => warn!(path = configured, error = %e, "Configured font unusable, probing system fonts"),
            }
        }

        for candidate in FONT_CANDIDATES {
            if !Path::new(candidate).exists() {
                continue;
            }
            match Self::load(candidate) {
                Ok(font) => {
                    info!(path = candidate, "Loaded system font");
                    return font;
                }
                Err(e) => warn!(path = candidate, error = %e, "Skipping font"),
            }
        }

        warn!("No usable font found, CJK text will render as boxes");
        GlyphFont::Builtin
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, GlyphFont::Builtin)
    }

    /// Height of one line of text at `px`
    pub fn line_height(&self, px: f32) -> f32 {
        match self {
            GlyphFont::TrueType { font, .. } => {
                let v = font.v_metrics(Scale::uniform(px));
                v.ascent - v.descent
            }
            GlyphFont::Builtin => px,
        }
    }

    fn builtin_advance(c: char, px: f32) -> f32 {
        if c.len_utf8() >= 3 { px } else { px * 0.6 }
    }

    /// Advance width of `text` without bold emulation
    fn advance(&self, text: &str, px: f32) -> f32 {
        match self {
            GlyphFont::TrueType { font, .. } => font
                .layout(text, Scale::uniform(px), point(0.0, 0.0))
                .last()
                .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
                .unwrap_or(0.0),
            GlyphFont::Builtin => text.chars().map(|c| Self::builtin_advance(c, px)).sum(),
        }
    }

    /// Draw `text` with its top edge at `y_top`
    ///
    /// Bold is emulated by a second pass one pixel to the right.
    pub fn draw(
        &self,
        canvas: &mut Canvas,
        text: &str,
        x: f32,
        y_top: f32,
        px: f32,
        bold: bool,
        ink: u8,
    ) {
        self.draw_pass(canvas, text, x, y_top, px, ink);
        if bold {
            self.draw_pass(canvas, text, x + 1.0, y_top, px, ink);
        }
    }

    fn draw_pass(&self, canvas: &mut Canvas, text: &str, x: f32, y_top: f32, px: f32, ink: u8) {
        match self {
            GlyphFont::TrueType { font, .. } => {
                let scale = Scale::uniform(px);
                let ascent = font.v_metrics(scale).ascent;
                for glyph in font.layout(text, scale, point(x, y_top + ascent)) {
                    if let Some(bb) = glyph.pixel_bounding_box() {
                        glyph.draw(|gx, gy, v| {
                            canvas.blend(bb.min.x + gx as i32, bb.min.y + gy as i32, v, ink);
                        });
                    }
                }
            }
            GlyphFont::Builtin => {
                let stroke = (px / 14.0).max(1.0);
                let mut cursor = x;
                for c in text.chars() {
                    let advance = Self::builtin_advance(c, px);
                    if !c.is_whitespace() {
                        let cell = Rect::new(
                            cursor + advance * 0.12,
                            y_top + px * 0.15,
                            advance * 0.76,
                            px * 0.7,
                        );
                        canvas.stroke_rect(cell, stroke, ink);
                    }
                    cursor += advance;
                }
            }
        }
    }

    /// `text` rendered alone on a tight white image
    pub fn render_image(&self, text: &str, px: f32, bold: bool) -> GrayImage {
        let width = self.measure(text, px, bold).ceil() as u32 + 2;
        let height = self.line_height(px).ceil() as u32 + 2;
        let mut canvas = Canvas::new(width.max(1), height.max(1));
        self.draw(&mut canvas, text, 1.0, 1.0, px, bold, super::canvas::INK);
        canvas.into_image()
    }
}

impl TextMeasure for GlyphFont {
    fn measure(&self, text: &str, size_px: f32, bold: bool) -> f32 {
        let width = self.advance(text, size_px);
        if bold && !text.is_empty() { width + 1.0 } else { width }
    }
}
