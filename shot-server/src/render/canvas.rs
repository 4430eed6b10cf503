//! Grayscale drawing surface
//!
//! Everything is drawn in black ink over white paper. Drawing only ever
//! darkens a pixel, so overlapping strokes compose without ordering issues.

use image::{GrayImage, Luma};

pub const PAPER: u8 = 255;
pub const INK: u8 = 0;

/// Axis-aligned rectangle in pixel space, origin top-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

/// Line style of a stroke
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

impl LineStyle {
    /// On/off lengths, scaled by the line width
    fn pattern(&self) -> Option<&'static [f32]> {
        match self {
            LineStyle::Solid => None,
            LineStyle::Dashed => Some(&[3.7, 1.6]),
            LineStyle::Dotted => Some(&[1.0, 1.65]),
            LineStyle::DashDot => Some(&[6.4, 1.6, 1.0, 1.6]),
        }
    }
}

/// Stroke parameters
#[derive(Debug, Clone, Copy)]
pub struct Stroke {
    pub width: f32,
    pub style: LineStyle,
    pub ink: u8,
}

impl Stroke {
    pub fn solid(width: f32) -> Self {
        Self {
            width,
            style: LineStyle::Solid,
            ink: INK,
        }
    }

    pub fn styled(width: f32, style: LineStyle) -> Self {
        Self {
            width,
            style,
            ink: INK,
        }
    }

    pub fn with_ink(mut self, ink: u8) -> Self {
        self.ink = ink;
        self
    }
}

pub struct Canvas {
    image: GrayImage,
    clip: Option<Rect>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::from_pixel(width, height, Luma([PAPER])),
            clip: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Restrict drawing to `rect` until [`Canvas::clear_clip`]
    pub fn set_clip(&mut self, rect: Rect) {
        self.clip = Some(rect);
    }

    pub fn clear_clip(&mut self) {
        self.clip = None;
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    /// Darken one pixel towards `ink` by `coverage` (0..1)
    pub fn blend(&mut self, x: i32, y: i32, coverage: f32, ink: u8) {
        if x < 0 || y < 0 || x >= self.image.width() as i32 || y >= self.image.height() as i32 {
            return;
        }
        if let Some(clip) = self.clip
            && !clip.contains(x as f32 + 0.5, y as f32 + 0.5)
        {
            return;
        }

        let coverage = coverage.clamp(0.0, 1.0);
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let old = pixel.0[0] as f32;
        let new = old + (ink as f32 - old) * coverage;
        pixel.0[0] = pixel.0[0].min(new.round() as u8);
    }

    /// Anti-aliased capsule between two points
    pub fn segment(&mut self, p0: (f32, f32), p1: (f32, f32), width: f32, ink: u8) {
        let half = width / 2.0;
        let pad = half.ceil() as i32 + 1;
        let min_x = p0.0.min(p1.0).floor() as i32 - pad;
        let max_x = p0.0.max(p1.0).ceil() as i32 + pad;
        let min_y = p0.1.min(p1.1).floor() as i32 - pad;
        let max_y = p0.1.max(p1.1).ceil() as i32 + pad;

        let dx = p1.0 - p0.0;
        let dy = p1.1 - p0.1;
        let len_sq = dx * dx + dy * dy;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let cx = x as f32 + 0.5;
                let cy = y as f32 + 0.5;
                let t = if len_sq > 0.0 {
                    (((cx - p0.0) * dx + (cy - p0.1) * dy) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let lx = p0.0 + t * dx;
                let ly = p0.1 + t * dy;
                let dist = ((lx - cx).powi(2) + (ly - cy).powi(2)).sqrt();
                let coverage = (half + 0.5 - dist).clamp(0.0, 1.0);
                if coverage > 0.01 {
                    self.blend(x, y, coverage, ink);
                }
            }
        }
    }

    /// Polyline with an optional dash pattern carried across vertices
    pub fn polyline(&mut self, points: &[(f32, f32)], stroke: Stroke) {
        if stroke.width <= 0.0 || points.is_empty() {
            return;
        }
        if points.len() == 1 {
            self.segment(points[0], points[0], stroke.width, stroke.ink);
            return;
        }

        let Some(pattern) = stroke.style.pattern() else {
            for pair in points.windows(2) {
                self.segment(pair[0], pair[1], stroke.width, stroke.ink);
            }
            return;
        };

        let dashes: Vec<f32> = pattern.iter().map(|d| d * stroke.width).collect();
        let mut index = 0usize;
        let mut remaining = dashes[0];

        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let len = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
            if len == 0.0 {
                continue;
            }

            let mut pos = 0.0f32;
            while pos < len {
                let step = remaining.min(len - pos);
                if index % 2 == 0 {
                    let t0 = pos / len;
                    let t1 = (pos + step) / len;
                    let s = (a.0 + (b.0 - a.0) * t0, a.1 + (b.1 - a.1) * t0);
                    let e = (a.0 + (b.0 - a.0) * t1, a.1 + (b.1 - a.1) * t1);
                    // Round caps eat into the gaps
                    self.segment(s, e, stroke.width * 0.8, stroke.ink);
                }
                pos += step;
                remaining -= step;
                if remaining <= 1e-3 {
                    index = (index + 1) % dashes.len();
                    remaining = dashes[index];
                }
            }
        }
    }

    pub fn hline(&mut self, x0: f32, x1: f32, y: f32, stroke: Stroke) {
        self.polyline(&[(x0, y), (x1, y)], stroke);
    }

    pub fn vline(&mut self, x: f32, y0: f32, y1: f32, stroke: Stroke) {
        self.polyline(&[(x, y0), (x, y1)], stroke);
    }

    /// Rectangle outline
    pub fn stroke_rect(&mut self, rect: Rect, width: f32, ink: u8) {
        let stroke = Stroke::solid(width).with_ink(ink);
        self.hline(rect.x, rect.right(), rect.y, stroke);
        self.hline(rect.x, rect.right(), rect.bottom(), stroke);
        self.vline(rect.x, rect.y, rect.bottom(), stroke);
        self.vline(rect.right(), rect.y, rect.bottom(), stroke);
    }

    pub fn fill_rect(&mut self, rect: Rect, ink: u8) {
        let x0 = rect.x.round() as i32;
        let y0 = rect.y.round() as i32;
        let x1 = rect.right().round() as i32;
        let y1 = rect.bottom().round() as i32;
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, 1.0, ink);
            }
        }
    }

    /// Composite an ink-on-white image, darkening only
    pub fn overlay(&mut self, image: &GrayImage, x: i32, y: i32) {
        for (ix, iy, pixel) in image.enumerate_pixels() {
            let v = pixel.0[0];
            if v < PAPER {
                self.blend(x + ix as i32, y + iy as i32, 1.0, v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dark_pixels(canvas: Canvas) -> usize {
        canvas
            .into_image()
            .pixels()
            .filter(|p| p.0[0] < 128)
            .count()
    }

    #[test]
    fn test_blend_only_darkens() {
        let mut c = Canvas::new(4, 4);
        c.blend(1, 1, 1.0, 0);
        c.blend(1, 1, 1.0, 200);
        c.blend(-1, 9, 1.0, 0);
        assert_eq!(c.into_image().get_pixel(1, 1).0[0], 0);
    }

    #[test]
    fn test_clip_blocks_outside() {
        let mut c = Canvas::new(20, 20);
        c.set_clip(Rect::new(0.0, 0.0, 10.0, 20.0));
        c.hline(0.0, 20.0, 10.0, Stroke::solid(2.0));
        let img = c.into_image();
        assert!(img.get_pixel(5, 10).0[0] < 128);
        assert_eq!(img.get_pixel(15, 10).0[0], PAPER);
    }

    #[test]
    fn test_dotted_line_has_gaps() {
        let mut solid = Canvas::new(200, 10);
        solid.hline(0.0, 200.0, 5.0, Stroke::solid(2.0));
        let mut dashed = Canvas::new(200, 10);
        dashed.hline(0.0, 200.0, 5.0, Stroke::styled(2.0, LineStyle::Dotted));

        let s = dark_pixels(solid);
        let d = dark_pixels(dashed);
        assert!(d > 0);
        assert!(d < s * 9 / 10);
    }

    #[test]
    fn test_single_point_polyline() {
        let mut c = Canvas::new(10, 10);
        c.polyline(&[(5.0, 5.0)], Stroke::solid(3.0));
        assert!(c.into_image().get_pixel(5, 5).0[0] < 128);
    }
}
