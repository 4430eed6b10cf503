//! Receipt composition
//!
//! Landscape page at 203 DPI, 1296 × 576 px (the 80 × 180 mm receipt
//! turned on its side). Columns follow a grid of width ratios:
//!
//! | Extended info | Columns |
//! |---------------|---------|
//! | on  | chart 0.65, shot info 0.12, bean info 0.23 |
//! | off | chart 0.65, shot info 0.35 |

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use image::{GrayImage, ImageFormat};
use shared::{MetaValue, ShotDocument, ShotMetadata, ShotTrace};
use tracing::{error, info, instrument};

use super::canvas::{Canvas, INK, Rect, Stroke};
use super::chart::{Chart, ChartMetrics, ChartText};
use super::font::GlyphFont;
use super::labels::ReceiptLabels;
use super::layout::{TextMeasure, WrapOptions, wrap_text};
use super::{RenderError, RenderResult};
use crate::core::settings::Language;
use crate::core::tasks::panic_message;

pub const RECEIPT_WIDTH: u32 = 1296;
pub const RECEIPT_HEIGHT: u32 = 576;
const DPI: f32 = 203.0;

const FONT_M_PT: f32 = 8.0;
const FONT_L_PT: f32 = 10.0;
const LINE_WIDTH_PT: f32 = 1.25;
const PAGE_MARGIN: f32 = 12.0;
/// Gap between columns, share of the average column width
const WSPACE: f32 = 0.2;

/// First text line sits 2% below the column top
const COLUMN_TOP: f32 = 0.02;
/// Line pitch, share of the column height
const LINE_STEP: f32 = 0.05;
const SEPARATOR_GAP: f32 = 0.5;
const BLANK_GAP: f32 = 0.3;
const SEPARATOR_EMS: f32 = 6.0;

const TITLE_WRAP_RATIO: f32 = 1.0;
const NOTES_WRAP_RATIO: f32 = 0.9;
const PROFILE_FALLBACK_CHARS: usize = 12;

/// Machine id sent by uploaders that do not identify themselves
pub const UNKNOWN_MACHINE: &str = "UNKNOWN";

fn pt(points: f32) -> f32 {
    points * DPI / 72.0
}

/// Per-render inputs that do not come from the shot document
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub machine_id: Option<String>,
    /// Draw the bean info column
    pub bean_info: bool,
    pub language: Language,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            machine_id: None,
            bean_info: true,
            language: Language::Zh,
        }
    }
}

/// One row of a text column
#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Title(String),
    Separator,
    Blank,
    Text(String),
}

impl Entry {
    /// Vertical advance in line steps
    fn advance(&self) -> f32 {
        match self {
            Entry::Title(_) | Entry::Text(_) => 1.0,
            Entry::Separator => 1.0 + SEPARATOR_GAP,
            Entry::Blank => 1.0 + BLANK_GAP,
        }
    }
}

struct Columns {
    chart: Rect,
    info: Rect,
    beans: Option<Rect>,
}

fn columns(content: Rect, bean_info: bool) -> Columns {
    let ratios: &[f32] = if bean_info {
        &[0.65, 0.12, 0.23]
    } else {
        &[0.65, 0.35]
    };
    let n = ratios.len() as f32;
    let avg = content.w / (n + (n - 1.0) * WSPACE);
    let gap = avg * WSPACE;

    let mut x = content.x;
    let cells: Vec<Rect> = ratios
        .iter()
        .map(|ratio| {
            let w = ratio * n * avg;
            let cell = Rect::new(x, content.y, w, content.h);
            x += w + gap;
            cell
        })
        .collect();

    Columns {
        chart: cells[0],
        info: cells[1],
        beans: cells.get(2).copied(),
    }
}

fn meta_text(value: Option<&MetaValue>, na: &str) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| na.to_string())
}

/// Renders shot documents into receipt images
pub struct ReceiptRenderer {
    font: GlyphFont,
    font_m: f32,
    font_l: f32,
    line_width: f32,
}

impl ReceiptRenderer {
    pub fn new(font: GlyphFont) -> Self {
        Self {
            font,
            font_m: pt(FONT_M_PT),
            font_l: pt(FONT_L_PT),
            line_width: pt(LINE_WIDTH_PT),
        }
    }

    pub fn font(&self) -> &GlyphFont {
        &self.font
    }

    /// Render a parsed document
    pub fn render(&self, doc: &ShotDocument, ctx: &RenderContext) -> RenderResult<GrayImage> {
        let trace = doc.trace()?;
        let initial_temp = trace.initial_temperature()?;
        let meta = doc.metadata();
        let labels = ReceiptLabels::for_language(ctx.language);

        let mut canvas = Canvas::new(RECEIPT_WIDTH, RECEIPT_HEIGHT);
        let content = Rect::new(
            PAGE_MARGIN,
            PAGE_MARGIN,
            RECEIPT_WIDTH as f32 - 2.0 * PAGE_MARGIN,
            RECEIPT_HEIGHT as f32 - 2.0 * PAGE_MARGIN,
        );
        let cols = columns(content, ctx.bean_info);

        let chart_area = Rect {
            h: cols.chart.h - self.machine_strip_height(),
            ..cols.chart
        };
        self.render_chart(&mut canvas, chart_area, &trace, labels);

        let info = self.info_entries(&meta, initial_temp, labels, cols.info);
        self.render_column(&mut canvas, cols.info, 0.05, &info);

        if let Some(beans) = cols.beans {
            let entries = self.bean_entries(&meta, labels, beans);
            self.render_column(&mut canvas, beans, 0.01, &entries);
        }

        if let Some(id) = ctx
            .machine_id
            .as_deref()
            .filter(|id| !id.is_empty() && *id != UNKNOWN_MACHINE)
        {
            self.render_machine_label(&mut canvas, labels, id);
        }

        Ok(canvas.into_image())
    }

    /// Read `json`, render it and write the PNG to `png`
    pub fn render_file(&self, json: &Path, png: &Path, ctx: &RenderContext) -> RenderResult<()> {
        let bytes = std::fs::read(json)?;
        let doc = ShotDocument::from_slice(&bytes)?;
        let image = self.render(&doc, ctx)?;
        image.save_with_format(png, ImageFormat::Png)?;
        Ok(())
    }

    /// Render boundary: every failure, panics included, becomes `false`
    ///
    /// A failed render leaves no image behind.
    #[instrument(skip(self, ctx), fields(json = %json.display()))]
    pub fn render_to_file(&self, json: &Path, png: &Path, ctx: &RenderContext) -> bool {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.render_file(json, png, ctx)))
            .unwrap_or_else(|panic| Err(RenderError::Panic(panic_message(panic.as_ref()))));

        match outcome {
            Ok(()) => {
                info!(image = %png.display(), "Receipt rendered");
                true
            }
            Err(e) => {
                error!(error = %e, "Receipt rendering failed");
                if png.exists()
                    && let Err(e) = std::fs::remove_file(png)
                {
                    error!(image = %png.display(), error = %e, "Failed to remove partial receipt");
                }
                false
            }
        }
    }

    fn machine_label_px(&self) -> f32 {
        self.font_m * 0.8
    }

    fn machine_strip_height(&self) -> f32 {
        let px = self.machine_label_px();
        self.font.line_height(px) + px * 0.4 + self.line_width
    }

    fn render_chart(&self, canvas: &mut Canvas, area: Rect, trace: &ShotTrace, labels: &ReceiptLabels) {
        let metrics = ChartMetrics {
            tick_px: self.font_m,
            legend_px: self.font_m * 0.8,
            line_width: self.line_width,
            tick_len: pt(3.5),
            pad: pt(1.5),
        };
        let text = ChartText {
            pressure_axis: labels.pressure_axis(),
            flow_axis: labels.flow_axis(),
            temperature_axis: labels.temperature_axis(),
            legend: [
                labels.pressure.to_string(),
                labels.water_flow.to_string(),
                labels.coffee_flow.to_string(),
                labels.temperature.to_string(),
            ],
        };
        Chart::new(&self.font, metrics).draw(canvas, area, trace, &text);
    }

    fn info_entries(
        &self,
        meta: &ShotMetadata,
        initial_temp: f64,
        labels: &ReceiptLabels,
        column: Rect,
    ) -> Vec<Entry> {
        let (date, time) = match meta.recorded_at.local_datetime() {
            Some(dt) => (
                dt.format("%Y-%m-%d").to_string(),
                dt.format("%H:%M:%S").to_string(),
            ),
            None => (labels.na.to_string(), labels.na.to_string()),
        };

        let title = meta.profile_title.as_deref().unwrap_or(labels.unknown_profile);
        let options = WrapOptions::new(column.w, self.font_m).with_ratio(TITLE_WRAP_RATIO);
        let mut title_lines = wrap_text(&self.font, title, &options);
        if title_lines.is_empty() {
            title_lines.push(title.chars().take(PROFILE_FALLBACK_CHARS).collect());
        }

        let mut entries = vec![
            Entry::Title(labels.date_time.to_string()),
            Entry::Separator,
            Entry::Text(date),
            Entry::Text(time),
            Entry::Blank,
            Entry::Title(labels.profile.to_string()),
            Entry::Separator,
        ];
        entries.extend(title_lines.into_iter().map(Entry::Text));
        entries.extend([
            Entry::Blank,
            Entry::Title(labels.extraction.to_string()),
            Entry::Separator,
            Entry::Text(format!("{}: {}g", labels.in_weight, meta_text(meta.dose_in.as_ref(), labels.na))),
            Entry::Text(format!("{}: {}g", labels.out_weight, meta_text(meta.yield_out.as_ref(), labels.na))),
            Entry::Text(format!("{}: {}s", labels.shot_time, meta_text(meta.shot_time.as_ref(), labels.na))),
            Entry::Blank,
            Entry::Title(labels.grinder_temp.to_string()),
            Entry::Separator,
            Entry::Text(format!(
                "{}: {}",
                labels.grind_setting,
                meta_text(meta.grinder_setting.as_ref(), labels.na)
            )),
            Entry::Text(format!("{}: {:.1}°C", labels.initial_temp, initial_temp)),
        ]);
        entries
    }

    fn bean_entries(&self, meta: &ShotMetadata, labels: &ReceiptLabels, column: Rect) -> Vec<Entry> {
        let mut entries = vec![Entry::Title(labels.bean_info.to_string()), Entry::Separator];

        match meta.bean_notes.as_deref() {
            Some(notes) => {
                let options = WrapOptions::new(column.w, self.font_m).with_ratio(NOTES_WRAP_RATIO);
                entries.extend(wrap_text(&self.font, notes, &options).into_iter().map(Entry::Text));
            }
            None => entries.push(Entry::Text(labels.na.to_string())),
        }

        entries.extend([
            Entry::Blank,
            Entry::Title(labels.tasting_note.to_string()),
            Entry::Separator,
        ]);
        entries
    }

    /// Draw `entries` top-down; a column too tall for the page is scaled to fit
    fn render_column(&self, canvas: &mut Canvas, column: Rect, x_frac: f32, entries: &[Entry]) {
        let top = column.y + column.h * COLUMN_TOP;
        let units: f32 = entries.iter().map(Entry::advance).sum();
        let available = column.bottom() - top;

        let mut step = column.h * LINE_STEP;
        let scale = if units * step > available {
            available / (units * step)
        } else {
            1.0
        };
        step *= scale;
        let font_m = self.font_m * scale;
        let font_l = self.font_l * scale;

        let x = column.x + column.w * x_frac;
        let rule = Stroke::solid((self.line_width * 0.4).max(1.0));
        let mut y = top;

        for entry in entries {
            match entry {
                Entry::Title(text) => {
                    self.font.draw(canvas, text, x, y, font_l, true, INK);
                }
                Entry::Separator => {
                    y += step * SEPARATOR_GAP;
                    let end = (x + font_m * SEPARATOR_EMS).min(column.right());
                    canvas.hline(x, end, y + font_m * 0.5, rule);
                }
                Entry::Blank => {
                    y += step * BLANK_GAP;
                }
                Entry::Text(text) => {
                    self.font.draw(canvas, text, x, y, font_m, false, INK);
                }
            }
            y += step;
        }
    }

    /// Boxed "machine: id" tag in the lower-left corner
    fn render_machine_label(&self, canvas: &mut Canvas, labels: &ReceiptLabels, id: &str) {
        let px = self.machine_label_px();
        let text = format!("{}: {}", labels.machine, id);
        let pad = px * 0.2;

        let w = self.font.measure(&text, px, false) + pad * 2.0;
        let h = self.font.line_height(px) + pad * 2.0;
        let x = RECEIPT_WIDTH as f32 * 0.03;
        let y = RECEIPT_HEIGHT as f32 - h - pt(0.5) - 1.0;

        canvas.stroke_rect(Rect::new(x, y, w, h), pt(0.5), INK);
        self.font.draw(canvas, &text, x + pad, y + pad, px, false, INK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn shot(samples: usize, notes: &str) -> Value {
        let series = |f: fn(f64) -> f64| -> Vec<f64> { (0..samples).map(|i| f(i as f64)).collect() };
        json!({
            "elapsed": series(|i| i * 0.5),
            "pressure": { "pressure": series(|i| (i / 5.0).min(9.0)) },
            "flow": { "flow": series(|i| (i / 10.0).min(2.5)), "by_weight": series(|i| (i / 12.0).min(2.0)) },
            "temperature": { "basket": series(|i| 93.0 - i * 0.02) },
            "profile": { "title": "Dialed In Espresso — 94.5g", "notes": notes },
            "meta": { "in": 18, "out": 36.5, "time": 28, "grinder": { "setting": "2.8" } },
            "timestamp": 1717000000
        })
    }

    fn renderer() -> ReceiptRenderer {
        ReceiptRenderer::new(GlyphFont::Builtin)
    }

    #[test]
    fn test_column_grid() {
        let content = Rect::new(0.0, 0.0, 340.0, 100.0);
        let cols = columns(content, true);
        // avg = 100, gap = 20, widths 195 / 36 / 69
        assert!((cols.chart.w - 195.0).abs() < 1e-3);
        assert!((cols.info.x - 215.0).abs() < 1e-3);
        let beans = cols.beans.unwrap();
        assert!((beans.right() - 340.0).abs() < 1e-3);

        let cols = columns(Rect::new(0.0, 0.0, 220.0, 100.0), false);
        assert!(cols.beans.is_none());
        assert!((cols.info.right() - 220.0).abs() < 1e-3);
    }

    #[test]
    fn test_render_dimensions() {
        let doc: ShotDocument = serde_json::from_value(shot(50, "埃塞俄比亚，花香、柑橘；回甘持久！")).unwrap();
        let image = renderer().render(&doc, &RenderContext::default()).unwrap();
        assert_eq!(image.dimensions(), (RECEIPT_WIDTH, RECEIPT_HEIGHT));
        assert!(image.pixels().any(|p| p.0[0] < 128));
    }

    #[test]
    fn test_bean_column_toggle() {
        let doc: ShotDocument = serde_json::from_value(shot(50, "")).unwrap();
        let r = renderer();
        let with = r.render(&doc, &RenderContext::default()).unwrap();
        let without = r
            .render(&doc, &RenderContext { bean_info: false, ..Default::default() })
            .unwrap();
        assert_ne!(with, without);
    }

    #[test]
    fn test_info_entries_layout() {
        let doc: ShotDocument = serde_json::from_value(shot(10, "")).unwrap();
        let r = renderer();
        let labels = ReceiptLabels::for_language(Language::En);
        let entries = r.info_entries(&doc.metadata(), 93.0, labels, Rect::new(0.0, 0.0, 400.0, 500.0));

        assert_eq!(entries[0], Entry::Title("Date & Time".into()));
        assert_eq!(entries[1], Entry::Separator);
        assert!(entries.contains(&Entry::Text("In: 18.0g".into())));
        assert!(entries.contains(&Entry::Text("Out: 36.5g".into())));
        assert!(entries.contains(&Entry::Text("Grind: 2.8".into())));
        assert_eq!(entries.last(), Some(&Entry::Text("Temp: 93.0°C".into())));
    }

    #[test]
    fn test_missing_values_use_placeholder() {
        let mut value = shot(10, "");
        value["meta"] = json!({});
        value.as_object_mut().unwrap().remove("timestamp");
        value["profile"]["title"] = json!("");
        let doc: ShotDocument = serde_json::from_value(value).unwrap();

        let labels = ReceiptLabels::for_language(Language::En);
        let entries = renderer().info_entries(&doc.metadata(), 90.0, labels, Rect::new(0.0, 0.0, 400.0, 500.0));
        assert_eq!(entries[2], Entry::Text("N/A".into()));
        assert!(entries.contains(&Entry::Text("Unknown Profile".into())));
        assert!(entries.contains(&Entry::Text("In: N/Ag".into())));
    }

    #[test]
    fn test_bean_entries_without_notes() {
        let doc: ShotDocument = serde_json::from_value(shot(10, "  ")).unwrap();
        let labels = ReceiptLabels::for_language(Language::Zh);
        let entries = renderer().bean_entries(&doc.metadata(), labels, Rect::new(0.0, 0.0, 200.0, 500.0));
        assert_eq!(entries[2], Entry::Text("未记录".into()));
        assert_eq!(entries.last(), Some(&Entry::Separator));
    }

    #[test]
    fn test_render_to_file_failure_leaves_no_image() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("shot_1.json");
        let png_path = dir.path().join("shot_1.png");

        let mut value = shot(10, "");
        value["pressure"]["pressure"] = json!(["x", 1.0]);
        std::fs::write(&json_path, serde_json::to_vec(&value).unwrap()).unwrap();
        std::fs::write(&png_path, b"stale").unwrap();

        assert!(!renderer().render_to_file(&json_path, &png_path, &RenderContext::default()));
        assert!(!png_path.exists());
    }

    #[test]
    fn test_render_to_file_empty_trace() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("shot_2.json");
        let png_path = dir.path().join("shot_2.png");
        std::fs::write(&json_path, serde_json::to_vec(&shot(0, "")).unwrap()).unwrap();

        assert!(!renderer().render_to_file(&json_path, &png_path, &RenderContext::default()));
        assert!(!png_path.exists());
    }

    #[test]
    fn test_render_to_file_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("shot_3.json");
        let png_path = dir.path().join("shot_3.png");
        std::fs::write(&json_path, serde_json::to_vec(&shot(50, "Kenya AA, juicy")).unwrap()).unwrap();

        let ctx = RenderContext {
            machine_id: Some("DE1-0042".into()),
            bean_info: true,
            language: Language::En,
        };
        assert!(renderer().render_to_file(&json_path, &png_path, &ctx));
        let image = image::open(&png_path).unwrap().to_luma8();
        assert_eq!(image.dimensions(), (RECEIPT_WIDTH, RECEIPT_HEIGHT));
    }
}
