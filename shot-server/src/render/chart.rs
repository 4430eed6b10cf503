//! Trace chart
//!
//! Fixed value ranges so receipts stay comparable across shots:
//! pressure 0-10 bar (left), flow 0-10 g/s (right), basket temperature
//! 0-100 °C on a second left spine pushed outwards. Only the time axis is
//! fitted to the data.

use image::imageops;

use shared::ShotTrace;

use super::canvas::{Canvas, INK, LineStyle, Rect, Stroke};
use super::font::GlyphFont;
use super::layout::TextMeasure;

pub const PRESSURE_RANGE: (f64, f64) = (0.0, 10.0);
pub const FLOW_RANGE: (f64, f64) = (0.0, 10.0);
pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 100.0);

const PRESSURE_TICK_STEP: f64 = 2.0;
const TEMPERATURE_TICK_STEP: f64 = 20.0;
/// Data margin on each side of the time axis
const TIME_MARGIN: f64 = 0.05;
const MAX_TIME_TICKS: usize = 8;
/// Temperature spine offset, share of the plot width
const TEMPERATURE_SPINE_OFFSET: f32 = 0.10;
/// Grid ink at 60% opacity
const GRID_INK: u8 = 102;

/// Strings drawn on the chart
#[derive(Debug, Clone)]
pub struct ChartText {
    pub pressure_axis: String,
    pub flow_axis: String,
    pub temperature_axis: String,
    /// Pressure, water flow, coffee flow, basket temperature
    pub legend: [String; 4],
}

/// Pixel sizes of the chart decorations
#[derive(Debug, Clone, Copy)]
pub struct ChartMetrics {
    pub tick_px: f32,
    pub legend_px: f32,
    pub line_width: f32,
    pub tick_len: f32,
    pub pad: f32,
}

/// Fitted time axis
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub ticks: Vec<f64>,
}

/// Smallest 1/2/2.5/5 × 10^k step giving at most `max_ticks` intervals
pub fn nice_step(span: f64, max_ticks: usize) -> f64 {
    if span <= 0.0 || !span.is_finite() {
        return 1.0;
    }
    let raw = span / max_ticks.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    [1.0, 2.0, 2.5, 5.0, 10.0]
        .into_iter()
        .map(|m| m * magnitude)
        .find(|step| *step >= raw)
        .unwrap_or(10.0 * magnitude)
}

impl TimeAxis {
    pub fn fit(range: Option<(f64, f64)>) -> Self {
        let (lo, hi) = range.unwrap_or((0.0, 1.0));
        let (min, max) = if hi > lo {
            let margin = (hi - lo) * TIME_MARGIN;
            (lo - margin, hi + margin)
        } else {
            (lo - 0.5, lo + 0.5)
        };

        let step = nice_step(max - min, MAX_TIME_TICKS);
        let mut ticks = Vec::new();
        let mut tick = (min / step).ceil() * step;
        while tick <= max + step * 1e-9 {
            // Avoid printing "-0"
            ticks.push(if tick.abs() < step * 1e-9 { 0.0 } else { tick });
            tick += step;
        }

        Self {
            min,
            max,
            step,
            ticks,
        }
    }

    pub fn label(&self, value: f64) -> String {
        if self.step.fract() == 0.0 {
            format!("{:.0}", value)
        } else {
            format!("{:.1}", value)
        }
    }
}

/// Linear map from a value range onto a pixel span
fn scale(value: f64, (lo, hi): (f64, f64), start: f32, length: f32) -> f32 {
    start + ((value - lo) / (hi - lo)) as f32 * length
}

fn fixed_ticks((lo, hi): (f64, f64), step: f64) -> Vec<f64> {
    let count = ((hi - lo) / step).round() as usize;
    (0..=count).map(|i| lo + i as f64 * step).collect()
}

pub struct Chart<'a> {
    font: &'a GlyphFont,
    metrics: ChartMetrics,
}

/// Plot box plus the decoration anchors derived from it
struct Frame {
    plot: Rect,
    temperature_spine: f32,
}

impl<'a> Chart<'a> {
    pub fn new(font: &'a GlyphFont, metrics: ChartMetrics) -> Self {
        Self { font, metrics }
    }

    fn widest(&self, labels: impl Iterator<Item = String>) -> f32 {
        labels
            .map(|l| self.font.measure(&l, self.metrics.tick_px, false))
            .fold(0.0, f32::max)
    }

    fn axis_label_thickness(&self) -> f32 {
        self.font.line_height(self.metrics.tick_px)
    }

    fn legend_height(&self) -> f32 {
        self.font.line_height(self.metrics.legend_px) + self.metrics.pad * 2.0
    }

    /// Lay out the plot box inside `outer`, leaving room for every decoration
    fn frame(&self, outer: Rect) -> Frame {
        let m = self.metrics;
        let label_band = self.axis_label_thickness();
        let value_labels = self.widest(fixed_ticks(PRESSURE_RANGE, PRESSURE_TICK_STEP).into_iter().map(fmt_value));
        let temp_labels = self.widest(fixed_ticks(TEMPERATURE_RANGE, TEMPERATURE_TICK_STEP).into_iter().map(fmt_value));

        // pressure spine -> ticks -> labels -> axis title
        let pressure_band = m.tick_len + m.pad + value_labels + m.pad + label_band + m.pad;
        let temperature_band = m.tick_len + m.pad + temp_labels + m.pad + label_band;
        let right_band = m.tick_len + m.pad + value_labels + m.pad + label_band;

        let bottom_band = m.tick_len + m.pad + self.font.line_height(m.tick_px) + self.legend_height();
        let top = outer.y + m.line_width;

        // Spine offset is proportional to the plot width, but never narrower
        // than the pressure labels it has to clear
        let avail = outer.w - temperature_band - right_band;
        let proportional = avail / (1.0 + TEMPERATURE_SPINE_OFFSET);
        let (width, offset) = if proportional * TEMPERATURE_SPINE_OFFSET >= pressure_band {
            (proportional, proportional * TEMPERATURE_SPINE_OFFSET)
        } else {
            ((avail - pressure_band).max(1.0), pressure_band)
        };

        let plot_x = outer.x + temperature_band + offset;
        let plot = Rect::new(plot_x, top, width, (outer.bottom() - top - bottom_band).max(1.0));
        Frame {
            plot,
            temperature_spine: plot.x - offset,
        }
    }

    /// Plot box the chart would use inside `outer`
    pub fn plot_area(&self, outer: Rect) -> Rect {
        self.frame(outer).plot
    }

    pub fn draw(&self, canvas: &mut Canvas, outer: Rect, trace: &ShotTrace, text: &ChartText) {
        let frame = self.frame(outer);
        let plot = frame.plot;
        let time = TimeAxis::fit(trace.time_range());
        let m = self.metrics;

        self.draw_grid(canvas, plot, &time);
        self.draw_series(canvas, plot, &time, trace);

        canvas.stroke_rect(plot, m.line_width, INK);
        self.draw_time_ticks(canvas, plot, &time);
        self.draw_left_axis(canvas, plot.x, plot, PRESSURE_RANGE, PRESSURE_TICK_STEP, &text.pressure_axis);
        self.draw_left_axis(
            canvas,
            frame.temperature_spine,
            plot,
            TEMPERATURE_RANGE,
            TEMPERATURE_TICK_STEP,
            &text.temperature_axis,
        );
        canvas.vline(frame.temperature_spine, plot.y, plot.bottom(), Stroke::solid(m.line_width));
        self.draw_right_axis(canvas, plot, &text.flow_axis);
        self.draw_legend(canvas, outer, plot, text);
    }

    fn draw_grid(&self, canvas: &mut Canvas, plot: Rect, time: &TimeAxis) {
        let stroke = Stroke::styled(self.metrics.line_width / 2.0, LineStyle::Dashed).with_ink(GRID_INK);
        for t in &time.ticks {
            let x = scale(*t, (time.min, time.max), plot.x, plot.w);
            canvas.vline(x, plot.y, plot.bottom(), stroke);
        }
        for v in fixed_ticks(PRESSURE_RANGE, PRESSURE_TICK_STEP) {
            let y = scale(v, PRESSURE_RANGE, plot.bottom(), -plot.h);
            canvas.hline(plot.x, plot.right(), y, stroke);
        }
    }

    fn draw_series(&self, canvas: &mut Canvas, plot: Rect, time: &TimeAxis, trace: &ShotTrace) {
        let series: [(&[f64], (f64, f64), LineStyle); 4] = [
            (&trace.pressure, PRESSURE_RANGE, LineStyle::Solid),
            (&trace.flow, FLOW_RANGE, LineStyle::Dashed),
            (&trace.flow_by_weight, FLOW_RANGE, LineStyle::Dotted),
            (&trace.basket_temp, TEMPERATURE_RANGE, LineStyle::DashDot),
        ];

        canvas.set_clip(plot);
        for (values, range, style) in series {
            let points: Vec<(f32, f32)> = trace
                .elapsed
                .iter()
                .zip(values)
                .map(|(t, v)| {
                    (
                        scale(*t, (time.min, time.max), plot.x, plot.w),
                        scale(*v, range, plot.bottom(), -plot.h),
                    )
                })
                .collect();
            canvas.polyline(&points, Stroke::styled(self.metrics.line_width, style));
        }
        canvas.clear_clip();
    }

    fn draw_time_ticks(&self, canvas: &mut Canvas, plot: Rect, time: &TimeAxis) {
        let m = self.metrics;
        let stroke = Stroke::solid(m.line_width / 1.5);
        for t in &time.ticks {
            let x = scale(*t, (time.min, time.max), plot.x, plot.w);
            canvas.vline(x, plot.bottom(), plot.bottom() + m.tick_len, stroke);
            let label = time.label(*t);
            let w = self.font.measure(&label, m.tick_px, false);
            self.font.draw(
                canvas,
                &label,
                x - w / 2.0,
                plot.bottom() + m.tick_len + m.pad,
                m.tick_px,
                false,
                INK,
            );
        }
    }

    /// Ticks, labels and title for a spine at `spine_x`, growing leftwards
    fn draw_left_axis(
        &self,
        canvas: &mut Canvas,
        spine_x: f32,
        plot: Rect,
        range: (f64, f64),
        step: f64,
        title: &str,
    ) {
        let m = self.metrics;
        let stroke = Stroke::solid(m.line_width / 1.5);
        let line = self.font.line_height(m.tick_px);
        let mut widest: f32 = 0.0;

        for v in fixed_ticks(range, step) {
            let y = scale(v, range, plot.bottom(), -plot.h);
            canvas.hline(spine_x - m.tick_len, spine_x, y, stroke);
            let label = fmt_value(v);
            let w = self.font.measure(&label, m.tick_px, false);
            widest = widest.max(w);
            self.font.draw(
                canvas,
                &label,
                spine_x - m.tick_len - m.pad - w,
                y - line / 2.0,
                m.tick_px,
                false,
                INK,
            );
        }

        let rotated = imageops::rotate270(&self.font.render_image(title, m.tick_px, false));
        let x = spine_x - m.tick_len - m.pad - widest - m.pad - rotated.width() as f32;
        let y = plot.center_y() - rotated.height() as f32 / 2.0;
        canvas.overlay(&rotated, x.round() as i32, y.round() as i32);
    }

    fn draw_right_axis(&self, canvas: &mut Canvas, plot: Rect, title: &str) {
        let m = self.metrics;
        let stroke = Stroke::solid(m.line_width / 1.5);
        let line = self.font.line_height(m.tick_px);
        let spine_x = plot.right();
        let mut widest: f32 = 0.0;

        for v in fixed_ticks(FLOW_RANGE, PRESSURE_TICK_STEP) {
            let y = scale(v, FLOW_RANGE, plot.bottom(), -plot.h);
            canvas.hline(spine_x, spine_x + m.tick_len, y, stroke);
            let label = fmt_value(v);
            widest = widest.max(self.font.measure(&label, m.tick_px, false));
            self.font.draw(
                canvas,
                &label,
                spine_x + m.tick_len + m.pad,
                y - line / 2.0,
                m.tick_px,
                false,
                INK,
            );
        }

        let rotated = imageops::rotate270(&self.font.render_image(title, m.tick_px, false));
        let x = spine_x + m.tick_len + m.pad + widest + m.pad;
        let y = plot.center_y() - rotated.height() as f32 / 2.0;
        canvas.overlay(&rotated, x.round() as i32, y.round() as i32);
    }

    /// One row of four entries centred under the plot, shrunk to fit `outer`
    fn draw_legend(&self, canvas: &mut Canvas, outer: Rect, plot: Rect, text: &ChartText) {
        let m = self.metrics;
        let styles = [
            LineStyle::Solid,
            LineStyle::Dashed,
            LineStyle::Dotted,
            LineStyle::DashDot,
        ];

        let entry_width = |px: f32| -> f32 {
            let handle = px * 2.0;
            let gap = px * 0.8;
            text.legend
                .iter()
                .map(|label| handle + px * 0.4 + self.font.measure(label, px, false))
                .sum::<f32>()
                + gap * 3.0
        };

        let mut px = m.legend_px;
        let natural = entry_width(px);
        if natural > outer.w {
            px = (px * outer.w / natural).max(m.legend_px * 0.6);
        }

        let total = entry_width(px);
        let mut x = (plot.center_x() - total / 2.0).max(outer.x);
        let row_top = outer.bottom() - self.legend_height() + m.pad;
        let mid = row_top + self.font.line_height(px) / 2.0;

        for (label, style) in text.legend.iter().zip(styles) {
            canvas.hline(x, x + px * 2.0, mid, Stroke::styled(m.line_width, style));
            x += px * 2.0 + px * 0.4;
            self.font.draw(canvas, label, x, row_top, px, false, INK);
            x += self.font.measure(label, px, false) + px * 0.8;
        }
    }
}

fn fmt_value(v: f64) -> String {
    format!("{:.0}", v)
}
