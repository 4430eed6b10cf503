//! Text layout engine
//!
//! Greedy word wrap driven by measured glyph widths, tuned for mixed
//! Latin/CJK text. CJK text has no spaces between words, so CJK punctuation
//! is turned into break opportunities when the text is mostly CJK.

/// Share of the budget actually used, leaves room for layout margins
pub const LAYOUT_MARGIN: f32 = 0.95;
/// Default share of the column width available to text
pub const DEFAULT_WIDTH_RATIO: f32 = 0.9;
/// A line is flushed once it holds more characters than this
pub const LINE_CHAR_CEILING: usize = 30;
/// Lines longer than this are re-split after wrapping
pub const POST_SPLIT_THRESHOLD: usize = 25;
/// Chunk size used by the re-split
pub const POST_SPLIT_CHUNK: usize = 12;
/// Maximum number of wrapped lines
pub const MAX_LINES: usize = 15;
/// Marker line appended when lines were dropped
pub const ELLIPSIS: &str = "...";

const CJK_PUNCTUATION: &str = "，。、；！？「」『』（）【】《》～·";
const LATIN_BREAKS: &[char] = &[',', ';'];

/// Rendered width of a string
pub trait TextMeasure {
    /// Width in pixels of `text` at `size_px`
    fn measure(&self, text: &str, size_px: f32, bold: bool) -> f32;
}

/// Wrap parameters
#[derive(Debug, Clone, Copy)]
pub struct WrapOptions {
    /// Width of the column the text goes into (px)
    pub available_width: f32,
    pub width_ratio: f32,
    pub size_px: f32,
    pub bold: bool,
}

impl WrapOptions {
    pub fn new(available_width: f32, size_px: f32) -> Self {
        Self {
            available_width,
            width_ratio: DEFAULT_WIDTH_RATIO,
            size_px,
            bold: false,
        }
    }

    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.width_ratio = ratio;
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Pixel budget a line must fit in
    pub fn budget(&self) -> f32 {
        self.available_width * self.width_ratio * LAYOUT_MARGIN
    }
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// More than 30% of the characters are CJK ideographs
pub fn is_mostly_cjk(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let cjk = text.chars().filter(|c| is_cjk(*c)).count();
    cjk as f32 / total as f32 > 0.3
}

/// Punctuation to spaces, whitespace runs collapsed
fn normalize(text: &str) -> String {
    let cjk = is_mostly_cjk(text);
    let replaced: String = text
        .chars()
        .map(|c| {
            if LATIN_BREAKS.contains(&c) || (cjk && CJK_PUNCTUATION.contains(c)) {
                ' '
            } else {
                c
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split into chunks of `size` characters
fn char_chunks(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// Wrap `text` into lines that fit the budget of `options`
///
/// Pure function of its input. Returns no lines for empty text.
pub fn wrap_text(measure: &dyn TextMeasure, text: &str, options: &WrapOptions) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let budget = options.budget();
    let width = |s: &str| measure.measure(s, options.size_px, options.bold);

    let processed = normalize(text);
    let mut words: Vec<String> = processed.split(' ').filter(|w| !w.is_empty()).map(str::to_string).collect();
    if words.is_empty() {
        words = text.chars().map(String::from).collect();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in words {
        let candidate = if current.is_empty() {
            word.clone()
        } else {
            format!("{} {}", current, word)
        };

        if width(&candidate) > budget {
            if !current.is_empty() {
                lines.push(current.trim().to_string());
            }

            if width(&word) > budget {
                // Estimated, not measured: degenerate input only
                let per_line = ((budget / (options.size_px * 0.7)) as usize).max(1);
                let mut segments = char_chunks(&word, per_line);
                let last = segments.pop().unwrap_or_default();
                lines.extend(segments);
                current = last;
            } else {
                current = word;
            }
        } else {
            current = candidate;
        }

        if current.chars().count() > LINE_CHAR_CEILING {
            lines.push(current.trim().to_string());
            current.clear();
        }
    }

    if !current.trim().is_empty() {
        lines.push(current.trim().to_string());
    }

    let mut result: Vec<String> = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.chars().count() > POST_SPLIT_THRESHOLD {
            result.extend(char_chunks(line, POST_SPLIT_CHUNK));
        } else {
            result.push(line.to_string());
        }
    }

    if result.len() > MAX_LINES {
        result.truncate(MAX_LINES);
        result.push(ELLIPSIS.to_string());
    }

    result
}
