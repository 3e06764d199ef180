//! Windowed rendering of large text documents.
//!
//! A [`TextDocument`] owns the full text plus a line-start index built once in
//! O(n). Every scroll event asks the document for a fresh [`WindowLayout`]: the
//! byte range worth rendering (visible viewport plus an overscan margin on both
//! sides) and the heights of the spacers that stand in for everything outside it.
//!
//! Heights are expressed in abstract "pixels". The terminal viewer uses a line
//! height of 1 so a pixel is a row; the defaults (20 per line, 100 lines of
//! overscan) match a proportional-font renderer.
//!
//! Every line is assumed to occupy exactly one line height. Very long lines that
//! wrap to several rows are not measured; the scroll extent is an approximation
//! in that case.

/// Default height of one line, in pixels.
pub const DEFAULT_LINE_HEIGHT: u64 = 20;

/// Default number of lines rendered above and below the viewport.
pub const DEFAULT_OVERSCAN_LINES: u64 = 100;

/// Fixed geometry used to translate between pixels and lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMetrics {
    /// Height of one line. Values of zero are treated as one.
    pub line_height: u64,
    /// Extra lines rendered on each side of the viewport.
    pub overscan_lines: u64,
}

impl Default for WindowMetrics {
    fn default() -> Self {
        Self {
            line_height: DEFAULT_LINE_HEIGHT,
            overscan_lines: DEFAULT_OVERSCAN_LINES,
        }
    }
}

impl WindowMetrics {
    /// Metrics for a row-addressed display: one row per line.
    pub fn rows(overscan_lines: u64) -> Self {
        Self { line_height: 1, overscan_lines }
    }
}

/// Byte range of the document that is actually rendered.
///
/// Always satisfies `start <= end <= text.len()`, and both ends fall on line
/// boundaries (so they are always valid `char` boundaries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleWindow {
    pub start: usize,
    pub end: usize,
}

impl VisibleWindow {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Result of one window recomputation.
///
/// `top_padding + rendered_height() + bottom_padding == total_height` holds for
/// every layout, so the scroll extent never changes when the window moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowLayout {
    pub window: VisibleWindow,
    /// First rendered line (inclusive).
    pub start_line: usize,
    /// Last rendered line (exclusive).
    pub end_line: usize,
    /// Height of all lines before `start_line`.
    pub top_padding: u64,
    /// Height of all lines from `end_line` to the end of the document.
    pub bottom_padding: u64,
    /// Height of the whole, unwindowed document.
    pub total_height: u64,
}

impl WindowLayout {
    pub fn rendered_lines(&self) -> usize {
        self.end_line - self.start_line
    }

    pub fn rendered_height(&self) -> u64 {
        self.total_height - self.top_padding - self.bottom_padding
    }
}

/// Immutable document text with a line-start index.
///
/// `line_starts[i]` is the byte offset where line `i` begins; the final entry is
/// a sentinel equal to `text.len() + 1` (the start of a virtual line after the
/// last newline-terminated one). An empty document has no lines and an index of
/// `[0]`.
#[derive(Debug, Clone)]
pub struct TextDocument {
    text: String,
    line_starts: Vec<usize>,
}

impl TextDocument {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = build_line_index(&text);
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of `\n`-separated lines (a trailing newline starts one more, empty line).
    pub fn line_count(&self) -> usize {
        self.line_starts.len() - 1
    }

    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    /// Byte offset of the start of `line`, clamped to the text length.
    pub fn offset_of_line(&self, line: usize) -> usize {
        let idx = line.min(self.line_count());
        self.line_starts[idx].min(self.text.len())
    }

    /// Line containing byte `offset`. Offsets past the end map to the last line.
    pub fn line_of_offset(&self, offset: usize) -> usize {
        if self.line_count() == 0 {
            return 0;
        }
        let idx = self.line_starts.partition_point(|&start| start <= offset);
        idx.saturating_sub(1).min(self.line_count() - 1)
    }

    /// Text of `line` without its trailing newline, or `None` past the last line.
    pub fn line(&self, line: usize) -> Option<&str> {
        if line >= self.line_count() {
            return None;
        }
        let start = self.line_starts[line];
        let end = (self.line_starts[line + 1] - 1).min(self.text.len());
        Some(&self.text[start..end])
    }

    /// Total document height under `metrics`.
    pub fn total_height(&self, metrics: WindowMetrics) -> u64 {
        self.line_count() as u64 * metrics.line_height.max(1)
    }

    /// Computes the window to render for a viewport at `scroll_top` of height
    /// `viewport_height`.
    ///
    /// Scroll positions beyond the end of the content are clamped; the result for
    /// an empty document is an empty window with no padding.
    pub fn recompute_window(
        &self,
        metrics: WindowMetrics,
        scroll_top: u64,
        viewport_height: u64,
    ) -> WindowLayout {
        let line_height = metrics.line_height.max(1);
        let total_lines = self.line_count() as u64;
        let total_height = total_lines * line_height;

        let first_visible = scroll_top / line_height;
        let last_visible = scroll_top.saturating_add(viewport_height).div_ceil(line_height);

        let end_line = last_visible
            .saturating_add(metrics.overscan_lines)
            .min(total_lines);
        let start_line = first_visible
            .saturating_sub(metrics.overscan_lines)
            .min(end_line);

        let top_padding = start_line * line_height;
        let rendered = (end_line - start_line) * line_height;
        let bottom_padding = total_height.saturating_sub(top_padding + rendered);

        let start_line = start_line as usize;
        let end_line = end_line as usize;

        WindowLayout {
            window: VisibleWindow {
                start: self.offset_of_line(start_line),
                end: self.offset_of_line(end_line),
            },
            start_line,
            end_line,
            top_padding,
            bottom_padding,
            total_height,
        }
    }

    /// The substring covered by `window`.
    pub fn visible_text(&self, window: &VisibleWindow) -> &str {
        let end = window.end.min(self.text.len());
        let start = window.start.min(end);
        &self.text[start..end]
    }

    /// Iterates the lines covered by `layout`, without newline terminators.
    pub fn visible_lines<'a>(&'a self, layout: &WindowLayout) -> impl Iterator<Item = &'a str> + 'a {
        (layout.start_line..layout.end_line).filter_map(move |i| self.line(i))
    }
}

fn build_line_index(text: &str) -> Vec<usize> {
    if text.is_empty() {
        return vec![0];
    }
    let mut starts = Vec::with_capacity(text.len() / 40 + 2);
    starts.push(0);
    starts.extend(
        text.bytes()
            .enumerate()
            .filter(|&(_, b)| b == b'\n')
            .map(|(i, _)| i + 1),
    );
    starts.push(text.len() + 1);
    starts
}

/// Heuristic check for markup content that must not be windowed.
///
/// Slicing markup by byte offset would cut tags apart, so content that starts
/// with `<` or contains a table or anchor tag goes to the markup renderer whole.
pub fn is_markup(text: &str) -> bool {
    if text.trim_start().starts_with('<') {
        return true;
    }
    contains_ignore_ascii_case(text, "<table") || contains_ignore_ascii_case(text, "<a ")
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}
