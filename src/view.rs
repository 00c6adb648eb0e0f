//! The Viewport (spec §4.6): scroll position, the visible-line cache, lazy
//! per-line measurement, and the ensure-caret-visible scroll reconciliation.
//!
//! Grounded in the teacher's `Viewport` (first-line + height, with
//! `with_line_in_view` nudging the scroll offset towards a target line);
//! generalized here from a line-count viewport to a pixel-extent one since
//! the spec measures scrolling in pixels, not lines, and adds horizontal
//! scrolling driven by the longest-line cache.

use crate::buffer::document::Document;
use crate::measurement::TextMetrics;
use crate::region::Caret;

/// Insets around the text area, contributing to the content extent (spec
/// §4.6: "Content x-extent is the maximum over all measured lines of
/// `insets.left + pixel_width + insets.right`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Insets {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

/// One entry of the visible-line cache built by [`Viewport::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleLine {
    pub line_index: usize,
    pub y: u32,
}

/// The region that needs repainting after a mutation or scroll (spec §4.6
/// "Repaint granularity").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepaintRegion {
    /// A single line's rectangle, identified by index.
    Line(usize),
    /// The entire visible region (a scroll, or a multi-line mutation).
    Visible,
}

/// Hard cap on ensure-caret-visible reconciliation passes (spec §4.6,
/// §5 "Cancellation / timeouts").
const ENSURE_VISIBLE_MAX_ITERATIONS: u32 = 3;

#[derive(Debug)]
pub struct Viewport {
    width: u32,
    height: u32,
    insets: Insets,
    scroll_x: u32,
    scroll_y: u32,
    first_visible_line: usize,
    visible_lines: Vec<VisibleLine>,
    pending_repaint: Option<RepaintRegion>,
}

impl Viewport {
    pub fn new(width: u32, height: u32, insets: Insets) -> Self {
        Self {
            width,
            height,
            insets,
            scroll_x: 0,
            scroll_y: 0,
            first_visible_line: 0,
            visible_lines: Vec::new(),
            pending_repaint: None,
        }
    }

    pub fn scroll_x(&self) -> u32 {
        self.scroll_x
    }

    pub fn scroll_y(&self) -> u32 {
        self.scroll_y
    }

    pub fn first_visible_line(&self) -> usize {
        self.first_visible_line
    }

    pub fn visible_lines(&self) -> &[VisibleLine] {
        &self.visible_lines
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pending_repaint = Some(RepaintRegion::Visible);
    }

    pub fn mark_line_dirty(&mut self, line: usize) {
        self.pending_repaint = Some(match self.pending_repaint {
            Some(RepaintRegion::Visible) => RepaintRegion::Visible,
            _ => RepaintRegion::Line(line),
        });
    }

    pub fn mark_all_dirty(&mut self) {
        self.pending_repaint = Some(RepaintRegion::Visible);
    }

    pub fn take_repaint_region(&mut self) -> Option<RepaintRegion> {
        self.pending_repaint.take()
    }

    fn content_y_extent(&self, doc: &Document) -> u32 {
        doc.lines().content_y_extent() + self.insets.top + self.insets.bottom
    }

    /// Only already-measured lines count towards this extent (spec §4.6:
    /// unmeasured lines contribute nothing) — this never measures a line
    /// itself, it only reads the cache `refresh`/`ensure_caret_visible` fill
    /// in as lines become visible.
    fn content_x_extent(&self, doc: &mut Document) -> u32 {
        let width = doc.lines_mut().longest_line_width();
        width + self.insets.left + self.insets.right
    }

    fn max_scroll_y(&self, doc: &Document) -> u32 {
        self.content_y_extent(doc).saturating_sub(self.height)
    }

    fn max_scroll_x(&self, doc: &mut Document) -> u32 {
        self.content_x_extent(doc).saturating_sub(self.width)
    }

    fn clamp_scroll(&mut self, doc: &mut Document) {
        self.scroll_y = self.scroll_y.min(self.max_scroll_y(doc));
        self.scroll_x = self.scroll_x.min(self.max_scroll_x(doc));
    }

    pub fn set_scroll(&mut self, x: u32, y: u32, doc: &mut Document) {
        self.scroll_x = x;
        self.scroll_y = y;
        self.clamp_scroll(doc);
        self.pending_repaint = Some(RepaintRegion::Visible);
    }

    /// Recompute `first_visible_line` and the visible-line cache, measuring
    /// any not-yet-measured line that becomes visible (spec §4.6 "Lazy
    /// measurement").
    pub fn refresh(&mut self, doc: &mut Document, metrics: &dyn TextMetrics) {
        self.clamp_scroll(doc);
        self.first_visible_line = doc.lines().find_first_visible_line(self.scroll_y);

        self.visible_lines.clear();
        let bottom = self.scroll_y + self.height;
        let mut line = self.first_visible_line;
        loop {
            if line >= doc.line_count() {
                break;
            }
            if doc.lines().get(line).pixel_width.is_none() {
                let bytes = doc.line_bytes_for_measurement(line);
                let width = metrics.measure_string(&bytes);
                doc.lines_mut().set_measurement(line, width);
            }
            let y = doc.lines().get(line).y_position;
            if y >= bottom {
                break;
            }
            self.visible_lines.push(VisibleLine { line_index: line, y });
            line += 1;
        }

        // A newly-measured line may have grown past the current longest,
        // widening the horizontal scroll limit; reconcile once more.
        self.clamp_scroll(doc);
    }

    /// Scroll so `caret`'s pixel rectangle is fully visible, iterating up to
    /// [`ENSURE_VISIBLE_MAX_ITERATIONS`] times since a vertical scroll can
    /// reveal a longer line that in turn requires a horizontal scroll (spec
    /// §4.6 "Ensure-caret-visible").
    pub fn ensure_caret_visible(&mut self, doc: &mut Document, metrics: &dyn TextMetrics, caret: Caret) {
        for _ in 0..ENSURE_VISIBLE_MAX_ITERATIONS {
            self.refresh(doc, metrics);

            let line = *doc.lines().get(caret.line);
            let caret_y = line.y_position;
            let caret_bottom = caret_y + line.pixel_height;
            let bytes = doc.line_bytes_for_measurement(caret.line);
            let caret_x = metrics.measure_string(&bytes[..caret.byte.min(bytes.len())]);

            let mut stable = true;
            if caret_y < self.scroll_y {
                self.scroll_y = caret_y;
                stable = false;
            } else if caret_bottom > self.scroll_y + self.height {
                self.scroll_y = caret_bottom.saturating_sub(self.height);
                stable = false;
            }
            if caret_x < self.scroll_x {
                self.scroll_x = caret_x;
                stable = false;
            } else if caret_x > self.scroll_x + self.width {
                self.scroll_x = caret_x.saturating_sub(self.width);
                stable = false;
            }
            self.clamp_scroll(doc);
            if stable {
                break;
            }
        }
        self.pending_repaint = Some(RepaintRegion::Visible);
    }
}
