//! Viewer state: document, page, zoom, selection mode and the drag gesture.
//!
//! Mode, drag and processing live in one [`ToolState`] so that dragging in
//! text mode, or toggling mode mid-drag, cannot be represented.

use tracing::{debug, info, warn};

use crate::bundle::ContextBundle;
use crate::capture::SelectionCapture;
use crate::config::{CaptureConfig, ViewerConfig};
use crate::document::{PageSource, RasterSurface};
use crate::error::{XrayError, XrayResult};
use crate::geometry::{normalize_rect, to_local_point, Bounds, Point, Rect, ScrollOffset};
use crate::sample::{SampleLayout, TextPosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Text,
    Area,
}

/// Rubber band in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragGesture {
    pub anchor: Point,
    pub current: Point,
}

impl DragGesture {
    pub fn rect(&self) -> Rect {
        normalize_rect(self.anchor, self.current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AreaState {
    Idle,
    Dragging(DragGesture),
    Processing,
}

/// Live text highlight in canvas pixels; `active` while the button is held
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextHighlight {
    pub anchor: Point,
    pub current: Point,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolState {
    Text { highlight: Option<TextHighlight> },
    Area(AreaState),
}

impl ToolState {
    pub fn mode(&self) -> SelectionMode {
        match self {
            ToolState::Text { .. } => SelectionMode::Text,
            ToolState::Area(_) => SelectionMode::Area,
        }
    }

    /// Idle for the purpose of mode toggles, navigation and zoom
    pub fn is_idle(&self) -> bool {
        !matches!(
            self,
            ToolState::Area(AreaState::Dragging(_)) | ToolState::Area(AreaState::Processing)
        )
    }
}

pub struct LoadedDocument<D> {
    pub source: D,
    pub name: String,
    pub page: usize,
    pub surface: RasterSurface,
}

pub enum DocumentState<D> {
    NoDocument,
    Loaded(LoadedDocument<D>),
}

/// What a pointer release produced
#[derive(Debug)]
pub enum PointerOutcome {
    /// Nothing to do (no gesture in progress, wrong state, outside the page)
    Ignored,
    /// Selection too small; back to idle
    Discarded,
    /// Area captured; the controller stays `Processing` until
    /// [`ViewerController::finish_processing`]
    Captured(ContextBundle),
    /// Primary crop failed; back to idle, nothing sent
    CaptureFailed(XrayError),
    /// Text selection accepted; mode and drag state are untouched
    TextCaptured(ContextBundle),
}

pub struct ViewerController<D: PageSource> {
    document: DocumentState<D>,
    tool: ToolState,
    zoom: f32,
    viewport: Bounds,
    scroll: ScrollOffset,
    sample: SampleLayout,
    viewer: ViewerConfig,
    capture: CaptureConfig,
}

impl<D: PageSource> ViewerController<D> {
    pub fn new(viewer: ViewerConfig, capture: CaptureConfig) -> Self {
        let zoom = viewer.initial_zoom.clamp(viewer.min_zoom, viewer.max_zoom);
        Self {
            document: DocumentState::NoDocument,
            tool: ToolState::Text { highlight: None },
            zoom,
            viewport: Bounds::default(),
            scroll: ScrollOffset::default(),
            sample: SampleLayout::new(72),
            viewer,
            capture,
        }
    }

    // ---- accessors ----

    pub fn document(&self) -> &DocumentState<D> {
        &self.document
    }

    pub fn loaded(&self) -> Option<&LoadedDocument<D>> {
        match &self.document {
            DocumentState::Loaded(doc) => Some(doc),
            DocumentState::NoDocument => None,
        }
    }

    pub fn tool(&self) -> ToolState {
        self.tool
    }

    pub fn mode(&self) -> SelectionMode {
        self.tool.mode()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn scroll(&self) -> ScrollOffset {
        self.scroll
    }

    pub fn viewport(&self) -> Bounds {
        self.viewport
    }

    pub fn sample(&self) -> &SampleLayout {
        &self.sample
    }

    pub fn current_page(&self) -> Option<usize> {
        self.loaded().map(|doc| doc.page)
    }

    pub fn page_count(&self) -> Option<usize> {
        self.loaded().map(|doc| doc.source.page_count())
    }

    pub fn can_go_next(&self) -> bool {
        self.tool.is_idle() && self.loaded().map_or(false, |d| d.page < d.source.page_count())
    }

    pub fn can_go_prev(&self) -> bool {
        self.tool.is_idle() && self.loaded().map_or(false, |d| d.page > 1)
    }

    fn cell_size(&self) -> (f64, f64) {
        (
            self.viewer.cell_width_px.max(1) as f64,
            self.viewer.cell_height_px.max(1) as f64,
        )
    }

    /// Canvas size in pixels: the page raster, or the wrapped sample passage
    pub fn content_size(&self) -> (f64, f64) {
        match &self.document {
            DocumentState::Loaded(doc) => {
                let (w, h) = doc.surface.dimensions();
                (w as f64, h as f64)
            }
            DocumentState::NoDocument => {
                let (cw, ch) = self.cell_size();
                (
                    self.sample.width() as f64 * cw,
                    self.sample.lines().len() as f64 * ch,
                )
            }
        }
    }

    /// Highlighted sample span `(anchor, current)` in text positions
    pub fn sample_highlight(&self) -> Option<(TextPosition, TextPosition)> {
        match (&self.document, self.tool) {
            (DocumentState::NoDocument, ToolState::Text { highlight: Some(h) }) => {
                let (cw, ch) = self.cell_size();
                Some((
                    self.sample.position_at(h.anchor, cw, ch),
                    self.sample.position_at(h.current, cw, ch),
                ))
            }
            _ => None,
        }
    }

    /// Highlight rectangle on a loaded page, in canvas pixels
    pub fn page_highlight(&self) -> Option<Rect> {
        match (&self.document, self.tool) {
            (DocumentState::Loaded(_), ToolState::Text { highlight: Some(h) }) => {
                Some(normalize_rect(h.anchor, h.current))
            }
            _ => None,
        }
    }

    // ---- document ----

    /// Replace the document and reset to page 1. An in-flight capture keeps running.
    pub fn load_document(&mut self, source: D, name: impl Into<String>) -> XrayResult<()> {
        let surface = source.render_page(1, self.zoom)?;
        let name = name.into();
        info!("Opened {} ({} pages)", name, source.page_count());

        self.document = DocumentState::Loaded(LoadedDocument {
            source,
            name,
            page: 1,
            surface,
        });
        self.scroll = ScrollOffset::default();
        self.tool = match self.tool {
            ToolState::Text { .. } => ToolState::Text { highlight: None },
            ToolState::Area(AreaState::Processing) => ToolState::Area(AreaState::Processing),
            ToolState::Area(_) => ToolState::Area(AreaState::Idle),
        };
        Ok(())
    }

    /// Toggle text/area selection. Only legal while idle.
    pub fn set_mode(&mut self, mode: SelectionMode) -> bool {
        if !self.tool.is_idle() {
            debug!("Mode change to {:?} refused while busy", mode);
            return false;
        }
        if self.tool.mode() == mode {
            return false;
        }
        self.tool = match mode {
            SelectionMode::Text => ToolState::Text { highlight: None },
            SelectionMode::Area => ToolState::Area(AreaState::Idle),
        };
        true
    }

    // ---- navigation ----

    pub fn next_page(&mut self) -> XrayResult<bool> {
        if !self.can_go_next() {
            return Ok(false);
        }
        self.go_to(self.current_page().unwrap_or(1) + 1)
    }

    pub fn prev_page(&mut self) -> XrayResult<bool> {
        if !self.can_go_prev() {
            return Ok(false);
        }
        self.go_to(self.current_page().unwrap_or(1) - 1)
    }

    fn go_to(&mut self, page: usize) -> XrayResult<bool> {
        let zoom = self.zoom;
        let DocumentState::Loaded(doc) = &mut self.document else {
            return Ok(false);
        };
        let surface = doc.source.render_page(page, zoom)?;
        doc.page = page;
        doc.surface = surface;
        self.scroll = ScrollOffset::default();
        if let ToolState::Text { highlight } = &mut self.tool {
            *highlight = None;
        }
        debug!("Page {}", page);
        Ok(true)
    }

    pub fn zoom_in(&mut self) -> XrayResult<bool> {
        self.set_zoom(self.zoom + self.viewer.zoom_step)
    }

    pub fn zoom_out(&mut self) -> XrayResult<bool> {
        self.set_zoom(self.zoom - self.viewer.zoom_step)
    }

    fn set_zoom(&mut self, zoom: f32) -> XrayResult<bool> {
        if !self.tool.is_idle() {
            return Ok(false);
        }
        let zoom = zoom.clamp(self.viewer.min_zoom, self.viewer.max_zoom);
        if (zoom - self.zoom).abs() < f32::EPSILON {
            return Ok(false);
        }

        if let DocumentState::Loaded(doc) = &mut self.document {
            doc.surface = doc.source.render_page(doc.page, zoom)?;
        }
        self.zoom = zoom;
        if let ToolState::Text { highlight } = &mut self.tool {
            *highlight = None;
        }
        self.clamp_scroll();
        debug!("Zoom {:.2}", zoom);
        Ok(true)
    }

    // ---- viewport ----

    /// Where the document pane sits on screen, in screen pixels
    pub fn set_viewport(&mut self, viewport: Bounds) {
        self.viewport = viewport;
        let (cw, _) = self.cell_size();
        let columns = (viewport.width / cw).floor().max(1.0) as usize;
        if columns != self.sample.width() {
            self.sample = SampleLayout::new(columns);
        }
        self.clamp_scroll();
    }

    pub fn scroll_by(&mut self, dx: f64, dy: f64) {
        self.scroll.x += dx;
        self.scroll.y += dy;
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        let (w, h) = self.content_size();
        let max_x = (w - self.viewport.width).max(0.0);
        let max_y = (h - self.viewport.height).max(0.0);
        self.scroll.x = self.scroll.x.clamp(0.0, max_x);
        self.scroll.y = self.scroll.y.clamp(0.0, max_y);
    }

    // ---- pointer ----

    pub fn pointer_down(&mut self, screen: Point) -> bool {
        if !self.viewport.contains(screen) {
            // A press anywhere else drops the old highlight
            if let ToolState::Text { highlight } = &mut self.tool {
                *highlight = None;
            }
            return false;
        }
        let local = to_local_point(screen, self.viewport, self.scroll);

        match self.tool {
            ToolState::Text { .. } => {
                self.tool = ToolState::Text {
                    highlight: Some(TextHighlight {
                        anchor: local,
                        current: local,
                        active: true,
                    }),
                };
                true
            }
            ToolState::Area(AreaState::Idle) if self.loaded().is_some() => {
                self.tool = ToolState::Area(AreaState::Dragging(DragGesture {
                    anchor: local,
                    current: local,
                }));
                true
            }
            ToolState::Area(_) => false,
        }
    }

    pub fn pointer_move(&mut self, screen: Point) -> bool {
        let local = to_local_point(screen, self.viewport, self.scroll);
        match &mut self.tool {
            ToolState::Text {
                highlight: Some(h),
            } if h.active => {
                h.current = local;
                true
            }
            ToolState::Area(AreaState::Dragging(drag)) => {
                drag.current = local;
                true
            }
            _ => false,
        }
    }

    pub fn pointer_up(&mut self, screen: Point) -> PointerOutcome {
        let local = to_local_point(screen, self.viewport, self.scroll);
        match self.tool {
            ToolState::Text { highlight } => self.release_text(highlight, local),
            ToolState::Area(AreaState::Dragging(drag)) => {
                let drag = DragGesture {
                    current: local,
                    ..drag
                };
                self.release_area(drag.rect())
            }
            ToolState::Area(_) => PointerOutcome::Ignored,
        }
    }

    fn release_text(&mut self, highlight: Option<TextHighlight>, local: Point) -> PointerOutcome {
        let Some(mut h) = highlight.filter(|h| h.active) else {
            return PointerOutcome::Ignored;
        };
        h.current = local;
        h.active = false;
        self.tool = ToolState::Text { highlight: Some(h) };

        let selection = match self.live_selection(&h) {
            Ok(text) => text,
            Err(e) => {
                warn!("Text layer query failed: {}", e);
                return PointerOutcome::Ignored;
            }
        };

        match crate::capture::capture_text(&selection, self.capture.min_text_chars) {
            Some(bundle) => PointerOutcome::TextCaptured(bundle),
            None => PointerOutcome::Ignored,
        }
    }

    /// Whatever text the highlight currently covers
    fn live_selection(&self, h: &TextHighlight) -> XrayResult<String> {
        match &self.document {
            DocumentState::NoDocument => {
                let (cw, ch) = self.cell_size();
                let a = self.sample.position_at(h.anchor, cw, ch);
                let b = self.sample.position_at(h.current, cw, ch);
                Ok(self.sample.selection_text(a, b))
            }
            DocumentState::Loaded(doc) => {
                let region = normalize_rect(h.anchor, h.current);
                doc.source.text_in_region(doc.page, self.zoom, region)
            }
        }
    }

    fn release_area(&mut self, rect: Rect) -> PointerOutcome {
        let DocumentState::Loaded(doc) = &self.document else {
            self.tool = ToolState::Area(AreaState::Idle);
            return PointerOutcome::Ignored;
        };

        let capture = SelectionCapture::new(&doc.source, &self.capture);
        match capture.capture_area(rect, &doc.surface, doc.page) {
            Ok(Some(bundle)) => {
                self.tool = ToolState::Area(AreaState::Processing);
                PointerOutcome::Captured(bundle)
            }
            Ok(None) => {
                self.tool = ToolState::Area(AreaState::Idle);
                PointerOutcome::Discarded
            }
            Err(e) => {
                warn!("Area capture failed: {}", e);
                self.tool = ToolState::Area(AreaState::Idle);
                PointerOutcome::CaptureFailed(e)
            }
        }
    }

    /// The analysis for the last capture resolved (or was gated); back to idle
    pub fn finish_processing(&mut self) {
        if let ToolState::Area(AreaState::Processing) = self.tool {
            self.tool = ToolState::Area(AreaState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;

    fn controller() -> ViewerController<MemoryDocument> {
        let mut c = ViewerController::new(ViewerConfig::default(), CaptureConfig::default());
        c.set_viewport(Bounds {
            left: 80.0,
            top: 32.0,
            width: 640.0,
            height: 480.0,
        });
        c
    }

    fn loaded(pages: usize) -> ViewerController<MemoryDocument> {
        let mut c = controller();
        c.load_document(MemoryDocument::new(pages, 400, 600), "paper.pdf")
            .unwrap();
        c
    }

    fn drag(c: &mut ViewerController<MemoryDocument>, from: Point, to: Point) -> PointerOutcome {
        assert!(c.pointer_down(from));
        c.pointer_move(to);
        c.pointer_up(to)
    }

    #[test]
    fn test_load_resets_to_first_page() {
        let mut c = loaded(3);
        assert!(c.next_page().unwrap());
        assert_eq!(c.current_page(), Some(2));

        c.load_document(MemoryDocument::new(5, 400, 600), "other.pdf")
            .unwrap();
        assert_eq!(c.current_page(), Some(1));
        assert_eq!(c.page_count(), Some(5));
        assert_eq!(c.loaded().unwrap().name, "other.pdf");
    }

    #[test]
    fn test_navigation_stops_at_bounds() {
        let mut c = loaded(2);
        assert!(!c.can_go_prev());
        assert!(!c.prev_page().unwrap());
        assert!(c.next_page().unwrap());
        assert!(!c.next_page().unwrap());
        assert_eq!(c.current_page(), Some(2));
    }

    #[test]
    fn test_zoom_clamps_and_rerenders() {
        let mut c = loaded(1);
        assert_eq!(c.loaded().unwrap().surface.width(), 600);

        assert!(c.zoom_in().unwrap());
        assert_eq!(c.zoom(), 1.75);
        assert_eq!(c.loaded().unwrap().surface.width(), 700);

        for _ in 0..20 {
            c.zoom_out().unwrap();
        }
        assert_eq!(c.zoom(), 0.5);
        assert!(!c.zoom_out().unwrap());
    }

    #[test]
    fn test_area_drag_captures_and_holds_processing() {
        let mut c = loaded(3);
        assert!(c.set_mode(SelectionMode::Area));

        let outcome = drag(&mut c, Point::new(200.0, 150.0), Point::new(140.0, 90.0));
        let PointerOutcome::Captured(bundle) = outcome else {
            panic!("expected a capture, got {:?}", outcome);
        };
        let image = bundle.primary_image().unwrap();
        assert_eq!((image.width, image.height), (60, 60));
        assert!(bundle.prev_page().is_none());
        assert_eq!(c.tool(), ToolState::Area(AreaState::Processing));

        // busy: no mode toggle, navigation or new drag
        assert!(!c.set_mode(SelectionMode::Text));
        assert!(!c.next_page().unwrap());
        assert!(!c.pointer_down(Point::new(200.0, 200.0)));

        c.finish_processing();
        assert_eq!(c.tool(), ToolState::Area(AreaState::Idle));
    }

    #[test]
    fn test_small_drag_is_discarded() {
        let mut c = loaded(1);
        c.set_mode(SelectionMode::Area);

        let outcome = drag(&mut c, Point::new(100.0, 100.0), Point::new(108.0, 140.0));
        assert!(matches!(outcome, PointerOutcome::Discarded));
        assert_eq!(c.tool(), ToolState::Area(AreaState::Idle));
    }

    #[test]
    fn test_dragging_blocks_navigation_and_mode() {
        let mut c = loaded(3);
        c.set_mode(SelectionMode::Area);
        assert!(c.pointer_down(Point::new(100.0, 100.0)));

        assert!(matches!(c.tool(), ToolState::Area(AreaState::Dragging(_))));
        assert!(!c.set_mode(SelectionMode::Text));
        assert!(!c.next_page().unwrap());
        assert!(!c.zoom_in().unwrap());
    }

    #[test]
    fn test_area_needs_document() {
        let mut c = controller();
        assert!(c.set_mode(SelectionMode::Area));
        assert!(!c.pointer_down(Point::new(100.0, 100.0)));
        assert!(matches!(
            c.pointer_up(Point::new(300.0, 300.0)),
            PointerOutcome::Ignored
        ));
    }

    #[test]
    fn test_pointer_outside_viewport_ignored() {
        let mut c = loaded(1);
        c.set_mode(SelectionMode::Area);
        assert!(!c.pointer_down(Point::new(10.0, 10.0)));
    }

    #[test]
    fn test_scroll_offsets_the_crop() {
        let mut c = loaded(1);
        c.set_mode(SelectionMode::Area);
        c.scroll_by(0.0, 100.0);
        assert_eq!(c.scroll().y, 100.0);

        assert!(c.pointer_down(Point::new(80.0, 32.0)));
        match c.tool() {
            ToolState::Area(AreaState::Dragging(d)) => assert_eq!(d.anchor, Point::new(0.0, 100.0)),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_sample_text_selection() {
        let mut c = controller();
        // cells are 8x16; viewport origin is (80, 32)
        let start = Point::new(80.0 + 4.0 * 8.0, 32.0 + 4.0);
        let end = Point::new(80.0 + 13.0 * 8.0, 32.0 + 4.0);

        let outcome = drag(&mut c, start, end);
        let PointerOutcome::TextCaptured(bundle) = outcome else {
            panic!("expected text capture, got {:?}", outcome);
        };
        assert_eq!(bundle.text(), Some("Attention"));
        assert_eq!(c.mode(), SelectionMode::Text);
        assert!(c.sample_highlight().is_some());
    }

    #[test]
    fn test_click_outside_pane_does_not_resend_selection() {
        let mut c = controller();
        let start = Point::new(80.0 + 4.0 * 8.0, 32.0 + 4.0);
        let end = Point::new(80.0 + 13.0 * 8.0, 32.0 + 4.0);
        assert!(matches!(
            drag(&mut c, start, end),
            PointerOutcome::TextCaptured(_)
        ));

        let elsewhere = Point::new(1000.0, 300.0);
        assert!(!c.pointer_down(elsewhere));
        assert!(matches!(c.pointer_up(elsewhere), PointerOutcome::Ignored));
        assert!(c.sample_highlight().is_none());
    }

    #[test]
    fn test_release_without_press_is_ignored() {
        let mut c = controller();
        let start = Point::new(80.0 + 4.0 * 8.0, 32.0 + 4.0);
        let end = Point::new(80.0 + 13.0 * 8.0, 32.0 + 4.0);
        drag(&mut c, start, end);

        // highlight is finished; a stray release must not capture it again
        assert!(matches!(c.pointer_up(end), PointerOutcome::Ignored));
        assert!(c.sample_highlight().is_some());
    }

    #[test]
    fn test_short_text_selection_ignored() {
        let mut c = controller();
        let start = Point::new(80.0, 32.0 + 4.0);
        let end = Point::new(80.0 + 2.0 * 8.0, 32.0 + 4.0);
        assert!(matches!(drag(&mut c, start, end), PointerOutcome::Ignored));
    }

    #[test]
    fn test_page_text_selection_uses_text_layer() {
        let mut c = controller();
        c.load_document(
            MemoryDocument::new(2, 400, 600).with_text(1, "QK^T / sqrt(dk)"),
            "paper.pdf",
        )
        .unwrap();

        let outcome = drag(&mut c, Point::new(100.0, 100.0), Point::new(300.0, 120.0));
        let PointerOutcome::TextCaptured(bundle) = outcome else {
            panic!("expected text capture, got {:?}", outcome);
        };
        assert_eq!(bundle.text(), Some("QK^T / sqrt(dk)"));
        assert!(c.page_highlight().is_some());
    }
}
