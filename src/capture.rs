//! Selection capture: turns a rubber-band rectangle or a text highlight into
//! a [`ContextBundle`].
//!
//! The crop is the analysis subject and is kept lossless (PNG). The full
//! current page and the previous page ride along as JPEG context rendered at a
//! fixed scale, independent of the viewer zoom. Only the previous page is ever
//! sent; papers define terms before they use them.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::{debug, warn};

use crate::bundle::ContextBundle;
use crate::config::CaptureConfig;
use crate::document::{PageSource, RasterSurface};
use crate::error::{XrayError, XrayResult};
use crate::geometry::Rect;
use crate::logging::PerformanceTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
        }
    }
}

/// Encoded raster for a single request; never cached
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub mime: ImageMime,
    pub bytes: Vec<u8>,
    /// 1-based page the pixels came from
    pub page: usize,
    pub width: u32,
    pub height: u32,
}

/// Capture settings plus the page source used for context renders
pub struct SelectionCapture<'a, D: PageSource> {
    source: &'a D,
    settings: &'a CaptureConfig,
}

impl<'a, D: PageSource> SelectionCapture<'a, D> {
    pub fn new(source: &'a D, settings: &'a CaptureConfig) -> Self {
        Self { source, settings }
    }

    /// Capture an area selection made on `surface`, the live render of `page`.
    ///
    /// `Ok(None)` means the rectangle was click noise. Errors mean the primary
    /// crop failed and nothing may be sent.
    pub fn capture_area(
        &self,
        rect: Rect,
        surface: &RasterSurface,
        page: usize,
    ) -> XrayResult<Option<ContextBundle>> {
        if !rect.exceeds(self.settings.min_selection_px) {
            debug!(
                "Discarding {:.0}x{:.0} selection below {}px",
                rect.width, rect.height, self.settings.min_selection_px
            );
            return Ok(None);
        }

        let timer = PerformanceTimer::start(format!("capture page {}", page));

        let crop = crop_region(surface, &rect)?;
        let image = PageImage {
            mime: ImageMime::Png,
            width: crop.width(),
            height: crop.height(),
            bytes: encode_png(&crop)?,
            page,
        };
        timer.checkpoint("crop");

        let full_page = self.render_context(page);
        let prev_page = if page > 1 {
            self.render_context(page - 1)
        } else {
            None
        };
        timer.checkpoint("context");

        Ok(Some(ContextBundle::Area {
            image,
            full_page,
            prev_page,
        }))
    }

    /// Text-mode capture; see [`capture_text`]
    pub fn capture_text(&self, selection: &str) -> Option<ContextBundle> {
        capture_text(selection, self.settings.min_text_chars)
    }

    /// Optional context page; any failure just drops it from the bundle
    fn render_context(&self, page: usize) -> Option<PageImage> {
        let result = self
            .source
            .render_page(page, self.settings.context_scale)
            .and_then(|surface| {
                let (width, height) = surface.dimensions();
                let bytes = encode_jpeg(surface, self.settings.jpeg_quality)?;
                Ok(PageImage {
                    mime: ImageMime::Jpeg,
                    bytes,
                    page,
                    width,
                    height,
                })
            });

        match result {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Context page {} omitted: {}", page, e);
                None
            }
        }
    }
}

/// Accept a text selection of at least `min_chars` characters, verbatim
pub fn capture_text(selection: &str, min_chars: usize) -> Option<ContextBundle> {
    if selection.chars().count() < min_chars {
        debug!("Ignoring {}-character text selection", selection.chars().count());
        return None;
    }
    Some(ContextBundle::Text {
        text: selection.to_string(),
    })
}

/// Copy the pixels under `rect` into a bitmap of exactly `rect`'s size.
///
/// A direct region copy, no resampling. Parts of the rectangle hanging off the
/// surface stay transparent; a rectangle entirely off the surface is an error.
pub fn crop_region(surface: &RgbaImage, rect: &Rect) -> XrayResult<RgbaImage> {
    let (x, y, width, height) = rect.pixel_region();
    if width == 0 || height == 0 {
        return Err(XrayError::capture("selection has no area"));
    }

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + width as i64).min(surface.width() as i64);
    let y1 = (y + height as i64).min(surface.height() as i64);
    if x0 >= x1 || y0 >= y1 {
        return Err(XrayError::capture("selection lies outside the rendered page"));
    }

    let visible = imageops::crop_imm(
        surface,
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    )
    .to_image();

    let mut out = RgbaImage::new(width, height);
    imageops::replace(&mut out, &visible, x0 - x, y0 - y);
    Ok(out)
}

pub fn encode_png(image: &RgbaImage) -> XrayResult<Vec<u8>> {
    let mut data = Vec::new();
    image.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)?;
    Ok(data)
}

/// JPEG has no alpha channel; flatten to RGB first
pub fn encode_jpeg(surface: RasterSurface, quality: u8) -> XrayResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(surface).to_rgb8();
    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, quality).encode_image(&rgb)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::check_page;
    use image::Rgba;
    use std::cell::RefCell;

    /// Solid-colour pages; records every render request
    struct FakeDocument {
        pages: usize,
        failing: Vec<usize>,
        renders: RefCell<Vec<(usize, f32)>>,
    }

    impl FakeDocument {
        fn new(pages: usize) -> Self {
            Self {
                pages,
                failing: Vec::new(),
                renders: RefCell::new(Vec::new()),
            }
        }
    }

    impl PageSource for FakeDocument {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn render_page(&self, page: usize, scale: f32) -> XrayResult<RasterSurface> {
            check_page(page, self.pages)?;
            self.renders.borrow_mut().push((page, scale));
            if self.failing.contains(&page) {
                return Err(XrayError::render(page, "simulated failure"));
            }
            let side = (100.0 * scale) as u32;
            Ok(RgbaImage::from_pixel(side, side, Rgba([page as u8, 0, 0, 255])))
        }

        fn text_in_region(&self, _page: usize, _scale: f32, _region: Rect) -> XrayResult<String> {
            Ok(String::new())
        }
    }

    fn gradient_surface(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 7, 255]))
    }

    #[test]
    fn test_crop_is_exact_pixel_copy() {
        let surface = gradient_surface(200, 200);
        let crop = crop_region(&surface, &Rect::new(30.0, 40.0, 50.0, 20.0)).unwrap();

        assert_eq!(crop.dimensions(), (50, 20));
        assert_eq!(*crop.get_pixel(0, 0), Rgba([30, 40, 7, 255]));
        assert_eq!(*crop.get_pixel(49, 19), Rgba([79, 59, 7, 255]));
    }

    #[test]
    fn test_crop_overhanging_edge_keeps_requested_size() {
        let surface = gradient_surface(100, 100);
        let crop = crop_region(&surface, &Rect::new(80.0, 90.0, 40.0, 30.0)).unwrap();

        assert_eq!(crop.dimensions(), (40, 30));
        assert_eq!(*crop.get_pixel(0, 0), Rgba([80, 90, 7, 255]));
        assert_eq!(crop.get_pixel(25, 5)[3], 0);
    }

    #[test]
    fn test_crop_outside_surface_fails() {
        let surface = gradient_surface(100, 100);
        let err = crop_region(&surface, &Rect::new(150.0, 150.0, 40.0, 40.0)).unwrap_err();
        assert!(matches!(err, XrayError::Capture { .. }));
    }

    #[test]
    fn test_narrow_rect_produces_no_bundle() {
        let doc = FakeDocument::new(3);
        let settings = CaptureConfig::default();
        let capture = SelectionCapture::new(&doc, &settings);
        let surface = gradient_surface(200, 200);

        let bundle = capture
            .capture_area(Rect::new(10.0, 10.0, 8.0, 40.0), &surface, 2)
            .unwrap();
        assert!(bundle.is_none());
        assert!(doc.renders.borrow().is_empty());
    }

    #[test]
    fn test_area_capture_on_first_page_has_no_previous_page() {
        let doc = FakeDocument::new(3);
        let settings = CaptureConfig::default();
        let capture = SelectionCapture::new(&doc, &settings);
        let surface = gradient_surface(200, 200);

        let bundle = capture
            .capture_area(Rect::new(10.0, 10.0, 50.0, 50.0), &surface, 1)
            .unwrap()
            .unwrap();

        match bundle {
            ContextBundle::Area {
                image,
                full_page,
                prev_page,
            } => {
                assert_eq!(image.mime, ImageMime::Png);
                assert_eq!((image.width, image.height), (50, 50));
                assert!(image.bytes.starts_with(&[0x89, b'P', b'N', b'G']));
                let full = full_page.expect("full page context");
                assert_eq!(full.mime, ImageMime::Jpeg);
                assert_eq!(full.page, 1);
                assert!(full.bytes.starts_with(&[0xff, 0xd8, 0xff]));
                assert!(prev_page.is_none());
            }
            other => panic!("expected area bundle, got {:?}", other),
        }
        assert_eq!(*doc.renders.borrow(), vec![(1, 1.0)]);
    }

    #[test]
    fn test_area_capture_renders_previous_page_at_context_scale() {
        let doc = FakeDocument::new(3);
        let settings = CaptureConfig::default();
        let capture = SelectionCapture::new(&doc, &settings);
        let surface = gradient_surface(300, 300);

        let bundle = capture
            .capture_area(Rect::new(0.0, 0.0, 60.0, 60.0), &surface, 3)
            .unwrap()
            .unwrap();

        assert!(bundle.prev_page().map(|p| p.page) == Some(2));
        assert!(bundle.full_page().map(|p| p.page) == Some(3));
        // No next-page context, and zoom never leaks into context renders
        assert_eq!(*doc.renders.borrow(), vec![(3, 1.0), (2, 1.0)]);
    }

    #[test]
    fn test_context_failures_are_omitted() {
        let mut doc = FakeDocument::new(3);
        doc.failing = vec![1, 2];
        let settings = CaptureConfig::default();
        let capture = SelectionCapture::new(&doc, &settings);
        let surface = gradient_surface(200, 200);

        let bundle = capture
            .capture_area(Rect::new(5.0, 5.0, 50.0, 50.0), &surface, 2)
            .unwrap()
            .unwrap();

        assert!(bundle.primary_image().is_some());
        assert!(bundle.full_page().is_none());
        assert!(bundle.prev_page().is_none());
    }

    #[test]
    fn test_primary_crop_failure_is_fatal() {
        let doc = FakeDocument::new(3);
        let settings = CaptureConfig::default();
        let capture = SelectionCapture::new(&doc, &settings);
        let surface = gradient_surface(50, 50);

        let result = capture.capture_area(Rect::new(500.0, 500.0, 50.0, 50.0), &surface, 2);
        assert!(result.is_err());
        assert!(doc.renders.borrow().is_empty());
    }

    #[test]
    fn test_text_capture_boundary() {
        assert!(capture_text("ab", 3).is_none());
        assert_eq!(
            capture_text("QKᵀ", 3),
            Some(ContextBundle::Text {
                text: "QKᵀ".to_string()
            })
        );
    }

    #[test]
    fn test_text_capture_is_verbatim() {
        let raw = "  softmax(QK^T / sqrt(d_k)) V \n";
        match capture_text(raw, 3) {
            Some(ContextBundle::Text { text }) => assert_eq!(text, raw),
            other => panic!("unexpected {:?}", other),
        }
    }
}
