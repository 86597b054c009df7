//! Document source collaborator: page count, on-demand page rasters and
//! text-layer queries. Pages are 1-based.

use image::{Rgba, RgbaImage};

use crate::error::{XrayError, XrayResult};
use crate::geometry::Rect;

/// A rendered page bitmap in canvas pixel space
pub type RasterSurface = RgbaImage;

/// Anything that can hand out page rasters
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Render `page` at `scale` pixels per PDF point
    fn render_page(&self, page: usize, scale: f32) -> XrayResult<RasterSurface>;

    /// Text under `region` of `page` as rendered at `scale`
    fn text_in_region(&self, page: usize, scale: f32, region: Rect) -> XrayResult<String>;
}

/// RangeError guard shared by every source
pub fn check_page(page: usize, page_count: usize) -> XrayResult<()> {
    if page == 0 || page > page_count {
        return Err(XrayError::PageOutOfRange { page, page_count });
    }
    Ok(())
}

/// Pages held in memory as flat-coloured rasters with optional text.
///
/// Used when no PDF engine is available and by the pipeline tests.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    /// Page size in points at scale 1.0
    page_width: u32,
    page_height: u32,
    texts: Vec<String>,
}

impl MemoryDocument {
    pub fn new(page_count: usize, page_width: u32, page_height: u32) -> Self {
        Self {
            page_width,
            page_height,
            texts: vec![String::new(); page_count],
        }
    }

    pub fn with_text(mut self, page: usize, text: impl Into<String>) -> Self {
        if let Some(slot) = page.checked_sub(1).and_then(|i| self.texts.get_mut(i)) {
            *slot = text.into();
        }
        self
    }
}

impl PageSource for MemoryDocument {
    fn page_count(&self) -> usize {
        self.texts.len()
    }

    fn render_page(&self, page: usize, scale: f32) -> XrayResult<RasterSurface> {
        check_page(page, self.page_count())?;
        let width = ((self.page_width as f32 * scale).round() as u32).max(1);
        let height = ((self.page_height as f32 * scale).round() as u32).max(1);
        let shade = 255u8.saturating_sub((page as u8).wrapping_mul(16));
        Ok(RgbaImage::from_pixel(width, height, Rgba([shade, shade, 255, 255])))
    }

    fn text_in_region(&self, page: usize, _scale: f32, _region: Rect) -> XrayResult<String> {
        check_page(page, self.page_count())?;
        Ok(self.texts[page - 1].clone())
    }
}

#[cfg(feature = "pdfium")]
pub use self::pdfium::{load_document, open_path, PdfiumDocument};

#[cfg(feature = "pdfium")]
mod pdfium {
    use image::RgbaImage;
    use pdfium_render::prelude::*;
    use std::path::Path;
    use tracing::{debug, info};

    use super::{check_page, PageSource, RasterSurface};
    use crate::error::{ErrorContext, XrayError, XrayResult};
    use crate::geometry::Rect;

    /// PDF bytes plus the page count; PDFium is bound per operation
    pub struct PdfiumDocument {
        bytes: Vec<u8>,
        page_count: usize,
    }

    fn bind_pdfium() -> XrayResult<Pdfium> {
        let at = Pdfium::pdfium_platform_library_name_at_path;
        let bindings = Pdfium::bind_to_library(at("./lib/"))
            .or_else(|_| Pdfium::bind_to_library(at("./")))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| XrayError::decode(format!("Failed to load the PDFium library: {:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }

    /// Decode PDF bytes; malformed input fails with `Decode`
    pub fn load_document(bytes: Vec<u8>) -> XrayResult<PdfiumDocument> {
        let pdfium = bind_pdfium()?;
        let page_count = {
            let document = pdfium
                .load_pdf_from_byte_slice(&bytes, None)
                .map_err(|e| XrayError::decode_with_source("PDFium rejected the document", e))?;
            document.pages().len() as usize
        };

        if page_count == 0 {
            return Err(XrayError::decode("document has no pages"));
        }

        info!("Loaded PDF: {} pages, {} bytes", page_count, bytes.len());
        Ok(PdfiumDocument { bytes, page_count })
    }

    pub fn open_path(path: &Path) -> XrayResult<PdfiumDocument> {
        let bytes = std::fs::read(path).with_path(path)?;
        load_document(bytes)
    }

    impl PdfiumDocument {
        fn with_page<T>(
            &self,
            page: usize,
            f: impl FnOnce(&PdfPage) -> Result<T, PdfiumError>,
        ) -> XrayResult<T> {
            check_page(page, self.page_count)?;
            let pdfium = bind_pdfium()?;
            let document = pdfium
                .load_pdf_from_byte_slice(&self.bytes, None)
                .map_err(|e| XrayError::render(page, e.to_string()))?;
            let pdf_page = document
                .pages()
                .get((page - 1) as u16)
                .map_err(|e| XrayError::render(page, e.to_string()))?;
            f(&pdf_page).map_err(|e| XrayError::render(page, e.to_string()))
        }
    }

    impl PageSource for PdfiumDocument {
        fn page_count(&self) -> usize {
            self.page_count
        }

        fn render_page(&self, page: usize, scale: f32) -> XrayResult<RasterSurface> {
            let (width, height, bytes) = self.with_page(page, |pdf_page| {
                let target_width = (pdf_page.width().value * scale).round().max(1.0) as i32;
                let target_height = (pdf_page.height().value * scale).round().max(1.0) as i32;

                let render_config = PdfRenderConfig::new()
                    .set_target_width(target_width)
                    .set_target_height(target_height);

                let bitmap = pdf_page.render_with_config(&render_config)?;
                Ok((
                    bitmap.width() as u32,
                    bitmap.height() as u32,
                    bitmap.as_rgba_bytes().to_vec(),
                ))
            })?;

            debug!("Rendered page {} at {:.2}x: {}x{}", page, scale, width, height);
            RgbaImage::from_raw(width, height, bytes)
                .ok_or_else(|| XrayError::render(page, "bitmap size does not match its pixel data"))
        }

        fn text_in_region(&self, page: usize, scale: f32, region: Rect) -> XrayResult<String> {
            let scale = scale as f64;
            self.with_page(page, |pdf_page| {
                // Canvas pixels are top-left origin; PDF points are bottom-left
                let page_height = pdf_page.height().value as f64;
                let left = region.x / scale;
                let right = region.right() / scale;
                let top = page_height - region.y / scale;
                let bottom = page_height - region.bottom() / scale;

                let text = pdf_page.text()?;
                Ok(text.inside_rect(PdfRect::new_from_values(
                    bottom as f32,
                    left as f32,
                    top as f32,
                    right as f32,
                )))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_page_bounds() {
        assert!(check_page(1, 3).is_ok());
        assert!(check_page(3, 3).is_ok());
        assert!(matches!(
            check_page(0, 3),
            Err(XrayError::PageOutOfRange { page: 0, page_count: 3 })
        ));
        assert!(matches!(
            check_page(4, 3),
            Err(XrayError::PageOutOfRange { page: 4, .. })
        ));
    }

    #[test]
    fn test_memory_document_scales_and_bounds() {
        let doc = MemoryDocument::new(3, 100, 140).with_text(2, "softmax");
        assert_eq!(doc.page_count(), 3);

        let page = doc.render_page(2, 1.5).unwrap();
        assert_eq!(page.dimensions(), (150, 210));
        assert_ne!(page.get_pixel(0, 0), doc.render_page(1, 1.5).unwrap().get_pixel(0, 0));

        assert_eq!(doc.text_in_region(2, 1.0, Rect::default()).unwrap(), "softmax");
        assert!(doc.render_page(4, 1.0).is_err());
    }
}
