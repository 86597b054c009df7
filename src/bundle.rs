//! Context bundles and the ordered request parts built from them.

use crate::capture::{ImageMime, PageImage};

/// What one analysis request carries: a text selection or an area selection.
/// The two shapes never mix.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextBundle {
    Text {
        text: String,
    },
    Area {
        image: PageImage,
        full_page: Option<PageImage>,
        prev_page: Option<PageImage>,
    },
}

/// One element of the multi-part request
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    InlineImage { mime: ImageMime, data: Vec<u8> },
}

pub const PREV_PAGE_LABEL: &str = "CONTEXT: This is the PREVIOUS page of the paper for reference:";
pub const FULL_PAGE_LABEL: &str =
    "CONTEXT: This is the FULL CURRENT page where the selection was made:";
pub const AREA_TASK: &str =
    "TASK: Analyze the specific mathematical equation or diagram in the following cropped selection:";
pub const AREA_FOLLOW_UP: &str =
    "Explain it, break down the symbols, and provide geometric intuitions.";

impl ContextBundle {
    pub fn is_area(&self) -> bool {
        matches!(self, ContextBundle::Area { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ContextBundle::Text { text } => Some(text),
            ContextBundle::Area { .. } => None,
        }
    }

    pub fn primary_image(&self) -> Option<&PageImage> {
        match self {
            ContextBundle::Area { image, .. } => Some(image),
            ContextBundle::Text { .. } => None,
        }
    }

    pub fn full_page(&self) -> Option<&PageImage> {
        match self {
            ContextBundle::Area { full_page, .. } => full_page.as_ref(),
            ContextBundle::Text { .. } => None,
        }
    }

    pub fn prev_page(&self) -> Option<&PageImage> {
        match self {
            ContextBundle::Area { prev_page, .. } => prev_page.as_ref(),
            ContextBundle::Text { .. } => None,
        }
    }

    /// Request parts, context first so the subject is read against it
    pub fn to_parts(&self) -> Vec<ContentPart> {
        match self {
            ContextBundle::Text { text } => vec![ContentPart::Text(format!(
                "Analyze this ML concept/equation: \"{}\"",
                text
            ))],
            ContextBundle::Area {
                image,
                full_page,
                prev_page,
            } => {
                let mut parts = Vec::with_capacity(7);
                if let Some(prev) = prev_page {
                    parts.push(ContentPart::Text(PREV_PAGE_LABEL.to_string()));
                    parts.push(ContentPart::from_image(prev));
                }
                if let Some(full) = full_page {
                    parts.push(ContentPart::Text(FULL_PAGE_LABEL.to_string()));
                    parts.push(ContentPart::from_image(full));
                }
                parts.push(ContentPart::Text(AREA_TASK.to_string()));
                parts.push(ContentPart::from_image(image));
                parts.push(ContentPart::Text(AREA_FOLLOW_UP.to_string()));
                parts
            }
        }
    }
}

impl ContentPart {
    fn from_image(image: &PageImage) -> Self {
        ContentPart::InlineImage {
            mime: image.mime,
            data: image.bytes.clone(),
        }
    }
}
