use crate::analysis::{DimensionStep, VisualizationType};

pub const GENERIC_NOTE: &str =
    "This concept is best understood through the dimensional breakdown above.";

pub const MATMUL_TIP: &str = "If the inner dimensions of two multiplying matrices don't match \
(e.g., [A, B] x [C, D] where B != C), the operation is mathematically impossible.";

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRow<'a> {
    /// First two characters of the name, upper-cased
    pub badge: String,
    pub step: &'a DimensionStep,
}

/// Shape-breakdown view of a result, rows in service order
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeBreakdown<'a> {
    pub rows: Vec<ShapeRow<'a>>,
    pub note: Option<&'static str>,
}

impl<'a> ShapeBreakdown<'a> {
    pub fn new(dimensions: &'a [DimensionStep], viz: VisualizationType) -> Self {
        let rows = dimensions
            .iter()
            .map(|step| ShapeRow {
                badge: step.name.chars().take(2).collect::<String>().to_uppercase(),
                step,
            })
            .collect();
        let note = (viz == VisualizationType::Generic).then_some(GENERIC_NOTE);
        Self { rows, note }
    }
}
