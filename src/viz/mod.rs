//! Visualization selection and the small models behind each renderer.

pub mod gradient;
pub mod shape;
pub mod vector;

use crate::analysis::VisualizationType;

pub use gradient::GradientHill;
pub use shape::{ShapeBreakdown, ShapeRow};
pub use vector::VectorPlayground;

/// Which panel renderer draws a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererChoice {
    /// Interactive query/key alignment demo
    VectorPlayground,
    /// Shape-breakdown list driven by the result's dimensions
    ShapeBreakdown,
    /// Interactive 1-D optimisation demo
    GradientHill,
}

pub fn select_renderer(viz: VisualizationType) -> RendererChoice {
    match viz {
        VisualizationType::VectorAlignment => RendererChoice::VectorPlayground,
        VisualizationType::DimensionMismatch => RendererChoice::ShapeBreakdown,
        VisualizationType::GradientDescent => RendererChoice::GradientHill,
        VisualizationType::Generic => RendererChoice::ShapeBreakdown,
    }
}

/// Raw label from anywhere; unknown labels get the GENERIC renderer
pub fn select_renderer_for_label(label: &str) -> RendererChoice {
    select_renderer(VisualizationType::from_label(label))
}

/// Per-result demo state; rebuilt whenever a new result arrives
#[derive(Debug, Clone, PartialEq)]
pub enum VizState {
    Vector(VectorPlayground),
    Gradient(GradientHill),
    Shape,
}

impl VizState {
    pub fn for_choice(choice: RendererChoice) -> Self {
        match choice {
            RendererChoice::VectorPlayground => VizState::Vector(VectorPlayground::default()),
            RendererChoice::GradientHill => VizState::Gradient(GradientHill::default()),
            RendererChoice::ShapeBreakdown => VizState::Shape,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_viz_type_has_its_renderer() {
        assert_eq!(
            select_renderer(VisualizationType::VectorAlignment),
            RendererChoice::VectorPlayground
        );
        assert_eq!(
            select_renderer(VisualizationType::DimensionMismatch),
            RendererChoice::ShapeBreakdown
        );
        assert_eq!(
            select_renderer(VisualizationType::GradientDescent),
            RendererChoice::GradientHill
        );
        assert_eq!(
            select_renderer(VisualizationType::Generic),
            RendererChoice::ShapeBreakdown
        );
    }

    #[test]
    fn test_unknown_label_gets_generic_renderer() {
        assert_eq!(select_renderer_for_label("HEATMAP"), RendererChoice::ShapeBreakdown);
        assert_eq!(select_renderer_for_label(""), RendererChoice::ShapeBreakdown);
        assert_eq!(
            select_renderer_for_label("GRADIENT_DESCENT"),
            RendererChoice::GradientHill
        );
    }

    #[test]
    fn test_viz_state_matches_choice() {
        assert!(matches!(
            VizState::for_choice(RendererChoice::GradientHill),
            VizState::Gradient(_)
        ));
        assert_eq!(VizState::for_choice(RendererChoice::ShapeBreakdown), VizState::Shape);
    }
}
