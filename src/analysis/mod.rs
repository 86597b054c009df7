//! Remote analysis: request construction, transport and strict response decoding.

pub mod client;
pub mod schema;
pub mod types;

pub use client::{AnalysisClient, AnalysisRequest, AnalysisTransport, GeminiTransport};
pub use types::{
    AnalysisResult, DimensionStep, MathSymbol, SymbolRole, VisualizationType, IMAGE_PLACEHOLDER,
};
