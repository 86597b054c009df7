//! Declared response schema, tutor instruction and strict payload decoding.
//!
//! The service is asked to self-conform to the schema, but the payload is
//! still decoded strictly: a missing or mistyped field rejects the whole
//! response. Only `vizType` is lenient and degrades to GENERIC.

use serde::Deserialize;
use serde_json::{json, Value};

use super::types::{AnalysisResult, DimensionStep, MathSymbol, SymbolRole, VisualizationType};
use crate::error::{XrayError, XrayResult};

pub const SYSTEM_INSTRUCTION: &str = "You are a world-class ML researcher acting as a tutor. \
Your goal is to demystify mathematical equations from research papers.

Analyze the provided text or image (which may contain an equation).
1. Translate it into \"Plain English\" concepts (no jargon).
2. Break down every symbol.
3. Perform Dimensional Analysis (The \"Shape\" technique). Assume standard transformer/DL shapes if context implies it (e.g., d_model=512).
4. Recommend a visualization type:
   - If it involves Dot Products, Attention, or Similarity -> VECTOR_ALIGNMENT
   - If it involves Matrix Multiplication shapes -> DIMENSION_MISMATCH
   - If it involves Loss, Optimization, or Gradients -> GRADIENT_DESCENT
   - Otherwise -> GENERIC
";

/// Response schema in the service's OpenAPI subset
pub fn response_schema() -> Value {
    let roles: Vec<&str> = SymbolRole::ALL.iter().map(|r| r.as_str()).collect();
    let viz_types: Vec<&str> = VisualizationType::ALL.iter().map(|v| v.as_str()).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "simplifiedExplanation": {
                "type": "STRING",
                "description": "A crystal clear, plain English explanation of the mathematical concept suitable for an engineer without a PhD."
            },
            "symbols": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "symbol": { "type": "STRING" },
                        "definition": { "type": "STRING" },
                        "plainEnglish": {
                            "type": "STRING",
                            "description": "A metaphor or simple explanation (e.g. 'Volume knob')"
                        },
                        "role": { "type": "STRING", "enum": roles }
                    },
                    "required": ["symbol", "definition", "plainEnglish", "role"]
                }
            },
            "dimensions": {
                "type": "ARRAY",
                "description": "The breakdown of matrix/vector shapes in the operation.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "shape": { "type": "STRING", "description": "e.g. [B, T, d_model]" },
                        "description": { "type": "STRING" },
                        "isInput": { "type": "BOOLEAN" }
                    },
                    "required": ["name", "shape", "description", "isInput"]
                }
            },
            "vizType": {
                "type": "STRING",
                "enum": viz_types,
                "description": "The type of interactive visualization best suited for this concept."
            }
        },
        "required": ["simplifiedExplanation", "symbols", "dimensions", "vizType"]
    })
}

/// The service's half of an [`AnalysisResult`]; `originalText` is filled locally
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePayload {
    pub simplified_explanation: String,
    pub symbols: Vec<MathSymbol>,
    pub dimensions: Vec<DimensionStep>,
    #[serde(default)]
    pub viz_type: VisualizationType,
}

impl ServicePayload {
    pub fn into_result(self, original_text: impl Into<String>) -> AnalysisResult {
        AnalysisResult {
            original_text: original_text.into(),
            simplified_explanation: self.simplified_explanation,
            symbols: self.symbols,
            dimensions: self.dimensions,
            viz_type: self.viz_type,
        }
    }
}

pub fn decode_payload(text: &str) -> XrayResult<ServicePayload> {
    if text.trim().is_empty() {
        return Err(XrayError::service("empty response text"));
    }
    serde_json::from_str(text)
        .map_err(|e| XrayError::service(format!("response does not match the schema: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{
        "simplifiedExplanation": "Compare every query with every key.",
        "symbols": [
            {"symbol": "Q", "definition": "queries", "plainEnglish": "questions", "role": "matrix"},
            {"symbol": "d_k", "definition": "key width", "plainEnglish": "ruler", "role": "scalar"},
            {"symbol": "softmax", "definition": "normaliser", "plainEnglish": "vote", "role": "function"}
        ],
        "dimensions": [
            {"name": "Q", "shape": "[T, d_k]", "description": "queries", "isInput": true},
            {"name": "QK^T", "shape": "[T, T]", "description": "scores", "isInput": false}
        ],
        "vizType": "VECTOR_ALIGNMENT"
    }"#;

    #[test]
    fn test_decode_preserves_order() {
        let payload = decode_payload(GOOD).unwrap();
        let names: Vec<&str> = payload.symbols.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(names, vec!["Q", "d_k", "softmax"]);
        assert_eq!(payload.dimensions[1].shape, "[T, T]");
        assert!(!payload.dimensions[1].is_input);

        let result = payload.into_result("Attention(Q,K,V)");
        assert_eq!(result.original_text, "Attention(Q,K,V)");
        assert_eq!(result.viz_type, VisualizationType::VectorAlignment);
    }

    #[test]
    fn test_missing_field_rejected() {
        let text = r#"{"simplifiedExplanation": "x", "symbols": [], "vizType": "GENERIC"}"#;
        assert!(matches!(decode_payload(text), Err(XrayError::Service { .. })));
    }

    #[test]
    fn test_mistyped_field_rejected() {
        let text = r#"{"simplifiedExplanation": "x", "symbols": [],
            "dimensions": [{"name": "A", "shape": "[1]", "description": "d", "isInput": "yes"}],
            "vizType": "GENERIC"}"#;
        assert!(decode_payload(text).is_err());
    }

    #[test]
    fn test_unknown_viz_type_degrades_to_generic() {
        let text = r#"{"simplifiedExplanation": "x", "symbols": [], "dimensions": [], "vizType": "SANKEY"}"#;
        assert_eq!(decode_payload(text).unwrap().viz_type, VisualizationType::Generic);

        let missing = r#"{"simplifiedExplanation": "x", "symbols": [], "dimensions": []}"#;
        assert_eq!(decode_payload(missing).unwrap().viz_type, VisualizationType::Generic);
    }

    #[test]
    fn test_schema_declares_closed_enums() {
        let schema = response_schema();
        let roles = &schema["properties"]["symbols"]["items"]["properties"]["role"]["enum"];
        assert_eq!(roles.as_array().unwrap().len(), 5);
        let viz = schema["properties"]["vizType"]["enum"].as_array().unwrap();
        assert_eq!(viz.len(), 4);
        assert!(viz.contains(&json!("GENERIC")));
    }

    #[test]
    fn test_non_json_rejected() {
        assert!(decode_payload("Sorry, I can't help with that.").is_err());
        assert!(decode_payload("   ").is_err());
    }
}
