use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Placeholder shown as the selected context of an analysed image area
pub const IMAGE_PLACEHOLDER: &str = "[Analyzed Image Area]";

/// Placeholder used when an image analysis falls back
pub const IMAGE_ERROR_PLACEHOLDER: &str = "[Image Analysis Error]";

pub const FALLBACK_EXPLANATION: &str = "We couldn't analyze this specific selection right now. \
Please check your API Key or try a clearer selection.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolRole {
    Scalar,
    Vector,
    Matrix,
    Function,
    Constant,
}

impl SymbolRole {
    pub const ALL: [SymbolRole; 5] = [
        SymbolRole::Scalar,
        SymbolRole::Vector,
        SymbolRole::Matrix,
        SymbolRole::Function,
        SymbolRole::Constant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolRole::Scalar => "scalar",
            SymbolRole::Vector => "vector",
            SymbolRole::Matrix => "matrix",
            SymbolRole::Function => "function",
            SymbolRole::Constant => "constant",
        }
    }
}

/// A symbol decoded by the analysis service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MathSymbol {
    pub symbol: String,
    pub definition: String,
    pub plain_english: String,
    pub role: SymbolRole,
}

/// One row of a shape breakdown, in pipeline order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionStep {
    pub name: String,
    pub shape: String,
    pub description: String,
    pub is_input: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisualizationType {
    VectorAlignment,
    DimensionMismatch,
    GradientDescent,
    #[default]
    Generic,
}

impl VisualizationType {
    pub const ALL: [VisualizationType; 4] = [
        VisualizationType::VectorAlignment,
        VisualizationType::DimensionMismatch,
        VisualizationType::GradientDescent,
        VisualizationType::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualizationType::VectorAlignment => "VECTOR_ALIGNMENT",
            VisualizationType::DimensionMismatch => "DIMENSION_MISMATCH",
            VisualizationType::GradientDescent => "GRADIENT_DESCENT",
            VisualizationType::Generic => "GENERIC",
        }
    }

    /// Unknown labels resolve to `Generic`
    pub fn from_label(label: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|viz| viz.as_str() == label)
            .unwrap_or(VisualizationType::Generic)
    }
}

impl fmt::Display for VisualizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Missing, null, mistyped or unknown all mean GENERIC
impl<'de> Deserialize<'de> for VisualizationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(value
            .as_ref()
            .and_then(|v| v.as_str())
            .map(VisualizationType::from_label)
            .unwrap_or_default())
    }
}

/// A finished analysis. Replaced wholesale by the next one, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub original_text: String,
    pub simplified_explanation: String,
    pub symbols: Vec<MathSymbol>,
    pub dimensions: Vec<DimensionStep>,
    #[serde(default)]
    pub viz_type: VisualizationType,
}

impl AnalysisResult {
    /// The safe result shown whenever the remote step fails
    pub fn fallback(original_text: impl Into<String>) -> Self {
        Self {
            original_text: original_text.into(),
            simplified_explanation: FALLBACK_EXPLANATION.to_string(),
            symbols: Vec::new(),
            dimensions: Vec::new(),
            viz_type: VisualizationType::Generic,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.simplified_explanation == FALLBACK_EXPLANATION
            && self.symbols.is_empty()
            && self.dimensions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default)]
        viz: VisualizationType,
    }

    fn viz_of(json: &str) -> VisualizationType {
        serde_json::from_str::<Holder>(json).unwrap().viz
    }

    #[test]
    fn test_viz_type_lenient_decoding() {
        assert_eq!(viz_of(r#"{"viz":"GRADIENT_DESCENT"}"#), VisualizationType::GradientDescent);
        assert_eq!(viz_of(r#"{"viz":"HEATMAP"}"#), VisualizationType::Generic);
        assert_eq!(viz_of(r#"{"viz":null}"#), VisualizationType::Generic);
        assert_eq!(viz_of(r#"{"viz":7}"#), VisualizationType::Generic);
        assert_eq!(viz_of(r#"{}"#), VisualizationType::Generic);
    }

    #[test]
    fn test_viz_type_labels_round_trip() {
        for viz in VisualizationType::ALL {
            assert_eq!(VisualizationType::from_label(viz.as_str()), viz);
        }
        assert_eq!(
            serde_json::to_string(&VisualizationType::VectorAlignment).unwrap(),
            "\"VECTOR_ALIGNMENT\""
        );
    }

    #[test]
    fn test_symbol_role_is_closed() {
        let ok: MathSymbol = serde_json::from_str(
            r#"{"symbol":"W","definition":"weights","plainEnglish":"knobs","role":"matrix"}"#,
        )
        .unwrap();
        assert_eq!(ok.role, SymbolRole::Matrix);

        let bad = serde_json::from_str::<MathSymbol>(
            r#"{"symbol":"W","definition":"weights","plainEnglish":"knobs","role":"tensor"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_fallback_shape() {
        let result = AnalysisResult::fallback("QK^T");
        assert_eq!(result.original_text, "QK^T");
        assert!(result.symbols.is_empty());
        assert!(result.dimensions.is_empty());
        assert_eq!(result.viz_type, VisualizationType::Generic);
        assert!(result.is_fallback());
    }
}
