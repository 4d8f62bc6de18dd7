//! Resolved NeXus plot models
//!
//! These are the consumer-facing types produced by resolution: which
//! dataset is the signal, which datasets label its axes, and how the
//! file asks for the plot to be styled.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use imview_core::Entity;

/// Axis or signal scale requested by the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleType {
    Linear,
    Log,
    SymLog,
}

impl ScaleType {
    /// Parse a SILX scale name; unknown names are dropped
    pub fn from_silx(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(ScaleType::Linear),
            "log" => Some(ScaleType::Log),
            "symlog" => Some(ScaleType::SymLog),
            _ => None,
        }
    }
}

/// How the signal should be rendered, when the file declares it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NxInterpretation {
    Spectrum,
    Image,
}

impl NxInterpretation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "spectrum" => Some(NxInterpretation::Spectrum),
            "image" => Some(NxInterpretation::Image),
            _ => None,
        }
    }
}

/// A plottable dataset with its display metadata
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDef {
    pub dataset: Entity,
    /// Display label, from the `long_name` attribute
    pub label: Option<String>,
    /// Physical unit, from the `units` attribute
    pub unit: Option<String>,
    /// Companion error dataset, if the group carries one
    pub errors: Option<Entity>,
}

/// Styling hints from the `SILX_style` attribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SilxStyle {
    pub signal_scale_type: Option<ScaleType>,
    /// One entry per axis; `None` leaves the axis at its default scale
    pub axis_scale_types: Option<Vec<Option<ScaleType>>>,
}

impl SilxStyle {
    /// Parse the `SILX_style` attribute value
    ///
    /// The attribute is JSON, stored either directly or as a JSON string.
    /// A malformed style degrades to defaults with a warning; it never
    /// fails resolution.
    pub fn parse(raw: &JsonValue) -> Self {
        let parsed = match raw {
            JsonValue::String(text) => match serde_json::from_str::<JsonValue>(text) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Malformed SILX_style attribute ({e}), using defaults");
                    return SilxStyle::default();
                }
            },
            other => other.clone(),
        };

        let Some(map) = parsed.as_object() else {
            warn!("SILX_style attribute is not a JSON object, using defaults");
            return SilxStyle::default();
        };

        let signal_scale_type = map
            .get("signal_scale_type")
            .and_then(JsonValue::as_str)
            .and_then(ScaleType::from_silx);

        // A single scale name applies to every axis
        let axis_scale_types = map.get("axes_scale_type").map(|value| match value {
            JsonValue::String(name) => vec![ScaleType::from_silx(name)],
            JsonValue::Array(items) => items
                .iter()
                .map(|item| item.as_str().and_then(ScaleType::from_silx))
                .collect(),
            _ => Vec::new(),
        });

        SilxStyle {
            signal_scale_type,
            axis_scale_types,
        }
    }
}

/// Fully resolved plottable group
#[derive(Debug, Clone, PartialEq)]
pub struct NxData {
    /// Scalar string dataset named `title`, if the group has one
    pub title_dataset: Option<Entity>,
    pub signal_def: DatasetDef,
    /// Datasets named by `auxiliary_signals`
    pub aux_defs: Vec<DatasetDef>,
    /// One slot per signal dimension; `None` where the file declared no
    /// axis for that dimension
    pub axis_defs: Vec<Option<DatasetDef>>,
    pub silx_style: SilxStyle,
    pub interpretation: Option<NxInterpretation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_silx_style_from_json_string() {
        let raw = json!("{\"signal_scale_type\": \"log\", \"axes_scale_type\": [\"linear\", \"symlog\"]}");
        let style = SilxStyle::parse(&raw);
        assert_eq!(style.signal_scale_type, Some(ScaleType::Log));
        assert_eq!(
            style.axis_scale_types,
            Some(vec![Some(ScaleType::Linear), Some(ScaleType::SymLog)])
        );
    }

    #[test]
    fn test_silx_style_single_axis_scale() {
        let style = SilxStyle::parse(&json!({ "axes_scale_type": "log" }));
        assert_eq!(style.axis_scale_types, Some(vec![Some(ScaleType::Log)]));
    }

    #[test]
    fn test_malformed_silx_style_degrades_to_defaults() {
        assert_eq!(SilxStyle::parse(&json!("{not json")), SilxStyle::default());
        assert_eq!(SilxStyle::parse(&json!(42)), SilxStyle::default());
    }

    #[test]
    fn test_unknown_scale_names_dropped() {
        let style = SilxStyle::parse(&json!({ "signal_scale_type": "sqrt" }));
        assert_eq!(style.signal_scale_type, None);
    }

    #[test]
    fn test_interpretation_parse() {
        assert_eq!(
            NxInterpretation::parse("spectrum"),
            Some(NxInterpretation::Spectrum)
        );
        assert_eq!(NxInterpretation::parse("rgba-image"), None);
    }
}
