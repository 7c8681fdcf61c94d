// PlantVillage Inference 🌿 AGPL-3.0 License

//! Prediction result types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::labels;

/// Structured diagnosis for one classified image.
///
/// Transient, built per prediction and serialized straight into the HTTP
/// response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    /// Predicted class name from the label catalog.
    pub class_name: String,
    /// Maximum softmax probability for the predicted class (0.0 - 1.0).
    pub confidence: f32,
    /// Whether the predicted condition is the healthy one.
    pub is_healthy: bool,
    /// Plant segment of the class name, human readable.
    pub plant_type: String,
    /// Disease segment of the class name, `null` for healthy predictions.
    pub disease_type: Option<String>,
}

impl Diagnosis {
    /// Build a diagnosis from a catalog label and its softmax probability.
    #[must_use]
    pub fn from_label(class_name: &str, confidence: f32) -> Self {
        Self {
            class_name: class_name.to_string(),
            confidence,
            is_healthy: labels::is_healthy(class_name),
            plant_type: labels::plant_type(class_name),
            disease_type: labels::disease_type(class_name),
        }
    }
}
