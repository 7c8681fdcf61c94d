// PlantVillage Inference 🌿 AGPL-3.0 License

//! The fixed PlantVillage label catalog and label decomposition.
//!
//! Every class name has the composite form `"<Plant>___<Condition>"`. The
//! catalog order matches the model's output layer, so the list must never be
//! reordered or resized independently of the weights.

/// Delimiter between the plant and condition segments of a class name.
pub const LABEL_DELIMITER: &str = "___";

/// Ordered class names matching the model's output layer, index for index.
///
/// Reproduced verbatim from the training dataset manifest, including the
/// repeated `Strawberry___healthy` entry at indices 26 and 28.
pub const CLASS_NAMES: [&str; 39] = [
    "Apple___Apple_scab",
    "Apple___Black_rot",
    "Apple___Cedar_apple_rust",
    "Apple___healthy",
    "Blueberry___healthy",
    "Cherry_(including_sour)___healthy",
    "Cherry_(including_sour)___Powdery_mildew",
    "Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot",
    "Corn_(maize)___Common_rust_",
    "Corn_(maize)___healthy",
    "Corn_(maize)___Northern_Leaf_Blight",
    "Grape___Black_rot",
    "Grape___Esca_(Black_Measles)",
    "Grape___healthy",
    "Grape___Leaf_blight_(Isariopsis_Leaf_Spot)",
    "Orange___Haunglongbing_(Citrus_greening)",
    "Peach___Bacterial_spot",
    "Peach___healthy",
    "Pepper,_bell___Bacterial_spot",
    "Pepper,_bell___healthy",
    "Potato___Early_blight",
    "Potato___healthy",
    "Potato___Late_blight",
    "Raspberry___healthy",
    "Soybean___healthy",
    "Squash___Powdery_mildew",
    "Strawberry___healthy",
    "Strawberry___Leaf_scorch",
    "Strawberry___healthy",
    "Tomato___Bacterial_spot",
    "Tomato___Early_blight",
    "Tomato___Late_blight",
    "Tomato___Leaf_Mold",
    "Tomato___Septoria_leaf_spot",
    "Tomato___Spider_mites Two-spotted_spider_mite",
    "Tomato___Target_Spot",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
    "Tomato___Tomato_mosaic_virus",
    "Tomato___healthy",
];

/// Whether a class name denotes a healthy plant.
///
/// Case-insensitive substring match; the catalog is fixed, so this heuristic
/// is its only health detector.
#[must_use]
pub fn is_healthy(class_name: &str) -> bool {
    class_name.to_lowercase().contains("healthy")
}

/// Plant segment of a class name, with underscores replaced by spaces.
///
/// For a label without the delimiter, the whole label is the plant type.
#[must_use]
pub fn plant_type(class_name: &str) -> String {
    class_name
        .split(LABEL_DELIMITER)
        .next()
        .unwrap_or(class_name)
        .replace('_', " ")
}

/// Condition segment of a class name, with underscores replaced by spaces.
///
/// Returns `None` when the label has no second segment or the condition is
/// the healthy one.
#[must_use]
pub fn disease_type(class_name: &str) -> Option<String> {
    let mut parts = class_name.split(LABEL_DELIMITER);
    let _plant = parts.next()?;
    let condition = parts.next()?;
    if condition.to_lowercase().contains("healthy") {
        return None;
    }
    Some(condition.replace('_', " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        assert_eq!(CLASS_NAMES.len(), 39);
        for name in CLASS_NAMES {
            assert!(!name.is_empty());
        }
    }

    #[test]
    fn test_is_healthy() {
        assert!(is_healthy("Apple___healthy"));
        assert!(is_healthy("Cherry_(including_sour)___healthy"));
        assert!(!is_healthy("Apple___Apple_scab"));
        assert!(!is_healthy("Tomato___Late_blight"));
    }

    #[test]
    fn test_plant_type() {
        assert_eq!(plant_type("Apple___Apple_scab"), "Apple");
        assert_eq!(plant_type("Pepper,_bell___Bacterial_spot"), "Pepper, bell");
        assert_eq!(plant_type("Corn_(maize)___Common_rust_"), "Corn (maize)");
        assert_eq!(
            plant_type("Cherry_(including_sour)___Powdery_mildew"),
            "Cherry (including sour)"
        );
    }

    #[test]
    fn test_disease_type() {
        assert_eq!(
            disease_type("Apple___Apple_scab"),
            Some("Apple scab".to_string())
        );
        assert_eq!(
            disease_type("Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot"),
            Some("Cercospora leaf spot Gray leaf spot".to_string())
        );
        assert_eq!(disease_type("Apple___healthy"), None);
        assert_eq!(disease_type("no_delimiter_here"), None);
    }

    #[test]
    fn test_decomposition_law_over_catalog() {
        // The three accessors must agree with the raw label for every entry.
        for name in CLASS_NAMES {
            let healthy = is_healthy(name);
            assert_eq!(healthy, name.to_lowercase().contains("healthy"));

            let plant = plant_type(name);
            assert!(!plant.is_empty());
            assert!(!plant.contains('_'));

            let disease = disease_type(name);
            if healthy {
                assert_eq!(disease, None, "healthy label {name} reported a disease");
            } else {
                let disease = disease.expect("diseased label missing disease type");
                assert!(!disease.contains('_'));
            }
        }
    }
}
