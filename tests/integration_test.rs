// PlantVillage Inference 🌿 AGPL-3.0 License

//! Integration tests for the inference library surface.
//!
//! The test environment carries no weights file, so every model here is the
//! untrained fallback. That is exactly the availability policy under test:
//! the pipeline must stay functional and deterministic without real weights.

use image::{DynamicImage, Rgb, RgbImage};
use plantvillage_inference::{preprocess_image, Diagnosis, DiseaseModel, CLASS_NAMES};

fn leaf_like_image() -> DynamicImage {
    let mut img = RgbImage::from_pixel(320, 240, Rgb([34, 139, 34]));
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if (x / 16 + y / 16) % 2 == 0 {
            *pixel = Rgb([85, 107, 47]);
        }
    }
    DynamicImage::ImageRgb8(img)
}

#[test]
fn test_end_to_end_pipeline_with_fallback_model() {
    let mut model = DiseaseModel::load("no_such_weights.onnx");
    assert!(!model.weights_loaded());

    let diagnosis = model.predict(&leaf_like_image()).unwrap();
    assert!(CLASS_NAMES.contains(&diagnosis.class_name.as_str()));
    assert!((0.0..=1.0).contains(&diagnosis.confidence));
}

#[test]
fn test_pipeline_is_idempotent() {
    let mut model = DiseaseModel::load("no_such_weights.onnx");
    let img = leaf_like_image();
    assert_eq!(model.predict(&img).unwrap(), model.predict(&img).unwrap());
}

#[test]
fn test_preprocessing_shape_for_arbitrary_input() {
    let tensor = preprocess_image(&leaf_like_image());
    assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
}

#[test]
fn test_diagnosis_decomposition_over_full_catalog() {
    for name in CLASS_NAMES {
        let diag = Diagnosis::from_label(name, 0.5);
        assert_eq!(diag.is_healthy, name.to_lowercase().contains("healthy"));
        assert_eq!(diag.disease_type.is_some(), !diag.is_healthy);
        assert!(name.replace('_', " ").starts_with(&diag.plant_type));
    }
}
