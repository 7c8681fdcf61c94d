// PlantVillage Inference 🌿 AGPL-3.0 License

//! Image preprocessing for classification inference.
//!
//! Mirrors the transform the model was trained with: bilinear resize to a
//! fixed square resolution, scale to `[0, 1]`, then per-channel ImageNet
//! normalization. The transform is pure: the same image bytes always produce
//! the same tensor.

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

/// Model input edge length in pixels.
pub const INPUT_SIZE: u32 = 224;

/// Per-channel normalization mean (ImageNet statistics).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel normalization standard deviation (ImageNet statistics).
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Preprocess an image into a normalized NCHW tensor of shape `[1, 3, 224, 224]`.
///
/// Accepts an image of arbitrary dimensions. Resizing is exact (no aspect
/// preservation, no letterbox padding), matching the training transform.
#[must_use]
pub fn preprocess_image(image: &DynamicImage) -> Array4<f32> {
    let resized = image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let value = f32::from(pixel[c]) / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    tensor
}
