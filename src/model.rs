// PlantVillage Inference 🌿 AGPL-3.0 License

//! Model loading and prediction.
//!
//! [`DiseaseModel`] wraps an ONNX Runtime session trained on the PlantVillage
//! label catalog. Loading never fails the process: when the weights file
//! cannot be used, an untrained fallback network of the same output shape is
//! substituted so the service keeps answering. The substitution is visible in
//! logs and via [`DiseaseModel::weights_loaded`], not in the prediction
//! response shape.

use std::path::Path;

use image::DynamicImage;
use ndarray::Array4;
#[cfg(feature = "coreml")]
use ort::execution_providers::CoreMLExecutionProvider;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::TensorRef;

use crate::error::{InferenceError, Result};
use crate::labels::CLASS_NAMES;
use crate::preprocessing::{preprocess_image, INPUT_SIZE};
use crate::results::Diagnosis;

/// Seed for the fallback network's weight initialization. Fixed so that a
/// fallback process is deterministic across restarts.
const FALLBACK_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Compute backend for the forward pass.
enum Backend {
    /// ONNX Runtime session with resolved tensor names.
    Onnx {
        session: Session,
        input_name: String,
        output_name: String,
    },
    /// Untrained substitute used when the weights file cannot be loaded.
    Untrained(UntrainedNet),
}

/// Plant disease classification model.
pub struct DiseaseModel {
    backend: Backend,
}

impl DiseaseModel {
    /// Load a model from an ONNX file, falling back to an untrained network
    /// on any failure.
    ///
    /// The load is validated with a warmup forward pass: the flattened output
    /// must have exactly one logit per catalog entry, otherwise index-to-label
    /// mapping would silently degrade and the file is rejected.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load_session(path) {
            Ok(backend) => {
                tracing::info!("Model loaded successfully from {}", path.display());
                Self { backend }
            }
            Err(err) => {
                tracing::error!("Failed to load model from {}: {err}", path.display());
                tracing::warn!("Using untrained fallback model; predictions will be meaningless");
                Self {
                    backend: Backend::Untrained(UntrainedNet::new(CLASS_NAMES.len())),
                }
            }
        }
    }

    fn load_session(path: &Path) -> Result<Backend> {
        if !path.exists() {
            return Err(InferenceError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        #[allow(unused_mut)]
        let mut builder = Session::builder().map_err(|e| {
            InferenceError::ModelLoadError(format!("Failed to create session builder: {e}"))
        })?;

        // Hardware acceleration when compiled in; CPU otherwise.
        #[cfg(feature = "cuda")]
        {
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(|e| {
                    InferenceError::ModelLoadError(format!("Failed to register CUDA EP: {e}"))
                })?;
        }
        #[cfg(feature = "coreml")]
        {
            builder = builder
                .with_execution_providers([CoreMLExecutionProvider::default().build()])
                .map_err(|e| {
                    InferenceError::ModelLoadError(format!("Failed to register CoreML EP: {e}"))
                })?;
        }

        let mut session = builder
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| {
                InferenceError::ModelLoadError(format!("Failed to set optimization level: {e}"))
            })?
            .commit_from_file(path)
            .map_err(|e| InferenceError::ModelLoadError(format!("Failed to load model: {e}")))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "input".to_string());

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| InferenceError::ModelLoadError("Model has no outputs".to_string()))?;

        // Warmup forward pass doubles as the output-shape check.
        let size = INPUT_SIZE as usize;
        let dummy = Array4::<f32>::zeros((1, 3, size, size));
        let logits = run_session(&mut session, &input_name, &output_name, &dummy)?;
        if logits.len() != CLASS_NAMES.len() {
            return Err(InferenceError::ModelLoadError(format!(
                "Model produces {} logits but the label catalog has {} entries",
                logits.len(),
                CLASS_NAMES.len()
            )));
        }

        Ok(Backend::Onnx {
            session,
            input_name,
            output_name,
        })
    }

    /// Whether real weights were loaded, as opposed to the untrained fallback.
    #[must_use]
    pub fn weights_loaded(&self) -> bool {
        matches!(self.backend, Backend::Onnx { .. })
    }

    /// Number of output classes.
    #[must_use]
    pub const fn num_classes(&self) -> usize {
        CLASS_NAMES.len()
    }

    /// Model input size as (height, width).
    #[must_use]
    pub const fn input_size(&self) -> (u32, u32) {
        (INPUT_SIZE, INPUT_SIZE)
    }

    /// Classify an image and return the structured diagnosis.
    ///
    /// # Errors
    ///
    /// Returns an error if the forward pass fails or produces an output
    /// incompatible with the label catalog.
    pub fn predict(&mut self, image: &DynamicImage) -> Result<Diagnosis> {
        let tensor = preprocess_image(image);
        let logits = self.forward(&tensor)?;
        let probabilities = softmax(&logits);

        let (index, confidence) = argmax(&probabilities).ok_or_else(|| {
            InferenceError::InferenceError("Model produced an empty output".to_string())
        })?;

        let class_name = CLASS_NAMES.get(index).ok_or_else(|| {
            InferenceError::InferenceError(format!(
                "Predicted index {index} is outside the label catalog"
            ))
        })?;

        Ok(Diagnosis::from_label(class_name, confidence))
    }

    fn forward(&mut self, input: &Array4<f32>) -> Result<Vec<f32>> {
        match &mut self.backend {
            Backend::Onnx {
                session,
                input_name,
                output_name,
            } => run_session(session, input_name, output_name, input),
            Backend::Untrained(net) => Ok(net.forward(input)),
        }
    }
}

impl std::fmt::Debug for DiseaseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiseaseModel")
            .field("weights_loaded", &self.weights_loaded())
            .field("num_classes", &self.num_classes())
            .finish()
    }
}

/// Run one forward pass through an ONNX session and flatten the output.
fn run_session(
    session: &mut Session,
    input_name: &str,
    output_name: &str,
    input: &Array4<f32>,
) -> Result<Vec<f32>> {
    let input_contiguous = input.as_standard_layout();

    let input_tensor = TensorRef::from_array_view(&input_contiguous)
        .map_err(|e| InferenceError::InferenceError(format!("Failed to create input tensor: {e}")))?;

    let inputs = ort::inputs![input_name => input_tensor];

    let outputs = session
        .run(inputs)
        .map_err(|e| InferenceError::InferenceError(format!("Inference failed: {e}")))?;

    let output = outputs
        .get(output_name)
        .ok_or_else(|| InferenceError::InferenceError(format!("Output '{output_name}' not found")))?;

    let (_shape, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e| InferenceError::InferenceError(format!("Failed to extract output: {e}")))?;

    Ok(data.to_vec())
}

/// Numerically stable softmax.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.iter().map(|&v| v / sum).collect()
    } else {
        exps
    }
}

/// Index and value of the maximum element.
fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((i, v)),
        })
}

/// Untrained stand-in network: a randomly initialized linear probe over
/// pooled channel statistics, one logit per catalog entry.
///
/// Weights come from a fixed-seed generator, so the fallback is as
/// deterministic as a real model: the same image always yields the same
/// (meaningless) prediction.
struct UntrainedNet {
    weights: Vec<f32>,
    biases: Vec<f32>,
    num_classes: usize,
}

/// Pooled features per channel: mean and mean of squares.
const FALLBACK_FEATURES: usize = 6;

impl UntrainedNet {
    fn new(num_classes: usize) -> Self {
        let mut state = FALLBACK_SEED;
        let mut next = move || {
            // splitmix64, mapped to a small symmetric interval
            state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            z ^= z >> 31;
            ((z >> 40) as f32 / (1u64 << 24) as f32 - 0.5) * 2.0
        };

        let weights = (0..num_classes * FALLBACK_FEATURES).map(|_| next()).collect();
        let biases = (0..num_classes).map(|_| next()).collect();

        Self {
            weights,
            biases,
            num_classes,
        }
    }

    fn forward(&self, input: &Array4<f32>) -> Vec<f32> {
        let mut features = [0.0f32; FALLBACK_FEATURES];
        let per_channel = (input.len() / 3).max(1) as f32;
        for c in 0..3 {
            let channel = input.index_axis(ndarray::Axis(1), c);
            let mut sum = 0.0f32;
            let mut sum_sq = 0.0f32;
            for &v in &channel {
                sum += v;
                sum_sq += v * v;
            }
            features[c] = sum / per_channel;
            features[3 + c] = sum_sq / per_channel;
        }

        (0..self.num_classes)
            .map(|i| {
                let row = &self.weights[i * FALLBACK_FEATURES..(i + 1) * FALLBACK_FEATURES];
                self.biases[i]
                    + row
                        .iter()
                        .zip(features.iter())
                        .map(|(w, f)| w * f)
                        .sum::<f32>()
            })
            .collect()
    }
}
