// PlantVillage Inference 🌿 AGPL-3.0 License

//! # PlantVillage Inference Service
//!
//! HTTP inference service for plant disease classification. The service loads
//! a pretrained ONNX image-classification model over the PlantVillage label
//! catalog, accepts an image via base64 payload or remote URL, and returns a
//! predicted disease class with a confidence score and derived plant/disease
//! metadata.
//!
//! ## Features
//!
//! - **ONNX Runtime** - forward pass delegated to ONNX Runtime, CPU by
//!   default, CUDA/CoreML behind cargo features
//! - **Availability first** - a failed weights load is replaced by an
//!   untrained fallback model so the service never refuses to start
//! - **Deterministic pipeline** - pure preprocessing and gradient-free
//!   inference: the same image bytes always yield the same prediction
//!
//! ## Quick start
//!
//! ```no_run
//! use plantvillage_inference::{AppState, router};
//!
//! # async fn run() {
//! let state = AppState::load("plant_disease_model.onnx");
//! let app = router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await.unwrap();
//! axum::serve(listener, app).await.unwrap();
//! # }
//! ```
//!
//! ## Endpoints
//!
//! | Method | Path           | Description                                |
//! |--------|----------------|--------------------------------------------|
//! | GET    | `/health`      | Liveness and model state                   |
//! | POST   | `/predict`     | Classify a base64-encoded image            |
//! | POST   | `/predict_url` | Fetch an image over HTTP and classify it   |
//! | GET    | `/info`        | Model path, catalog size, fallback status  |

pub mod error;
pub mod fetch;
pub mod labels;
pub mod model;
pub mod preprocessing;
pub mod results;
pub mod server;

pub use error::{InferenceError, Result};
pub use labels::CLASS_NAMES;
pub use model::DiseaseModel;
pub use preprocessing::preprocess_image;
pub use results::Diagnosis;
pub use server::{router, AppState};
