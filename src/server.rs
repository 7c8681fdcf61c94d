// PlantVillage Inference 🌿 AGPL-3.0 License

//! HTTP API for the inference service.
//!
//! Three core endpoints back one loaded model: `GET /health`,
//! `POST /predict` (base64 payload) and `POST /predict_url` (remote fetch).
//! `GET /info` reports model details, including whether real weights were
//! loaded or the untrained fallback is serving. Swagger UI is mounted at
//! `/swagger-ui`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::error::{InferenceError, Result};
use crate::model::DiseaseModel;
use crate::results::Diagnosis;

/// Shared application state: the loaded model plus its origin path.
pub struct AppState {
    /// Loaded model. The runtime's `run` takes `&mut self`, hence the mutex;
    /// the weights themselves are never mutated after startup.
    pub model: Mutex<DiseaseModel>,
    /// Path the model was loaded from (or attempted, when falling back).
    pub model_path: String,
}

impl AppState {
    /// Load the model from `model_path` and wrap it for sharing.
    #[must_use]
    pub fn load(model_path: &str) -> Arc<Self> {
        let model = DiseaseModel::load(model_path);
        Arc::new(Self {
            model: Mutex::new(model),
            model_path: model_path.to_string(),
        })
    }
}

/// Request body for `/predict`.
#[derive(Deserialize, ToSchema)]
pub struct PredictRequest {
    /// Base64-encoded image bytes, with or without a `data:image/...;base64,`
    /// prefix.
    image: Option<String>,
}

/// Request body for `/predict_url`.
#[derive(Deserialize, ToSchema)]
pub struct PredictUrlRequest {
    /// HTTP(S) URL of the image to classify.
    url: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Whether a model is installed. Always true: a failed weights load is
    /// replaced by the untrained fallback at startup.
    pub model_loaded: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct InfoResponse {
    /// Configured model path.
    pub model_path: String,
    /// Number of classes in the label catalog.
    pub num_classes: usize,
    /// Model input size (height, width).
    pub input_size: (u32, u32),
    /// False when the untrained fallback is serving instead of real weights.
    pub weights_loaded: bool,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PlantVillage Inference Service",
        description = "Plant disease classification over the PlantVillage label set. \
            Send a base64-encoded image to /predict or an image URL to /predict_url.",
        version = "0.1.0",
        license(name = "AGPL-3.0")
    ),
    paths(root, health, info, predict, predict_url),
    components(schemas(
        PredictRequest,
        PredictUrlRequest,
        Diagnosis,
        ErrorResponse,
        HealthResponse,
        InfoResponse
    )),
    tags(
        (name = "inference", description = "Classification endpoints"),
        (name = "health", description = "Health check endpoints")
    )
)]
struct ApiDoc;

/// Build the service router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/predict", post(predict))
        .route("/predict_url", post(predict_url))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Decode a base64 payload (optionally data-URL prefixed) into an image.
fn decode_image_payload(payload: &str) -> Result<DynamicImage> {
    let payload = if payload.starts_with("data:image") {
        payload
            .split_once(',')
            .ok_or_else(|| {
                InferenceError::ImageError("Data URL is missing the base64 payload".to_string())
            })?
            .1
    } else {
        payload
    };

    let bytes = BASE64_STANDARD
        .decode(payload.trim())
        .map_err(|e| InferenceError::ImageError(format!("Invalid base64 image data: {e}")))?;

    let image = image::load_from_memory(&bytes)?;
    Ok(image)
}

/// Run inference and translate failure to the generic 500 body.
async fn diagnose(state: &AppState, image: &DynamicImage) -> std::result::Result<Json<Diagnosis>, HandlerError> {
    let mut model = state.model.lock().await;
    match model.predict(image) {
        Ok(diagnosis) => Ok(Json(diagnosis)),
        Err(err) => {
            tracing::error!("Prediction failed: {err}");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Prediction failed",
            ))
        }
    }
}

/// Root endpoint
///
/// Returns a service banner.
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Service banner", body = String)
    )
)]
async fn root() -> &'static str {
    "PlantVillage Inference Service - POST /predict with a base64 image. Swagger UI at /swagger-ui/"
}

/// Health check endpoint
///
/// Always 200; `model_loaded` is true after startup because a failed weights
/// load falls back to an untrained model instead of aborting.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: true,
    })
}

/// Model information endpoint
///
/// Reports the configured model path, catalog size, input size, and whether
/// real weights are serving.
#[utoipa::path(
    get,
    path = "/info",
    tag = "inference",
    responses(
        (status = 200, description = "Model information", body = InfoResponse)
    )
)]
async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    let model = state.model.lock().await;
    Json(InfoResponse {
        model_path: state.model_path.clone(),
        num_classes: model.num_classes(),
        input_size: model.input_size(),
        weights_loaded: model.weights_loaded(),
    })
}

/// Classify a base64-encoded image
///
/// The payload may carry a `data:image/...;base64,` prefix, which is stripped
/// before decoding.
#[utoipa::path(
    post,
    path = "/predict",
    tag = "inference",
    request_body = PredictRequest,
    responses(
        (status = 200, description = "Classification result", body = Diagnosis),
        (status = 400, description = "Missing image field", body = ErrorResponse),
        (status = 500, description = "Decode or inference failure", body = ErrorResponse)
    )
)]
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> std::result::Result<Json<Diagnosis>, HandlerError> {
    let Some(payload) = request.image else {
        return Err(error_response(StatusCode::BAD_REQUEST, "No image provided"));
    };

    let image = decode_image_payload(&payload).map_err(|err| {
        tracing::error!("Failed to decode image payload: {err}");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    })?;

    diagnose(&state, &image).await
}

/// Classify an image fetched from a URL
///
/// The image is downloaded with a bounded timeout and then classified exactly
/// like a `/predict` payload.
#[utoipa::path(
    post,
    path = "/predict_url",
    tag = "inference",
    request_body = PredictUrlRequest,
    responses(
        (status = 200, description = "Classification result", body = Diagnosis),
        (status = 400, description = "Missing URL field or download failure", body = ErrorResponse),
        (status = 500, description = "Decode or inference failure", body = ErrorResponse)
    )
)]
async fn predict_url(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictUrlRequest>,
) -> std::result::Result<Json<Diagnosis>, HandlerError> {
    let Some(url) = request.url else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "No image URL provided",
        ));
    };

    let bytes = crate::fetch::fetch_image_bytes(&url).map_err(|err| {
        tracing::error!("Failed to download image from URL: {err}");
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Failed to download image: {err}"),
        )
    })?;

    let image = image::load_from_memory(&bytes).map_err(|err| {
        tracing::error!("Failed to decode downloaded image: {err}");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    })?;

    diagnose(&state, &image).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::CLASS_NAMES;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tower::ServiceExt;

    fn test_router() -> Router {
        // No weights file in the test environment; the fallback model serves.
        router(AppState::load("missing_test_model.onnx"))
    }

    fn png_base64() -> String {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([30, 160, 40])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        BASE64_STANDARD.encode(buf.into_inner())
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["model_loaded"], true);
    }

    #[tokio::test]
    async fn test_info_reports_fallback() {
        let response = test_router()
            .oneshot(Request::builder().uri("/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["weights_loaded"], false);
        assert_eq!(json["num_classes"], CLASS_NAMES.len());
    }

    #[tokio::test]
    async fn test_predict_missing_image_field() {
        let response = test_router()
            .oneshot(json_request("/predict", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"], "No image provided");
    }

    #[tokio::test]
    async fn test_predict_base64_image() {
        let response = test_router()
            .oneshot(json_request(
                "/predict",
                serde_json::json!({ "image": png_base64() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let class_name = json["className"].as_str().unwrap();
        assert!(CLASS_NAMES.contains(&class_name));

        let confidence = json["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        assert!(json["isHealthy"].is_boolean());
        assert!(json["plantType"].is_string());
    }

    #[tokio::test]
    async fn test_data_url_and_bare_payload_agree() {
        let bare = png_base64();
        let data_url = format!("data:image/png;base64,{bare}");

        let from_bare = body_json(
            test_router()
                .oneshot(json_request("/predict", serde_json::json!({ "image": bare })))
                .await
                .unwrap(),
        )
        .await;
        let from_data_url = body_json(
            test_router()
                .oneshot(json_request(
                    "/predict",
                    serde_json::json!({ "image": data_url }),
                ))
                .await
                .unwrap(),
        )
        .await;

        assert_eq!(from_bare, from_data_url);
    }

    #[tokio::test]
    async fn test_predict_is_idempotent() {
        let payload = serde_json::json!({ "image": png_base64() });
        let first = body_json(
            test_router()
                .oneshot(json_request("/predict", payload.clone()))
                .await
                .unwrap(),
        )
        .await;
        let second = body_json(
            test_router()
                .oneshot(json_request("/predict", payload))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_predict_invalid_base64() {
        let response = test_router()
            .oneshot(json_request(
                "/predict",
                serde_json::json!({ "image": "!!!not-base64!!!" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert!(!json["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_predict_undecodable_image_bytes() {
        let garbage = BASE64_STANDARD.encode(b"these bytes are not an image");
        let response = test_router()
            .oneshot(json_request(
                "/predict",
                serde_json::json!({ "image": garbage }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_predict_url_missing_field() {
        let response = test_router()
            .oneshot(json_request("/predict_url", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"], "No image URL provided");
    }

    #[tokio::test]
    async fn test_predict_url_unreachable() {
        let response = test_router()
            .oneshot(json_request(
                "/predict_url",
                serde_json::json!({ "url": "http://127.0.0.1:9/leaf.jpg" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        let error = json["error"].as_str().unwrap();
        assert!(error.starts_with("Failed to download image:"));
    }
}
