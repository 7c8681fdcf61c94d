// PlantVillage Inference 🌿 AGPL-3.0 License

//! Server binary: load the model once, then serve the inference API.

use std::env;

use plantvillage_inference::{router, AppState};

/// Default model weights path, relative to the working directory.
const DEFAULT_MODEL_PATH: &str = "plant_disease_model.onnx";

/// Default listen port.
const DEFAULT_PORT: &str = "5000";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let model_path = env::var("MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string());
    tracing::info!("Loading model: {model_path}");

    let state = AppState::load(&model_path);
    let app = router(state);

    let port = env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
    let addr = format!("0.0.0.0:{port}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    if let Ok(local) = listener.local_addr() {
        tracing::info!("Server listening on {local}");
        tracing::info!("Swagger UI available at http://localhost:{port}/swagger-ui/");
    }

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {err}");
        std::process::exit(1);
    }
}
