use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use base64::Engine;
use serde::Serialize;
use tower_http::services::ServeDir;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use terragen::progress::{PhaseStatus, ProgressEvent};
use terragen::{CancelToken, GenerationConfig, GenerationError, Phase, render};

#[derive(Serialize)]
struct GenerateResponse {
    layers: Vec<Layer>,
    events: Vec<EventEntry>,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct Layer {
    name: String,
    data_url: String,
}

#[derive(Serialize)]
struct EventEntry {
    phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<PhaseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_step: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl EventEntry {
    fn from_event(event: &ProgressEvent<'_>) -> Self {
        let mut entry = Self {
            phase: event.phase(),
            status: None,
            current_step: None,
            total_steps: None,
            message: None,
        };
        match event {
            ProgressEvent::Status { status, .. } => entry.status = Some(*status),
            ProgressEvent::Step(p) => {
                entry.current_step = Some(p.current_step);
                entry.total_steps = Some(p.total_steps);
            }
            ProgressEvent::Complete { .. } => {}
            ProgressEvent::Error { message } => entry.message = Some(message.clone()),
        }
        entry
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn data_url(img: &image::RgbaImage) -> Result<String, GenerationError> {
    let png = render::encode_png(img)?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
    Ok(format!("data:image/png;base64,{}", b64))
}

async fn generate_handler(
    Json(overrides): Json<serde_json::Value>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let config = GenerationConfig::from_overrides(&overrides)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    let result = tokio::task::spawn_blocking(move || -> Result<GenerateResponse, GenerationError> {
        let mut events = Vec::new();
        let map = terragen::generate_world(&config, &CancelToken::new(), |event| {
            events.push(EventEntry::from_event(&event));
        })?;

        let layers = vec![
            Layer {
                name: "heightmap".into(),
                data_url: data_url(&map.image)?,
            },
            Layer {
                name: "plates".into(),
                data_url: data_url(&render::render_plates(&map.world.grid))?,
            },
        ];

        Ok(GenerateResponse {
            layers,
            events,
            width: config.width,
            height: config.height,
        })
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    match result {
        Ok(response) => Ok(Json(response)),
        Err(GenerationError::Config(e)) => Err(api_error(StatusCode::BAD_REQUEST, e)),
        Err(e) => {
            error!(error = %e, "generation failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let frontend = ServeDir::new("frontend");

    let app = Router::new()
        .route("/api/generate", post(generate_handler))
        .fallback_service(frontend);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("terragen server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
