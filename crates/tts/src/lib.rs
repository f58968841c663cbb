#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod catalog;
mod coordinator;
mod credentials;
mod error;
mod http_client;
mod merge;
mod provider;
mod segment;
mod server;
mod signer;
mod ssml;
mod types;

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

pub use error::{Result, TtsError};
pub use server::{Server, TtsServerBuilder};
pub use types::{SpeechRequest, SpeechResponse, Voice};

/// Build the TTS server from configuration
pub fn build_server(config: &murmur_config::Config) -> anyhow::Result<Arc<Server>> {
    let server = Arc::new(
        TtsServerBuilder::new(config)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize TTS server: {e}"))?,
    );
    Ok(server)
}

/// Create the endpoint router for TTS
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new()
        .route("/v1/audio/speech", get(synthesize_query).post(synthesize_json))
        .route("/v1/audio/voices", get(list_voices))
}

/// Handle speech synthesis requests with a JSON body
async fn synthesize_json(
    State(server): State<Arc<Server>>,
    Json(request): Json<SpeechRequest>,
) -> Result<axum::response::Response> {
    synthesize(&server, &request).await
}

/// Query-parameter form of a synthesis request
///
/// Single-letter aliases allow compact hand-written URLs.
#[derive(Deserialize)]
struct SpeechQuery {
    #[serde(alias = "t")]
    text: Option<String>,
    #[serde(alias = "v")]
    voice: Option<String>,
    #[serde(alias = "r")]
    rate: Option<String>,
    #[serde(alias = "p")]
    pitch: Option<String>,
    #[serde(alias = "s")]
    style: Option<String>,
}

/// Handle speech synthesis requests expressed as query parameters
async fn synthesize_query(
    State(server): State<Arc<Server>>,
    Query(query): Query<SpeechQuery>,
) -> Result<axum::response::Response> {
    let request = SpeechRequest {
        text: query.text.unwrap_or_default(),
        voice: query.voice,
        rate: query.rate,
        pitch: query.pitch,
        style: query.style,
    };
    synthesize(&server, &request).await
}

async fn synthesize(server: &Server, request: &SpeechRequest) -> Result<axum::response::Response> {
    let cancel = CancellationToken::new();
    // Dropping the handler future (client disconnect) cancels in-flight
    // segment work through this guard
    let _guard = cancel.clone().drop_guard();

    let response = server.synthesize(request, &cancel).await?;

    tracing::debug!(bytes = response.audio.len(), "speech synthesis complete");
    Ok(response.into_response())
}

#[derive(Deserialize)]
struct VoicesQuery {
    #[serde(default, alias = "l")]
    locale: String,
}

/// Handle voice catalog listing requests
async fn list_voices(
    State(server): State<Arc<Server>>,
    Query(query): Query<VoicesQuery>,
) -> Result<Json<Vec<Voice>>> {
    let voices = server.voices(&query.locale).await?;
    Ok(Json(voices))
}
