//! Minimal HTTP front-end for mood commands and status.
//!
//! The chat-bot transport itself stays outside the process; whatever drives
//! it ends up POSTing one of the four moods here. Payloads outside the
//! closed set are rejected by deserialization.

use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

use mood::{Mood, MoodState};
use pipeline::PipelineState;

/// State shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub commands: mpsc::UnboundedSender<Mood>,
    pub mood: Arc<MoodState>,
    pub pipeline_state: watch::Receiver<PipelineState>,
}

#[derive(Deserialize)]
pub struct MoodRequest {
    pub mood: Mood,
}

#[derive(Serialize)]
struct MoodResponse {
    mood: Mood,
}

#[derive(Serialize)]
struct StatusResponse {
    mood: Mood,
    state: PipelineState,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/mood", get(current_mood).post(request_mood))
        .route("/status", get(status))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html("ANDI is watching. POST /mood to change how it feels.")
}

async fn current_mood(State(state): State<AppState>) -> Json<MoodResponse> {
    Json(MoodResponse {
        mood: state.mood.current().await,
    })
}

async fn request_mood(
    State(state): State<AppState>,
    Json(req): Json<MoodRequest>,
) -> StatusCode {
    info!(mood = %req.mood, "mood command received");
    if state.commands.send(req.mood).is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::ACCEPTED
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        mood: state.mood.current().await,
        state: *state.pipeline_state.borrow(),
    })
}
