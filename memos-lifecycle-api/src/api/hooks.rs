use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use memos_lifecycle::{
    LifecycleEvent, LifecycleHook, LifecycleOutput, SessionEndEvent, SessionStartEvent,
    ToolResultEvent,
};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct HookState {
    pub hook: Arc<dyn LifecycleHook>,
}

/// Extracts an event body. Malformed bodies are logged and answered as if
/// nothing happened; hosts must never see a hook fail.
fn event_or_skip<T>(hook: &str, payload: Result<Json<T>, JsonRejection>) -> Option<T> {
    match payload {
        Ok(Json(event)) => Some(event),
        Err(rejection) => {
            warn!("Ignoring malformed {} payload: {}", hook, rejection.body_text());
            None
        },
    }
}

pub async fn session_start(
    State(state): State<HookState>,
    payload: Result<Json<SessionStartEvent>, JsonRejection>,
) -> Json<LifecycleOutput> {
    let Some(event) = event_or_skip("session-start", payload) else {
        return Json(LifecycleOutput::none());
    };

    Json(state.hook.handle(&LifecycleEvent::SessionStart(event)).await)
}

pub async fn bootstrap(State(state): State<HookState>) -> Json<LifecycleOutput> {
    Json(state.hook.handle(&LifecycleEvent::Bootstrap).await)
}

pub async fn session_end(
    State(state): State<HookState>,
    payload: Result<Json<SessionEndEvent>, JsonRejection>,
) -> StatusCode {
    if let Some(event) = event_or_skip("session-end", payload) {
        state.hook.handle(&LifecycleEvent::SessionEnd(event)).await;
    }
    StatusCode::NO_CONTENT
}

pub async fn tool_result(
    State(state): State<HookState>,
    payload: Result<Json<ToolResultEvent>, JsonRejection>,
) -> StatusCode {
    if let Some(event) = event_or_skip("tool-result", payload) {
        state.hook.handle(&LifecycleEvent::ToolResult(event)).await;
    }
    StatusCode::ACCEPTED
}
