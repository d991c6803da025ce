// src/web/routes.rs
// HTTP route handlers

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Map, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::AppState;
use crate::error::{Result, WafaqError};
use crate::resolver::ResolvedSuggestion;
use crate::selection::SelectionInput;
use crate::utils::html_page;

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> Router {
    // FAQ widgets call /query and /selection from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/query", post(query_handler))
        .route("/selection", post(selection_handler))
        .route("/log", get(log_handler))
        .route("/selection_log", get(selection_log_handler));

    if state.kill_switch.is_some() {
        router = router.route("/kill", get(kill_handler));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// POST /query {"query": "..."} -> ranked suggestions
async fn query_handler(State(state): State<AppState>, body: Bytes) -> Result<Json<Vec<ResolvedSuggestion>>> {
    state.diagnostics.debug("/query POST");

    let query = match parse_object(&body).and_then(|obj| required_str(&obj, "query")) {
        Ok(query) => query,
        Err(err) => {
            state.diagnostics.error(format!("Query: {err}"));
            return Err(err);
        }
    };
    state.diagnostics.info(format!("Query: parameter: {query}"));

    let suggestions = state.resolver.resolve(&query, state.max_intents).await?;
    state.diagnostics.debug("/query return");
    Ok(Json(suggestions))
}

/// POST /selection - record which suggestion the user picked
async fn selection_handler(State(state): State<AppState>, body: Bytes) -> Result<StatusCode> {
    state.diagnostics.debug("/selection POST");

    let recorded = parse_selection(&body).and_then(|input| {
        if let (Some(query), Some(selected), Some(confidence)) =
            (&input.query, &input.selected_intent, input.selected_confidence)
        {
            state.diagnostics.info(format!("Selection query: {query}"));
            state.diagnostics.info(format!("Selection selected: {selected}"));
            state.diagnostics.info(format!("Selection confidence: {confidence}"));
        }
        state.selections.record(input)
    });

    if let Err(err) = recorded {
        state.diagnostics.error(format!("Selection: {err}"));
        return Err(err);
    }

    state.diagnostics.debug("/selection return");
    Ok(StatusCode::OK)
}

async fn log_handler(State(state): State<AppState>) -> Html<String> {
    Html(html_page(&state.diagnostics.render_html()))
}

async fn selection_log_handler(State(state): State<AppState>) -> Html<String> {
    Html(html_page(&state.selections.render_html()))
}

/// GET /kill - stop the server (only routed when enabled)
async fn kill_handler(State(state): State<AppState>) -> StatusCode {
    if let Some(kill) = &state.kill_switch {
        state.diagnostics.info("Shutdown requested via /kill");
        kill.notify_one();
    }
    StatusCode::OK
}

// ============================================================================
// Request body helpers
// ============================================================================

fn parse_object(body: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(obj)) => Ok(obj),
        _ => Err(WafaqError::invalid_input("Request body must be a JSON object")),
    }
}

fn parse_selection(body: &[u8]) -> Result<SelectionInput> {
    let obj = parse_object(body)?;
    Ok(SelectionInput {
        query: optional_str(&obj, "query")?,
        selected_intent: optional_str(&obj, "selected_name")?,
        selected_confidence: optional_f64(&obj, "selected_confidence")?,
        top_intent: optional_str(&obj, "top_name")?,
        top_confidence: optional_f64(&obj, "top_confidence")?,
    })
}

fn required_str(obj: &Map<String, Value>, field: &str) -> Result<String> {
    optional_str(obj, field)?
        .ok_or_else(|| WafaqError::invalid_input(format!("Missing '{field}' parameter")))
}

/// `null` counts as absent
fn optional_str(obj: &Map<String, Value>, field: &str) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(wrong_type(field)),
    }
}

fn optional_f64(obj: &Map<String, Value>, field: &str) -> Result<Option<f64>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| wrong_type(field)),
    }
}

fn wrong_type(field: &str) -> WafaqError {
    WafaqError::invalid_input(format!("Wrong '{field}' parameter type"))
}
