// HTTP request handlers
use crate::application::error::ServiceError;
use crate::application::session::Session;
use crate::domain::tag::{Tag, TagId};
use crate::domain::value::Value;
use crate::domain::window::Step;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct PlotRequest {
    pub tag_id: String,
}

#[derive(Deserialize)]
pub struct FormulaRequest {
    pub formula: String,
    /// Store the result as a new tag with this id
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct TimeFrameRequest {
    pub time_frame: String,
}

#[derive(Serialize)]
pub struct FormulaResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<TagId>,
    pub value: Value,
}

#[derive(Serialize)]
pub struct WindowView {
    pub anchor: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub duration_minutes: f64,
}

#[derive(Serialize)]
pub struct SessionView {
    pub plotted: Vec<TagId>,
    pub window: WindowView,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            plotted: session.plotted.clone(),
            window: WindowView {
                anchor: session.window.anchor(),
                start: session.window.start(),
                duration_minutes: session.window.duration_minutes(),
            },
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/session", get(get_session))
        .route("/chart", get(get_chart))
        .route("/tags", post(plot_tag))
        .route("/tags/:id", delete(remove_tag))
        .route("/formulas", post(evaluate_formula))
        .route("/window/duration", put(set_time_frame))
        .route("/window/:step", post(step_window))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    let session = state.session.lock().await;
    Json(SessionView::from(&*session))
}

/// Series for every plotted tag over the current window
pub async fn get_chart(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tag>>, ServiceError> {
    let session = state.session.lock().await;
    Ok(Json(state.formula_service.chart(&session).await?))
}

pub async fn plot_tag(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlotRequest>,
) -> Result<Json<Vec<Tag>>, ServiceError> {
    let mut session = state.session.lock().await;
    let chart = state
        .formula_service
        .plot_tag(&mut session, &request.tag_id)
        .await?;
    Ok(Json(chart))
}

pub async fn remove_tag(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionView>, ServiceError> {
    let mut session = state.session.lock().await;
    if !state.formula_service.remove_tag(&mut session, &id)? {
        tracing::debug!("Tag {} was not plotted", id);
    }
    Ok(Json(SessionView::from(&*session)))
}

/// Evaluate a formula; with a `name`, store the series result as a derived tag
pub async fn evaluate_formula(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FormulaRequest>,
) -> Result<Json<FormulaResponse>, ServiceError> {
    let mut session = state.session.lock().await;
    let response = match request.name {
        Some(name) => {
            let tag = state
                .formula_service
                .create_derived_tag(&mut session, &name, &request.formula)
                .await?;
            FormulaResponse {
                tag: Some(tag.id),
                value: tag.value,
            }
        }
        None => FormulaResponse {
            tag: None,
            value: state.formula_service.evaluate(&session, &request.formula).await?,
        },
    };
    Ok(Json(response))
}

pub async fn step_window(
    Path(step): Path<Step>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionView>, ServiceError> {
    let mut session = state.session.lock().await;
    state.navigation_service.step(&mut session, step).await?;
    Ok(Json(SessionView::from(&*session)))
}

pub async fn set_time_frame(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TimeFrameRequest>,
) -> Result<Json<SessionView>, ServiceError> {
    let mut session = state.session.lock().await;
    state
        .navigation_service
        .set_time_frame(&mut session, &request.time_frame)?;
    Ok(Json(SessionView::from(&*session)))
}
