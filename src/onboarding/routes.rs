//! REST endpoints for signup, login, session lookup, and logout.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::error::{OnboardingError, WizardError};

use super::manager::OnboardingManager;
use super::model::Role;
use super::state::{ScrollReport, StepFields};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub manager: Arc<OnboardingManager>,
}

/// Failure of any endpoint, rendered as a JSON `{error}` body.
#[derive(Debug)]
pub enum ApiError {
    BadId,
    /// Request body missing, not JSON, or the wrong shape.
    BadBody(JsonRejection),
    Onboarding(OnboardingError),
}

impl From<OnboardingError> for ApiError {
    fn from(e: OnboardingError) -> Self {
        Self::Onboarding(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadBody(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadId => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({"error": "Invalid signup ID"}),
            ),
            Self::BadBody(rejection) => (
                rejection.status(),
                serde_json::json!({"error": rejection.body_text()}),
            ),
            Self::Onboarding(OnboardingError::NotFound { id }) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({"error": format!("Signup {id} not found")}),
            ),
            Self::Onboarding(OnboardingError::Wizard(WizardError::Validation(fields))) => {
                let error = WizardError::Validation(fields.clone()).to_string();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    serde_json::json!({"error": error, "fields": fields}),
                )
            }
            Self::Onboarding(e @ OnboardingError::Wizard(_))
            | Self::Onboarding(e @ OnboardingError::EmailTaken { .. }) => (
                StatusCode::CONFLICT,
                serde_json::json!({"error": e.to_string()}),
            ),
            Self::Onboarding(e @ OnboardingError::InvalidCredentials) => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({"error": e.to_string()}),
            ),
            Self::Onboarding(OnboardingError::Auth(e)) => {
                error!("Password hashing failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({"error": "Authentication unavailable"}),
                )
            }
            Self::Onboarding(OnboardingError::Database(e)) => {
                error!("Store failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({"error": "Store unavailable"}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadId)
}

#[derive(Deserialize)]
struct RoleRequest {
    role: Role,
}

#[derive(Deserialize)]
struct AgreeRequest {
    agreed: bool,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "swift2me-onboarding"
    }))
}

/// GET /api/session
///
/// The signed-in profile and its dashboard, or 404 if nobody is signed in.
async fn get_session(State(state): State<OnboardingRouteState>) -> Result<Response, ApiError> {
    match state.manager.current_session().await? {
        Some(session) => Ok(Json(session).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No session"})),
        )
            .into_response()),
    }
}

/// DELETE /api/session
async fn logout(State(state): State<OnboardingRouteState>) -> Result<StatusCode, ApiError> {
    state.manager.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/login
///
/// Verify a registered account and make it the signed-in session.
async fn login(
    State(state): State<OnboardingRouteState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let password = SecretString::from(body.password);
    let session = state.manager.login(&body.email, &password).await?;
    Ok(Json(session))
}

/// GET /api/config
///
/// Cities, tracks and password rules so the client can render the steps.
async fn get_config(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.manager.config().clone())
}

/// POST /api/signup
async fn begin(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let (id, wizard) = state.manager.begin().await;
    (
        StatusCode::CREATED,
        Json(serde_json::json!({"id": id, "wizard": wizard})),
    )
}

/// GET /api/signup/{id}
async fn get_wizard(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.manager.view(parse_id(&id)?).await?;
    Ok(Json(view))
}

/// DELETE /api/signup/{id}
async fn cancel(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    if state.manager.cancel(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(OnboardingError::NotFound { id }.into())
    }
}

/// POST /api/signup/{id}/role
async fn select_role(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<String>,
    body: Result<Json<RoleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let view = state.manager.select_role(parse_id(&id)?, body.role).await?;
    Ok(Json(view))
}

/// POST /api/signup/{id}/step
async fn submit_step(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<String>,
    fields: Result<Json<StepFields>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(fields) = fields?;
    let view = state.manager.submit_step(parse_id(&id)?, fields).await?;
    Ok(Json(view))
}

/// POST /api/signup/{id}/back
async fn go_back(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.manager.go_back(parse_id(&id)?).await?;
    Ok(Json(view))
}

/// POST /api/signup/{id}/scroll
async fn record_scroll(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<String>,
    report: Result<Json<ScrollReport>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(report) = report?;
    let view = state.manager.record_scroll(parse_id(&id)?, report).await?;
    Ok(Json(view))
}

/// POST /api/signup/{id}/agree
async fn set_agreed(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<String>,
    body: Result<Json<AgreeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let view = state.manager.set_agreed(parse_id(&id)?, body.agreed).await?;
    Ok(Json(view))
}

/// POST /api/signup/{id}/complete
async fn complete(
    State(state): State<OnboardingRouteState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.manager.complete(parse_id(&id)?).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/session", get(get_session).delete(logout))
        .route("/api/login", post(login))
        .route("/api/config", get(get_config))
        .route("/api/signup", post(begin))
        .route("/api/signup/{id}", get(get_wizard).delete(cancel))
        .route("/api/signup/{id}/role", post(select_role))
        .route("/api/signup/{id}/step", post(submit_step))
        .route("/api/signup/{id}/back", post(go_back))
        .route("/api/signup/{id}/scroll", post(record_scroll))
        .route("/api/signup/{id}/agree", post(set_agreed))
        .route("/api/signup/{id}/complete", post(complete))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::config::WizardConfig;
    use crate::store::InMemoryStore;

    fn app() -> Router {
        let store = Arc::new(InMemoryStore::new());
        let manager = OnboardingManager::new(store.clone(), store, WizardConfig::default());
        onboarding_routes(OnboardingRouteState {
            manager: Arc::new(manager),
        })
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_ok() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn no_session_is_404() {
        let (status, _) = send(&app(), Method::GET, "/api/session", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn config_lists_cities_and_tracks() {
        let (status, body) = send(&app(), Method::GET, "/api/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cities"][0], "Edinburgh");
        assert_eq!(body["tracks"]["Driver"][1], "license");
        assert!(body["password_policies"].get("Customer").is_none());
    }

    #[tokio::test]
    async fn begin_returns_id_and_first_step() {
        let (status, body) = send(&app(), Method::POST, "/api/signup", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
        assert_eq!(body["wizard"]["step"], 1);
        assert_eq!(body["wizard"]["step_kind"], "credentials");
    }

    #[tokio::test]
    async fn validation_failure_is_422_with_fields() {
        let app = app();
        let (_, body) = send(&app, Method::POST, "/api/signup", None).await;
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/signup/{id}/step"),
            Some(serde_json::json!({"email": "a@b.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<&str> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["password", "role"]);
    }

    #[tokio::test]
    async fn complete_off_final_step_is_409() {
        let app = app();
        let (_, body) = send(&app, Method::POST, "/api/signup", None).await;
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) =
            send(&app, Method::POST, &format!("/api/signup/{id}/complete"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("Not at final step"));
    }

    #[tokio::test]
    async fn back_at_first_step_is_409() {
        let app = app();
        let (_, body) = send(&app, Method::POST, "/api/signup", None).await;
        let id = body["id"].as_str().unwrap().to_string();
        let (status, _) = send(&app, Method::POST, &format!("/api/signup/{id}/back"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn bad_and_unknown_ids() {
        let app = app();
        let (status, _) = send(&app, Method::GET, "/api/signup/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/signup/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/signup/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    async fn send_raw(
        app: &Router,
        uri: &str,
        content_type: Option<&str>,
        body: &'static str,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(Method::POST).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        let resp = app
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn malformed_bodies_get_json_errors() {
        let app = app();
        let (_, body) = send(&app, Method::POST, "/api/signup", None).await;
        let id = body["id"].as_str().unwrap().to_string();
        let uri = format!("/api/signup/{id}/step");

        let (status, body) = send_raw(&app, &uri, Some("application/json"), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send_raw(&app, &uri, None, r#"{"city": "Edinburgh"}"#).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body["error"].is_string());

        let (status, body) = send_raw(
            &app,
            &format!("/api/signup/{id}/role"),
            Some("application/json"),
            r#"{"role": "admin"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("unknown role"));
    }

    #[tokio::test]
    async fn login_with_unknown_account_is_401() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/api/login",
            Some(serde_json::json!({"email": "a@b.com", "password": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid email or password");
    }

    #[tokio::test]
    async fn logout_without_session_is_no_content() {
        let (status, _) = send(&app(), Method::DELETE, "/api/session", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
