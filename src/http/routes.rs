//! HTTP route definitions

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;
use uuid::Uuid;

use crate::app::AppState;
use crate::http::middleware::{require_auth, AuthenticatedUser};
use crate::items::{ItemError, MyReports};
use crate::model::{FoundItem, ItemFilter, LostItem, NewFoundItem, NewLostItem};
use crate::util::time::uptime_secs;

/// Extractors whose rejections are reported as `AppError::BadRequest`
type ItemId = WithRejection<Path<Uuid>, AppError>;
type Filter = WithRejection<Query<ItemFilter>, AppError>;
type JsonBody<T> = WithRejection<Json<T>, AppError>;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);
    let timeout = state.config.request_timeout;

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/lost-items", get(list_lost_handler))
        .route("/lost-items/:id", get(get_lost_handler))
        .route("/found-items", get(list_found_handler))
        .route("/found-items/:id", get(get_found_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/lost-items", post(report_lost_handler))
        .route(
            "/lost-items/:id",
            put(update_lost_handler).delete(delete_lost_handler),
        )
        .route("/lost-items/:id/found", post(mark_found_handler))
        .route("/found-items", post(report_found_handler))
        .route(
            "/found-items/:id",
            put(update_found_handler).delete(delete_found_handler),
        )
        .route("/found-items/:id/claim", post(claim_handler))
        .route("/me/reports", get(my_reports_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let allowed_origins: Vec<header::HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    cors.allow_origin(allowed_origins).allow_credentials(true)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    store: &'static str,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        store: state.items.backend_name(),
    })
}

// ============================================================================
// Listing endpoints
// ============================================================================

#[derive(Serialize)]
struct ItemList<T> {
    items: Vec<T>,
    total: usize,
}

impl<T> From<Vec<T>> for ItemList<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

async fn list_lost_handler(
    State(state): State<AppState>,
    WithRejection(Query(filter), _): Filter,
) -> Result<Json<ItemList<LostItem>>, AppError> {
    let items = state.items.lost_items(&filter).await?;
    Ok(Json(items.into()))
}

async fn get_lost_handler(
    State(state): State<AppState>,
    WithRejection(Path(id), _): ItemId,
) -> Result<Json<LostItem>, AppError> {
    Ok(Json(state.items.lost_item(id).await?))
}

async fn list_found_handler(
    State(state): State<AppState>,
    WithRejection(Query(filter), _): Filter,
) -> Result<Json<ItemList<FoundItem>>, AppError> {
    let items = state.items.found_items(&filter).await?;
    Ok(Json(items.into()))
}

async fn get_found_handler(
    State(state): State<AppState>,
    WithRejection(Path(id), _): ItemId,
) -> Result<Json<FoundItem>, AppError> {
    Ok(Json(state.items.found_item(id).await?))
}

async fn my_reports_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    WithRejection(Query(filter), _): Filter,
) -> Result<Json<MyReports>, AppError> {
    Ok(Json(state.items.my_reports(auth.user_id(), &filter).await?))
}

// ============================================================================
// Report endpoints
// ============================================================================

async fn report_lost_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    WithRejection(Json(req), _): JsonBody<NewLostItem>,
) -> Result<impl IntoResponse, AppError> {
    check_write_rate(&state, &auth)?;
    let item = state.items.report_lost(&auth.actor, req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn report_found_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    WithRejection(Json(req), _): JsonBody<NewFoundItem>,
) -> Result<impl IntoResponse, AppError> {
    check_write_rate(&state, &auth)?;
    let item = state.items.report_found(&auth.actor, req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_lost_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    WithRejection(Path(id), _): ItemId,
    WithRejection(Json(req), _): JsonBody<NewLostItem>,
) -> Result<Json<LostItem>, AppError> {
    check_write_rate(&state, &auth)?;
    Ok(Json(state.items.update_lost(&auth.actor, id, req).await?))
}

async fn update_found_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    WithRejection(Path(id), _): ItemId,
    WithRejection(Json(req), _): JsonBody<NewFoundItem>,
) -> Result<Json<FoundItem>, AppError> {
    check_write_rate(&state, &auth)?;
    Ok(Json(state.items.update_found(&auth.actor, id, req).await?))
}

async fn delete_lost_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    WithRejection(Path(id), _): ItemId,
) -> Result<StatusCode, AppError> {
    check_write_rate(&state, &auth)?;
    state.items.delete_lost(&auth.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_found_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    WithRejection(Path(id), _): ItemId,
) -> Result<StatusCode, AppError> {
    check_write_rate(&state, &auth)?;
    state.items.delete_found(&auth.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Claim / found-confirmation endpoints
// ============================================================================

#[derive(Serialize)]
struct ActionResponse<T> {
    success: bool,
    message: String,
    item: T,
}

async fn claim_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    WithRejection(Path(id), _): ItemId,
) -> Result<Json<ActionResponse<FoundItem>>, AppError> {
    check_write_rate(&state, &auth)?;
    let item = state.items.claim_found(id, &auth.actor).await?;

    Ok(Json(ActionResponse {
        success: true,
        message: "Item claimed successfully".to_string(),
        item,
    }))
}

async fn mark_found_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    WithRejection(Path(id), _): ItemId,
) -> Result<Json<ActionResponse<LostItem>>, AppError> {
    check_write_rate(&state, &auth)?;
    let item = state.items.mark_lost_found(id, &auth.actor).await?;

    Ok(Json(ActionResponse {
        success: true,
        message: "Item marked as found".to_string(),
        item,
    }))
}

fn check_write_rate(state: &AppState, auth: &AuthenticatedUser) -> Result<(), AppError> {
    if state.write_limiter.check(auth.user_id()) {
        Ok(())
    } else {
        warn!(user_id = %auth.user_id(), "Write rate limit exceeded");
        Err(AppError::RateLimited)
    }
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<ItemError> for AppError {
    fn from(err: ItemError) -> Self {
        let message = err.to_string();
        match err {
            ItemError::Validation(_) => AppError::BadRequest(message),
            ItemError::NotFound => AppError::NotFound(message),
            ItemError::AlreadyClaimed | ItemError::AlreadyFound => AppError::Conflict(message),
            ItemError::OwnItem | ItemError::Forbidden => AppError::Forbidden(message),
            // Already logged where it happened
            ItemError::Store(_) => AppError::Upstream("Item storage is unavailable".to_string()),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

// Bodies that parse but do not fit the item shape are 400 too, not 422
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StoreBackend};
    use crate::http::middleware::sign_token;
    use crate::store::{Backend, MemoryStore};
    use crate::util::time::unix_secs;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    const SECRET: &str = "router-test-secret";

    fn app_with_rate(write_rate_limit: u32) -> Router {
        let config = Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "debug".to_string(),
            store: StoreBackend::Memory,
            supabase_jwt_secret: SECRET.to_string(),
            client_origin: "*".to_string(),
            request_timeout: Duration::from_secs(5),
            write_rate_limit,
        };
        build_router(AppState::with_backend(config, Backend::Memory(MemoryStore::new())))
    }

    fn app() -> Router {
        app_with_rate(100)
    }

    fn token(user: &str, name: &str) -> String {
        sign_token(
            &json!({
                "sub": user,
                "exp": unix_secs() + 600,
                "user_metadata": { "full_name": name }
            }),
            SECRET,
        )
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn umbrella() -> Value {
        json!({
            "name": "Green umbrella",
            "description": "Folding, green and white",
            "category": "Other",
            "location": "Library steps",
            "keptAt": "Library front desk"
        })
    }

    #[tokio::test]
    async fn health_reports_store() {
        let (status, body) = send(&app(), Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn writes_require_a_valid_token() {
        let app = app();
        let (status, _) = send(&app, Method::POST, "/found-items", None, Some(umbrella())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send(&app, Method::POST, "/found-items", Some("garbage"), Some(umbrella())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn report_list_and_claim_found_item() {
        let app = app();
        let finder = token("finder", "Pat Finder");
        let owner = token("owner", "Lee Owner");

        let (status, item) =
            send(&app, Method::POST, "/found-items", Some(&finder), Some(umbrella())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item["reportedBy"], "finder");
        assert_eq!(item["reportedByName"], "Pat Finder");
        assert_eq!(item["claimed"], false);
        let id = item["id"].as_str().unwrap().to_string();

        let (status, list) = send(&app, Method::GET, "/found-items?q=UMBRELLA", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 1);

        let (status, list) = send(&app, Method::GET, "/found-items?q=bicycle", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 0);

        // reporter cannot claim their own find
        let claim_uri = format!("/found-items/{}/claim", id);
        let (status, _) = send(&app, Method::POST, &claim_uri, Some(&finder), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, Method::POST, &claim_uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["item"]["claimed"], true);
        assert_eq!(body["item"]["claimedBy"], "owner");
        assert_eq!(body["item"]["claimedByName"], "Lee Owner");

        let other = token("other", "Someone");
        let (status, body) = send(&app, Method::POST, &claim_uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Item has already been claimed");

        let (status, list) = send(&app, Method::GET, "/found-items?open=true", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 0);
    }

    #[tokio::test]
    async fn invalid_report_is_a_bad_request() {
        let app = app();
        let finder = token("finder", "Pat");
        let mut body = umbrella();
        body["keptAt"] = json!("");

        let (status, body) = send(&app, Method::POST, "/found-items", Some(&finder), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Please specify where the item is kept");
    }

    #[tokio::test]
    async fn lost_item_lifecycle() {
        let app = app();
        let owner = token("owner", "Lee");
        let finder = token("finder", "Pat");

        let (status, item) = send(
            &app,
            Method::POST,
            "/lost-items",
            Some(&owner),
            Some(json!({
                "name": "Calculator",
                "category": "electronics",
                "lastSeenLocation": "Math building room 101"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item["category"], "Electronics");
        assert_eq!(item["lastSeenLocation"], "Math building room 101");
        let id = item["id"].as_str().unwrap().to_string();
        let item_uri = format!("/lost-items/{}", id);

        let (status, edited) = send(
            &app,
            Method::PUT,
            &item_uri,
            Some(&owner),
            Some(json!({
                "name": "Graphing calculator",
                "category": "Electronics",
                "location": "Math building"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(edited["name"], "Graphing calculator");

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("{}/found", item_uri),
            Some(&finder),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item"]["found"], true);
        assert_eq!(body["item"]["foundByName"], "Pat");

        let (status, _) = send(&app, Method::DELETE, &item_uri, Some(&finder), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::DELETE, &item_uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::GET, &item_uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn my_reports_lists_only_callers_items() {
        let app = app();
        let me = token("me", "Me");
        let them = token("them", "Them");

        send(&app, Method::POST, "/found-items", Some(&me), Some(umbrella())).await;
        send(&app, Method::POST, "/found-items", Some(&them), Some(umbrella())).await;
        send(
            &app,
            Method::POST,
            "/lost-items",
            Some(&me),
            Some(json!({ "name": "Scarf", "location": "Bus 12" })),
        )
        .await;

        let (status, body) = send(&app, Method::GET, "/me/reports", Some(&me), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lost"].as_array().unwrap().len(), 1);
        assert_eq!(body["found"].as_array().unwrap().len(), 1);
        assert_eq!(body["found"][0]["reportedBy"], "me");
    }

    #[tokio::test]
    async fn writes_are_rate_limited_per_user() {
        let app = app_with_rate(1);
        let finder = token("finder", "Pat");

        let (status, _) =
            send(&app, Method::POST, "/found-items", Some(&finder), Some(umbrella())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            send(&app, Method::POST, "/found-items", Some(&finder), Some(umbrella())).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Too many requests");
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let uri = format!("/found-items/{}", Uuid::new_v4());
        let (status, body) = send(&app(), Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Item not found");
    }

    async fn send_raw(
        app: &Router,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: &str,
    ) -> (StatusCode, String, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn malformed_requests_get_json_bad_request() {
        let app = app();
        let finder = token("finder", "Pat");

        let (status, content_type, body) =
            send_raw(&app, Method::GET, "/found-items/not-a-uuid", None, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type, "application/json");
        assert!(body["error"].is_string());

        let (status, content_type, body) =
            send_raw(&app, Method::POST, "/found-items", Some(&finder), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type, "application/json");
        assert!(body["error"].is_string());

        let (status, _, body) =
            send_raw(&app, Method::GET, "/lost-items?open=1", None, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn mistyped_body_is_bad_request_not_unprocessable() {
        let owner = token("owner", "Sam");
        let body = json!({
            "name": "Phone",
            "location": "Gym",
            "dateLost": "1700000000000"
        });

        let (status, _, body) = send_raw(
            &app(),
            Method::POST,
            "/lost-items",
            Some(&owner),
            &body.to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
