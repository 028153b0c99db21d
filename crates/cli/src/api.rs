use crate::uploads::{given_date, save_upload};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use fridge_core::inventory::{ConsumeOutcome, Inventory, InventoryError};
use fridge_core::resolver::ResolveError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use storage::models::Item;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state for the HTTP handlers.
pub struct AppState {
    pub inventory: Inventory,
    pub upload_dir: PathBuf,
}

pub fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/upload/", post(upload_product))
        .route("/api/products/", get(list_products))
        .route("/api/products/:id/consume", post(consume_product))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unprocessable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "status": "error", "message": message }))).into_response()
    }
}

impl From<InventoryError> for ApiError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::Resolve(ResolveError::InvalidManualDate(_)) => {
                ApiError::BadRequest("Invalid manual date format, expected YYYY-MM-DD.".into())
            }
            InventoryError::Resolve(ResolveError::MissingInput) => {
                ApiError::BadRequest("Provide a photo or a manual date.".into())
            }
            InventoryError::Storage(e) => {
                tracing::error!(error = %e, "inventory storage failed");
                ApiError::Internal("storage error".into())
            }
        }
    }
}

#[derive(Default)]
struct UploadForm {
    product_name: Option<String>,
    user_id: Option<String>,
    manual_date: Option<String>,
    photo: Option<(Option<String>, Vec<u8>)>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" => {
                let file_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                // Browsers send an empty part when no file was picked.
                if file_name.as_deref().is_some_and(|n| !n.is_empty()) && !data.is_empty() {
                    form.photo = Some((file_name, data.to_vec()));
                }
            }
            "product_name" | "user_id" | "manual_date" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                match name.as_str() {
                    "product_name" => form.product_name = Some(value),
                    "user_id" => form.user_id = Some(value),
                    _ => form.manual_date = Some(value),
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

/// Handler for `POST /api/upload/`.
async fn upload_product(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = read_upload_form(multipart).await?;
    let product_name = form
        .product_name
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Unprocessable("product_name is required".into()))?;
    let user_id = form
        .user_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Unprocessable("user_id is required".into()))?;
    let manual_date = given_date(form.manual_date.as_deref());

    // The photo is only stored when it will actually be read.
    let photo_path = match (manual_date, form.photo) {
        (None, Some((file_name, data))) => Some(
            save_upload(&state.upload_dir, file_name.as_deref(), &data)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "failed to store upload");
                    ApiError::Internal("could not store photo".into())
                })?,
        ),
        _ => None,
    };

    let registration = state
        .inventory
        .register(
            &product_name,
            &user_id,
            manual_date,
            photo_path.as_deref(),
        )
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Product processed",
        "date_status": registration.expiry.display_status,
        "expiry": registration.expiry,
        "item": registration.item,
    })))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    user_id: Option<String>,
}

/// Handler for `GET /api/products/`.
async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state
        .inventory
        .list_active(params.user_id.as_deref())
        .await?;
    Ok(Json(items))
}

/// Handler for `POST /api/products/:id/consume`.
async fn consume_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    match state.inventory.consume(id).await? {
        ConsumeOutcome::Consumed => Ok(Json(json!({
            "status": "success",
            "message": "Product removed from the fridge",
        }))),
        ConsumeOutcome::NotFound => Ok(Json(json!({
            "status": "error",
            "message": "Product not found",
        }))),
    }
}
