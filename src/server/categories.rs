use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::server::AppState;
use crate::server::dto::CategoryRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::GameCategory;

pub fn categories_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
}

/// GET / - All active categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .store
        .list_active_categories()
        .api_err("Failed to list categories")?;

    Ok(Json(ApiResponse::success(categories)))
}

/// GET /{id} - A single active category. Deactivated categories read as gone.
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .store
        .get_active_category(id)
        .api_err("Failed to get category")?
        .or_not_found("Category not found")?;

    Ok(Json(ApiResponse::success(category)))
}

/// POST / - Create a category. Names are unique across active and
/// deactivated categories alike.
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Category name is required"));
    }

    if store
        .category_name_exists(&req.name)
        .api_err("Failed to check category name")?
    {
        return Err(ApiError::conflict(format!(
            "Category with name '{}' already exists",
            req.name
        )));
    }

    let mut category = GameCategory {
        id: 0,
        name: req.name,
        description: req.description,
        icon: req.icon,
        is_active: true,
    };
    category.id = store
        .create_category(&category)
        .api_err("Failed to create category")?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(category))))
}

/// PUT /{id} - Update an active category
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    let mut category = store
        .get_active_category(id)
        .api_err("Failed to get category")?
        .or_not_found("Category not found")?;

    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Category name is required"));
    }

    if category.name != req.name
        && store
            .active_category_name_exists(&req.name)
            .api_err("Failed to check category name")?
    {
        return Err(ApiError::conflict(format!(
            "Category with name '{}' already exists",
            req.name
        )));
    }

    category.name = req.name;
    category.description = req.description;
    category.icon = req.icon;

    store
        .update_category(&category)
        .api_err("Failed to update category")?;

    Ok(Json(ApiResponse::success(category)))
}

/// DELETE /{id} - Soft delete. The row stays so games keep their category id,
/// but the category disappears from every listing.
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    store
        .get_active_category(id)
        .api_err("Failed to get category")?
        .or_not_found("Category not found")?;

    store
        .deactivate_category(id)
        .api_err("Failed to delete category")?;

    Ok(StatusCode::NO_CONTENT)
}
