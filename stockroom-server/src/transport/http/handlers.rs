//! Route handlers

use super::{AppState, AuthUser};
use crate::error::ApiError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use stockroom::{Item, ItemPage, ItemQuery, ItemStore, ItemUpdate, NewItem};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Raw listing parameters; anything unparseable falls back to a default
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub min_stock: Option<String>,
    pub name: Option<String>,
}

impl ListParams {
    pub fn into_query(self) -> ItemQuery {
        let int = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        ItemQuery::new(
            int(&self.page),
            int(&self.page_size),
            self.sort_by.as_deref(),
            self.sort_order.as_deref(),
            int(&self.min_stock),
            self.name,
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> MessageResponse<T> {
    fn new(message: &str, data: Option<T>) -> Self {
        Self {
            message: message.to_string(),
            data,
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = body.map_err(|_| ApiError::BadRequest("Invalid request".to_string()))?;
    let token = state.auth.login(&req.username, &req.password)?;
    tracing::info!("Issued token for {}", req.username);
    Ok(Json(LoginResponse { token }))
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ItemPage>, ApiError> {
    let query = params.into_query();
    let page = state
        .items
        .list(&query)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to fetch items", &state.metrics))?;
    Ok(Json(page))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Item>>, ApiError> {
    let item = state
        .items
        .read(&id)
        .await
        .map_err(|e| ApiError::from_store(e, "Database error", &state.metrics))?;
    Ok(Json(DataResponse { data: item }))
}

pub async fn create_item(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    body: Result<Json<NewItem>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse<Item>>), ApiError> {
    let Json(new_item) = body?;
    new_item.validate()?;

    let item = state
        .items
        .create(new_item)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to create item", &state.metrics))?;

    tracing::info!("{} created item {}", claims.sub, item.id);
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Item created successfully", Some(item))),
    ))
}

pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<ItemUpdate>, JsonRejection>,
) -> Result<Json<MessageResponse<Item>>, ApiError> {
    // A missing item is reported before anything is said about the body
    state
        .items
        .store()
        .find(&id)
        .await
        .map_err(|e| ApiError::from_store(e, "Database error", &state.metrics))?
        .ok_or(ApiError::NotFound)?;

    let Json(update) = body?;
    update.validate()?;

    let item = state
        .items
        .update(&id, update)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to update item", &state.metrics))?;

    tracing::info!("{} updated item {}", claims.sub, id);
    Ok(Json(MessageResponse::new("Item updated successfully", Some(item))))
}

pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse<Item>>, ApiError> {
    state
        .items
        .delete(&id)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to delete item", &state.metrics))?;

    tracing::info!("{} deleted item {}", claims.sub, id);
    Ok(Json(MessageResponse::new("Item deleted successfully", None)))
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.export_prometheus(),
    )
}

pub async fn not_found() -> ApiError {
    ApiError::NoRoute
}
