use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use super::{path_id, query, AppState};
use crate::domain::aggregates::{NewProduct, Product, UserProfile};
use crate::dto::{ListParams, PaginatedResponse};
use crate::StorefrontError;

pub async fn list(
    State(s): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PaginatedResponse<Product>>, StorefrontError> {
    let p = query(params)?;
    let page = p.page();
    let search = p.search.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let (data, total) = s.products.list(page, p.per_page(), search).await?;
    Ok(Json(PaginatedResponse { data, total, page }))
}

pub async fn get(
    State(s): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Product>, StorefrontError> {
    s.products.get(path_id(id)?).await?.map(Json).ok_or_else(|| StorefrontError::NotFound("Product not found".into()))
}

pub async fn admin_list(
    state: State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PaginatedResponse<Product>>, StorefrontError> {
    list(state, params).await
}

pub async fn create_product(
    State(s): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), StorefrontError> {
    let Json(new) = payload.map_err(|e| StorefrontError::BadRequest(e.body_text()))?;
    let product = Product::create(new)?;
    s.products.insert(&product).await?;
    tracing::info!(product_id = %product.id, title = %product.title, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn customers(
    State(s): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PaginatedResponse<UserProfile>>, StorefrontError> {
    let p = query(params)?;
    let page = p.page();
    let (data, total) = s.users.list_customers(page, p.per_page()).await?;
    Ok(Json(PaginatedResponse { data, total, page }))
}
