use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{path_id, query, AppState};
use crate::domain::aggregates::{staff_role, NewStaff, UserError, UserProfile};
use crate::dto::{ListParams, PaginatedResponse, UpdateStaffRequest};
use crate::StorefrontError;

pub async fn list(
    State(s): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PaginatedResponse<UserProfile>>, StorefrontError> {
    let p = query(params)?;
    let page = p.page();
    let (data, total) = s.users.list_staff(page, p.per_page()).await?;
    Ok(Json(PaginatedResponse { data, total, page }))
}

pub async fn create(
    State(s): State<AppState>,
    payload: Result<Json<NewStaff>, JsonRejection>,
) -> Result<(StatusCode, Json<UserProfile>), StorefrontError> {
    let Json(new) = payload.map_err(|e| StorefrontError::BadRequest(e.body_text()))?;
    let staff = UserProfile::new_staff(new)?;
    s.users.insert(&staff).await?;
    tracing::info!(user_id = %staff.id, role = staff.role.as_str(), "staff member added");
    Ok((StatusCode::CREATED, Json(staff)))
}

pub async fn update(
    State(s): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateStaffRequest>, JsonRejection>,
) -> Result<Json<UserProfile>, StorefrontError> {
    let id = path_id(id)?;
    let Json(req) = payload.map_err(|e| StorefrontError::BadRequest(e.body_text()))?;
    let role = req.role.as_deref().map(staff_role).transpose()?;

    let mut user = load_staff(&s, id).await?;
    user.role = role.unwrap_or(user.role);
    user.onboarding_completed = req.active.unwrap_or(user.onboarding_completed);
    if !s.users.update_staff(id, user.role, user.onboarding_completed).await? {
        return Err(StorefrontError::NotFound("User not found".into()));
    }
    tracing::info!(user_id = %id, role = user.role.as_str(), active = user.onboarding_completed, "staff member updated");
    Ok(Json(user))
}

/// Removes the account's row; the auth-provider account is left alone.
pub async fn revoke(
    State(s): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Value>, StorefrontError> {
    let id = path_id(id)?;
    load_staff(&s, id).await?;
    if !s.users.delete(id).await? {
        return Err(StorefrontError::NotFound("User not found".into()));
    }
    tracing::info!(user_id = %id, "staff access revoked");
    Ok(Json(json!({ "success": true })))
}

async fn load_staff(s: &AppState, id: Uuid) -> Result<UserProfile, StorefrontError> {
    let user = s.users.find(id).await?.ok_or_else(|| StorefrontError::NotFound("User not found".into()))?;
    if !user.role.is_staff() {
        return Err(UserError::NotStaff.into());
    }
    Ok(user)
}
