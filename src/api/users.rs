//! Account management (admin) and the public member directory.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::auth::{authorize_fresh, require_role, CurrentUser, ADMIN_ONLY};
use crate::api::crud::UpdateBuilder;
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::db::models::{MemberCard, UpdateUserRequest, UserResponse};
use crate::db::users;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    pub limit: Option<i64>,
}

/// GET /api/members: public directory with display fields only.
pub async fn member_directory(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Vec<MemberCard>>, ApiError> {
    let limit = query.limit.unwrap_or(12).clamp(1, 100);
    let members = users::list_members(&state.db, limit).await?;
    Ok(Json(members))
}

/// GET /api/users: admin account list.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    require_role(&session, ADMIN_ONLY)?;
    let accounts = users::list(&state.db).await?;
    Ok(Json(accounts))
}

/// PATCH /api/users/:id: sparse edit of names and role.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    authorize_fresh(&state.db, &session, ADMIN_ONLY).await?;

    let mut errors = ValidationErrorBuilder::new();
    if let Some(first_name) = &request.first_name {
        if let Err(e) = validation::validate_name(first_name, "First name") {
            errors.add("first_name", e);
        }
    }
    errors.finish()?;

    let mut builder = UpdateBuilder::new("users", "user_id");
    builder.set_if("first_name", request.first_name.map(|s| s.trim().to_string()));
    builder.set_if("second_name", request.second_name.map(|s| s.trim().to_string()));
    builder.set_if("role", request.role.map(|r| r.as_str().to_string()));
    if builder.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    builder.touch();

    if builder.execute(&state.db, &id).await? == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id = %id, "Account updated");
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/users/:id
///
/// Admins cannot delete their own account, so the system always retains at
/// least the acting admin.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let acting = authorize_fresh(&state.db, &session, ADMIN_ONLY).await?;

    if acting.user_id == id {
        return Err(ApiError::forbidden("You cannot delete your own account"));
    }

    let target = users::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    users::delete(&state.db, &id).await?;

    if let Some(photo) = &target.photo {
        state.uploads.remove("profile", photo).await;
    }

    tracing::info!(user_id = %id, deleted_by = %acting.user_id, "Account deleted");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::models::NewUser;
    use crate::db::test_pool;

    async fn seed(pool: &sqlx::SqlitePool, email: &str, role: Role) -> String {
        users::insert(
            pool,
            NewUser {
                first_name: "U".to_string(),
                second_name: None,
                email: email.to_string(),
                password_hash: "$argon2id$fake".to_string(),
                role,
                phone: None,
                address: None,
                gender: None,
                aspiration: Some("Arts".to_string()),
                photo: None,
            },
        )
        .await
        .unwrap()
        .user_id
    }

    #[tokio::test]
    async fn test_directory_lists_members_only() {
        let pool = test_pool().await;
        seed(&pool, "a@example.org", Role::Member).await;
        seed(&pool, "b@example.org", Role::Admin).await;
        seed(&pool, "c@example.org", Role::Staff).await;

        let members = users::list_members(&pool, 12).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].aspiration.as_deref(), Some("Arts"));
    }

    #[tokio::test]
    async fn test_role_change_is_persisted() {
        let pool = test_pool().await;
        let id = seed(&pool, "m@example.org", Role::Member).await;

        let mut builder = UpdateBuilder::new("users", "user_id");
        builder.set("role", Role::Staff.as_str());
        builder.touch();
        assert_eq!(builder.execute(&pool, &id).await.unwrap(), 1);

        let user = users::find_by_id(&pool, &id).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Staff);
    }
}
