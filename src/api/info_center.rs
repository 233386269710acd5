//! Information-center endpoints: opportunities, programs and resources
//! published by staff, addressed by slug.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::auth::{authorize_fresh, CurrentUser, OptionalUser, STAFF_ROLES};
use crate::auth;
use crate::api::crud::UpdateBuilder;
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::db::models::{CreateInfoEntryRequest, InfoEntry, InfoEntrySummary};
use crate::AppState;

/// GET /api/info: published entries, summary fields only. Staff sessions
/// also see unpublished drafts.
pub async fn list_info_entries(
    State(state): State<Arc<AppState>>,
    OptionalUser(session): OptionalUser,
) -> Result<Json<Vec<InfoEntrySummary>>, ApiError> {
    let staff = session
        .map(|s| auth::authorize(&s, STAFF_ROLES))
        .unwrap_or(false);

    let sql = if staff {
        "SELECT id, category, name, summary, image, slug, created_at \
         FROM information_center ORDER BY created_at DESC"
    } else {
        "SELECT id, category, name, summary, image, slug, created_at \
         FROM information_center WHERE is_published = 1 ORDER BY created_at DESC"
    };

    let entries = sqlx::query_as::<_, InfoEntrySummary>(sql)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(entries))
}

/// GET /api/info/:slug: published entries for everyone, drafts for staff,
/// matching the listing's visibility rules.
pub async fn get_info_entry(
    State(state): State<Arc<AppState>>,
    OptionalUser(session): OptionalUser,
    Path(slug): Path<String>,
) -> Result<Json<InfoEntry>, ApiError> {
    let staff = session
        .map(|s| auth::authorize(&s, STAFF_ROLES))
        .unwrap_or(false);

    let entry = fetch_entry(&state.db, &slug, staff)
        .await?
        .ok_or_else(|| ApiError::not_found("Entry not found"))?;
    Ok(Json(entry))
}

async fn fetch_entry(
    pool: &sqlx::SqlitePool,
    slug: &str,
    include_drafts: bool,
) -> Result<Option<InfoEntry>, sqlx::Error> {
    let sql = if include_drafts {
        "SELECT * FROM information_center WHERE slug = ?"
    } else {
        "SELECT * FROM information_center WHERE slug = ? AND is_published = 1"
    };
    sqlx::query_as::<_, InfoEntry>(sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
}

/// POST /api/info
pub async fn create_info_entry(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<CreateInfoEntryRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let author = authorize_fresh(&state.db, &session, STAFF_ROLES).await?;

    let mut errors = ValidationErrorBuilder::new();
    let category = request.category.as_deref().unwrap_or("");
    let name = request.name.as_deref().unwrap_or("");
    let content = request.content.as_deref().unwrap_or("");

    if let Err(e) = validation::validate_required_text(category, "Category", 100) {
        errors.add("category", e);
    }
    if let Err(e) = validation::validate_required_text(name, "Name", 200) {
        errors.add("name", e);
    }
    if let Err(e) = validation::validate_required_text(content, "Content", 50_000) {
        errors.add("content", e);
    }
    if let Some(email) = request.contact_email.as_deref().filter(|e| !e.trim().is_empty()) {
        if let Err(e) = validation::validate_email(email) {
            errors.add("contact_email", e);
        }
    }
    errors.finish()?;

    let slug = unique_slug(&state.db, name).await?;
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO information_center
            (id, category, name, content, summary, location, date_start, date_end,
             contact_person, contact_email, contact_phone, address, image, attachment,
             is_published, slug, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(category.trim())
    .bind(name.trim())
    .bind(content)
    .bind(&request.summary)
    .bind(&request.location)
    .bind(&request.date_start)
    .bind(&request.date_end)
    .bind(&request.contact_person)
    .bind(&request.contact_email)
    .bind(&request.contact_phone)
    .bind(&request.address)
    .bind(&request.image)
    .bind(&request.attachment)
    .bind(request.is_published as i64)
    .bind(&slug)
    .bind(&author.user_id)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    tracing::info!(entry_id = %id, %slug, "Information entry created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "entryId": id, "slug": slug })),
    ))
}

/// PATCH /api/info/:id: sparse edit; the slug stays stable so published
/// links keep working.
pub async fn update_info_entry(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateInfoEntryRequest>,
) -> Result<Json<Value>, ApiError> {
    authorize_fresh(&state.db, &session, STAFF_ROLES).await?;

    let mut builder = UpdateBuilder::new("information_center", "id");
    builder.set_if("category", request.category);
    builder.set_if("name", request.name);
    builder.set_if("content", request.content);
    builder.set_if("summary", request.summary);
    builder.set_if("location", request.location);
    builder.set_if("date_start", request.date_start);
    builder.set_if("date_end", request.date_end);
    builder.set_if("contact_person", request.contact_person);
    builder.set_if("contact_email", request.contact_email);
    builder.set_if("contact_phone", request.contact_phone);
    builder.set_if("address", request.address);
    builder.set_if("image", request.image);
    builder.set_if("attachment", request.attachment);
    if let Some(published) = request.is_published {
        builder.set("is_published", if published { "1" } else { "0" });
    }
    if builder.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    if builder.execute(&state.db, &id).await? == 0 {
        return Err(ApiError::not_found("Entry not found"));
    }
    Ok(Json(json!({ "success": true })))
}

/// Sparse-update body: every field optional, absent means untouched.
#[derive(Debug, serde::Deserialize)]
pub struct UpdateInfoEntryRequest {
    pub category: Option<String>,
    pub name: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub image: Option<String>,
    pub attachment: Option<String>,
    pub is_published: Option<bool>,
}

/// DELETE /api/info/:id
pub async fn delete_info_entry(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    authorize_fresh(&state.db, &session, STAFF_ROLES).await?;

    let result = sqlx::query("DELETE FROM information_center WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Entry not found"));
    }
    Ok(Json(json!({ "success": true })))
}

/// Derive a unique slug from the name: the plain slug if free, otherwise the
/// first free `-2`, `-3`, ... suffix.
async fn unique_slug(pool: &sqlx::SqlitePool, name: &str) -> Result<String, sqlx::Error> {
    let base = validation::slugify(name);
    let mut candidate = base.clone();
    let mut suffix = 2;

    while slug_taken(pool, &candidate).await? {
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
    Ok(candidate)
}

async fn slug_taken(pool: &sqlx::SqlitePool, slug: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM information_center WHERE slug = ? LIMIT 1")
            .bind(slug)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn insert_entry(pool: &sqlx::SqlitePool, name: &str, slug: &str, published: i64) {
        sqlx::query(
            r#"
            INSERT INTO information_center (id, category, name, content, is_published, slug, created_at)
            VALUES (?, 'grants', ?, 'body', ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(published)
        .bind(slug)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_unique_slug_appends_suffix() {
        let pool = test_pool().await;
        assert_eq!(unique_slug(&pool, "Youth Grant").await.unwrap(), "youth-grant");

        insert_entry(&pool, "Youth Grant", "youth-grant", 1).await;
        assert_eq!(
            unique_slug(&pool, "Youth Grant").await.unwrap(),
            "youth-grant-2"
        );

        insert_entry(&pool, "Youth Grant", "youth-grant-2", 1).await;
        assert_eq!(
            unique_slug(&pool, "Youth Grant").await.unwrap(),
            "youth-grant-3"
        );
    }

    #[tokio::test]
    async fn test_drafts_visible_only_when_drafts_included() {
        let pool = test_pool().await;
        insert_entry(&pool, "Draft", "draft", 0).await;

        assert!(fetch_entry(&pool, "draft", false).await.unwrap().is_none());
        let entry = fetch_entry(&pool, "draft", true).await.unwrap().unwrap();
        assert_eq!(entry.slug, "draft");
    }

    #[tokio::test]
    async fn test_unpublished_entries_hidden_from_listing() {
        let pool = test_pool().await;
        insert_entry(&pool, "Visible", "visible", 1).await;
        insert_entry(&pool, "Draft", "draft", 0).await;

        let entries = sqlx::query_as::<_, InfoEntrySummary>(
            "SELECT id, category, name, summary, image, slug, created_at \
             FROM information_center WHERE is_published = 1",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].slug, "visible");
    }
}
