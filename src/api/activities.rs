//! Activity endpoints: past programs and events with attached media.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::auth::{authorize_fresh, CurrentUser, STAFF_ROLES};
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::db::models::{Activity, ActivityMedia, ActivityWithMedia, MediaItem};
use crate::storage::{self, MAX_UPLOAD_BYTES};
use crate::AppState;

/// GET /api/activities: newest first, media aggregated per activity.
pub async fn list_activities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ActivityWithMedia>>, ApiError> {
    let activities = sqlx::query_as::<_, Activity>(
        "SELECT * FROM activities ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    let media = sqlx::query_as::<_, ActivityMedia>("SELECT * FROM activity_media")
        .fetch_all(&state.db)
        .await?;

    let mut by_activity: HashMap<String, Vec<MediaItem>> = HashMap::new();
    for m in media {
        by_activity.entry(m.activity_id).or_default().push(MediaItem {
            id: m.id,
            media_type: m.media_type,
            file_name: m.file_name,
        });
    }

    let result = activities
        .into_iter()
        .map(|activity| {
            let media = by_activity.remove(&activity.id).unwrap_or_default();
            ActivityWithMedia { activity, media }
        })
        .collect();
    Ok(Json(result))
}

#[derive(Debug, Default)]
struct ActivityForm {
    title: String,
    activity_type: String,
    description: String,
    event_date: Option<String>,
    media: Vec<(String, Option<String>, Vec<u8>)>,
}

impl ActivityForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = ActivityForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "media" {
                let filename = field.file_name().unwrap_or("media").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read media: {e}")))?;
                if !bytes.is_empty() {
                    form.media.push((filename, content_type, bytes.to_vec()));
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid field {name}: {e}")))?;
            match name.as_str() {
                "title" => form.title = value,
                "type" => form.activity_type = value,
                "description" => form.description = value,
                "event_date" => form.event_date = Some(value),
                _ => {}
            }
        }
        Ok(form)
    }

    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrorBuilder::new();

        if let Err(e) = validation::validate_required_text(&self.title, "Title", 200) {
            errors.add("title", e);
        }
        if let Err(e) = validation::validate_required_text(&self.activity_type, "Type", 100) {
            errors.add("type", e);
        }
        if let Err(e) = validation::validate_required_text(&self.description, "Description", 5000) {
            errors.add("description", e);
        }
        for (i, (_, _, bytes)) in self.media.iter().enumerate() {
            if bytes.len() > MAX_UPLOAD_BYTES {
                errors.add("media", format!("Media file {} exceeds the 5MB limit", i + 1));
            }
        }

        errors.finish()
    }
}

/// POST /api/activities
///
/// The activity row and its media rows land in one transaction; saved blobs
/// are removed again if the transaction fails.
pub async fn create_activity(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let author = authorize_fresh(&state.db, &session, STAFF_ROLES).await?;

    let form = ActivityForm::from_multipart(multipart).await?;
    form.validate()?;

    let mut saved: Vec<(String, String)> = Vec::with_capacity(form.media.len());
    for (filename, content_type, bytes) in &form.media {
        let stored = state
            .uploads
            .save("activities", filename, bytes)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to store media: {e}")))?;
        let media_type = storage::media_type_for(content_type.as_deref(), filename);
        saved.push((stored, media_type.to_string()));
    }

    let activity_id = Uuid::new_v4().to_string();
    let insert = async {
        let mut tx = state.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO activities (id, title, type, description, event_date, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&activity_id)
        .bind(form.title.trim())
        .bind(form.activity_type.trim())
        .bind(form.description.trim())
        .bind(&form.event_date)
        .bind(&author.user_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for (file_name, media_type) in &saved {
            sqlx::query(
                "INSERT INTO activity_media (id, activity_id, media_type, file_name) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&activity_id)
            .bind(media_type)
            .bind(file_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    };

    if let Err(e) = insert.await {
        for (file_name, _) in &saved {
            state.uploads.remove("activities", file_name).await;
        }
        return Err(e.into());
    }

    tracing::info!(activity_id = %activity_id, media = saved.len(), "Activity created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "activityId": activity_id })),
    ))
}

/// DELETE /api/activities/:id: media rows cascade; blobs removed after.
pub async fn delete_activity(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    authorize_fresh(&state.db, &session, STAFF_ROLES).await?;

    let files: Vec<(String,)> =
        sqlx::query_as("SELECT file_name FROM activity_media WHERE activity_id = ?")
            .bind(&id)
            .fetch_all(&state.db)
            .await?;

    let result = sqlx::query("DELETE FROM activities WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Activity not found"));
    }

    for (file_name,) in &files {
        state.uploads.remove("activities", file_name).await;
    }

    tracing::info!(activity_id = %id, "Activity deleted");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn valid_form() -> ActivityForm {
        ActivityForm {
            title: "Art workshop".to_string(),
            activity_type: "workshop".to_string(),
            description: "A weekend art workshop".to_string(),
            event_date: Some("2026-09-01".to_string()),
            media: vec![],
        }
    }

    #[test]
    fn test_valid_activity_passes() {
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn test_missing_title_rejected() {
        let mut form = valid_form();
        form.title = String::new();
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_oversized_media_rejected() {
        let mut form = valid_form();
        form.media.push((
            "clip.mp4".to_string(),
            Some("video/mp4".to_string()),
            vec![0u8; MAX_UPLOAD_BYTES + 1],
        ));
        assert!(form.validate().is_err());
    }

    #[tokio::test]
    async fn test_media_rows_cascade_with_activity() {
        let pool = test_pool().await;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO activities (id, title, type, description, created_at) VALUES ('a1', 'T', 'workshop', 'D', ?)",
        )
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO activity_media (id, activity_id, media_type, file_name) VALUES ('m1', 'a1', 'image', 'x.png')",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("DELETE FROM activities WHERE id = 'a1'")
            .execute(&pool)
            .await
            .unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM activity_media")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
