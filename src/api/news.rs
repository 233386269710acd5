//! News and events endpoints.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::auth::{authorize_fresh, CurrentUser, STAFF_ROLES};
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::db::models::NewsEventWithAuthor;
use crate::storage::{self, MAX_UPLOAD_BYTES};
use crate::AppState;

/// GET /api/news: newest first, joined with the author's display fields.
pub async fn list_news(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<NewsEventWithAuthor>>, ApiError> {
    let posts = sqlx::query_as::<_, NewsEventWithAuthor>(
        r#"
        SELECT n.event_id, n.title, n.description, n.type, n.image, n.video_url,
               n.event_date, n.created_at, u.first_name, u.second_name, u.role
        FROM news_events n
        LEFT JOIN users u ON u.user_id = n.created_by
        ORDER BY n.created_at DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(posts))
}

#[derive(Debug, Default)]
struct NewsForm {
    title: String,
    post_type: String,
    description: String,
    video_url: Option<String>,
    event_date: Option<String>,
    image: Option<(String, Option<String>, Vec<u8>)>,
}

impl NewsForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = NewsForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "image" {
                let filename = field.file_name().unwrap_or("image").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read image: {e}")))?;
                if !bytes.is_empty() {
                    form.image = Some((filename, content_type, bytes.to_vec()));
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid field {name}: {e}")))?;
            match name.as_str() {
                "title" => form.title = value,
                "type" => form.post_type = value,
                "description" => form.description = value,
                "video_url" => form.video_url = Some(value),
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
        if let Err(e) = validation::validate_required_text(&self.post_type, "Type", 50) {
            errors.add("type", e);
        }
        if let Err(e) = validation::validate_required_text(&self.description, "Description", 10_000)
        {
            errors.add("description", e);
        }
        if let Some((filename, content_type, bytes)) = &self.image {
            if bytes.len() > MAX_UPLOAD_BYTES {
                errors.add("image", "Image must be 5MB or smaller");
            }
            if !storage::is_allowed_image(content_type.as_deref(), filename) {
                errors.add("image", "Image must be a JPEG, PNG, WebP or GIF image");
            }
        }

        errors.finish()
    }
}

/// POST /api/news
pub async fn create_news(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let author = authorize_fresh(&state.db, &session, STAFF_ROLES).await?;

    let form = NewsForm::from_multipart(multipart).await?;
    form.validate()?;

    let image = match &form.image {
        Some((filename, _, bytes)) => Some(
            state
                .uploads
                .save("news", filename, bytes)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to store image: {e}")))?,
        ),
        None => None,
    };

    let event_id = Uuid::new_v4().to_string();
    let result = sqlx::query(
        r#"
        INSERT INTO news_events
            (event_id, title, description, type, image, video_url, event_date, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event_id)
    .bind(form.title.trim())
    .bind(form.description.trim())
    .bind(form.post_type.trim())
    .bind(&image)
    .bind(&form.video_url)
    .bind(&form.event_date)
    .bind(&author.user_id)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await;

    if let Err(e) = result {
        if let Some(name) = &image {
            state.uploads.remove("news", name).await;
        }
        return Err(e.into());
    }

    tracing::info!(event_id = %event_id, "News post created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "eventId": event_id })),
    ))
}

/// DELETE /api/news/:id
pub async fn delete_news(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    authorize_fresh(&state.db, &session, STAFF_ROLES).await?;

    let post: Option<(Option<String>,)> =
        sqlx::query_as("SELECT image FROM news_events WHERE event_id = ?")
            .bind(&id)
            .fetch_optional(&state.db)
            .await?;
    let Some((image,)) = post else {
        return Err(ApiError::not_found("Post not found"));
    };

    sqlx::query("DELETE FROM news_events WHERE event_id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    if let Some(image) = &image {
        state.uploads.remove("news", image).await;
    }

    tracing::info!(event_id = %id, "News post deleted");
    Ok(Json(json!({ "success": true })))
}
