//! Staff dashboard counters.

use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::auth::{require_role, CurrentUser, STAFF_ROLES};
use crate::api::error::ApiError;
use crate::auth::Role;
use crate::db::users;
use crate::AppState;

/// GET /api/dashboard/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    require_role(&session, STAFF_ROLES)?;

    let members = users::count_by_role(&state.db, Role::Member).await?;
    let messages = count(&state.db, "messages").await?;
    let applications = count(&state.db, "applications").await?;
    let pending_applications = count_where(
        &state.db,
        "SELECT COUNT(*) FROM applications WHERE status = 'pending'",
    )
    .await?;
    let talents = count(&state.db, "talents").await?;
    let pending_talents = count_where(
        &state.db,
        "SELECT COUNT(*) FROM talents WHERE status = 'pending'",
    )
    .await?;

    Ok(Json(json!({
        "members": members,
        "messages": messages,
        "applications": applications,
        "pendingApplications": pending_applications,
        "talents": talents,
        "pendingTalents": pending_talents,
    })))
}

async fn count(pool: &sqlx::SqlitePool, table: &str) -> Result<i64, sqlx::Error> {
    // Table names are the compile-time literals above.
    count_where(pool, &format!("SELECT COUNT(*) FROM {}", table)).await
}

async fn count_where(pool: &sqlx::SqlitePool, sql: &str) -> Result<i64, sqlx::Error> {
    let (n,): (i64,) = sqlx::query_as(sql).fetch_one(pool).await?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_counts_on_empty_database() {
        let pool = test_pool().await;
        assert_eq!(count(&pool, "messages").await.unwrap(), 0);
        assert_eq!(count(&pool, "applications").await.unwrap(), 0);
        assert_eq!(count(&pool, "talents").await.unwrap(), 0);
    }
}
