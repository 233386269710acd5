//! HTTP API: router assembly and the handler modules.

pub mod activities;
pub mod applications;
pub mod auth;
pub mod crud;
pub mod dashboard;
pub mod error;
pub mod info_center;
pub mod mentorship;
pub mod messages;
pub mod news;
pub mod register;
pub mod suggestions;
pub mod talents;
pub mod users;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::storage::MAX_UPLOAD_BYTES;
use crate::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&state.config.server.upload_dir);

    Router::new()
        .route("/health", get(health))
        // Session
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/register", post(register::register))
        // Payment workflow
        .route("/api/payments/orders", post(register::create_payment_order))
        .route("/api/payments/capture", post(register::capture_payment_order))
        // Talents
        .route(
            "/api/talents",
            get(talents::list_talents).post(talents::register_talent),
        )
        .route("/api/talents/statistics", get(talents::talent_statistics))
        .route("/api/talents/insights", get(talents::talent_insights))
        .route("/api/talents/pending", get(talents::pending_talents))
        .route("/api/talents/status", patch(talents::update_talent_status))
        .route(
            "/api/talents/:id",
            patch(talents::update_talent).delete(talents::delete_talent),
        )
        // Applications
        .route(
            "/api/applications",
            get(applications::list_applications).post(applications::create_application),
        )
        .route(
            "/api/applications/:id/status",
            patch(applications::update_application_status),
        )
        // Activities
        .route(
            "/api/activities",
            get(activities::list_activities).post(activities::create_activity),
        )
        .route("/api/activities/:id", delete(activities::delete_activity))
        // Mentorship
        .route(
            "/api/mentorship",
            get(mentorship::list_mentees)
                .post(mentorship::register_mentee)
                .delete(mentorship::delete_mentee),
        )
        // Information center
        .route(
            "/api/info",
            get(info_center::list_info_entries).post(info_center::create_info_entry),
        )
        .route(
            "/api/info/:slug",
            get(info_center::get_info_entry)
                .patch(info_center::update_info_entry)
                .delete(info_center::delete_info_entry),
        )
        // News and events
        .route("/api/news", get(news::list_news).post(news::create_news))
        .route("/api/news/:id", delete(news::delete_news))
        // Contact form
        .route(
            "/api/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        // Suggestion box
        .route(
            "/api/suggestions",
            get(suggestions::list_suggestions)
                .post(suggestions::create_suggestion)
                .patch(suggestions::update_suggestion)
                .delete(suggestions::delete_suggestion),
        )
        .route("/api/suggestions/read", post(suggestions::mark_suggestion_read))
        // Accounts
        .route("/api/members", get(users::member_directory))
        .route("/api/users", get(users::list_users))
        .route(
            "/api/users/:id",
            patch(users::update_user).delete(users::delete_user),
        )
        // Dashboard
        .route("/api/dashboard/stats", get(dashboard::stats))
        // Uploaded media
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        // Multipart bodies carry up to a handful of 5MB files.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES * 6))
        .with_state(state)
}
