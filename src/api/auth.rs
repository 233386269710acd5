//! Login, logout, session introspection, and the request extractors that
//! gate every protected endpoint.
//!
//! The session rides in an HttpOnly cookie holding a signed token. Request
//! authorization trusts the token's role claim; privileged mutations
//! additionally re-check the store through [`authorize_fresh`] so a demoted
//! or deleted account cannot keep acting on an old token.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::auth::{self, Role, SessionUser};
use crate::db::models::{LoginRequest, User};
use crate::db::users;
use crate::AppState;

/// Name of the session cookie.
pub const AUTH_COOKIE: &str = "auth_token";

/// Roles allowed to administer content.
pub const STAFF_ROLES: &[Role] = &[Role::Admin, Role::Staff];

/// Roles allowed to manage accounts.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Build the session cookie. `Secure` is only set in production so local
/// development over plain HTTP keeps working.
fn session_cookie(token: String, production: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(production)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(auth::TOKEN_TTL_DAYS))
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build()
}

fn session_user_json(user: &SessionUser) -> serde_json::Value {
    json!({
        "id": user.user_id,
        "email": user.email,
        "role": user.role,
        "first_name": user.first_name,
        "photo": user.photo,
    })
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError> {
    let (email, password) = match (request.email.as_deref(), request.password.as_deref()) {
        (Some(e), Some(p)) if !e.trim().is_empty() && !p.is_empty() => (e, p),
        _ => return Err(ApiError::bad_request("Email and password are required")),
    };

    let user = users::find_by_email(&state.db, email).await?;

    // One rejection message for both unknown email and wrong password.
    let user = match user {
        Some(u) if verify_password(password, &u.password_hash) => u,
        _ => return Err(ApiError::unauthorized("Invalid email or password")),
    };

    let session = SessionUser {
        user_id: user.user_id,
        email: user.email,
        role: user.role,
        first_name: user.first_name,
        photo: user.photo,
    };
    let token = state
        .tokens
        .issue(&session)
        .map_err(|e| ApiError::internal(format!("Failed to issue session token: {e}")))?;

    tracing::info!(user_id = %session.user_id, "User logged in");

    let jar = jar.add(session_cookie(token, state.config.server.production));
    Ok((
        jar,
        Json(json!({ "success": true, "user": session_user_json(&session) })),
    ))
}

/// POST /api/auth/logout
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let jar = jar.add(removal_cookie());
    (jar, Json(json!({ "success": true, "message": "Logged out" })))
}

/// GET /api/auth/me
///
/// Reads the account row fresh so the client sees current fields, not the
/// snapshot baked into the token at login. Only the display fields the
/// header widget needs are returned.
pub async fn me(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = users::find_by_id(&state.db, &session.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    Ok(Json(me_response(&user)))
}

fn me_response(user: &User) -> serde_json::Value {
    json!({
        "id": user.user_id,
        "first_name": user.first_name,
        "role": user.role,
        "photo": user.photo,
    })
}

/// Pull the session token out of the request: the session cookie first, then
/// an Authorization bearer header for non-browser clients.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(AUTH_COOKIE) {
        let value = cookie.value();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Extractor for endpoints that require a logged-in user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        let session = state
            .tokens
            .verify(&token)
            .ok_or_else(|| ApiError::unauthorized("Session is invalid or expired"))?;
        Ok(CurrentUser(session))
    }
}

/// Extractor for endpoints whose behavior differs for visitors and members
/// but which reject nobody.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<SessionUser>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = extract_token(&parts.headers).and_then(|t| state.tokens.verify(&t));
        Ok(OptionalUser(session))
    }
}

/// Role gate over the token's claim. Sufficient for reads and low-stakes
/// writes; privileged mutations use [`authorize_fresh`] instead.
pub fn require_role(user: &SessionUser, allowed: &[Role]) -> Result<(), ApiError> {
    if auth::authorize(user, allowed) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ))
    }
}

/// Role gate that consults the store, not the token. A token issued before a
/// demotion or deletion fails here even though its claim still verifies.
pub async fn authorize_fresh(
    pool: &sqlx::SqlitePool,
    session: &SessionUser,
    allowed: &[Role],
) -> Result<User, ApiError> {
    let user = users::find_by_id(pool, &session.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    if !allowed.contains(&user.role) {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ));
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::models::NewUser;
    use crate::db::test_pool;
    use axum::http::HeaderValue;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-hash"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok".to_string(), true);
        assert_eq!(cookie.name(), AUTH_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));

        // Development deployments skip Secure so HTTP logins work.
        let dev = session_cookie("tok".to_string(), false);
        assert_eq!(dev.secure(), Some(false));
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let cookie = removal_cookie();
        assert_eq!(cookie.name(), AUTH_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }

    #[test]
    fn test_extract_token_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("auth_token=from-cookie; other=x"),
        );
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(extract_token(&headers), Some("from-cookie".to_string()));

        headers.remove(header::COOKIE);
        assert_eq!(extract_token(&headers), Some("from-header".to_string()));

        headers.remove(header::AUTHORIZATION);
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn test_require_role() {
        let member = SessionUser {
            user_id: "u1".to_string(),
            email: "m@example.org".to_string(),
            role: Role::Member,
            first_name: "M".to_string(),
            photo: None,
        };
        assert!(require_role(&member, &[Role::Member]).is_ok());
        assert!(require_role(&member, &[Role::Admin, Role::Staff]).is_err());
    }

    async fn seeded_session(pool: &sqlx::SqlitePool, role: Role) -> SessionUser {
        let user = users::insert(
            pool,
            NewUser {
                first_name: "Test".to_string(),
                second_name: None,
                email: format!("{}@example.org", role),
                password_hash: "$argon2id$fake".to_string(),
                role,
                phone: None,
                address: None,
                gender: None,
                aspiration: None,
                photo: None,
            },
        )
        .await
        .unwrap();

        SessionUser {
            user_id: user.user_id,
            email: user.email,
            role: user.role,
            first_name: user.first_name,
            photo: None,
        }
    }

    #[tokio::test]
    async fn test_me_returns_display_fields_keyed_by_id() {
        let pool = test_pool().await;
        let session = seeded_session(&pool, Role::Member).await;
        let user = users::find_by_id(&pool, &session.user_id)
            .await
            .unwrap()
            .unwrap();

        let body = me_response(&user);
        assert_eq!(body["id"], json!(user.user_id));
        assert_eq!(body["first_name"], json!("Test"));
        assert_eq!(body["role"], json!("member"));
        assert!(body.get("user_id").is_none());
        assert!(body.get("email").is_none());
    }

    #[tokio::test]
    async fn test_authorize_fresh_uses_stored_role() {
        let pool = test_pool().await;
        let mut session = seeded_session(&pool, Role::Member).await;

        assert!(authorize_fresh(&pool, &session, &[Role::Member])
            .await
            .is_ok());

        // Token still claims admin, but the store says member.
        session.role = Role::Admin;
        let err = authorize_fresh(&pool, &session, &[Role::Admin])
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_authorize_fresh_rejects_deleted_account() {
        let pool = test_pool().await;
        let session = seeded_session(&pool, Role::Admin).await;
        users::delete(&pool, &session.user_id).await.unwrap();

        let err = authorize_fresh(&pool, &session, &[Role::Admin])
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
