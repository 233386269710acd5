//! Startup seeding.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::api::auth::hash_password;
use crate::auth::Role;
use crate::db::models::NewUser;
use crate::db::users;

/// Ensure an admin account exists so a fresh install is reachable. Runs on
/// every startup; does nothing once any admin is present.
pub async fn ensure_admin_user(
    pool: &SqlitePool,
    email: &str,
    password: Option<&str>,
) -> Result<()> {
    if users::count_by_role(pool, Role::Admin).await? > 0 {
        return Ok(());
    }

    let Some(password) = password else {
        warn!("No admin account exists and auth.admin_password is not set; skipping seed");
        return Ok(());
    };

    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("failed to hash admin password: {e}"))?;

    users::insert(
        pool,
        NewUser {
            first_name: "Admin".to_string(),
            second_name: None,
            email: email.to_string(),
            password_hash,
            role: Role::Admin,
            phone: None,
            address: None,
            gender: None,
            aspiration: None,
            photo: None,
        },
    )
    .await
    .context("failed to seed admin user")?;

    info!("Seeded initial admin user: {}", email);
    Ok(())
}
