//! Credential store: the only module that reads or writes the users table.
//!
//! Emails are normalized to lowercase here so the unique index compares
//! like with like; roles cross this boundary only as the closed enum.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::Role;
use crate::db::models::{MemberCard, NewUser, User, UserResponse};

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM users WHERE email = ? LIMIT 1")
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Insert a new account. A duplicate email surfaces as the database's
/// uniqueness violation; callers map it to a conflict.
pub async fn insert(pool: &SqlitePool, new_user: NewUser) -> Result<User, sqlx::Error> {
    let user_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users
            (user_id, first_name, second_name, email, password_hash, role,
             phone, address, gender, aspiration, photo, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user_id)
    .bind(new_user.first_name.trim())
    .bind(new_user.second_name.as_deref().map(str::trim))
    .bind(normalize_email(&new_user.email))
    .bind(&new_user.password_hash)
    .bind(new_user.role)
    .bind(new_user.phone.as_deref().map(str::trim))
    .bind(new_user.address.as_deref().map(str::trim))
    .bind(&new_user.gender)
    .bind(new_user.aspiration.as_deref().map(str::trim))
    .bind(&new_user.photo)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?")
        .bind(&user_id)
        .fetch_one(pool)
        .await
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<UserResponse>, sqlx::Error> {
    sqlx::query_as::<_, UserResponse>(
        r#"
        SELECT user_id, first_name, second_name, email, role, phone, photo, gender, aspiration
        FROM users
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn list_members(pool: &SqlitePool, limit: i64) -> Result<Vec<MemberCard>, sqlx::Error> {
    sqlx::query_as::<_, MemberCard>(
        r#"
        SELECT user_id, first_name, second_name, photo, aspiration
        FROM users
        WHERE role = 'member'
        ORDER BY created_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn count_by_role(pool: &SqlitePool, role: Role) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = ?")
        .bind(role)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn delete(pool: &SqlitePool, user_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{is_unique_violation, test_pool};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Amina".to_string(),
            second_name: Some("Okello".to_string()),
            email: email.to_string(),
            password_hash: "$argon2id$fake".to_string(),
            role: Role::Member,
            phone: Some("+254700000000".to_string()),
            address: Some("Nairobi".to_string()),
            gender: Some("female".to_string()),
            aspiration: Some("Music".to_string()),
            photo: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup_normalizes_email() {
        let pool = test_pool().await;
        let user = insert(&pool, new_user("  Amina@Example.ORG ")).await.unwrap();
        assert_eq!(user.email, "amina@example.org");
        assert_eq!(user.role, Role::Member);

        let found = find_by_email(&pool, "AMINA@example.org").await.unwrap();
        assert_eq!(found.unwrap().user_id, user.user_id);
        assert!(email_exists(&pool, "amina@EXAMPLE.org").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let pool = test_pool().await;
        insert(&pool, new_user("amina@example.org")).await.unwrap();

        // Case differences must not smuggle a second row past the index.
        let err = insert(&pool, new_user("AMINA@example.org"))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_inserts_leave_one_row() {
        let pool = test_pool().await;

        let (a, b) = tokio::join!(
            insert(&pool, new_user("race@example.org")),
            insert(&pool, new_user("race@example.org")),
        );

        let failures = [&a, &b]
            .iter()
            .filter(|r| r.is_err())
            .map(|r| r.as_ref().unwrap_err())
            .inspect(|e| assert!(is_unique_violation(e)))
            .count();
        assert_eq!(failures, 1);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let pool = test_pool().await;
        let user = insert(&pool, new_user("gone@example.org")).await.unwrap();
        assert_eq!(count_by_role(&pool, Role::Member).await.unwrap(), 1);

        assert_eq!(delete(&pool, &user.user_id).await.unwrap(), 1);
        assert_eq!(delete(&pool, &user.user_id).await.unwrap(), 0);
        assert_eq!(count_by_role(&pool, Role::Member).await.unwrap(), 0);
    }
}
