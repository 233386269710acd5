//! Shared plumbing for sparse updates.
//!
//! Admin edit endpoints accept partial bodies: absent fields stay untouched.
//! Each handler whitelists its columns with static names and feeds present
//! values into this builder, which emits a single UPDATE touching only those
//! columns plus `updated_at`.

use sqlx::SqlitePool;

pub struct UpdateBuilder {
    table: &'static str,
    key_column: &'static str,
    columns: Vec<&'static str>,
    values: Vec<Option<String>>,
}

impl UpdateBuilder {
    pub fn new(table: &'static str, key_column: &'static str) -> Self {
        Self {
            table,
            key_column,
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Set a column to a value. Column names are compile-time literals from
    /// the handler's whitelist, never request data.
    pub fn set(&mut self, column: &'static str, value: impl Into<String>) -> &mut Self {
        self.columns.push(column);
        self.values.push(Some(value.into()));
        self
    }

    /// Set a column only when the request supplied it.
    pub fn set_if(&mut self, column: &'static str, value: Option<impl Into<String>>) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    /// Set a column to NULL.
    pub fn set_null(&mut self, column: &'static str) -> &mut Self {
        self.columns.push(column);
        self.values.push(None);
        self
    }

    /// Stamp `updated_at` with the current time. Only tables that carry the
    /// column call this.
    pub fn touch(&mut self) -> &mut Self {
        self.set("updated_at", chrono::Utc::now().to_rfc3339())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Run the update. Returns the number of rows changed, so callers can
    /// turn 0 into a not-found.
    pub async fn execute(self, pool: &SqlitePool, key: &str) -> Result<u64, sqlx::Error> {
        if self.columns.is_empty() {
            return Ok(0);
        }

        let assignments: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} = ?", c))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.table,
            assignments.join(", "),
            self.key_column
        );

        let mut query = sqlx::query(&sql);
        for value in &self.values {
            query = query.bind(value);
        }
        query = query.bind(key);

        let result = query.execute(pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::models::NewUser;
    use crate::db::{test_pool, users};

    async fn seed_user(pool: &SqlitePool) -> crate::db::models::User {
        users::insert(
            pool,
            NewUser {
                first_name: "Amina".to_string(),
                second_name: Some("Okello".to_string()),
                email: "amina@example.org".to_string(),
                password_hash: "$argon2id$fake".to_string(),
                role: Role::Member,
                phone: Some("+254700000000".to_string()),
                address: None,
                gender: None,
                aspiration: None,
                photo: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_updates_only_named_columns() {
        let pool = test_pool().await;
        let user = seed_user(&pool).await;

        let mut builder = UpdateBuilder::new("users", "user_id");
        builder.set("first_name", "Aisha");
        builder.set_if("second_name", None::<String>);
        builder.touch();
        assert_eq!(builder.execute(&pool, &user.user_id).await.unwrap(), 1);

        let updated = users::find_by_id(&pool, &user.user_id).await.unwrap().unwrap();
        assert_eq!(updated.first_name, "Aisha");
        // Untouched fields keep their values.
        assert_eq!(updated.second_name.as_deref(), Some("Okello"));
        assert_eq!(updated.phone.as_deref(), Some("+254700000000"));
        assert_ne!(updated.updated_at, user.updated_at);
    }

    #[tokio::test]
    async fn test_set_null_clears_column() {
        let pool = test_pool().await;
        let user = seed_user(&pool).await;

        let mut builder = UpdateBuilder::new("users", "user_id");
        builder.set_null("second_name");
        assert_eq!(builder.execute(&pool, &user.user_id).await.unwrap(), 1);

        let updated = users::find_by_id(&pool, &user.user_id).await.unwrap().unwrap();
        assert_eq!(updated.second_name, None);
    }

    #[tokio::test]
    async fn test_empty_builder_touches_nothing() {
        let pool = test_pool().await;
        let user = seed_user(&pool).await;

        let builder = UpdateBuilder::new("users", "user_id");
        assert!(builder.is_empty());
        assert_eq!(builder.execute(&pool, &user.user_id).await.unwrap(), 0);

        let after = users::find_by_id(&pool, &user.user_id).await.unwrap().unwrap();
        assert_eq!(after.updated_at, user.updated_at);
    }

    #[tokio::test]
    async fn test_missing_row_reports_zero() {
        let pool = test_pool().await;
        let mut builder = UpdateBuilder::new("users", "user_id");
        builder.set("first_name", "Ghost");
        assert_eq!(builder.execute(&pool, "no-such-id").await.unwrap(), 0);
    }
}
