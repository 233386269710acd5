//! Pending-registration store.
//!
//! A row is written the moment the gateway confirms capture. Registration
//! claims the row up front with an atomic consume, so one captured order can
//! never produce two accounts. If account creation fails after the claim,
//! the row is released and the member can finish registration with the same
//! order id instead of paying again.

use sqlx::SqlitePool;

/// Record a captured order. Re-capturing an already-recorded order is a
/// no-op: the gateway guarantees capture idempotency per order id and this
/// mirrors it locally.
pub async fn record_capture(
    pool: &SqlitePool,
    order_id: &str,
    amount: &str,
    currency: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO pending_registrations (order_id, amount, currency, captured_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(order_id)
    .bind(amount)
    .bind(currency)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// Claim a captured order for account creation. The guard on `consumed`
/// makes the claim atomic: of any number of racing attempts citing the same
/// order, exactly one sees `true`.
pub async fn consume(pool: &SqlitePool, order_id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE pending_registrations SET consumed = 1 WHERE order_id = ? AND consumed = 0")
            .bind(order_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() == 1)
}

/// Return a claimed order to the pool after a failed account creation.
pub async fn release(pool: &SqlitePool, order_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE pending_registrations SET consumed = 0 WHERE order_id = ?")
        .bind(order_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_unknown_order_cannot_be_consumed() {
        let pool = test_pool().await;
        assert!(!consume(&pool, "ORDER-404").await.unwrap());
    }

    #[tokio::test]
    async fn test_capture_record_is_idempotent() {
        let pool = test_pool().await;
        record_capture(&pool, "ORDER-1", "10.00", "USD").await.unwrap();
        record_capture(&pool, "ORDER-1", "10.00", "USD").await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pending_registrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_consumed_order_cannot_be_reused() {
        let pool = test_pool().await;
        record_capture(&pool, "ORDER-2", "10.00", "USD").await.unwrap();

        assert!(consume(&pool, "ORDER-2").await.unwrap());
        assert!(!consume(&pool, "ORDER-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_consumes_yield_one_winner() {
        let pool = test_pool().await;
        record_capture(&pool, "ORDER-3", "10.00", "USD").await.unwrap();

        let (a, b) = tokio::join!(consume(&pool, "ORDER-3"), consume(&pool, "ORDER-3"));
        assert!(a.unwrap() ^ b.unwrap());
    }

    #[tokio::test]
    async fn test_released_order_can_be_consumed_again() {
        let pool = test_pool().await;
        record_capture(&pool, "ORDER-4", "10.00", "USD").await.unwrap();

        assert!(consume(&pool, "ORDER-4").await.unwrap());
        release(&pool, "ORDER-4").await.unwrap();
        assert!(consume(&pool, "ORDER-4").await.unwrap());
    }
}
