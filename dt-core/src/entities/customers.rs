//! The `customers` table.
//!
//! A platform user is identified by `(platform_id, platform_user_id)`;
//! `user_id` is the internal surrogate key. Users are created on first
//! contact. Balances are only ever mutated under `FOR UPDATE` inside an
//! enclosing transaction.

use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::Postgres;

use crate::clock::now_ms;
use crate::framework::DatabaseProcessor;

/// Active account status; anything else is treated as disabled.
pub const STATUS_ACTIVE: i16 = 1;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Customer {
    pub user_id: i64,
    pub platform_id: i16,
    pub platform_user_id: String,
    pub username: String,
    pub balance: Decimal,
    pub status: i16,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Customer {
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    /// Lock and load a user by platform identity. Must run in a transaction.
    pub async fn get_by_platform_for_update_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        platform_id: i16,
        platform_user_id: &str,
    ) -> Result<Option<Customer>, sqlx::Error> {
        sqlx::query_as::<_, Customer>(
            r#"
            SELECT user_id, platform_id, platform_user_id, username, balance,
                   status, created_at, updated_at
            FROM customers
            WHERE platform_id = $1 AND platform_user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(platform_id)
        .bind(platform_user_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Lock and load a user by internal id. Must run in a transaction.
    pub async fn get_by_id_for_update_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        user_id: i64,
    ) -> Result<Option<Customer>, sqlx::Error> {
        sqlx::query_as::<_, Customer>(
            r#"
            SELECT user_id, platform_id, platform_user_id, username, balance,
                   status, created_at, updated_at
            FROM customers
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Load-or-register a user under row lock.
    ///
    /// First contact inserts the account with a zero balance and active
    /// status. The insert uses `ON CONFLICT DO NOTHING` so a concurrent
    /// registration does not abort the enclosing transaction; the loser
    /// recovers by re-reading `FOR UPDATE`.
    pub async fn get_or_create_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        platform_id: i16,
        platform_user_id: &str,
        username: &str,
    ) -> Result<Customer, sqlx::Error> {
        if let Some(user) =
            Self::get_by_platform_for_update_tx(tx, platform_id, platform_user_id).await?
        {
            return Ok(user);
        }

        let now = now_ms();
        let inserted = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers
                (platform_id, platform_user_id, username, balance, status, created_at, updated_at)
            VALUES ($1, $2, $3, 0, $4, $5, $5)
            ON CONFLICT (platform_id, platform_user_id) DO NOTHING
            RETURNING user_id, platform_id, platform_user_id, username, balance,
                      status, created_at, updated_at
            "#,
        )
        .bind(platform_id)
        .bind(platform_user_id)
        .bind(username)
        .bind(STATUS_ACTIVE)
        .bind(now)
        .fetch_optional(&mut **tx)
        .await?;

        match inserted {
            Some(user) => {
                tracing::info!(
                    user_id = user.user_id,
                    platform_id,
                    platform_user_id,
                    "registered new user"
                );
                Ok(user)
            }
            // Lost the registration race; the committed row must exist.
            None => Self::get_by_platform_for_update_tx(tx, platform_id, platform_user_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound),
        }
    }

    /// Write a new balance. The caller must hold the user's row lock.
    pub async fn update_balance_tx(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        user_id: i64,
        new_balance: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE customers SET balance = $1, updated_at = $2 WHERE user_id = $3")
            .bind(new_balance)
            .bind(now_ms())
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Read a user's balance without locking.
pub struct GetUserBalance {
    pub platform_id: i16,
    pub platform_user_id: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BalanceRow {
    pub balance: Decimal,
}

impl Processor<GetUserBalance, Result<Option<BalanceRow>, sqlx::Error>> for DatabaseProcessor {
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserBalance")]
    async fn process(&self, query: GetUserBalance) -> Result<Option<BalanceRow>, sqlx::Error> {
        sqlx::query_as::<_, BalanceRow>(
            "SELECT balance FROM customers WHERE platform_id = $1 AND platform_user_id = $2",
        )
        .bind(query.platform_id)
        .bind(&query.platform_user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
