use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{checked_balance, validate_new_transaction, LedgerStore};
use crate::account::models::{Account, NewAccount};
use crate::errors::AppError;
use crate::transaction::models::{LedgerQuery, NewTransaction, Transaction};

/// Ledger store backed by Postgres.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with production pool settings and apply pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to run migrations: {e}")))?;

        info!("Connected to Postgres ledger store");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_accounts(&self, owner_id: Uuid) -> Result<Vec<Account>, AppError> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, owner_id, name, account_type, balance, currency, is_active, created_at, updated_at
            FROM accounts
            WHERE owner_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, owner_id, name, account_type, balance, currency, is_active, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, AppError> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (owner_id, name, account_type, balance, currency, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, owner_id, name, account_type, balance, currency, is_active, created_at, updated_at
            "#,
        )
        .bind(account.owner_id)
        .bind(&account.name)
        .bind(account.account_type.as_str())
        .bind(account.balance)
        .bind(&account.currency)
        .bind(account.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn query_transactions(
        &self,
        query: &LedgerQuery,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Transaction>, i64), AppError> {
        let transaction_type = query.transaction_type.map(|t| t.as_str());

        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT t.id, t.account_id, t.transaction_date, t.description, t.category,
                   t.transaction_type, t.amount, t.created_at, t.updated_at
            FROM transactions t
            JOIN accounts a ON t.account_id = a.id
            WHERE ($1::uuid IS NULL OR a.owner_id = $1)
              AND ($2::uuid IS NULL OR t.account_id = $2)
              AND ($3::text IS NULL OR t.category = $3)
              AND ($4::text IS NULL OR t.transaction_type = $4)
            ORDER BY t.seq ASC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(query.owner_id)
        .bind(query.account_id)
        .bind(&query.category)
        .bind(transaction_type)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM transactions t
            JOIN accounts a ON t.account_id = a.id
            WHERE ($1::uuid IS NULL OR a.owner_id = $1)
              AND ($2::uuid IS NULL OR t.account_id = $2)
              AND ($3::text IS NULL OR t.category = $3)
              AND ($4::text IS NULL OR t.transaction_type = $4)
            "#,
        )
        .bind(query.owner_id)
        .bind(query.account_id)
        .bind(&query.category)
        .bind(transaction_type)
        .fetch_one(&self.pool)
        .await?;

        Ok((transactions, total))
    }

    async fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, AppError> {
        validate_new_transaction(&transaction)?;

        let mut tx = self.pool.begin().await?;

        // Lock the account row so concurrent inserts serialize on the balance
        let balance = sqlx::query_scalar::<_, Decimal>(
            "SELECT balance FROM accounts WHERE id = $1 FOR UPDATE",
        )
        .bind(transaction.account_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

        // Rejected before the insert; dropping `tx` releases the lock
        checked_balance(balance, transaction.amount)?;

        let row = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions
                (account_id, transaction_date, description, category, transaction_type, amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, account_id, transaction_date, description, category,
                      transaction_type, amount, created_at, updated_at
            "#,
        )
        .bind(transaction.account_id)
        .bind(transaction.transaction_date)
        .bind(&transaction.description)
        .bind(&transaction.category)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.amount)
        .fetch_one(&mut *tx)
        .await?;

        let updated = sqlx::query(
            "UPDATE accounts SET balance = balance + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(transaction.amount)
        .bind(transaction.account_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            // Dropping `tx` without commit rolls the insert back
            return Err(AppError::Conflict(format!(
                "Balance update for account {} affected {} rows",
                transaction.account_id,
                updated.rows_affected()
            )));
        }

        tx.commit().await?;

        Ok(row)
    }
}
