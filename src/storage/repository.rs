use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::domain::{Account, AccountId, Cents};

use super::{MIGRATION_001_ACCOUNTS, StoreConfig};

/// What happened to an account insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Another row already holds this id; nothing was written.
    IdTaken,
}

/// Aggregate figures over the whole ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSummary {
    pub account_count: i64,
    pub total_balance: Cents,
}

/// Repository for persisting and querying accounts.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the SQLite database described by `config`.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_path))?;

        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to repeat: existing rows are kept.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_ACCOUNTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Connect and make sure the schema exists.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let repo = Self::connect(config).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Wait for in-flight queries and close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Account operations
    // ========================

    /// Returns true if an account with this id exists.
    pub async fn account_exists(&self, id: AccountId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up account id")?;
        Ok(row.is_some())
    }

    /// Insert a new account. The primary key is the uniqueness gate: an
    /// insert that collides reports [`InsertOutcome::IdTaken`] instead of
    /// failing.
    pub async fn insert_account(&self, account: &Account) -> Result<InsertOutcome> {
        let result = sqlx::query("INSERT INTO accounts (id, name, balance) VALUES (?, ?, ?)")
            .bind(account.id)
            .bind(&account.name)
            .bind(account.balance)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Ok(InsertOutcome::IdTaken)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to save account")),
        }
    }

    /// Get an account by id.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT id, name, balance FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account")?;

        Ok(row.as_ref().map(Self::row_to_account))
    }

    /// Add `amount` to an account's balance in one statement.
    /// Returns false (and changes nothing) if the account doesn't exist.
    pub async fn deposit(&self, id: AccountId, amount: Cents) -> Result<bool> {
        let result = sqlx::query("UPDATE accounts SET balance = balance + ? WHERE id = ?")
            .bind(amount)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to apply deposit")?;
        Ok(result.rows_affected() == 1)
    }

    /// Count accounts and sum their balances.
    pub async fn summary(&self) -> Result<LedgerSummary> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS account_count, COALESCE(SUM(balance), 0) AS total_balance FROM accounts",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to summarize ledger")?;

        Ok(LedgerSummary {
            account_count: row.get("account_count"),
            total_balance: row.get("total_balance"),
        })
    }

    /// Start a unit of work spanning several account rows.
    pub async fn begin(&self) -> Result<AccountTx> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(AccountTx { tx })
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Account {
        Account {
            id: row.get("id"),
            name: row.get("name"),
            balance: row.get("balance"),
        }
    }
}

/// An open transaction over the accounts table.
///
/// Dropping it without calling [`AccountTx::commit`] rolls everything back.
/// Callers should issue a write before any read so the database write lock
/// is held for the whole unit of work.
pub struct AccountTx {
    tx: Transaction<'static, Sqlite>,
}

impl AccountTx {
    /// Subtract `amount` from the account if it holds at least that much.
    /// Returns false when the account is missing or short of funds.
    pub async fn debit(&mut self, id: AccountId, amount: Cents) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET balance = balance - ? WHERE id = ? AND balance >= ?",
        )
        .bind(amount)
        .bind(id)
        .bind(amount)
        .execute(&mut *self.tx)
        .await
        .context("Failed to debit account")?;
        Ok(result.rows_affected() == 1)
    }

    /// Add `amount` to the account. Returns false when it doesn't exist.
    pub async fn credit(&mut self, id: AccountId, amount: Cents) -> Result<bool> {
        let result = sqlx::query("UPDATE accounts SET balance = balance + ? WHERE id = ?")
            .bind(amount)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to credit account")?;
        Ok(result.rows_affected() == 1)
    }

    /// Balance as seen inside this transaction.
    pub async fn balance_of(&mut self, id: AccountId) -> Result<Option<Cents>> {
        let row = sqlx::query("SELECT balance FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to read balance")?;
        Ok(row.map(|r| r.get("balance")))
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("Failed to commit transaction")
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .context("Failed to roll back transaction")
    }
}
