use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::domain::{
    Account, AccountId, Cents, IdSource, RandomIds, format_cents, is_valid_account_id,
};
use crate::storage::{AccountTx, InsertOutcome, LedgerSummary, Repository, StoreConfig};

use super::AppError;

/// Application service providing the ledger operations.
/// This is the primary interface for any client (CLI, HTTP, tests).
pub struct LedgerService {
    repo: Repository,
    ids: Arc<dyn IdSource>,
    max_id_attempts: usize,
}

/// Result of a successful deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositReceipt {
    pub account_id: AccountId,
    pub amount: Cents,
}

/// Result of a committed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: Cents,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            ids: Arc::new(RandomIds),
            max_id_attempts: StoreConfig::default().max_id_attempts,
        }
    }

    /// Open (and if needed initialize) the database described by `config`.
    pub async fn open(config: &StoreConfig) -> Result<Self, AppError> {
        let repo = Repository::open(config).await?;
        info!(database = %config.database_path, "ledger store opened");
        Ok(Self::new(repo).with_max_id_attempts(config.max_id_attempts))
    }

    /// Replace the source of candidate account ids.
    pub fn with_id_source(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn with_max_id_attempts(mut self, attempts: usize) -> Self {
        self.max_id_attempts = attempts.max(1);
        self
    }

    /// Close the underlying connection pool.
    pub async fn close(&self) {
        self.repo.close().await;
        info!("ledger store closed");
    }

    // ========================
    // Account operations
    // ========================

    /// Open a new account under a freshly assigned random id.
    #[instrument(skip(self))]
    pub async fn create_account(
        &self,
        name: String,
        initial_balance: Cents,
    ) -> Result<Account, AppError> {
        if initial_balance < 0 {
            return Err(AppError::invalid_input("Initial balance cannot be negative"));
        }
        if name.trim().is_empty() {
            return Err(AppError::invalid_input("Account name cannot be empty"));
        }

        let mut account = Account::new(0, name, initial_balance);

        for attempt in 1..=self.max_id_attempts {
            account.id = self.ids.next_id();

            if self.repo.account_exists(account.id).await? {
                debug!(id = account.id, attempt, "candidate id already in use");
                continue;
            }

            match self.insert_account(&account).await {
                Ok(()) => {
                    info!(id = account.id, attempt, "account created");
                    return Ok(account);
                }
                Err(AppError::IdCollision(id)) => {
                    warn!(id, attempt, "candidate id claimed concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::IdSpaceExhausted {
            attempts: self.max_id_attempts,
        })
    }

    async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        match self.repo.insert_account(account).await? {
            InsertOutcome::Inserted => Ok(()),
            InsertOutcome::IdTaken => Err(AppError::IdCollision(account.id)),
        }
    }

    /// Look up an account's name and balance.
    pub async fn get_balance(&self, id: AccountId) -> Result<Account, AppError> {
        if !is_valid_account_id(id) {
            return Err(AppError::InvalidIdFormat(id));
        }

        self.repo
            .get_account(id)
            .await?
            .ok_or(AppError::AccountNotFound(id))
    }

    /// Count accounts and total the money held by the ledger.
    pub async fn summary(&self) -> Result<LedgerSummary, AppError> {
        Ok(self.repo.summary().await?)
    }

    // ========================
    // Balance mutations
    // ========================

    /// Add external funds to an account.
    #[instrument(skip(self))]
    pub async fn deposit(&self, id: AccountId, amount: Cents) -> Result<DepositReceipt, AppError> {
        if amount <= 0 {
            return Err(AppError::invalid_input(
                "Deposit amount must be greater than zero",
            ));
        }

        if !self.repo.deposit(id, amount).await? {
            return Err(AppError::AccountNotFound(id));
        }

        info!(id, amount = %format_cents(amount), "deposit applied");
        Ok(DepositReceipt {
            account_id: id,
            amount,
        })
    }

    /// Move funds between two accounts as one all-or-nothing unit.
    ///
    /// Checks run in a fixed order and the first failure wins: amount,
    /// distinct accounts, sender exists, sender covers the amount, receiver
    /// exists. Any failure leaves both balances untouched.
    #[instrument(skip(self))]
    pub async fn transfer(
        &self,
        sender_id: AccountId,
        receiver_id: AccountId,
        amount: Cents,
    ) -> Result<TransferReceipt, AppError> {
        if amount <= 0 {
            return Err(AppError::invalid_input("Amount must be positive"));
        }
        if sender_id == receiver_id {
            return Err(AppError::SameAccount(sender_id));
        }

        let mut tx = self
            .repo
            .begin()
            .await
            .map_err(AppError::TransactionFailed)?;

        let applied = Self::apply_transfer(&mut tx, sender_id, receiver_id, amount).await;
        if let Err(e) = applied {
            if let Err(rollback_err) = tx.rollback().await {
                // The dropped connection still discards the transaction.
                error!(error = ?rollback_err, "explicit rollback failed");
            }
            match &e {
                AppError::TransactionFailed(cause) => {
                    error!(error = ?cause, "transfer aborted and rolled back")
                }
                _ => debug!(error = %e, "transfer rejected"),
            }
            return Err(e);
        }

        tx.commit().await.map_err(|e| {
            error!(error = ?e, "transfer commit failed");
            AppError::TransactionFailed(e)
        })?;

        info!(
            sender_id,
            receiver_id,
            amount = %format_cents(amount),
            "transfer committed"
        );
        Ok(TransferReceipt {
            sender_id,
            receiver_id,
            amount,
        })
    }

    /// Debit then credit inside `tx`. The debit is the first statement so
    /// the write lock is held before any balance is inspected.
    async fn apply_transfer(
        tx: &mut AccountTx,
        sender_id: AccountId,
        receiver_id: AccountId,
        amount: Cents,
    ) -> Result<(), AppError> {
        let debited = tx
            .debit(sender_id, amount)
            .await
            .map_err(AppError::TransactionFailed)?;

        if !debited {
            let balance = tx
                .balance_of(sender_id)
                .await
                .map_err(AppError::TransactionFailed)?;
            return Err(match balance {
                None => AppError::SenderNotFound(sender_id),
                Some(balance) => AppError::InsufficientBalance {
                    account_id: sender_id,
                    balance,
                    required: amount,
                },
            });
        }

        let credited = tx
            .credit(receiver_id, amount)
            .await
            .map_err(AppError::TransactionFailed)?;

        if !credited {
            return Err(AppError::ReceiverNotFound(receiver_id));
        }

        Ok(())
    }
}
