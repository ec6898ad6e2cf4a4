use thiserror::Error;

use crate::domain::{AccountId, Cents, ParseCentsError, format_cents};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid ID format: {0} is not a 6-digit account id")]
    InvalidIdFormat(AccountId),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Sender not found: {0}")]
    SenderNotFound(AccountId),

    #[error("Receiver not found: {0}")]
    ReceiverNotFound(AccountId),

    #[error("Cannot transfer from account {0} to itself")]
    SameAccount(AccountId),

    #[error(
        "Insufficient balance in account {account_id}: balance {}, required {}",
        cents(.balance),
        cents(.required)
    )]
    InsufficientBalance {
        account_id: AccountId,
        balance: Cents,
        required: Cents,
    },

    /// A freshly generated id was claimed by another account between the
    /// existence check and the insert. Account creation retries on this.
    #[error("Account id {0} is already in use")]
    IdCollision(AccountId),

    #[error("Could not find a free account id after {attempts} attempts")]
    IdSpaceExhausted { attempts: usize },

    #[error("Transaction failed")]
    TransactionFailed(#[source] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

fn cents(amount: &Cents) -> String {
    format_cents(*amount)
}

impl From<ParseCentsError> for AppError {
    fn from(err: ParseCentsError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl AppError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        AppError::InvalidInput(reason.into())
    }

    /// Returns true for the "no such account" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::AccountNotFound(_)
                | AppError::SenderNotFound(_)
                | AppError::ReceiverNotFound(_)
        )
    }
}
