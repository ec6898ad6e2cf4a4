use std::ops::RangeInclusive;

use rand::Rng;

use super::Cents;

/// Six-digit public account number.
pub type AccountId = i64;

/// Every issued account id lies in this range.
pub const ACCOUNT_ID_RANGE: RangeInclusive<AccountId> = 100_000..=999_999;

/// Returns true if `id` has the six-digit shape of an account number.
pub fn is_valid_account_id(id: AccountId) -> bool {
    ACCOUNT_ID_RANGE.contains(&id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub balance: Cents,
}

impl Account {
    pub fn new(id: AccountId, name: impl Into<String>, balance: Cents) -> Self {
        Self {
            id,
            name: name.into(),
            balance,
        }
    }
}

/// Produces candidate account ids.
///
/// Candidates are only proposals: the store still has to accept the insert,
/// so an implementation may hand out an id that is already taken.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> AccountId;
}

/// Uniformly random ids drawn from [`ACCOUNT_ID_RANGE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&self) -> AccountId {
        rand::thread_rng().gen_range(ACCOUNT_ID_RANGE)
    }
}
