// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use custodia::application::LedgerService;
use custodia::domain::{Account, AccountId, Cents, IdSource};
use custodia::storage::StoreConfig;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Store configuration pointing at a fresh database inside `dir`.
pub fn test_config(dir: &TempDir) -> StoreConfig {
    let db_path = dir.path().join("test.db");
    StoreConfig::new(db_path.to_str().unwrap())
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::open(&test_config(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Same as [`test_service`] but with scripted account ids.
pub async fn test_service_with_ids(ids: &[AccountId]) -> Result<(LedgerService, TempDir)> {
    let (service, temp_dir) = test_service().await?;
    Ok((service.with_id_source(ScriptedIds::new(ids)), temp_dir))
}

/// A second, independent connection to the test database, for poking at
/// the schema behind the service's back.
pub async fn raw_pool(dir: &TempDir) -> Result<SqlitePool> {
    let db_path = dir.path().join("test.db");
    Ok(SqlitePool::connect(&format!("sqlite:{}", db_path.display())).await?)
}

/// Hands out ids in order, then keeps repeating the last one.
pub struct ScriptedIds {
    ids: Mutex<VecDeque<AccountId>>,
}

impl ScriptedIds {
    pub fn new(ids: &[AccountId]) -> Self {
        assert!(!ids.is_empty(), "need at least one scripted id");
        Self {
            ids: Mutex::new(ids.iter().copied().collect()),
        }
    }
}

impl IdSource for ScriptedIds {
    fn next_id(&self) -> AccountId {
        let mut ids = self.ids.lock().unwrap();
        if ids.len() > 1 {
            ids.pop_front().unwrap()
        } else {
            ids[0]
        }
    }
}

/// Test fixture: two funded accounts
pub struct Pair {
    pub alice: Account,
    pub bob: Account,
}

impl Pair {
    pub async fn create(
        service: &LedgerService,
        alice_balance: Cents,
        bob_balance: Cents,
    ) -> Result<Self> {
        let alice = service
            .create_account("Alice".into(), alice_balance)
            .await?;
        let bob = service.create_account("Bob".into(), bob_balance).await?;
        Ok(Self { alice, bob })
    }

    pub async fn balances(&self, service: &LedgerService) -> Result<(Cents, Cents)> {
        let alice = service.get_balance(self.alice.id).await?.balance;
        let bob = service.get_balance(self.bob.id).await?.balance;
        Ok((alice, bob))
    }
}
