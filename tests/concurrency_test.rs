mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{Pair, test_service};
use custodia::application::AppError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_are_additive() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);
    let id = service.create_account("Alice".into(), 10000).await?.id;

    let first = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.deposit(id, 5000).await })
    };
    let second = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.deposit(id, 2500).await })
    };
    first.await??;
    second.await??;

    assert_eq!(service.get_balance(id).await?.balance, 17500);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_deposits_lose_no_updates() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);
    let id = service.create_account("Alice".into(), 0).await?.id;

    let handles: Vec<_> = (1..=40)
        .map(|amount| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.deposit(id, amount).await })
        })
        .collect();
    for handle in handles {
        handle.await??;
    }

    assert_eq!(
        service.get_balance(id).await?.balance,
        (1..=40).sum::<i64>()
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposing_transfers_conserve_money() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);
    let pair = Pair::create(&service, 1000, 1000).await?;

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let service = Arc::clone(&service);
            let (from, to) = if i % 2 == 0 {
                (pair.alice.id, pair.bob.id)
            } else {
                (pair.bob.id, pair.alice.id)
            };
            tokio::spawn(async move { service.transfer(from, to, 300).await })
        })
        .collect();

    for handle in handles {
        match handle.await? {
            Ok(_) | Err(AppError::InsufficientBalance { .. }) => {}
            Err(e) => panic!("unexpected transfer failure: {e:?}"),
        }
    }

    let (alice, bob) = pair.balances(&service).await?;
    assert!(alice >= 0 && bob >= 0, "balances went negative: {alice}, {bob}");
    assert_eq!(alice + bob, 2000);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_half_applied_transfers() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);
    let pair = Pair::create(&service, 5000, 5000).await?;

    let writer = {
        let service = Arc::clone(&service);
        let (alice, bob) = (pair.alice.id, pair.bob.id);
        tokio::spawn(async move {
            for i in 0..50 {
                let (from, to) = if i % 2 == 0 { (alice, bob) } else { (bob, alice) };
                service.transfer(from, to, 100 + i).await?;
            }
            Ok::<_, AppError>(())
        })
    };

    let reader = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            for _ in 0..200 {
                let summary = service.summary().await?;
                assert_eq!(summary.total_balance, 10000, "observed a partial transfer");
                tokio::task::yield_now().await;
            }
            Ok::<_, AppError>(())
        })
    };

    writer.await??;
    reader.await??;
    assert_eq!(service.summary().await?.total_balance, 10000);
    Ok(())
}
