//! Concurrency tests for purchases.
//!
//! The in-memory store takes a real exclusive lock per row, so these tests
//! exercise the same interleavings a relational store would see: many buyers
//! racing for one ticket, buyers of different tickets, a lock held past the
//! deadline and a buyer that panics while holding the lock.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use futures::future::join_all;
use proptest::prelude::*;
use std::time::Duration;
use ticketbox_core::mocks::{MockTicketCache, MockTicketStore};
use ticketbox_core::{
    ErrorKind, NewTicket, ServiceConfig, TicketError, TicketId, TicketService, TicketStore,
    TicketTransaction,
};

type Service = TicketService<MockTicketStore, MockTicketCache>;

fn service() -> Service {
    TicketService::new(
        MockTicketStore::new(),
        MockTicketCache::new(),
        ServiceConfig::default(),
    )
}

async fn ticket(service: &Service, allocation: i64) -> TicketId {
    service
        .create(&NewTicket::new("Festival", "", allocation))
        .await
        .expect("create ticket")
        .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_single_purchases_sell_exact_allocation() {
    let service = service();
    let id = ticket(&service, 50).await;

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.purchase(id, 1).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 50);
    assert_eq!(service.store().allocation(id), Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_oversubscribed_purchases_never_oversell() {
    let service = service();
    let id = ticket(&service, 40).await;

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.purchase(id, 1).await })
        })
        .collect();

    let mut successes = 0;
    let mut sold_out = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(TicketError::SoldOut { .. }) => sold_out += 1,
            Err(e) => panic!("unexpected purchase error: {e}"),
        }
    }

    assert_eq!(successes, 40);
    assert_eq!(sold_out, 60);
    assert_eq!(service.store().allocation(id), Some(0));
    assert_eq!(service.store().commit_count(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remaining_counts_are_unique() {
    let service = service();
    let id = ticket(&service, 20).await;

    let results = join_all((0..20).map(|_| service.purchase(id, 1))).await;

    let mut remaining: Vec<i64> = results
        .into_iter()
        .map(|r| r.unwrap().remaining)
        .collect();
    remaining.sort_unstable();

    // Each committed purchase observed a distinct allocation under the lock
    assert_eq!(remaining, (0..20).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_lock_held_past_deadline_times_out() {
    let service = service();
    let id = ticket(&service, 10).await;

    let mut holder = service.store().begin().await.unwrap();
    holder.find_for_update(id).await.unwrap();

    let err = service
        .purchase_within(id, 1, Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, TicketError::Timeout { id: timed_out, .. } if timed_out == id));
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.is_retryable());
    assert_eq!(service.store().allocation(id), Some(10));

    holder.rollback().await.unwrap();

    assert_eq!(service.purchase(id, 1).await.unwrap().remaining, 9);
}

#[tokio::test]
async fn test_timed_out_purchase_returns_without_waiting_for_rollback() {
    let service = service();
    let id = ticket(&service, 10).await;
    service.store().stall_rollback(true);

    let mut holder = service.store().begin().await.unwrap();
    holder.find_for_update(id).await.unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        service.purchase_within(id, 1, Duration::from_millis(50)),
    )
    .await
    .expect("purchase must return at its deadline");

    match result {
        Err(TicketError::Timeout { waited, .. }) => assert!(waited < Duration::from_secs(1)),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(service.store().commit_count(), 0);
    assert_eq!(service.store().rollback_count(), 1);

    drop(holder);
    service.store().stall_rollback(false);
    assert_eq!(service.purchase(id, 1).await.unwrap().remaining, 9);
}

#[tokio::test]
async fn test_store_lock_wait_is_bounded_by_deadline() {
    let service = service();
    let id = ticket(&service, 10).await;

    service
        .purchase_within(id, 1, Duration::from_millis(250))
        .await
        .unwrap();

    let lock_wait = service.store().last_lock_wait().expect("begin_within called");
    assert!(lock_wait <= Duration::from_millis(250));
    assert!(lock_wait > Duration::ZERO);
}

#[tokio::test]
async fn test_waiting_buyer_sees_committed_decrement() {
    let service = service();
    let id = ticket(&service, 10).await;

    let mut holder = service.store().begin().await.unwrap();
    holder.find_for_update(id).await.unwrap();

    let waiter = {
        let service = service.clone();
        tokio::spawn(async move { service.purchase(id, 5).await })
    };
    tokio::task::yield_now().await;

    holder.update_allocation(id, 3).await.unwrap();
    holder.commit().await.unwrap();

    let err = waiter.await.unwrap().unwrap_err();
    assert_eq!(
        err,
        TicketError::InsufficientAllocation {
            id,
            requested: 5,
            available: 3,
        }
    );
}

#[tokio::test]
async fn test_different_tickets_do_not_block_each_other() {
    let service = service();
    let busy = ticket(&service, 10).await;
    let free = ticket(&service, 10).await;

    let mut holder = service.store().begin().await.unwrap();
    holder.find_for_update(busy).await.unwrap();

    let receipt = service
        .purchase_within(free, 2, Duration::from_millis(50))
        .await
        .unwrap();

    assert_eq!(receipt.remaining, 8);
    drop(holder);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panic_during_purchase_releases_lock() {
    let service = service();
    let id = ticket(&service, 10).await;
    service.store().panic_on_update(true);

    let handle = {
        let service = service.clone();
        tokio::spawn(async move { service.purchase(id, 1).await })
    };
    let join_err = handle.await.unwrap_err();

    assert!(join_err.is_panic());
    assert_eq!(service.store().rollback_count(), 1);
    assert_eq!(service.store().commit_count(), 0);
    assert_eq!(service.store().allocation(id), Some(10));

    service.store().panic_on_update(false);
    let receipt = service
        .purchase_within(id, 1, Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(receipt.remaining, 9);
}

#[tokio::test]
async fn test_cancelled_purchase_releases_lock() {
    let service = service();
    let id = ticket(&service, 10).await;

    let mut holder = service.store().begin().await.unwrap();
    holder.find_for_update(id).await.unwrap();

    // Give up on a purchase that is queued behind the holder
    let waiter = {
        let service = service.clone();
        tokio::spawn(async move { service.purchase(id, 1).await })
    };
    tokio::task::yield_now().await;
    waiter.abort();
    assert!(waiter.await.unwrap_err().is_cancelled());

    holder.rollback().await.unwrap();

    let receipt = service
        .purchase_within(id, 1, Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(receipt.remaining, 9);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever the interleaving, the allocation never goes negative and
    /// equals the initial allocation minus every successful quantity.
    #[test]
    fn prop_no_overselling(
        allocation in 1i64..200,
        quantities in prop::collection::vec(1i64..60, 1..24),
    ) {
        tokio_test::block_on(async {
            let service = service();
            let id = ticket(&service, allocation).await;

            let results = join_all(quantities.iter().map(|&q| service.purchase(id, q))).await;

            let sold: i64 = results
                .iter()
                .filter_map(|r| r.as_ref().ok())
                .map(|p| p.quantity)
                .sum();
            let remaining = service.store().allocation(id).unwrap();

            prop_assert!(sold <= allocation);
            prop_assert!(remaining >= 0);
            prop_assert_eq!(remaining, allocation - sold);

            for result in &results {
                if let Err(e) = result {
                    let rejected = matches!(
                        e,
                        TicketError::SoldOut { .. } | TicketError::InsufficientAllocation { .. }
                    );
                    prop_assert!(rejected, "unexpected purchase error: {}", e);
                }
            }
            Ok(())
        })?;
    }
}
