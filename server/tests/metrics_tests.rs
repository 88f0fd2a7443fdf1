//! Checks that ticket service metrics reach the Prometheus exporter.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use ticketbox_core::mocks::{MockTicketCache, MockTicketStore};
use ticketbox_core::{NewTicket, ServiceConfig, TicketService};
use ticketbox_server::metrics::{recorder_builder, register_metrics};

#[test]
fn test_service_metrics_are_exported() {
    let recorder = recorder_builder().unwrap().build_recorder();
    let handle = recorder.handle();

    metrics::with_local_recorder(&recorder, || {
        register_metrics();
        tokio_test::block_on(async {
            let service = TicketService::new(
                MockTicketStore::new(),
                MockTicketCache::new(),
                ServiceConfig::default(),
            );
            let ticket = service
                .create(&NewTicket::new("Concert", "", 5))
                .await
                .unwrap();

            service.get(ticket.id).await.unwrap();
            service.get(ticket.id).await.unwrap();
            service.purchase(ticket.id, 2).await.unwrap();
            service.purchase(ticket.id, 10).await.unwrap_err();
            service.purchase(ticket.id, 0).await.unwrap_err();
        });
    });

    let text = handle.render();

    assert!(text.contains("tickets_created_total 1"));
    assert!(text.contains(r#"ticket_cache_lookups_total{outcome="miss"} 1"#));
    assert!(text.contains(r#"ticket_cache_lookups_total{outcome="hit"} 1"#));
    assert!(text.contains(r#"ticket_purchases_total{outcome="success"} 1"#));
    assert!(text.contains(r#"ticket_purchases_total{outcome="insufficient"} 1"#));
    assert!(text.contains(r#"ticket_purchases_total{outcome="invalid"} 1"#));
    assert!(text.contains("ticket_purchase_duration_seconds_count 3"));
}

#[test]
fn test_cache_failures_are_counted() {
    let recorder = recorder_builder().unwrap().build_recorder();
    let handle = recorder.handle();

    metrics::with_local_recorder(&recorder, || {
        tokio_test::block_on(async {
            let cache = MockTicketCache::new();
            let service =
                TicketService::new(MockTicketStore::new(), cache.clone(), ServiceConfig::default());
            let ticket = service
                .create(&NewTicket::new("Concert", "", 5))
                .await
                .unwrap();

            cache.set_healthy(false);
            service.get(ticket.id).await.unwrap();
            service.purchase(ticket.id, 1).await.unwrap();
        });
    });

    let text = handle.render();

    assert!(text.contains(r#"ticket_cache_lookups_total{outcome="error"} 1"#));
    assert!(text.contains("ticket_cache_write_failures_total 1"));
    assert!(text.contains("ticket_cache_invalidation_failures_total 1"));
}
