use async_trait::async_trait;
use chrono::{DateTime, Utc};
use payhook::application::order_status::{OrderStatusService, StatusUpdate};
use payhook::application::registry::StatusMapperRegistry;
use payhook::config::StatusUpdateConfig;
use payhook::domain::order::{Order, OrderId, OrderStatus, Transition};
use payhook::domain::ports::OrderRepository;
use payhook::error::Result;
use payhook::infrastructure::in_memory::{InMemoryGatewayClient, InMemoryOrderRepository};
use std::sync::Arc;
use std::time::Duration;

/// Delays every read so racing updates interleave between lookup and write.
struct SlowReads {
    inner: InMemoryOrderRepository,
}

#[async_trait]
impl OrderRepository for SlowReads {
    async fn store(&self, order: Order) -> Result<()> {
        self.inner.store(order).await
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.inner.get(order_id).await
    }

    async fn find_order_id_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<OrderId>> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.inner.find_order_id_by_transaction_id(transaction_id).await
    }

    async fn set_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        notify_customer: bool,
        comment: &str,
    ) -> Result<()> {
        self.inner
            .set_status(order_id, status, notify_customer, comment)
            .await
    }

    async fn transition_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        notify_customer: bool,
        comment: &str,
    ) -> Result<(OrderStatus, Transition)> {
        self.inner
            .transition_status(order_id, status, notify_customer, comment)
            .await
    }

    async fn record_shipping_date(&self, order_id: OrderId, date: DateTime<Utc>) -> Result<()> {
        self.inner.record_shipping_date(order_id, date).await
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        self.inner.all_orders().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_racing_deliveries_do_not_regress_terminal_status() {
    let inner = InMemoryOrderRepository::new();
    inner.store(Order::new(1, "tx-1")).await.unwrap();
    let orders = Arc::new(SlowReads {
        inner: inner.clone(),
    });

    let service = Arc::new(OrderStatusService::new(
        StatusMapperRegistry::with_defaults(),
        orders,
        Arc::new(InMemoryGatewayClient::new()),
        StatusUpdateConfig::default(),
    ));

    let refund = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .update_by_transaction_id("tx-1", OrderStatus::Refunded)
                .await
                .unwrap()
        })
    };
    let paid = {
        let service = service.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            service
                .update_by_transaction_id("tx-1", OrderStatus::CompletelyPaid)
                .await
                .unwrap()
        })
    };

    let refund = refund.await.unwrap();
    let paid = paid.await.unwrap();

    assert_eq!(
        inner.payment_status(1).await.unwrap(),
        Some(OrderStatus::Refunded)
    );
    // Whichever write lands first, the later one is judged against it.
    match paid {
        StatusUpdate::Applied(OrderStatus::CompletelyPaid) => {
            assert_eq!(refund, StatusUpdate::Applied(OrderStatus::Refunded));
        }
        StatusUpdate::Stale { current, target } => {
            assert_eq!(current, OrderStatus::Refunded);
            assert_eq!(target, OrderStatus::CompletelyPaid);
        }
        other => panic!("unexpected update {other:?}"),
    }
    assert_eq!(
        inner.status_changes().await.last().map(|c| c.status),
        Some(OrderStatus::Refunded)
    );
}

#[tokio::test]
async fn test_review_then_pending_keeps_paid_progress() {
    let orders = Arc::new(InMemoryOrderRepository::new());
    orders.store(Order::new(1, "tx-1")).await.unwrap();
    let service = OrderStatusService::new(
        StatusMapperRegistry::with_defaults(),
        orders.clone(),
        Arc::new(InMemoryGatewayClient::new()),
        StatusUpdateConfig::default(),
    );

    for status in [OrderStatus::CompletelyPaid, OrderStatus::ReviewNecessary] {
        service
            .update_by_transaction_id("tx-1", status)
            .await
            .unwrap();
    }
    let late = service
        .update_by_transaction_id("tx-1", OrderStatus::Open)
        .await
        .unwrap();

    assert_eq!(
        late,
        StatusUpdate::Stale {
            current: OrderStatus::ReviewNecessary,
            target: OrderStatus::Open,
        }
    );
    assert_eq!(
        orders.payment_status(1).await.unwrap(),
        Some(OrderStatus::ReviewNecessary)
    );
}
