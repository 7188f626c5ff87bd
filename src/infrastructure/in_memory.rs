use crate::domain::order::{Order, OrderId, OrderStatus, StatusChange, Transition};
use crate::domain::payment::{Charge, GatewayResource, PaymentResource, Shipment};
use crate::domain::ports::{GatewayClient, OrderRepository};
use crate::domain::webhook::WebhookEvent;
use crate::error::{GatewayError, PayhookError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory order repository.
///
/// Keeps every persisted status change in an audit log, which makes it the
/// repository of choice for tests.
#[derive(Default, Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    changes: Arc<RwLock<Vec<StatusChange>>>,
}

impl InMemoryOrderRepository {
    /// Creates a new, empty in-memory order repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Status changes in the order they were persisted.
    pub async fn status_changes(&self) -> Vec<StatusChange> {
        self.changes.read().await.clone()
    }

    async fn record_change(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        notify_customer: bool,
        comment: &str,
    ) {
        self.changes.write().await.push(StatusChange {
            order_id,
            status,
            notify_customer,
            comment: comment.to_string(),
        });
    }
}

fn existing(orders: &mut HashMap<OrderId, Order>, order_id: OrderId) -> Result<&mut Order> {
    orders
        .get_mut(&order_id)
        .ok_or_else(|| PayhookError::Repository(format!("order {order_id} does not exist")))
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn store(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn find_order_id_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<OrderId>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|order| order.transaction_id == transaction_id)
            .map(|order| order.id))
    }

    async fn set_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        notify_customer: bool,
        comment: &str,
    ) -> Result<()> {
        let mut orders = self.orders.write().await;
        let order = existing(&mut orders, order_id)?;
        order.apply_status(status, comment);
        self.record_change(order_id, status, notify_customer, comment).await;
        Ok(())
    }

    async fn transition_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        notify_customer: bool,
        comment: &str,
    ) -> Result<(OrderStatus, Transition)> {
        // The write guard spans check and write.
        let mut orders = self.orders.write().await;
        let order = existing(&mut orders, order_id)?;
        let previous = order.payment_status;
        let transition = order.transition_to(status);
        if transition == Transition::Allowed {
            order.apply_status(status, comment);
            self.record_change(order_id, status, notify_customer, comment).await;
        }
        Ok((previous, transition))
    }

    async fn record_shipping_date(&self, order_id: OrderId, date: DateTime<Utc>) -> Result<()> {
        let mut orders = self.orders.write().await;
        let order = existing(&mut orders, order_id)?;
        order.shipping_date = Some(date);
        Ok(())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by_key(|order| order.id);
        Ok(all)
    }
}

/// Gateway state loaded from a fixture file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayFixtures {
    #[serde(default)]
    pub payments: Vec<PaymentResource>,
    /// Resources keyed by the retrieve URL webhooks announce them under.
    #[serde(default)]
    pub resources: HashMap<String, GatewayResource>,
}

/// A gateway double answering from memory.
///
/// Serves recorded fixtures for offline runs and tests. Unknown ids and URLs
/// fail with [`GatewayError::NotFound`], like the real gateway would.
#[derive(Default, Clone)]
pub struct InMemoryGatewayClient {
    payments: Arc<RwLock<HashMap<String, PaymentResource>>>,
    resources: Arc<RwLock<HashMap<String, GatewayResource>>>,
}

impl InMemoryGatewayClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixtures(fixtures: GatewayFixtures) -> Self {
        let payments = fixtures
            .payments
            .into_iter()
            .map(|payment| (payment.id.clone(), payment))
            .collect();
        Self {
            payments: Arc::new(RwLock::new(payments)),
            resources: Arc::new(RwLock::new(fixtures.resources)),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixtures: GatewayFixtures = serde_json::from_str(&content)
            .map_err(|e| PayhookError::Config(format!("invalid gateway fixtures: {e}")))?;
        Ok(Self::from_fixtures(fixtures))
    }

    pub async fn insert_payment(&self, payment: PaymentResource) {
        self.payments.write().await.insert(payment.id.clone(), payment);
    }

    pub async fn insert_resource(&self, retrieve_url: impl Into<String>, resource: GatewayResource) {
        self.resources
            .write()
            .await
            .insert(retrieve_url.into(), resource);
    }
}

#[async_trait]
impl GatewayClient for InMemoryGatewayClient {
    async fn fetch_resource_from_event(
        &self,
        event: &WebhookEvent,
    ) -> std::result::Result<GatewayResource, GatewayError> {
        let resources = self.resources.read().await;
        resources
            .get(&event.retrieve_url)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(event.retrieve_url.clone()))
    }

    async fn fetch_payment(
        &self,
        payment_id: &str,
    ) -> std::result::Result<PaymentResource, GatewayError> {
        let payments = self.payments.read().await;
        payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(payment_id.to_string()))
    }

    async fn fetch_payment_by_order_id(
        &self,
        order_id: &str,
    ) -> std::result::Result<PaymentResource, GatewayError> {
        let payments = self.payments.read().await;
        payments
            .values()
            .find(|payment| payment.order_id == order_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(order_id.to_string()))
    }

    async fn fetch_charge_by_id(
        &self,
        payment_id: &str,
        charge_id: &str,
    ) -> std::result::Result<Charge, GatewayError> {
        let payment = self.fetch_payment(payment_id).await?;
        payment
            .charges
            .into_iter()
            .find(|charge| charge.id == charge_id)
            .map(|mut charge| {
                charge.payment_id.get_or_insert_with(|| payment_id.to_string());
                charge
            })
            .ok_or_else(|| GatewayError::NotFound(format!("{payment_id}/{charge_id}")))
    }

    async fn ship(
        &self,
        payment_id: &str,
        invoice_document_id: &str,
    ) -> std::result::Result<Shipment, GatewayError> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(payment_id)
            .ok_or_else(|| GatewayError::NotFound(payment_id.to_string()))?;

        let shipment = Shipment {
            id: format!("{payment_id}-shp-{}", payment.shipments.len() + 1),
            invoice_id: Some(invoice_document_id.to_string()),
            date: Utc::now(),
            amount: None,
            payment_id: Some(payment_id.to_string()),
        };
        payment.shipments.push(shipment.clone());
        Ok(shipment)
    }
}
