use super::order::{Order, OrderId, OrderStatus, Transition};
use super::payment::{Charge, GatewayResource, PaymentResource, Shipment};
use super::webhook::WebhookEvent;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Read access to the payment gateway.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Resolves the resource a webhook announces.
    async fn fetch_resource_from_event(
        &self,
        event: &WebhookEvent,
    ) -> std::result::Result<GatewayResource, GatewayError>;

    async fn fetch_payment(&self, payment_id: &str)
    -> std::result::Result<PaymentResource, GatewayError>;

    async fn fetch_payment_by_order_id(
        &self,
        order_id: &str,
    ) -> std::result::Result<PaymentResource, GatewayError>;

    async fn fetch_charge_by_id(
        &self,
        payment_id: &str,
        charge_id: &str,
    ) -> std::result::Result<Charge, GatewayError>;

    /// Reports the shipment of an invoiced payment.
    async fn ship(
        &self,
        payment_id: &str,
        invoice_document_id: &str,
    ) -> std::result::Result<Shipment, GatewayError>;
}

/// Order persistence owned by the shop.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn store(&self, order: Order) -> Result<()>;
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;
    async fn find_order_id_by_transaction_id(&self, transaction_id: &str)
    -> Result<Option<OrderId>>;
    /// Unconditional write; bypasses the transition policy.
    async fn set_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        notify_customer: bool,
        comment: &str,
    ) -> Result<()>;
    /// Conditional write: checks [`Order::transition_to`] and persists `status`
    /// only when it is allowed, atomically with respect to other writers.
    ///
    /// Returns the status found before the call and the policy decision.
    async fn transition_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        notify_customer: bool,
        comment: &str,
    ) -> Result<(OrderStatus, Transition)>;
    async fn record_shipping_date(&self, order_id: OrderId, date: DateTime<Utc>) -> Result<()>;
    async fn all_orders(&self) -> Result<Vec<Order>>;

    async fn payment_status(&self, order_id: OrderId) -> Result<Option<OrderStatus>> {
        Ok(self.get(order_id).await?.map(|order| order.payment_status))
    }
}

/// Key/value access to shop configuration.
pub trait ConfigReader: Send + Sync {
    fn get(&self, key: &str) -> Option<serde_json::Value>;
}

pub type SharedGatewayClient = Arc<dyn GatewayClient>;
pub type SharedOrderRepository = Arc<dyn OrderRepository>;
