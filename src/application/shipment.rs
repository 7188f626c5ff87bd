use super::order_status::{OrderStatusService, StatusUpdate};
use crate::config::ShipmentConfig;
use crate::domain::order::{Order, OrderId};
use crate::domain::payment::{PaymentMethodKind, Shipment};
use crate::domain::ports::{SharedGatewayClient, SharedOrderRepository};
use crate::error::Result;
use chrono::Utc;
use std::sync::Arc;

/// Payment methods whose shipment must be reported to the gateway.
pub const SHIPPABLE_METHODS: [PaymentMethodKind; 1] = [PaymentMethodKind::InvoiceGuaranteed];

#[derive(Debug, Clone, PartialEq)]
pub enum ShipmentOutcome {
    /// The order does not qualify for a shipment notification.
    NotEligible(&'static str),
    /// The gateway rejected the shipment; nothing was recorded.
    ShipFailed(String),
    Shipped {
        shipment: Shipment,
        /// Status update triggered by the shipment, if automatic updates are on.
        status: Option<StatusUpdate>,
    },
}

/// Reports shipped orders to the gateway.
///
/// Invoice-guaranteed payments are only paid out once the merchant declares the
/// goods shipped, so reaching the configured fulfilment status triggers a
/// shipment call exactly once per order.
pub struct ShipmentNotifier {
    gateway: SharedGatewayClient,
    orders: SharedOrderRepository,
    status_service: Arc<OrderStatusService>,
    config: ShipmentConfig,
}

impl ShipmentNotifier {
    pub fn new(
        gateway: SharedGatewayClient,
        orders: SharedOrderRepository,
        status_service: Arc<OrderStatusService>,
        config: ShipmentConfig,
    ) -> Self {
        Self {
            gateway,
            orders,
            status_service,
            config,
        }
    }

    fn eligibility(&self, order: &Order) -> std::result::Result<(), &'static str> {
        let Some(shipping_status) = self.config.shipping_status.as_deref() else {
            return Err("shipping status not configured");
        };
        if order.fulfillment_status.as_deref() != Some(shipping_status) {
            return Err("order not in shipping status");
        }
        if !order
            .payment_kind
            .is_some_and(|kind| SHIPPABLE_METHODS.contains(&kind))
        {
            return Err("payment method does not require shipment");
        }
        if order.shipping_date.is_some() {
            return Err("shipment already reported");
        }
        Ok(())
    }

    /// Reacts to a change of the order stored under `order_id`.
    #[tracing::instrument(skip(self))]
    pub async fn on_order_updated(&self, order_id: OrderId) -> Result<ShipmentOutcome> {
        let Some(order) = self.orders.get(order_id).await? else {
            return Ok(ShipmentOutcome::NotEligible("unknown order"));
        };

        if let Err(reason) = self.eligibility(&order) {
            tracing::debug!(reason, "No shipment notification");
            return Ok(ShipmentOutcome::NotEligible(reason));
        }

        let Some(invoice_id) = order.invoice_document_id.as_deref() else {
            return Ok(ShipmentOutcome::NotEligible("no invoice document"));
        };
        let Some(payment_id) = order.payment_id.as_deref() else {
            return Ok(ShipmentOutcome::NotEligible("no payment id"));
        };

        let mut shipment = match self.gateway.ship(payment_id, invoice_id).await {
            Ok(shipment) => shipment,
            Err(e) => {
                tracing::error!(
                    payment_id,
                    invoice_id,
                    transaction_id = %order.transaction_id,
                    error = %e,
                    "Unable to send shipping notification"
                );
                return Ok(ShipmentOutcome::ShipFailed(e.to_string()));
            }
        };

        // The shipment belongs to the payment it was reported for, whether or
        // not the gateway echoes the reference back.
        shipment
            .payment_id
            .get_or_insert_with(|| payment_id.to_string());

        self.orders.record_shipping_date(order_id, Utc::now()).await?;
        tracing::info!(payment_id, invoice_id, shipment_id = %shipment.id, "Shipment reported");

        let status = if self.config.auto_status_update {
            Some(self.status_service.update_by_shipment(&shipment).await?)
        } else {
            None
        };

        Ok(ShipmentOutcome::Shipped { shipment, status })
    }
}
