use super::registry::StatusMapperRegistry;
use crate::config::StatusUpdateConfig;
use crate::domain::order::{OrderStatus, Transition};
use crate::domain::payment::{
    Authorization, Cancellation, Charge, PaymentReference, PaymentResource, Payout, Shipment,
};
use crate::domain::ports::{SharedGatewayClient, SharedOrderRepository};
use crate::error::{PayhookError, Result};

/// Audit note stored with every status change made by this service.
pub const WEBHOOK_COMMENT: &str = "Unzer - Webhook";

/// What a status update request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied(OrderStatus),
    /// The order already had this status.
    Unchanged(OrderStatus),
    /// The order has moved past the computed status; the notification is stale.
    Stale {
        current: OrderStatus,
        target: OrderStatus,
    },
    /// Automatic updates are disabled; the computed status was not persisted.
    Disabled(OrderStatus),
    /// No order carries the transaction id yet.
    OrderNotFound,
    /// The payment state has no mapping for its payment method.
    NotMapped,
    /// The sub-resource has no owning payment.
    NoPayment,
}

/// Applies gateway payment states to shop orders.
///
/// Mapping failures are logged and swallowed: a webhook delivery must always be
/// acknowledged, otherwise the gateway keeps redelivering it. Only gateway and
/// repository failures reach the caller.
pub struct OrderStatusService {
    registry: StatusMapperRegistry,
    orders: SharedOrderRepository,
    gateway: SharedGatewayClient,
    config: StatusUpdateConfig,
}

impl OrderStatusService {
    pub fn new(
        registry: StatusMapperRegistry,
        orders: SharedOrderRepository,
        gateway: SharedGatewayClient,
        config: StatusUpdateConfig,
    ) -> Self {
        Self {
            registry,
            orders,
            gateway,
            config,
        }
    }

    pub async fn update_by_payment(&self, payment: &PaymentResource) -> Result<StatusUpdate> {
        let target = match self
            .registry
            .resolve(payment.kind)
            .and_then(|mapper| mapper.target_status(payment, true))
        {
            Ok(status) => status,
            Err(e @ PayhookError::NoMapperFound(_)) => {
                tracing::error!(
                    payment_id = %payment.id,
                    transaction_id = %payment.order_id,
                    kind = %payment.kind,
                    error = %e,
                    "No status mapper registered for payment method"
                );
                return Ok(StatusUpdate::NotMapped);
            }
            Err(e @ PayhookError::UnmappableState { .. }) => {
                tracing::warn!(
                    payment_id = %payment.id,
                    transaction_id = %payment.order_id,
                    kind = %payment.kind,
                    state = %payment.state,
                    error = %e,
                    "Skipping status update"
                );
                return Ok(StatusUpdate::NotMapped);
            }
            Err(e) => return Err(e),
        };

        if !self.config.auto_status_update {
            tracing::info!(
                payment_id = %payment.id,
                transaction_id = %payment.order_id,
                status = %target,
                "Automatic payment status update disabled"
            );
            return Ok(StatusUpdate::Disabled(target));
        }

        self.update_by_transaction_id(&payment.order_id, target).await
    }

    /// Persists `status` on the order stored under `transaction_id`.
    ///
    /// Replays of the current status and stale statuses are not written. The
    /// check and the write happen in one repository call, so racing deliveries
    /// cannot regress the order.
    pub async fn update_by_transaction_id(
        &self,
        transaction_id: &str,
        status: OrderStatus,
    ) -> Result<StatusUpdate> {
        let Some(order_id) = self
            .orders
            .find_order_id_by_transaction_id(transaction_id)
            .await?
        else {
            tracing::debug!(transaction_id, "No order for transaction yet");
            return Ok(StatusUpdate::OrderNotFound);
        };

        let (current, transition) = self
            .orders
            .transition_status(
                order_id,
                status,
                self.config.auto_notify_customer,
                WEBHOOK_COMMENT,
            )
            .await?;

        match transition {
            Transition::Unchanged => return Ok(StatusUpdate::Unchanged(current)),
            Transition::Regression => {
                tracing::info!(
                    transaction_id,
                    order_id,
                    current = %current,
                    target = %status,
                    "Ignoring stale payment status"
                );
                return Ok(StatusUpdate::Stale {
                    current,
                    target: status,
                });
            }
            Transition::Allowed => {}
        }

        tracing::info!(transaction_id, order_id, status = %status, "Payment status updated");
        Ok(StatusUpdate::Applied(status))
    }

    pub async fn update_by_charge(&self, charge: &Charge) -> Result<StatusUpdate> {
        self.update_by_reference(charge).await
    }

    pub async fn update_by_authorization(
        &self,
        authorization: &Authorization,
    ) -> Result<StatusUpdate> {
        self.update_by_reference(authorization).await
    }

    pub async fn update_by_cancellation(
        &self,
        cancellation: &Cancellation,
    ) -> Result<StatusUpdate> {
        self.update_by_reference(cancellation).await
    }

    pub async fn update_by_payout(&self, payout: &Payout) -> Result<StatusUpdate> {
        self.update_by_reference(payout).await
    }

    pub async fn update_by_shipment(&self, shipment: &Shipment) -> Result<StatusUpdate> {
        self.update_by_reference(shipment).await
    }

    async fn update_by_reference<R>(&self, resource: &R) -> Result<StatusUpdate>
    where
        R: PaymentReference + Sync,
    {
        let Some(payment_id) = resource.payment_reference() else {
            return Ok(StatusUpdate::NoPayment);
        };

        let payment = self.gateway.fetch_payment(payment_id).await?;
        self.update_by_payment(&payment).await
    }
}
