use super::order_status::{OrderStatusService, StatusUpdate};
use crate::domain::payment::GatewayResource;
use crate::domain::ports::SharedGatewayClient;
use crate::domain::webhook::WebhookEvent;
use crate::error::PayhookError;
use async_trait::async_trait;
use std::sync::Arc;

/// Why a handler did not forward the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The fetched sub-transaction carries no owning payment.
    MissingPaymentReference,
    /// The handler does not deal with this kind of resource.
    UnexpectedResource(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Completed(StatusUpdate),
    Skipped(SkipReason),
    Failed(String),
}

impl HandlerOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A reaction to one webhook event.
///
/// Handlers never return errors: every failure is logged and reported as an
/// outcome so the remaining handlers of the delivery still run.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, event: &WebhookEvent) -> HandlerOutcome;
}

fn fetch_failed(event: &WebhookEvent, handler: &'static str, error: PayhookError) -> HandlerOutcome {
    tracing::error!(
        handler,
        event_type = %event.event_type,
        retrieve_url = %event.retrieve_url,
        payment_id = event.payment_id.as_deref(),
        error = %error,
        "Failed to fetch webhook resource"
    );
    HandlerOutcome::Failed(error.to_string())
}

fn missing_payment(
    event: &WebhookEvent,
    handler: &'static str,
    resource: &GatewayResource,
) -> HandlerOutcome {
    let error = PayhookError::DataIntegrity {
        resource: resource.kind_name().to_string(),
        id: resource.id().to_string(),
    };
    tracing::error!(
        alert = true,
        handler,
        event_type = %event.event_type,
        retrieve_url = %event.retrieve_url,
        kind = resource.kind_name(),
        error = %error,
        "Webhook resource has no payment"
    );
    HandlerOutcome::Skipped(SkipReason::MissingPaymentReference)
}

fn completed(
    event: &WebhookEvent,
    handler: &'static str,
    result: crate::error::Result<StatusUpdate>,
) -> HandlerOutcome {
    match result {
        Ok(update) => HandlerOutcome::Completed(update),
        Err(e) => {
            tracing::error!(
                handler,
                event_type = %event.event_type,
                retrieve_url = %event.retrieve_url,
                error = %e,
                "Status update failed"
            );
            HandlerOutcome::Failed(e.to_string())
        }
    }
}

/// Reconciles the owning payment of whatever resource the event points at.
pub struct TransactionTypeHandler {
    gateway: SharedGatewayClient,
    service: Arc<OrderStatusService>,
}

impl TransactionTypeHandler {
    pub fn new(gateway: SharedGatewayClient, service: Arc<OrderStatusService>) -> Self {
        Self { gateway, service }
    }
}

#[async_trait]
impl WebhookHandler for TransactionTypeHandler {
    fn name(&self) -> &'static str {
        "transaction-type"
    }

    async fn execute(&self, event: &WebhookEvent) -> HandlerOutcome {
        let resource = match self.gateway.fetch_resource_from_event(event).await {
            Ok(resource) => resource,
            Err(e) => return fetch_failed(event, self.name(), e.into()),
        };

        if let GatewayResource::Payment(payment) = &resource {
            return completed(event, self.name(), self.service.update_by_payment(payment).await);
        }

        let Some(payment_id) = resource.payment_id() else {
            return missing_payment(event, self.name(), &resource);
        };

        let payment = match self.gateway.fetch_payment(payment_id).await {
            Ok(payment) => payment,
            Err(e) => return fetch_failed(event, self.name(), e.into()),
        };
        completed(event, self.name(), self.service.update_by_payment(&payment).await)
    }
}

/// Reconciles payments from charge events.
pub struct ChargeHandler {
    gateway: SharedGatewayClient,
    service: Arc<OrderStatusService>,
}

impl ChargeHandler {
    pub fn new(gateway: SharedGatewayClient, service: Arc<OrderStatusService>) -> Self {
        Self { gateway, service }
    }
}

#[async_trait]
impl WebhookHandler for ChargeHandler {
    fn name(&self) -> &'static str {
        "charge"
    }

    async fn execute(&self, event: &WebhookEvent) -> HandlerOutcome {
        let resource = match self.gateway.fetch_resource_from_event(event).await {
            Ok(resource) => resource,
            Err(e) => return fetch_failed(event, self.name(), e.into()),
        };

        let GatewayResource::Charge(charge) = &resource else {
            tracing::debug!(
                event_type = %event.event_type,
                kind = resource.kind_name(),
                "Charge handler ignoring resource"
            );
            return HandlerOutcome::Skipped(SkipReason::UnexpectedResource(
                resource.kind_name().to_string(),
            ));
        };

        if resource.payment_id().is_none() {
            return missing_payment(event, self.name(), &resource);
        }
        completed(event, self.name(), self.service.update_by_charge(charge).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::StatusMapperRegistry;
    use crate::config::StatusUpdateConfig;
    use crate::domain::order::{Order, OrderStatus};
    use crate::domain::payment::{
        Authorization, Charge, PaymentMethodKind, PaymentResource, PaymentState,
        UnrecognisedResource,
    };
    use crate::domain::ports::OrderRepository;
    use crate::infrastructure::in_memory::{InMemoryGatewayClient, InMemoryOrderRepository};
    use rust_decimal_macros::dec;

    const URL: &str = "https://gateway.test/resources/1";

    fn event(event_type: &str) -> WebhookEvent {
        WebhookEvent {
            event_type: event_type.to_string(),
            public_key: "s-pub-1".to_string(),
            retrieve_url: URL.to_string(),
            payment_id: None,
            payload: String::new(),
        }
    }

    fn payment(state: PaymentState) -> PaymentResource {
        PaymentResource {
            id: "s-pay-1".to_string(),
            order_id: "tx-1".to_string(),
            kind: PaymentMethodKind::PayPal,
            state,
            charges: vec![],
            shipments: vec![],
        }
    }

    fn charge(payment_id: Option<&str>) -> Charge {
        Charge {
            id: "s-chg-1".to_string(),
            amount: dec!(20.00),
            success: true,
            payment_id: payment_id.map(str::to_string),
            cancellations: vec![],
        }
    }

    async fn setup() -> (
        Arc<InMemoryGatewayClient>,
        Arc<InMemoryOrderRepository>,
        Arc<OrderStatusService>,
    ) {
        let gateway = Arc::new(InMemoryGatewayClient::new());
        let orders = Arc::new(InMemoryOrderRepository::new());
        orders.store(Order::new(1, "tx-1")).await.unwrap();
        let service = Arc::new(OrderStatusService::new(
            StatusMapperRegistry::with_defaults(),
            orders.clone(),
            gateway.clone(),
            StatusUpdateConfig::default(),
        ));
        (gateway, orders, service)
    }

    #[tokio::test]
    async fn test_payment_event_forwards_payment() {
        let (gateway, orders, service) = setup().await;
        gateway
            .insert_resource(URL, GatewayResource::Payment(payment(PaymentState::Completed)))
            .await;

        let handler = TransactionTypeHandler::new(gateway, service);
        let outcome = handler.execute(&event("payment.completed")).await;

        assert_eq!(
            outcome,
            HandlerOutcome::Completed(StatusUpdate::Applied(OrderStatus::CompletelyPaid))
        );
        assert_eq!(orders.status_changes().await.len(), 1);
    }

    #[tokio::test]
    async fn test_sub_transaction_resolves_owning_payment() {
        let (gateway, _, service) = setup().await;
        let mut pending = payment(PaymentState::Pending);
        pending.charges.push(charge(Some("s-pay-1")));
        gateway.insert_payment(pending).await;
        gateway
            .insert_resource(
                URL,
                GatewayResource::Authorization(Authorization {
                    id: "s-aut-1".to_string(),
                    amount: dec!(20.00),
                    payment_id: Some("s-pay-1".to_string()),
                }),
            )
            .await;

        let handler = TransactionTypeHandler::new(gateway, service);
        let outcome = handler.execute(&event("authorize.succeeded")).await;

        assert_eq!(
            outcome,
            HandlerOutcome::Completed(StatusUpdate::Applied(OrderStatus::CompletelyPaid))
        );
    }

    #[tokio::test]
    async fn test_charge_without_payment_is_skipped() {
        let (gateway, orders, service) = setup().await;
        gateway
            .insert_resource(URL, GatewayResource::Charge(charge(None)))
            .await;

        let handler = ChargeHandler::new(gateway.clone(), service.clone());
        assert_eq!(
            handler.execute(&event("charge.succeeded")).await,
            HandlerOutcome::Skipped(SkipReason::MissingPaymentReference)
        );

        let handler = TransactionTypeHandler::new(gateway, service);
        assert_eq!(
            handler.execute(&event("charge.succeeded")).await,
            HandlerOutcome::Skipped(SkipReason::MissingPaymentReference)
        );
        assert!(orders.status_changes().await.is_empty());
    }

    #[tokio::test]
    async fn test_unrecognised_resource_is_skipped() {
        let (gateway, _, service) = setup().await;
        gateway
            .insert_resource(
                URL,
                GatewayResource::Other(UnrecognisedResource {
                    kind: "basket".to_string(),
                    id: "s-bsk-1".to_string(),
                }),
            )
            .await;

        let handler = TransactionTypeHandler::new(gateway, service);
        assert_eq!(
            handler.execute(&event("basket.created")).await,
            HandlerOutcome::Skipped(SkipReason::MissingPaymentReference)
        );
    }

    #[tokio::test]
    async fn test_charge_handler_ignores_other_resources() {
        let (gateway, _, service) = setup().await;
        gateway
            .insert_resource(URL, GatewayResource::Payment(payment(PaymentState::Completed)))
            .await;

        let handler = ChargeHandler::new(gateway, service);
        assert_eq!(
            handler.execute(&event("charge.canceled")).await,
            HandlerOutcome::Skipped(SkipReason::UnexpectedResource("payment".to_string()))
        );
    }

    #[tokio::test]
    async fn test_charge_handler_updates_through_charge() {
        let (gateway, orders, service) = setup().await;
        gateway.insert_payment(payment(PaymentState::PartlyPaid)).await;
        gateway
            .insert_resource(URL, GatewayResource::Charge(charge(Some("s-pay-1"))))
            .await;

        let handler = ChargeHandler::new(gateway, service);
        let outcome = handler.execute(&event("charge.succeeded")).await;

        assert_eq!(
            outcome,
            HandlerOutcome::Completed(StatusUpdate::Applied(OrderStatus::PartiallyPaid))
        );
        assert_eq!(
            orders.payment_status(1).await.unwrap(),
            Some(OrderStatus::PartiallyPaid)
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported() {
        let (gateway, _, service) = setup().await;

        let handler = TransactionTypeHandler::new(gateway.clone(), service.clone());
        assert!(handler.execute(&event("payment.completed")).await.is_failed());

        // The charge exists but its payment does not.
        gateway
            .insert_resource(URL, GatewayResource::Charge(charge(Some("s-pay-404"))))
            .await;
        let handler = ChargeHandler::new(gateway, service);
        assert!(handler.execute(&event("charge.succeeded")).await.is_failed());
    }
}
