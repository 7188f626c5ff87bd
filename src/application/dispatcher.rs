use super::handlers::{ChargeHandler, HandlerOutcome, TransactionTypeHandler, WebhookHandler};
use super::order_status::OrderStatusService;
use crate::domain::ports::SharedGatewayClient;
use crate::domain::webhook::WebhookEvent;
use crate::error::Result;
use std::sync::Arc;

/// Hooks the transaction-type handler listens on by default.
pub const TRANSACTION_HOOKS: [&str; 6] = [
    "authorize",
    "payment",
    "chargeback",
    "payout",
    "shipment",
    "charge.canceled",
];

/// Result of one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub event_type: String,
    /// Outcome of every handler that ran, in execution order.
    pub outcomes: Vec<(&'static str, HandlerOutcome)>,
}

impl DispatchReport {
    pub fn handled(&self) -> bool {
        !self.outcomes.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failed()).count()
    }
}

/// Routes authenticated webhook deliveries to the handlers registered for them.
///
/// A handler is registered under a hook, which is an exact event type
/// (`charge.canceled`), a resource group (`charge` matches `charge.succeeded`)
/// or the wildcard `all`.
pub struct WebhookDispatcher {
    public_key: String,
    registrations: Vec<(String, Arc<dyn WebhookHandler>)>,
}

impl WebhookDispatcher {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            registrations: Vec::new(),
        }
    }

    /// Dispatcher wired with the charge and transaction-type handlers.
    pub fn with_default_handlers(
        public_key: impl Into<String>,
        gateway: SharedGatewayClient,
        service: Arc<OrderStatusService>,
    ) -> Self {
        let mut dispatcher = Self::new(public_key);

        let charge: Arc<dyn WebhookHandler> =
            Arc::new(ChargeHandler::new(gateway.clone(), service.clone()));
        dispatcher.register("charge", charge);

        let transaction: Arc<dyn WebhookHandler> =
            Arc::new(TransactionTypeHandler::new(gateway, service));
        for hook in TRANSACTION_HOOKS {
            dispatcher.register(hook, transaction.clone());
        }
        dispatcher
    }

    pub fn register(&mut self, hook: impl Into<String>, handler: Arc<dyn WebhookHandler>) {
        self.registrations.push((hook.into(), handler));
    }

    /// Handlers matching `event`, in registration order, each at most once.
    fn handlers_for(&self, event: &WebhookEvent) -> Vec<Arc<dyn WebhookHandler>> {
        let mut matched: Vec<Arc<dyn WebhookHandler>> = Vec::new();
        for (hook, handler) in &self.registrations {
            if event.matches_hook(hook) && !matched.iter().any(|h| Arc::ptr_eq(h, handler)) {
                matched.push(handler.clone());
            }
        }
        matched
    }

    /// Decodes and dispatches a raw webhook body.
    pub async fn dispatch(&self, raw: &[u8]) -> Result<DispatchReport> {
        let event = WebhookEvent::from_bytes(raw)?;
        self.dispatch_event(&event).await
    }

    #[tracing::instrument(skip_all, fields(event_type = %event.event_type))]
    pub async fn dispatch_event(&self, event: &WebhookEvent) -> Result<DispatchReport> {
        if let Err(e) = event.verify_public_key(&self.public_key) {
            tracing::warn!(
                retrieve_url = %event.retrieve_url,
                "Rejecting webhook with foreign public key"
            );
            return Err(e);
        }

        let handlers = self.handlers_for(event);
        if handlers.is_empty() {
            tracing::debug!("No handler registered for event");
        }

        let mut outcomes = Vec::with_capacity(handlers.len());
        for handler in handlers {
            let outcome = handler.execute(event).await;
            tracing::debug!(handler = handler.name(), outcome = ?outcome, "Handler finished");
            outcomes.push((handler.name(), outcome));
        }

        let report = DispatchReport {
            event_type: event.event_type.clone(),
            outcomes,
        };
        if report.failures() > 0 {
            tracing::warn!(
                failures = report.failures(),
                handlers = report.outcomes.len(),
                "Webhook handled with failures"
            );
        }
        Ok(report)
    }
}
