#![allow(dead_code)]

use payhook::application::dispatcher::WebhookDispatcher;
use payhook::application::order_status::OrderStatusService;
use payhook::application::registry::StatusMapperRegistry;
use payhook::config::StatusUpdateConfig;
use payhook::domain::order::Order;
use payhook::domain::payment::{
    Charge, GatewayResource, PaymentMethodKind, PaymentResource, PaymentState,
};
use payhook::domain::ports::OrderRepository;
use payhook::infrastructure::in_memory::{InMemoryGatewayClient, InMemoryOrderRepository};
use rust_decimal::Decimal;
use std::sync::Arc;

pub const PUBLIC_KEY: &str = "s-pub-test";

pub fn payment(
    id: &str,
    transaction_id: &str,
    kind: PaymentMethodKind,
    state: PaymentState,
) -> PaymentResource {
    PaymentResource {
        id: id.to_string(),
        order_id: transaction_id.to_string(),
        kind,
        state,
        charges: vec![],
        shipments: vec![],
    }
}

pub fn charge(id: &str, payment_id: Option<&str>, amount: Decimal) -> Charge {
    Charge {
        id: id.to_string(),
        amount,
        success: true,
        payment_id: payment_id.map(str::to_string),
        cancellations: vec![],
    }
}

pub fn payload(event_type: &str, public_key: &str, retrieve_url: &str) -> Vec<u8> {
    serde_json::json!({
        "event": event_type,
        "publicKey": public_key,
        "retrieveUrl": retrieve_url,
    })
    .to_string()
    .into_bytes()
}

/// A dispatcher wired against in-memory adapters.
pub struct Harness {
    pub gateway: Arc<InMemoryGatewayClient>,
    pub orders: Arc<InMemoryOrderRepository>,
    pub dispatcher: WebhookDispatcher,
}

impl Harness {
    pub async fn new(config: StatusUpdateConfig) -> Self {
        let gateway = Arc::new(InMemoryGatewayClient::new());
        let orders = Arc::new(InMemoryOrderRepository::new());
        let service = Arc::new(OrderStatusService::new(
            StatusMapperRegistry::with_defaults(),
            orders.clone(),
            gateway.clone(),
            config,
        ));
        let dispatcher =
            WebhookDispatcher::with_default_handlers(PUBLIC_KEY, gateway.clone(), service);
        Self {
            gateway,
            orders,
            dispatcher,
        }
    }

    pub async fn with_order(self, id: u64, transaction_id: &str) -> Self {
        self.orders
            .store(Order::new(id, transaction_id))
            .await
            .unwrap();
        self
    }

    pub async fn publish(&self, url: &str, resource: GatewayResource) {
        self.gateway.insert_resource(url, resource).await;
    }
}
