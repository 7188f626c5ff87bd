//! Application layer reconciling shop orders with gateway payments.
//!
//! A [`dispatcher::WebhookDispatcher`] authenticates deliveries and routes them to
//! [`handlers`], which fetch the announced resource and hand its payment to the
//! [`order_status::OrderStatusService`]. The service picks a
//! [`status_mapper::StatusMapper`] from the [`registry`] and persists the resulting
//! order status. [`shipment::ShipmentNotifier`] covers the opposite direction,
//! reporting shipped orders to the gateway.

pub mod dispatcher;
pub mod handlers;
pub mod order_status;
pub mod registry;
pub mod shipment;
pub mod status_mapper;
