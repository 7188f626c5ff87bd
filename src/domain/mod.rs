//! Domain model: gateway resources, order records, webhook events and the ports
//! through which the application layer reaches the gateway and the shop.

pub mod order;
pub mod payment;
pub mod ports;
pub mod webhook;
