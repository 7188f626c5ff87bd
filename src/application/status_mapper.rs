//! Per payment method rules turning a gateway payment into an order status.
//!
//! Every mapper answers two questions: does it handle a payment method, and which
//! order status does a payment snapshot translate to. Rules share the helpers
//! [`map_default`], [`check_for_refund`] and [`check_for_shipment`]; the two
//! checks return `None` when they find nothing, leaving the caller to fall
//! through or to give up with [`PayhookError::UnmappableState`].
//!
//! `is_webhook` marks asynchronous notifications. Synchronous checkout flows
//! never observe some intermediate states that webhook deliveries legitimately
//! carry, so a few rules only reject those states outside webhook context.

use crate::domain::order::OrderStatus;
use crate::domain::payment::{PaymentMethodKind, PaymentResource, PaymentState};
use crate::error::{PayhookError, Result};

pub trait StatusMapper: Send + Sync {
    fn name(&self) -> &'static str;
    fn supports(&self, kind: PaymentMethodKind) -> bool;
    fn target_status(&self, payment: &PaymentResource, is_webhook: bool) -> Result<OrderStatus>;
}

/// Direct translation of the gateway state.
pub fn map_default(payment: &PaymentResource) -> OrderStatus {
    match payment.state {
        PaymentState::Completed => OrderStatus::CompletelyPaid,
        PaymentState::PartlyPaid => OrderStatus::PartiallyPaid,
        PaymentState::Pending => OrderStatus::Open,
        PaymentState::Canceled => OrderStatus::Canceled,
        PaymentState::PaymentReview | PaymentState::Chargeback => OrderStatus::ReviewNecessary,
    }
}

/// Refund status derived from the cancellations of all charges.
pub fn check_for_refund(payment: &PaymentResource) -> Option<OrderStatus> {
    if !payment.has_cancellations() {
        return None;
    }

    if payment.cancelled_amount() >= payment.charged_amount() {
        Some(OrderStatus::Refunded)
    } else {
        Some(OrderStatus::PartiallyRefunded)
    }
}

/// Shipment status derived from the reported shipments.
pub fn check_for_shipment(payment: &PaymentResource) -> Option<OrderStatus> {
    if payment.shipments.is_empty() {
        return None;
    }

    match payment.shipped_amount() {
        Some(shipped) if shipped < payment.charged_amount() => Some(OrderStatus::PartiallyShipped),
        _ => Some(OrderStatus::Shipped),
    }
}

fn unmappable(payment: &PaymentResource) -> PayhookError {
    PayhookError::UnmappableState {
        payment_id: payment.id.clone(),
        kind: payment.kind,
        state: payment.state,
    }
}

fn refund_or_unmappable(payment: &PaymentResource) -> Result<OrderStatus> {
    check_for_refund(payment).ok_or_else(|| unmappable(payment))
}

pub struct EpsStatusMapper;

impl StatusMapper for EpsStatusMapper {
    fn name(&self) -> &'static str {
        "eps"
    }

    fn supports(&self, kind: PaymentMethodKind) -> bool {
        kind == PaymentMethodKind::Eps
    }

    fn target_status(&self, payment: &PaymentResource, is_webhook: bool) -> Result<OrderStatus> {
        if is_webhook {
            return Ok(map_default(payment));
        }
        if payment.is_pending() {
            return Err(unmappable(payment));
        }
        if payment.is_canceled() {
            return refund_or_unmappable(payment);
        }
        Ok(map_default(payment))
    }
}

pub struct InvoiceStatusMapper;

impl StatusMapper for InvoiceStatusMapper {
    fn name(&self) -> &'static str {
        "invoice"
    }

    fn supports(&self, kind: PaymentMethodKind) -> bool {
        kind == PaymentMethodKind::Invoice
    }

    fn target_status(&self, payment: &PaymentResource, _is_webhook: bool) -> Result<OrderStatus> {
        if payment.is_canceled() {
            return Err(unmappable(payment));
        }
        Ok(map_default(payment))
    }
}

pub struct InvoiceGuaranteedStatusMapper;

impl StatusMapper for InvoiceGuaranteedStatusMapper {
    fn name(&self) -> &'static str {
        "invoice-guaranteed"
    }

    fn supports(&self, kind: PaymentMethodKind) -> bool {
        kind == PaymentMethodKind::InvoiceGuaranteed
    }

    fn target_status(&self, payment: &PaymentResource, _is_webhook: bool) -> Result<OrderStatus> {
        if payment.is_canceled() {
            return refund_or_unmappable(payment);
        }
        if let Some(status) = check_for_shipment(payment) {
            return Ok(status);
        }
        Ok(map_default(payment))
    }
}

pub struct PayPalStatusMapper;

impl StatusMapper for PayPalStatusMapper {
    fn name(&self) -> &'static str {
        "paypal"
    }

    fn supports(&self, kind: PaymentMethodKind) -> bool {
        kind == PaymentMethodKind::PayPal
    }

    fn target_status(&self, payment: &PaymentResource, _is_webhook: bool) -> Result<OrderStatus> {
        if payment.is_pending() {
            // PayPal keeps the payment pending until the shop finalises it,
            // even though the buyer's charge already went through.
            return match payment.first_charge() {
                Some(charge) if charge.success => Ok(OrderStatus::CompletelyPaid),
                _ => Err(unmappable(payment)),
            };
        }
        if payment.is_canceled() {
            return refund_or_unmappable(payment);
        }
        Ok(map_default(payment))
    }
}

pub struct PrzelewyStatusMapper;

impl StatusMapper for PrzelewyStatusMapper {
    fn name(&self) -> &'static str {
        "przelewy24"
    }

    fn supports(&self, kind: PaymentMethodKind) -> bool {
        kind == PaymentMethodKind::Przelewy24
    }

    fn target_status(&self, payment: &PaymentResource, _is_webhook: bool) -> Result<OrderStatus> {
        if payment.is_pending() {
            return Err(unmappable(payment));
        }
        if payment.is_canceled() {
            return refund_or_unmappable(payment);
        }
        Ok(map_default(payment))
    }
}

/// Plain and guaranteed SEPA direct debit share one rule.
pub struct SepaDirectDebitStatusMapper {
    kind: PaymentMethodKind,
}

impl SepaDirectDebitStatusMapper {
    pub fn plain() -> Self {
        Self {
            kind: PaymentMethodKind::Sepa,
        }
    }

    pub fn guaranteed() -> Self {
        Self {
            kind: PaymentMethodKind::SepaGuaranteed,
        }
    }
}

impl StatusMapper for SepaDirectDebitStatusMapper {
    fn name(&self) -> &'static str {
        match self.kind {
            PaymentMethodKind::SepaGuaranteed => "sepa-direct-debit-guaranteed",
            _ => "sepa-direct-debit",
        }
    }

    fn supports(&self, kind: PaymentMethodKind) -> bool {
        kind == self.kind
    }

    fn target_status(&self, payment: &PaymentResource, _is_webhook: bool) -> Result<OrderStatus> {
        if payment.is_canceled() {
            return refund_or_unmappable(payment);
        }
        Ok(map_default(payment))
    }
}

/// Fallback for payment methods without dedicated rules.
pub struct GenericStatusMapper;

impl StatusMapper for GenericStatusMapper {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn supports(&self, kind: PaymentMethodKind) -> bool {
        kind == PaymentMethodKind::Generic
    }

    fn target_status(&self, payment: &PaymentResource, _is_webhook: bool) -> Result<OrderStatus> {
        Ok(map_default(payment))
    }
}
