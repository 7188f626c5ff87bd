use super::payment::PaymentMethodKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type OrderId = u64;

/// Payment status stored on an order record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    ReviewNecessary,
    PartiallyPaid,
    CompletelyPaid,
    PartiallyShipped,
    Shipped,
    PartiallyRefunded,
    Refunded,
    Canceled,
}

/// Result of checking a status change against the monotonic ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Target equals the current status; nothing to write.
    Unchanged,
    Allowed,
    /// Target would move the order backwards or out of a terminal status.
    Regression,
}

impl OrderStatus {
    /// Canceled and refunded orders never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Refunded)
    }

    // ReviewNecessary and Canceled sit outside the progression.
    fn rank(self) -> Option<u8> {
        match self {
            Self::Open => Some(0),
            Self::PartiallyPaid => Some(1),
            Self::CompletelyPaid => Some(2),
            Self::PartiallyShipped => Some(3),
            Self::Shipped => Some(4),
            Self::PartiallyRefunded => Some(5),
            Self::Refunded => Some(6),
            Self::ReviewNecessary | Self::Canceled => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::ReviewNecessary => "review_necessary",
            Self::PartiallyPaid => "partially_paid",
            Self::CompletelyPaid => "completely_paid",
            Self::PartiallyShipped => "partially_shipped",
            Self::Shipped => "shipped",
            Self::PartiallyRefunded => "partially_refunded",
            Self::Refunded => "refunded",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slice of a shop order this crate reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// External transaction id; equals the gateway payment's order id.
    pub transaction_id: String,
    pub payment_id: Option<String>,
    pub payment_kind: Option<PaymentMethodKind>,
    pub payment_status: OrderStatus,
    /// Fulfilment status label maintained by the shop.
    pub fulfillment_status: Option<String>,
    pub invoice_document_id: Option<String>,
    pub shipping_date: Option<DateTime<Utc>>,
    /// Audit note written with the last payment status change.
    pub status_comment: Option<String>,
    /// Furthest progression status the order has held, kept across reviews.
    #[serde(default)]
    pub peak_status: Option<OrderStatus>,
}

impl Order {
    pub fn new(id: OrderId, transaction_id: impl Into<String>) -> Self {
        Self {
            id,
            transaction_id: transaction_id.into(),
            payment_id: None,
            payment_kind: None,
            payment_status: OrderStatus::Open,
            fulfillment_status: None,
            invoice_document_id: None,
            shipping_date: None,
            status_comment: None,
            peak_status: None,
        }
    }

    fn progress_rank(&self) -> Option<u8> {
        self.payment_status
            .rank()
            .max(self.peak_status.and_then(OrderStatus::rank))
    }

    /// Checks moving this order to `target` against the monotonic ordering.
    ///
    /// The furthest status reached before a review still counts, so an order
    /// leaving ReviewNecessary cannot fall behind where it already was.
    pub fn transition_to(&self, target: OrderStatus) -> Transition {
        let current = self.payment_status;
        if current == target {
            return Transition::Unchanged;
        }
        if current.is_terminal() {
            return Transition::Regression;
        }
        match (self.progress_rank(), target.rank()) {
            (Some(floor), Some(next)) if next < floor => Transition::Regression,
            _ => Transition::Allowed,
        }
    }

    /// Writes a payment status change onto the record.
    pub fn apply_status(&mut self, status: OrderStatus, comment: &str) {
        self.peak_status = [self.peak_status, Some(self.payment_status), Some(status)]
            .into_iter()
            .flatten()
            .filter(|s| s.rank().is_some())
            .max_by_key(|s| s.rank());
        self.payment_status = status;
        self.status_comment = Some(comment.to_string());
    }
}

/// One persisted payment status change.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub notify_customer: bool,
    pub comment: String,
}
