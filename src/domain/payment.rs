use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Payment method a gateway payment was made with.
///
/// Selects the status mapping rules. Payment types the gateway reports but this
/// crate does not know fall back to [`PaymentMethodKind::Generic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethodKind {
    Eps,
    Invoice,
    InvoiceGuaranteed,
    #[serde(rename = "paypal")]
    PayPal,
    #[serde(rename = "przelewy24")]
    Przelewy24,
    #[serde(rename = "sepa-direct-debit")]
    Sepa,
    #[serde(rename = "sepa-direct-debit-guaranteed")]
    SepaGuaranteed,
    #[serde(other)]
    Generic,
}

impl PaymentMethodKind {
    pub const ALL: [PaymentMethodKind; 8] = [
        Self::Eps,
        Self::Invoice,
        Self::InvoiceGuaranteed,
        Self::PayPal,
        Self::Przelewy24,
        Self::Sepa,
        Self::SepaGuaranteed,
        Self::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eps => "eps",
            Self::Invoice => "invoice",
            Self::InvoiceGuaranteed => "invoice-guaranteed",
            Self::PayPal => "paypal",
            Self::Przelewy24 => "przelewy24",
            Self::Sepa => "sepa-direct-debit",
            Self::SepaGuaranteed => "sepa-direct-debit-guaranteed",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for PaymentMethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a payment as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    Completed,
    Canceled,
    PartlyPaid,
    PaymentReview,
    Chargeback,
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::PartlyPaid => "partly_paid",
            Self::PaymentReview => "payment_review",
            Self::Chargeback => "chargeback",
        };
        f.write_str(name)
    }
}

/// A refund or reversal booked against a charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub reason_code: Option<String>,
    /// Charge this cancellation reverses, if it reverses one.
    #[serde(default)]
    pub charge_id: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
}

/// Captured funds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charge {
    pub id: String,
    pub amount: Decimal,
    pub success: bool,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub cancellations: Vec<Cancellation>,
}

impl Charge {
    pub fn cancelled_amount(&self) -> Decimal {
        self.cancellations.iter().map(|c| c.amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: String,
    /// Invoice document the shipment was reported with.
    #[serde(default)]
    pub invoice_id: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub payment_id: Option<String>,
}

/// Read-only snapshot of a gateway payment.
///
/// Fetched fresh for every reconciliation and never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResource {
    pub id: String,
    /// External transaction id the local order is stored under.
    pub order_id: String,
    #[serde(rename = "paymentType")]
    pub kind: PaymentMethodKind,
    pub state: PaymentState,
    #[serde(default)]
    pub charges: Vec<Charge>,
    #[serde(default)]
    pub shipments: Vec<Shipment>,
}

impl PaymentResource {
    pub fn is_pending(&self) -> bool {
        self.state == PaymentState::Pending
    }

    pub fn is_canceled(&self) -> bool {
        self.state == PaymentState::Canceled
    }

    pub fn first_charge(&self) -> Option<&Charge> {
        self.charges.first()
    }

    /// Sum of all successful charges.
    pub fn charged_amount(&self) -> Decimal {
        self.charges
            .iter()
            .filter(|c| c.success)
            .map(|c| c.amount)
            .sum()
    }

    /// Sum of every cancellation across all charges.
    pub fn cancelled_amount(&self) -> Decimal {
        self.charges.iter().map(Charge::cancelled_amount).sum()
    }

    pub fn has_cancellations(&self) -> bool {
        self.charges.iter().any(|c| !c.cancellations.is_empty())
    }

    /// Shipped total, or `None` when any shipment was reported without an amount.
    pub fn shipped_amount(&self) -> Option<Decimal> {
        self.shipments.iter().map(|s| s.amount).sum()
    }
}

/// A resource the gateway did not model as a payment transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnrecognisedResource {
    pub kind: String,
    pub id: String,
}

/// Whatever a webhook's retrieve URL resolves to.
///
/// Selected by the `resource` tag of the gateway JSON. Tags outside the known
/// transaction types land in [`GatewayResource::Other`] instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResource {
    Payment(PaymentResource),
    Charge(Charge),
    Authorization(Authorization),
    Cancellation(Cancellation),
    Payout(Payout),
    Shipment(Shipment),
    Other(UnrecognisedResource),
}

impl<'de> Deserialize<'de> for GatewayResource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let kind = value
            .get("resource")
            .and_then(Value::as_str)
            .ok_or_else(|| de::Error::missing_field("resource"))?
            .to_string();

        let resource = match kind.as_str() {
            "payment" => serde_json::from_value(value).map(Self::Payment),
            "charge" => serde_json::from_value(value).map(Self::Charge),
            "authorization" => serde_json::from_value(value).map(Self::Authorization),
            "cancellation" => serde_json::from_value(value).map(Self::Cancellation),
            "payout" => serde_json::from_value(value).map(Self::Payout),
            "shipment" => serde_json::from_value(value).map(Self::Shipment),
            _ => {
                let id = value.get("id").and_then(Value::as_str).unwrap_or_default();
                Ok(Self::Other(UnrecognisedResource {
                    kind: kind.clone(),
                    id: id.to_string(),
                }))
            }
        };
        resource.map_err(de::Error::custom)
    }
}

impl GatewayResource {
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Payment(_) => "payment",
            Self::Charge(_) => "charge",
            Self::Authorization(_) => "authorization",
            Self::Cancellation(_) => "cancellation",
            Self::Payout(_) => "payout",
            Self::Shipment(_) => "shipment",
            Self::Other(other) => &other.kind,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Payment(p) => &p.id,
            Self::Charge(c) => &c.id,
            Self::Authorization(a) => &a.id,
            Self::Cancellation(c) => &c.id,
            Self::Payout(p) => &p.id,
            Self::Shipment(s) => &s.id,
            Self::Other(other) => &other.id,
        }
    }

    /// Back-reference to the owning payment of a sub-transaction.
    pub fn payment_id(&self) -> Option<&str> {
        match self {
            Self::Payment(_) | Self::Other(_) => None,
            Self::Charge(c) => c.payment_reference(),
            Self::Authorization(a) => a.payment_reference(),
            Self::Cancellation(c) => c.payment_reference(),
            Self::Payout(p) => p.payment_reference(),
            Self::Shipment(s) => s.payment_reference(),
        }
    }
}

/// Sub-transactions that point back to the payment they belong to.
pub trait PaymentReference {
    fn payment_reference(&self) -> Option<&str>;
}

macro_rules! impl_payment_reference {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PaymentReference for $ty {
                fn payment_reference(&self) -> Option<&str> {
                    self.payment_id.as_deref().filter(|id| !id.is_empty())
                }
            }
        )*
    };
}

impl_payment_reference!(Charge, Authorization, Cancellation, Payout, Shipment);
