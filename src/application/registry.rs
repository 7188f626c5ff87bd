use super::status_mapper::{
    EpsStatusMapper, GenericStatusMapper, InvoiceGuaranteedStatusMapper, InvoiceStatusMapper,
    PayPalStatusMapper, PrzelewyStatusMapper, SepaDirectDebitStatusMapper, StatusMapper,
};
use crate::domain::payment::PaymentMethodKind;
use crate::error::{PayhookError, Result};

/// Ordered collection of status mappers.
///
/// Resolution scans mappers in registration order and returns the first one
/// supporting the payment method. Registration refuses a mapper that would share
/// a payment method with an already registered one, so the order never decides
/// between two competing rules.
#[derive(Default)]
pub struct StatusMapperRegistry {
    mappers: Vec<Box<dyn StatusMapper>>,
}

impl StatusMapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with one mapper for every known payment method.
    pub fn with_defaults() -> Self {
        Self {
            mappers: vec![
                Box::new(EpsStatusMapper),
                Box::new(InvoiceStatusMapper),
                Box::new(InvoiceGuaranteedStatusMapper),
                Box::new(PayPalStatusMapper),
                Box::new(PrzelewyStatusMapper),
                Box::new(SepaDirectDebitStatusMapper::plain()),
                Box::new(SepaDirectDebitStatusMapper::guaranteed()),
                Box::new(GenericStatusMapper),
            ],
        }
    }

    pub fn register(&mut self, mapper: Box<dyn StatusMapper>) -> Result<()> {
        for kind in PaymentMethodKind::ALL {
            if !mapper.supports(kind) {
                continue;
            }
            if let Some(existing) = self.mappers.iter().find(|m| m.supports(kind)) {
                return Err(PayhookError::MapperConflict {
                    mapper: mapper.name(),
                    existing: existing.name(),
                    kind,
                });
            }
        }
        self.mappers.push(mapper);
        Ok(())
    }

    pub fn resolve(&self, kind: PaymentMethodKind) -> Result<&dyn StatusMapper> {
        self.mappers
            .iter()
            .find(|m| m.supports(kind))
            .map(|m| m.as_ref())
            .ok_or(PayhookError::NoMapperFound(kind))
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}
