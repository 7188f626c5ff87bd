use crate::domain::order::Order;
use crate::error::{PayhookError, Result};
use std::io::Read;

/// Reads orders from a CSV source.
///
/// Wraps `csv::Reader`, trimming whitespace and tolerating trailing optional
/// columns that are left out.
pub struct OrderReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OrderReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes the orders of the source.
    pub fn orders(self) -> impl Iterator<Item = Result<Order>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PayhookError::from))
    }
}
