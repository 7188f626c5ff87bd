use crate::domain::order::Order;
use crate::error::Result;
use std::io::Write;

/// Writes orders as CSV, one row per order with a header line.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders<I>(&mut self, orders: I) -> Result<()>
    where
        I: IntoIterator<Item = Order>,
    {
        for order in orders {
            self.writer.serialize(order)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
