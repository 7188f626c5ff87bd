use crate::domain::order::{Order, OrderId, OrderStatus, Transition};
use crate::domain::ports::OrderRepository;
use crate::error::{PayhookError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing orders keyed by order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family mapping gateway transaction ids to order ids.
pub const CF_TRANSACTION_INDEX: &str = "transaction_index";

/// A persistent order repository backed by RocksDB.
///
/// Orders are stored as JSON under their big-endian id. A secondary column family
/// indexes them by transaction id so webhook lookups avoid a full scan.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbOrderRepository {
    db: Arc<DB>,
    // Serialises read-modify-write cycles issued through this handle.
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbOrderRepository {
    /// Opens or creates a RocksDB instance at `path`, creating missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let cf_index = ColumnFamilyDescriptor::new(CF_TRANSACTION_INDEX, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orders, cf_index])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PayhookError::Repository(format!("{name} column family not found")))
    }

    fn put(&self, order: &Order) -> Result<()> {
        let value = serde_json::to_vec(order)
            .map_err(|e| PayhookError::Repository(format!("Serialization error: {e}")))?;
        self.db.put_cf(self.cf(CF_ORDERS)?, order.id.to_be_bytes(), value)?;
        Ok(())
    }

    fn load(&self, order_id: OrderId) -> Result<Option<Order>> {
        let Some(bytes) = self.db.get_cf(self.cf(CF_ORDERS)?, order_id.to_be_bytes())? else {
            return Ok(None);
        };
        let order = serde_json::from_slice(&bytes)
            .map_err(|e| PayhookError::Repository(format!("Deserialization error: {e}")))?;
        Ok(Some(order))
    }

    fn load_existing(&self, order_id: OrderId) -> Result<Order> {
        self.load(order_id)?
            .ok_or_else(|| PayhookError::Repository(format!("order {order_id} does not exist")))
    }
}

#[async_trait]
impl OrderRepository for RocksDbOrderRepository {
    async fn store(&self, order: Order) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let index = self.cf(CF_TRANSACTION_INDEX)?;
        if let Some(previous) = self.load(order.id)?
            && previous.transaction_id != order.transaction_id
        {
            self.db.delete_cf(index, previous.transaction_id.as_bytes())?;
        }
        self.db.put_cf(
            index,
            order.transaction_id.as_bytes(),
            order.id.to_be_bytes(),
        )?;
        self.put(&order)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.load(order_id)
    }

    async fn find_order_id_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<OrderId>> {
        let result = self
            .db
            .get_pinned_cf(self.cf(CF_TRANSACTION_INDEX)?, transaction_id.as_bytes())?;

        match result {
            Some(bytes) => {
                let key: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    PayhookError::Repository(format!(
                        "corrupt index entry for transaction {transaction_id}"
                    ))
                })?;
                Ok(Some(OrderId::from_be_bytes(key)))
            }
            None => Ok(None),
        }
    }

    async fn set_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        notify_customer: bool,
        comment: &str,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut order = self.load_existing(order_id)?;
        order.apply_status(status, comment);
        self.put(&order)?;

        tracing::debug!(order_id, status = %status, notify_customer, "Order status persisted");
        Ok(())
    }

    async fn transition_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        notify_customer: bool,
        comment: &str,
    ) -> Result<(OrderStatus, Transition)> {
        // Load, check and put under one lock.
        let _guard = self.write_lock.lock().await;
        let mut order = self.load_existing(order_id)?;
        let previous = order.payment_status;
        let transition = order.transition_to(status);
        if transition == Transition::Allowed {
            order.apply_status(status, comment);
            self.put(&order)?;
            tracing::debug!(order_id, status = %status, notify_customer, "Order status persisted");
        }
        Ok((previous, transition))
    }

    async fn record_shipping_date(&self, order_id: OrderId, date: DateTime<Utc>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut order = self.load_existing(order_id)?;
        order.shipping_date = Some(date);
        self.put(&order)
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let handle = self.cf(CF_ORDERS)?;

        let mut orders = Vec::new();
        for item in self.db.iterator_cf(handle, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let order: Order = serde_json::from_slice(&value).map_err(|e| {
                PayhookError::Repository(format!("Failed to deserialize order: {e}"))
            })?;
            orders.push(order);
        }

        Ok(orders)
    }
}
