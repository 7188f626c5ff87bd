use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use payhook::application::dispatcher::WebhookDispatcher;
use payhook::application::order_status::OrderStatusService;
use payhook::application::registry::StatusMapperRegistry;
use payhook::application::shipment::ShipmentNotifier;
use payhook::config::{self, GatewayConfig, JsonConfigReader, ShipmentConfig, StatusUpdateConfig};
use payhook::domain::order::OrderId;
use payhook::domain::ports::{
    GatewayClient, OrderRepository, SharedGatewayClient, SharedOrderRepository,
};
use payhook::infrastructure::http_gateway::HttpGatewayClient;
use payhook::infrastructure::in_memory::{InMemoryGatewayClient, InMemoryOrderRepository};
use payhook::interfaces::csv::order_reader::OrderReader;
use payhook::interfaces::csv::order_writer::OrderWriter;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Plugin configuration as a flat JSON object
    #[arg(long)]
    config: PathBuf,

    /// Orders CSV loaded before running. All orders are written to stdout afterwards.
    #[arg(long)]
    orders: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Answer gateway requests from a JSON fixture file instead of the live API
    #[arg(long)]
    gateway_fixtures: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process one webhook delivery
    Dispatch {
        /// File holding the delivery body. Reads stdin when omitted.
        #[arg(long)]
        payload: Option<PathBuf>,
    },
    /// Re-apply the gateway payment state to an order
    Reconcile {
        #[arg(long)]
        order_id: OrderId,
    },
    /// Re-apply a payment state through one of its charges
    ReconcileCharge {
        #[arg(long)]
        payment_id: String,
        #[arg(long)]
        charge_id: String,
    },
    /// Report an order's shipment to the gateway if it qualifies
    Ship {
        #[arg(long)]
        order_id: OrderId,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn open_repository(db_path: Option<PathBuf>) -> Result<SharedOrderRepository> {
    if let Some(db_path) = db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            use payhook::infrastructure::rocksdb::RocksDbOrderRepository;
            let repository = RocksDbOrderRepository::open(db_path).into_diagnostic()?;
            return Ok(Arc::new(repository));
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        {
            tracing::warn!(
                db_path = %db_path.display(),
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
            );
        }
    }
    Ok(Arc::new(InMemoryOrderRepository::new()))
}

fn open_gateway(
    fixtures: Option<PathBuf>,
    reader: &JsonConfigReader,
) -> Result<SharedGatewayClient> {
    match fixtures {
        Some(path) => Ok(Arc::new(InMemoryGatewayClient::load(path).into_diagnostic()?)),
        None => {
            let config = GatewayConfig::from_reader(reader).into_diagnostic()?;
            Ok(Arc::new(HttpGatewayClient::new(config).into_diagnostic()?))
        }
    }
}

fn read_payload(path: Option<PathBuf>) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    match path {
        Some(path) => File::open(path)
            .into_diagnostic()?
            .read_to_end(&mut payload)
            .into_diagnostic()?,
        None => io::stdin().read_to_end(&mut payload).into_diagnostic()?,
    };
    Ok(payload)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let reader = JsonConfigReader::from_path(&cli.config).into_diagnostic()?;
    let orders = open_repository(cli.db_path)?;
    let gateway = open_gateway(cli.gateway_fixtures, &reader)?;

    if let Some(path) = cli.orders {
        let file = File::open(path).into_diagnostic()?;
        for order in OrderReader::new(file).orders() {
            match order {
                Ok(order) => orders.store(order).await.into_diagnostic()?,
                Err(e) => tracing::error!(error = %e, "Skipping unreadable order"),
            }
        }
    }

    let service = Arc::new(OrderStatusService::new(
        StatusMapperRegistry::with_defaults(),
        orders.clone(),
        gateway.clone(),
        StatusUpdateConfig::from_reader(&reader),
    ));

    match cli.command {
        Command::Dispatch { payload } => {
            let public_key = config::public_key(&reader).into_diagnostic()?;
            let dispatcher =
                WebhookDispatcher::with_default_handlers(public_key, gateway, service);

            let report = dispatcher
                .dispatch(&read_payload(payload)?)
                .await
                .into_diagnostic()?;
            tracing::info!(
                event_type = %report.event_type,
                handlers = report.outcomes.len(),
                failures = report.failures(),
                "Webhook processed"
            );
        }
        Command::Reconcile { order_id } => {
            let order = orders
                .get(order_id)
                .await
                .into_diagnostic()?
                .ok_or_else(|| miette::miette!("order {order_id} does not exist"))?;
            let payment = gateway
                .fetch_payment_by_order_id(&order.transaction_id)
                .await
                .into_diagnostic()?;
            let update = service.update_by_payment(&payment).await.into_diagnostic()?;
            tracing::info!(order_id, update = ?update, "Order reconciled");
        }
        Command::ReconcileCharge {
            payment_id,
            charge_id,
        } => {
            let charge = gateway
                .fetch_charge_by_id(&payment_id, &charge_id)
                .await
                .into_diagnostic()?;
            let update = service.update_by_charge(&charge).await.into_diagnostic()?;
            tracing::info!(%payment_id, %charge_id, update = ?update, "Charge reconciled");
        }
        Command::Ship { order_id } => {
            let notifier = ShipmentNotifier::new(
                gateway,
                orders.clone(),
                service,
                ShipmentConfig::from_reader(&reader),
            );
            let outcome = notifier.on_order_updated(order_id).await.into_diagnostic()?;
            tracing::info!(order_id, outcome = ?outcome, "Shipment check finished");
        }
    }

    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer
        .write_orders(orders.all_orders().await.into_diagnostic()?)
        .into_diagnostic()?;

    Ok(())
}
