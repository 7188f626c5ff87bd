#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;

fn payhook(db_path: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin!("payhook"));
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg("tests/fixtures/config.json")
        .arg("--gateway-fixtures")
        .arg("tests/fixtures/gateway.json")
        .arg("--db-path")
        .arg(db_path);
    cmd
}

#[test]
fn test_orders_persist_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("orders_db");

    // First run imports the orders and applies a webhook.
    payhook(&db_path)
        .arg("--orders")
        .arg("tests/fixtures/orders.csv")
        .arg("dispatch")
        .arg("--payload")
        .arg("tests/fixtures/payloads/charge_succeeded.json")
        .assert()
        .success();

    // Second run works on the stored orders alone.
    payhook(&db_path)
        .arg("reconcile")
        .arg("--order-id")
        .arg("3")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "1,tx-1,s-pay-1,paypal,completely_paid,,,,Unzer - Webhook,completely_paid",
        ))
        .stdout(predicate::str::contains(
            "3,tx-3,s-pay-3,sepa-direct-debit,refunded,,,,Unzer - Webhook,refunded",
        ));
}
