use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

fn payhook(orders: &std::path::Path) -> Command {
    let mut cmd = Command::new(cargo_bin!("payhook"));
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg("tests/fixtures/config.json")
        .arg("--orders")
        .arg(orders)
        .arg("--gateway-fixtures")
        .arg("tests/fixtures/gateway.json");
    cmd
}

#[test]
fn test_malformed_orders_are_skipped() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "id,transaction_id,payment_status").unwrap();
    writeln!(csv, "1,tx-1,open").unwrap();
    // Invalid status
    writeln!(csv, "2,tx-2,somewhere").unwrap();
    // Invalid id
    writeln!(csv, "three,tx-3,open").unwrap();
    writeln!(csv, "4,tx-4,open").unwrap();
    csv.flush().unwrap();

    payhook(csv.path())
        .arg("reconcile")
        .arg("--order-id")
        .arg("1")
        .assert()
        .success()
        .stderr(predicate::str::contains("Skipping unreadable order"))
        .stdout(predicate::str::contains(
            "1,tx-1,,,completely_paid,,,,Unzer - Webhook,completely_paid",
        ))
        .stdout(predicate::str::contains("4,tx-4,,,open,,,,"))
        .stdout(predicate::str::contains("tx-2").not());
}

#[test]
fn test_malformed_payload_fails() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "id,transaction_id,payment_status").unwrap();
    writeln!(csv, "1,tx-1,open").unwrap();
    csv.flush().unwrap();

    assert_cmd::Command::from_std(payhook(csv.path()))
        .arg("dispatch")
        .write_stdin("{\"event\": \"charge.succeeded\"")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid webhook payload"));
}

#[test]
fn test_unreachable_resource_is_acknowledged() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "id,transaction_id,payment_status").unwrap();
    writeln!(csv, "1,tx-1,open").unwrap();
    csv.flush().unwrap();

    let payload = serde_json::json!({
        "event": "payment.completed",
        "publicKey": "s-pub-test",
        "retrieveUrl": "https://gateway.test/v1/payments/s-pay-gone",
    });

    assert_cmd::Command::from_std(payhook(csv.path()))
        .arg("dispatch")
        .write_stdin(payload.to_string())
        .assert()
        .success()
        .stderr(predicate::str::contains("Failed to fetch webhook resource"))
        .stdout(predicate::str::contains("1,tx-1,,,open,,,,"));
}
