use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the caller's config, session and environment
fn storefront(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("storefront").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("SUPABASE_URL")
        .env_remove("SUPABASE_ANON_KEY")
        .env_remove("STOREFRONT_ENV")
        .env_remove("STOREFRONT_CONFIG")
        .env_remove("STOREFRONT_PASSWORD")
        .env_remove("RUST_LOG")
        .env("STOREFRONT_API_URL", "http://127.0.0.1:9")
        .env("STOREFRONT_TIMEOUT_SECS", "1")
        .env("STOREFRONT_SESSION_FILE", dir.path().join("session.json"));
    cmd
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    storefront(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("products"))
        .stdout(predicate::str::contains("cart"))
        .stdout(predicate::str::contains("whoami"));
}

#[test]
fn cart_totals_below_free_shipping() {
    let dir = TempDir::new().unwrap();
    storefront(&dir)
        .args(["cart", "totals", "2x100", "1x50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("250.00"))
        .stdout(predicate::str::contains("29.99"))
        .stdout(predicate::str::contains("45.00"))
        .stdout(predicate::str::contains("324.99"));
}

#[test]
fn cart_totals_above_threshold_ship_free() {
    let dir = TempDir::new().unwrap();
    storefront(&dir)
        .args(["cart", "totals", "1x600"])
        .assert()
        .success()
        .stdout(predicate::str::contains("free"))
        .stdout(predicate::str::contains("708.00"));
}

#[test]
fn cart_totals_as_json() {
    let dir = TempDir::new().unwrap();
    let output = storefront(&dir)
        .args(["--format", "json", "cart", "totals", "1x500"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let totals: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(totals["subtotal"], 500.0);
    assert_eq!(totals["shipping"], 29.99);
    assert_eq!(totals["total"], 619.99);
}

#[test]
fn malformed_cart_line_is_a_validation_error() {
    let dir = TempDir::new().unwrap();
    storefront(&dir)
        .args(["cart", "totals", "2x10", "twoxten"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("lines.1"));
}

#[test]
fn whoami_without_session_requires_auth() {
    let dir = TempDir::new().unwrap();
    storefront(&dir)
        .arg("whoami")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Not signed in"));
}

#[test]
fn short_review_fails_before_any_request() {
    let dir = TempDir::new().unwrap();
    storefront(&dir)
        .args(["reviews", "add", "7", "--rating", "5", "--comment", "ok"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("comment"));
}

#[test]
fn unreachable_api_is_a_network_error() {
    let dir = TempDir::new().unwrap();
    storefront(&dir)
        .args(["products", "show", "1"])
        .assert()
        .code(4);
}

#[test]
fn logout_without_session_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    storefront(&dir)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[test]
fn bad_config_file_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("storefront.toml"), "timeout = \"soon\"").unwrap();
    storefront(&dir)
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("storefront.toml"));
}
