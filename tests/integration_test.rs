//! Live service tests for the inventory endpoint.
//!
//! These tests call the real inventory service and require network access.
//! Run with: `cargo test --features integration-tests`

#![cfg(feature = "integration-tests")]

use eazymart::config::fetch_config;
use eazymart::inventory::fetch_catalog;
use eazymart::tls::build_http_client;

#[tokio::test]
async fn test_fetch_live_catalog() {
    let app_config = fetch_config().expect("config loads");
    let client = build_http_client(app_config.endpoints.ca_bundle.as_deref())
        .expect("failed to build HTTP client");

    let catalog = fetch_catalog(
        &client,
        &app_config.endpoints.inventory_url,
        app_config.endpoints.timeout,
    )
    .await
    .expect("failed to fetch catalog");

    assert!(!catalog.is_empty(), "live catalog has no items");
    for item in catalog.items() {
        assert!(!item.id.is_empty());
    }
}
