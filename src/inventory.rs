//! Catalog fetch from the inventory service.

use std::time::Duration;

use serde_json::Value;
use tracing::info;

use crate::Result;
use crate::models::Catalog;
use crate::models::envelope::unwrap_envelope;

/// Fetches and normalizes the catalog.
///
/// The response may be wrapped once in a gateway envelope.
///
/// # Errors
///
/// Returns [`StoreError::Http`](crate::StoreError::Http) on transport or
/// status failures and
/// [`StoreError::MalformedResponse`](crate::StoreError::MalformedResponse)
/// if the payload is not a catalog.
pub async fn fetch_catalog(client: &reqwest::Client, url: &str, timeout: Duration) -> Result<Catalog> {
    info!(url, "fetching catalog");
    let response = client
        .get(url)
        .header("Content-Type", "application/json")
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?;
    let body: Value = response.json().await?;
    let catalog = parse_catalog(body)?;
    info!(items = catalog.len(), "catalog loaded");
    Ok(catalog)
}

/// Unwraps and normalizes an inventory response body.
///
/// # Errors
///
/// Returns [`StoreError::MalformedResponse`](crate::StoreError::MalformedResponse)
/// if the envelope or payload is malformed.
pub fn parse_catalog(body: Value) -> Result<Catalog> {
    let payload =
        unwrap_envelope(body).map_err(|e| crate::StoreError::MalformedResponse(e.message))?;
    Catalog::from_value(payload).map_err(|e| crate::StoreError::MalformedResponse(e.message))
}
