//! TLS and HTTP client configuration.
//!
//! Builds a [`rustls::ClientConfig`] trusting the Mozilla root set plus any
//! certificates from an optional PEM bundle, and a [`reqwest::Client`] that
//! uses it for every service call.

use std::path::Path;

use rustls::ClientConfig;

use crate::Result;

/// Builds a [`ClientConfig`] with the webpki roots and, when given, the
/// certificates in `extra_roots`.
///
/// # Errors
///
/// Returns [`StoreError::Tls`](crate::StoreError::Tls) if the bundle cannot
/// be read or parsed.
pub fn build_tls_config(extra_roots: Option<&Path>) -> Result<ClientConfig> {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if let Some(path) = extra_roots {
        let pem = std::fs::read(path).map_err(|e| {
            crate::StoreError::Tls(format!("failed to read {}: {e}", path.display()))
        })?;
        let certs: Vec<_> = rustls_pemfile::certs(&mut &pem[..])
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| crate::StoreError::Tls(format!("failed to parse CA PEM: {e}")))?;
        let (added, ignored) = root_store.add_parsable_certificates(certs);
        tracing::debug!(added, ignored, "loaded extra CA certificates");
    }

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(config)
}

/// Builds the shared HTTP client.
///
/// # Errors
///
/// Returns [`StoreError::Tls`](crate::StoreError::Tls) if the TLS config or
/// client cannot be built.
pub fn build_http_client(extra_roots: Option<&Path>) -> Result<reqwest::Client> {
    let tls = build_tls_config(extra_roots)?;
    reqwest::Client::builder()
        .use_preconfigured_tls(tls)
        .build()
        .map_err(|e| crate::StoreError::Tls(format!("failed to build HTTP client: {e}")))
}
