//! Shared test utilities: in-process gateway, fixtures, and session setup.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use eazymart::StoreError;
use eazymart::checkout::CheckoutForm;
use eazymart::config::{PICKUP_LOCATION, StoreRules};
use eazymart::gateway::{GatewayError, OrderGateway};
use eazymart::geo::{Coordinate, StaticGeocoder};
use eazymart::inventory::parse_catalog;
use eazymart::models::{Catalog, Order};
use eazymart::session::Storefront;
use eazymart::store::{KeyValueStore, MemoryStore};

pub const CATALOG_JSON: &str = include_str!("../fixtures/catalog.json");
pub const CATALOG_ARRAY_ENVELOPED_JSON: &str =
    include_str!("../fixtures/catalog_array_enveloped.json");
pub const SUBMIT_ENVELOPED_JSON: &str = include_str!("../fixtures/submit_enveloped.json");
pub const SUBMIT_FAILURE_JSON: &str = include_str!("../fixtures/submit_failure.json");
pub const SUBMIT_PLAIN_JSON: &str = include_str!("../fixtures/submit_plain.json");

/// Address the test geocoder places about 2 km north of the store.
pub const NEAR_ADDRESS: &str = "Gandhi Nagar, Chilakaluripet";
/// Address the test geocoder places about 12 km north of the store.
pub const FAR_ADDRESS: &str = "Narasaraopet Bus Stand";

pub fn near_point() -> Coordinate {
    Coordinate::new(PICKUP_LOCATION.lat + 0.018, PICKUP_LOCATION.lng)
}

pub fn far_point() -> Coordinate {
    Coordinate::new(PICKUP_LOCATION.lat + 0.1078, PICKUP_LOCATION.lng)
}

pub fn geocoder() -> StaticGeocoder {
    StaticGeocoder::new()
        .with_address(NEAR_ADDRESS, near_point())
        .with_address(FAR_ADDRESS, far_point())
}

pub fn fixture(json: &str) -> Value {
    serde_json::from_str(json).expect("fixture is valid JSON")
}

pub fn catalog() -> Catalog {
    parse_catalog(fixture(CATALOG_JSON)).expect("catalog fixture parses")
}

/// A session over `store` with the fixture catalog loaded.
pub fn storefront_with(store: Arc<dyn KeyValueStore>) -> Storefront {
    let mut storefront =
        Storefront::open(store, StoreRules::default()).expect("session opens");
    storefront.set_catalog(catalog());
    storefront
}

pub fn storefront() -> Storefront {
    storefront_with(Arc::new(MemoryStore::new()))
}

/// A filled-in delivery form for an in-range address.
pub fn delivery_form() -> CheckoutForm {
    CheckoutForm {
        name: "Sravani".to_string(),
        phone: "9849012345".to_string(),
        email: "sravani@example.com".to_string(),
        address: NEAR_ADDRESS.to_string(),
        ..CheckoutForm::default()
    }
}

/// Gateway that answers every submission with a fixed result and records
/// what it was sent.
pub struct FakeGateway {
    reply: Result<Value, GatewayError>,
    calls: AtomicUsize,
    submitted: Mutex<Vec<Order>>,
}

impl FakeGateway {
    pub fn replying(body: Value) -> Self {
        Self {
            reply: Ok(body),
            calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: GatewayError) -> Self {
        Self {
            reply: Err(error),
            calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<Order> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderGateway for FakeGateway {
    async fn submit(&self, order: &Order) -> Result<Value, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(order.clone());
        self.reply.clone()
    }
}

/// Serves `response` verbatim to the first HTTP request on a local port and
/// returns the URL to reach it.
pub async fn serve_once(response: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });
    format!("http://{addr}/orders")
}

/// True once the headers and the full `Content-Length` body have arrived.
fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= header_end + 4 + content_length
}

/// Store whose writes can be switched off to simulate a full disk.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    read_only: std::sync::atomic::AtomicBool,
}

impl FlakyStore {
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> eazymart::Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> eazymart::Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("disk full".to_string()));
        }
        self.inner.set(key, value)
    }
}
