//! Application configuration loaded from environment variables.
//!
//! Every variable is optional:
//! - `EAZYMART_INVENTORY_URL`: catalog endpoint (GET)
//! - `EAZYMART_ORDER_URL`: order submission endpoint (POST)
//! - `EAZYMART_GEOCODER_URL`: Nominatim-compatible search endpoint; no
//!   geocoder is used when unset
//! - `EAZYMART_DATA_DIR`: directory holding the persisted cart and ledger
//! - `EAZYMART_CA_BUNDLE`: extra PEM roots trusted for HTTPS
//! - `EAZYMART_TIMEOUT_SECS`: HTTP request timeout
//!
//! Business constants (fees, radius, pickup point, promo) are not read from
//! the environment; they live in [`StoreRules`].

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::geo::Coordinate;

/// Default inventory endpoint.
const DEFAULT_INVENTORY_URL: &str =
    "https://0tfmpga1m9.execute-api.ap-south-1.amazonaws.com/prod/inventory";

/// Default order submission endpoint.
const DEFAULT_ORDER_URL: &str =
    "https://0tfmpga1m9.execute-api.ap-south-1.amazonaws.com/prod/submit-order";

const DEFAULT_DATA_DIR: &str = ".eazymart";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Flat delivery fee in rupees.
pub const DELIVERY_FEE: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

/// Maximum great-circle distance from the pickup point for delivery orders.
pub const DELIVERY_RADIUS_KM: f64 = 10.0;

/// The single recognized promo code.
pub const PROMO_CODE: &str = "EAZY10";

/// Discount rate granted by [`PROMO_CODE`] (10%).
pub const PROMO_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Stock ceiling used when the catalog has no numeric stock for an item.
pub const DEFAULT_STOCK_CEILING: u32 = 999;

/// Fixed pickup location (Chilakaluripet, Guntur).
pub const PICKUP_LOCATION: Coordinate = Coordinate {
    lat: 16.0962,
    lng: 80.1657,
};

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub endpoints: EndpointConfig,
    pub data_dir: PathBuf,
    pub rules: StoreRules,
}

/// Remote service endpoints and HTTP client settings.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub inventory_url: String,
    pub order_url: String,
    pub geocoder_url: Option<String>,
    pub ca_bundle: Option<PathBuf>,
    pub timeout: Duration,
}

/// Business rules applied by the pricing engine and checkout flow.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRules {
    pub delivery_fee: Decimal,
    pub delivery_radius_km: f64,
    pub pickup_location: Coordinate,
    /// Address recorded on pickup orders.
    pub pickup_address: String,
    pub promo_code: String,
    pub promo_rate: Decimal,
    pub default_stock_ceiling: u32,
}

impl Default for StoreRules {
    fn default() -> Self {
        Self {
            delivery_fee: DELIVERY_FEE,
            delivery_radius_km: DELIVERY_RADIUS_KM,
            pickup_location: PICKUP_LOCATION,
            pickup_address: "EAZYMART, Chilakaluripet, Guntur".to_string(),
            promo_code: PROMO_CODE.to_string(),
            promo_rate: PROMO_RATE,
            default_stock_ceiling: DEFAULT_STOCK_CEILING,
        }
    }
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`StoreError::Config`](crate::StoreError::Config) if
/// `EAZYMART_TIMEOUT_SECS` is not a positive integer.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let inventory_url = non_empty_var("EAZYMART_INVENTORY_URL")
        .unwrap_or_else(|| DEFAULT_INVENTORY_URL.to_string());
    let order_url =
        non_empty_var("EAZYMART_ORDER_URL").unwrap_or_else(|| DEFAULT_ORDER_URL.to_string());
    let geocoder_url = non_empty_var("EAZYMART_GEOCODER_URL");
    let ca_bundle = non_empty_var("EAZYMART_CA_BUNDLE").map(PathBuf::from);
    let data_dir = non_empty_var("EAZYMART_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    let timeout_secs = match non_empty_var("EAZYMART_TIMEOUT_SECS") {
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => {
                return Err(crate::StoreError::Config(format!(
                    "EAZYMART_TIMEOUT_SECS must be a positive integer, got {raw:?}"
                )));
            }
        },
        None => DEFAULT_TIMEOUT_SECS,
    };

    Ok(AppConfig {
        endpoints: EndpointConfig {
            inventory_url,
            order_url,
            geocoder_url,
            ca_bundle,
            timeout: Duration::from_secs(timeout_secs),
        },
        data_dir,
        rules: StoreRules::default(),
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
