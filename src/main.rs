use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use eazymart::config::{AppConfig, fetch_config};
use eazymart::gateway::HttpGateway;
use eazymart::geo::{Geocoder, HttpGeocoder};
use eazymart::inventory::fetch_catalog;
use eazymart::session::Storefront;
use eazymart::store::{FileStore, KeyValueStore};
use eazymart::tls::build_http_client;
use eazymart::tui::event::{spawn_event_reader, spawn_tick_timer, update};
use eazymart::tui::{Action, App, Message, Tui, render, restore_terminal, setup_terminal};
use eazymart::{Result, StoreError};

const LOG_FILE: &str = "eazymart.log";
const TICK_MS: u64 = 250;

/// Handles shared by background tasks.
struct Services {
    tx: mpsc::UnboundedSender<Message>,
    client: reqwest::Client,
    inventory_url: String,
    timeout: Duration,
    gateway: Arc<HttpGateway>,
    geocoder: Option<Arc<dyn Geocoder>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let app_config = fetch_config()?;
    let store = FileStore::open(&app_config.data_dir)?;
    init_logging(&app_config)?;

    let client = build_http_client(app_config.endpoints.ca_bundle.as_deref())?;
    let store: Arc<dyn KeyValueStore> = Arc::new(store);
    let storefront = Storefront::open(store, app_config.rules.clone())?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let endpoints = &app_config.endpoints;
    let services = Services {
        tx: tx.clone(),
        client: client.clone(),
        inventory_url: endpoints.inventory_url.clone(),
        timeout: endpoints.timeout,
        gateway: Arc::new(HttpGateway::new(
            client.clone(),
            &endpoints.order_url,
            endpoints.timeout,
        )),
        geocoder: endpoints.geocoder_url.as_deref().map(|url| {
            Arc::new(HttpGeocoder::new(client.clone(), url, endpoints.timeout)) as Arc<dyn Geocoder>
        }),
    };
    if services.geocoder.is_none() {
        info!("no geocoder configured; delivery orders need a map pin");
    }

    spawn_catalog_fetch(&services);

    let mut terminal = setup_terminal()?;
    spawn_event_reader(tx.clone());
    spawn_tick_timer(tx, TICK_MS);

    let mut app = App::new(storefront);
    let result = run(&mut terminal, &mut app, &mut rx, &services).await;
    restore_terminal(&mut terminal)?;
    if let Err(ref e) = result {
        error!(error = %e, "storefront exited with an error");
    }
    result
}

/// Writes logs to a file in the data directory so they do not corrupt the
/// terminal. Filtered by `RUST_LOG`, `eazymart=info` by default.
fn init_logging(app_config: &AppConfig) -> Result<()> {
    let path = app_config.data_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| StoreError::Io(format!("failed to open {}: {e}", path.display())))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("eazymart=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run(
    terminal: &mut Tui,
    app: &mut App,
    rx: &mut mpsc::UnboundedReceiver<Message>,
    services: &Services,
) -> Result<()> {
    while !app.should_quit {
        terminal
            .draw(|frame| render(frame, app))
            .map_err(|e| StoreError::Io(format!("failed to draw: {e}")))?;

        let Some(message) = rx.recv().await else {
            break;
        };
        if let Some(action) = update(app, message) {
            dispatch(action, services);
        }
    }
    Ok(())
}

fn dispatch(action: Action, services: &Services) {
    match action {
        Action::ReloadCatalog => spawn_catalog_fetch(services),
        Action::Submit(pending) => {
            let tx = services.tx.clone();
            let gateway = services.gateway.clone();
            let geocoder = services.geocoder.clone();
            tokio::spawn(async move {
                let outcome = pending.run(geocoder.as_deref(), gateway.as_ref()).await;
                let _ = tx.send(Message::CheckoutFinished(outcome));
            });
        }
    }
}

fn spawn_catalog_fetch(services: &Services) {
    let tx = services.tx.clone();
    let client = services.client.clone();
    let url = services.inventory_url.clone();
    let timeout = services.timeout;
    tokio::spawn(async move {
        let message = match fetch_catalog(&client, &url, timeout).await {
            Ok(catalog) => Message::CatalogLoaded(catalog),
            Err(e) => Message::CatalogFailed(e.to_string()),
        };
        let _ = tx.send(message);
    });
}
