//! End-to-end checkout flows against an in-process order gateway.

mod common;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use eazymart::checkout::{CheckoutError, CheckoutForm, CheckoutPhase, FormField, GeofenceError};
use eazymart::gateway::{GatewayError, HttpGateway};
use eazymart::models::{OrderStatus, OrderType};
use eazymart::session::{Storefront, StorefrontEvent};
use eazymart::store::MemoryStore;

use common::{FakeGateway, FlakyStore, delivery_form, fixture, geocoder, storefront};

fn fill_cart(storefront: &mut Storefront) {
    assert_ok!(storefront.add_from_catalog("rice-5kg"));
    assert_ok!(storefront.add_from_catalog("rice-5kg"));
}

#[tokio::test]
async fn enveloped_success_confirms_and_clears_cart() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    let gateway = FakeGateway::replying(fixture(common::SUBMIT_ENVELOPED_JSON));
    let geocoder = geocoder();

    let order = assert_ok!(
        storefront
            .submit_order(delivery_form(), Some(&geocoder), &gateway)
            .await
    );

    assert_eq!(order.external_receipt_id.as_deref(), Some("0008"));
    assert_eq!(order.order_status, OrderStatus::Confirmed);
    assert_eq!(gateway.calls(), 1);
    assert_eq!(storefront.orders().len(), 1);
    assert!(storefront.lines().is_empty());
    assert_eq!(storefront.badge_count(), 0);
    assert!(storefront.in_flight().is_none());
    assert_eq!(
        storefront.find_order(&order.order_id).unwrap().external_receipt_id.as_deref(),
        Some("0008")
    );
}

#[tokio::test]
async fn submitted_order_carries_snapshot_and_location() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    storefront.apply_promo("EAZY10");
    let gateway = FakeGateway::replying(fixture(common::SUBMIT_PLAIN_JSON));
    let geocoder = geocoder();

    assert_ok!(
        storefront
            .submit_order(delivery_form(), Some(&geocoder), &gateway)
            .await
    );

    let sent = gateway.submitted();
    assert_eq!(sent.len(), 1);
    let order = &sent[0];
    assert_eq!(order.order_type, OrderType::Delivery);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 2);
    assert_eq!(order.subtotal, dec!(500));
    assert_eq!(order.delivery_fee, dec!(30));
    assert_eq!(order.discount, dec!(50));
    assert_eq!(order.total, dec!(480));
    assert_eq!(order.promo_code, "EAZY10");
    assert_eq!(order.special_instructions, "None");
    assert_eq!(order.location.address, common::NEAR_ADDRESS);
    assert_eq!(order.location.latitude, Some(common::near_point().lat));
    assert_eq!(order.order_status, OrderStatus::Received);

    // Promo resets after a confirmed order.
    assert_eq!(storefront.promo_code(), "");
}

#[tokio::test]
async fn delivery_twelve_km_away_never_reaches_gateway() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    let mut events = storefront.subscribe();
    let gateway = FakeGateway::replying(fixture(common::SUBMIT_PLAIN_JSON));
    let geocoder = geocoder();
    let form = CheckoutForm {
        address: common::FAR_ADDRESS.to_string(),
        ..delivery_form()
    };

    let err = assert_err!(storefront.submit_order(form, Some(&geocoder), &gateway).await);

    match err {
        CheckoutError::Geofence(GeofenceError::OutOfRange { distance_km, .. }) => {
            assert!(distance_km > 11.5 && distance_km < 12.5, "got {distance_km}");
        }
        other => panic!("expected out of range, got {other:?}"),
    }
    assert_eq!(gateway.calls(), 0);
    assert_eq!(storefront.badge_count(), 2);
    assert!(storefront.orders().is_empty());
    assert!(storefront.in_flight().is_none());

    let mut saw_out_of_range = false;
    while let Ok(event) = events.try_recv() {
        saw_out_of_range |= matches!(event, StorefrontEvent::OutOfRange { .. });
    }
    assert!(saw_out_of_range);
}

#[tokio::test]
async fn pickup_skips_geofence_and_address() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    storefront.set_order_type(OrderType::Pickup);
    let gateway = FakeGateway::replying(fixture(common::SUBMIT_PLAIN_JSON));
    let form = CheckoutForm {
        address: String::new(),
        ..delivery_form()
    };

    let order = assert_ok!(storefront.submit_order(form, None, &gateway).await);

    assert_eq!(order.delivery_fee, dec!(0));
    assert_eq!(order.total, dec!(500));
    assert_eq!(order.location.latitude, None);
    assert_eq!(order.location.address, "EAZYMART, Chilakaluripet, Guntur");
    assert_eq!(order.external_receipt_id.as_deref(), Some("1-1042"));
}

#[tokio::test]
async fn empty_cart_is_refused_without_network() {
    let mut storefront = storefront();
    let gateway = FakeGateway::replying(fixture(common::SUBMIT_PLAIN_JSON));

    let err = assert_err!(
        storefront
            .submit_order(delivery_form(), Some(&geocoder()), &gateway)
            .await
    );

    assert_eq!(err, CheckoutError::EmptyOrder);
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn zero_total_is_refused_without_network() {
    let mut storefront = storefront();
    // The curd fixture has an unparseable price, which normalizes to zero.
    assert_ok!(storefront.add_from_catalog("curd-400g"));
    storefront.set_order_type(OrderType::Pickup);
    let gateway = FakeGateway::replying(fixture(common::SUBMIT_PLAIN_JSON));

    let err = assert_err!(storefront.submit_order(delivery_form(), None, &gateway).await);

    assert_eq!(err, CheckoutError::NonPositiveTotal);
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn missing_fields_are_all_reported() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    let gateway = FakeGateway::replying(fixture(common::SUBMIT_PLAIN_JSON));

    let err = assert_err!(
        storefront
            .submit_order(CheckoutForm::default(), Some(&geocoder()), &gateway)
            .await
    );

    match err {
        CheckoutError::Validation(v) => assert_eq!(
            v.missing,
            vec![
                FormField::CustomerName,
                FormField::CustomerPhone,
                FormField::DeliveryAddress
            ]
        ),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn application_failure_keeps_cart() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    let gateway = FakeGateway::replying(fixture(common::SUBMIT_FAILURE_JSON));

    let err = assert_err!(
        storefront
            .submit_order(delivery_form(), Some(&geocoder()), &gateway)
            .await
    );

    assert_eq!(
        err,
        CheckoutError::Application("Item out of stock at POS".to_string())
    );
    assert_eq!(gateway.calls(), 1);
    assert_eq!(storefront.badge_count(), 2);
    assert!(storefront.orders().is_empty());
}

#[tokio::test]
async fn failure_without_message_says_sync_failed() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    let gateway = FakeGateway::replying(json!({"status": "failed"}));

    let err = assert_err!(
        storefront
            .submit_order(delivery_form(), Some(&geocoder()), &gateway)
            .await
    );
    assert_eq!(err.to_string(), "Sync failed");
}

#[tokio::test]
async fn http_error_is_a_network_failure() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    let gateway = FakeGateway::failing(GatewayError::Status {
        status: 502,
        message: "No JSON response from server.".to_string(),
    });

    let err = assert_err!(
        storefront
            .submit_order(delivery_form(), Some(&geocoder()), &gateway)
            .await
    );

    assert!(matches!(err, CheckoutError::Network(GatewayError::Status { status: 502, .. })));
    assert!(err.to_string().contains("No JSON response from server."));
    assert_eq!(storefront.badge_count(), 2);
}

#[tokio::test]
async fn malformed_envelope_is_a_protocol_error() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    let gateway = FakeGateway::replying(json!({"statusCode": 200, "body": "<html>oops"}));

    let err = assert_err!(
        storefront
            .submit_order(delivery_form(), Some(&geocoder()), &gateway)
            .await
    );

    assert_eq!(err.to_string(), "Invalid response format from server.");
    assert!(matches!(err, CheckoutError::Protocol(_)));
}

#[tokio::test]
async fn non_json_success_body_is_a_protocol_error() {
    let url = common::serve_once(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html\r\n\
         Content-Length: 33\r\n\
         Connection: close\r\n\
         \r\n\
         <html>gateway timeout page</html>",
    )
    .await;
    let client = reqwest::Client::builder().build().unwrap();
    let gateway = HttpGateway::new(client, &url, Duration::from_secs(5));
    let mut storefront = storefront();
    fill_cart(&mut storefront);

    let err = assert_err!(
        storefront
            .submit_order(delivery_form(), Some(&geocoder()), &gateway)
            .await
    );

    assert!(matches!(err, CheckoutError::Protocol(_)), "got {err:?}");
    assert_eq!(err.to_string(), "Invalid response format from server.");
    assert_eq!(storefront.badge_count(), 2);
    assert!(storefront.orders().is_empty());
}

#[tokio::test]
async fn unreadable_gateway_body_is_a_protocol_error() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    let gateway = FakeGateway::failing(GatewayError::InvalidBody("expected value".to_string()));

    let err = assert_err!(
        storefront
            .submit_order(delivery_form(), Some(&geocoder()), &gateway)
            .await
    );
    assert!(matches!(err, CheckoutError::Protocol(_)));
}

#[tokio::test]
async fn missing_status_is_a_protocol_error() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    let gateway = FakeGateway::replying(json!({"receipt_number": "0009"}));

    let err = assert_err!(
        storefront
            .submit_order(delivery_form(), Some(&geocoder()), &gateway)
            .await
    );
    assert!(matches!(err, CheckoutError::Protocol(_)));
    assert!(storefront.orders().is_empty());
}

#[tokio::test]
async fn success_without_receipt_records_placeholder() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    let gateway = FakeGateway::replying(json!({"status": "success"}));

    let order = assert_ok!(
        storefront
            .submit_order(delivery_form(), Some(&geocoder()), &gateway)
            .await
    );
    assert_eq!(order.external_receipt_id.as_deref(), Some("N/A"));
}

#[tokio::test]
async fn spawned_checkout_allows_cart_edits_and_refuses_reentry() {
    let mut storefront = storefront();
    fill_cart(&mut storefront);
    let gateway = Arc::new(FakeGateway::replying(fixture(common::SUBMIT_ENVELOPED_JSON)));

    let pending = assert_ok!(storefront.begin_checkout(delivery_form()));
    let order_id = pending.order_id().to_string();

    let task = {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            let geocoder = geocoder();
            pending.run(Some(&geocoder), gateway.as_ref()).await
        })
    };

    // Re-entrant submit is refused while the first is in flight.
    assert_eq!(
        storefront.begin_checkout(delivery_form()).unwrap_err(),
        CheckoutError::SubmissionInFlight
    );
    // Cart actions are still allowed.
    assert_ok!(storefront.add_from_catalog("toor-dal-1kg"));

    let outcome = task.await.unwrap();
    assert_eq!(outcome.order_id, order_id);
    assert_eq!(outcome.phase, CheckoutPhase::Confirmed);

    let order = assert_ok!(storefront.finish_checkout(outcome));
    // The submitted snapshot predates the later add.
    assert_eq!(order.items.len(), 1);
    assert!(storefront.lines().is_empty());
    assert!(storefront.in_flight().is_none());
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn ledger_write_failure_is_reported_after_confirmation() {
    let store = Arc::new(FlakyStore::default());
    let mut storefront = common::storefront_with(store.clone());
    fill_cart(&mut storefront);
    let gateway = FakeGateway::replying(fixture(common::SUBMIT_ENVELOPED_JSON));

    store.set_read_only(true);
    let err = assert_err!(
        storefront
            .submit_order(delivery_form(), Some(&geocoder()), &gateway)
            .await
    );

    assert!(matches!(err, CheckoutError::Storage(_)));
    assert_eq!(gateway.calls(), 1);
    assert!(storefront.orders().is_empty());
}

#[tokio::test]
async fn confirmed_orders_survive_restart() {
    let store = Arc::new(MemoryStore::new());
    let order_id = {
        let mut storefront = common::storefront_with(store.clone());
        fill_cart(&mut storefront);
        let gateway = FakeGateway::replying(fixture(common::SUBMIT_ENVELOPED_JSON));
        let order = assert_ok!(
            storefront
                .submit_order(delivery_form(), Some(&geocoder()), &gateway)
                .await
        );
        order.order_id
    };

    let reopened = common::storefront_with(store);
    assert!(reopened.lines().is_empty());
    let found = reopened.find_order(&order_id).unwrap();
    assert_eq!(found.external_receipt_id.as_deref(), Some("0008"));
    assert!(reopened.find_order("AA-00000000").is_none());
}
