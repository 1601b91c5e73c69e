//! Cart, pricing, and persistence behavior through the storefront session.

mod common;

use std::sync::Arc;

use rust_decimal_macros::dec;
use tokio_test::assert_ok;

use eazymart::cart::QuantityChange;
use eazymart::models::{NewItem, OrderType};
use eazymart::session::StorefrontEvent;
use eazymart::store::{FileStore, KeyValueStore};

use common::{FlakyStore, storefront, storefront_with};

#[test]
fn repeated_adds_merge_into_one_line() {
    let mut storefront = storefront();
    for _ in 0..3 {
        assert_ok!(storefront.add_from_catalog("toor-dal-1kg"));
    }
    assert_ok!(storefront.add_from_catalog("rice-5kg"));

    let lines = storefront.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].id, "toor-dal-1kg");
    assert_eq!(lines[0].quantity, 3);
    assert_eq!(storefront.badge_count(), 4);
}

#[test]
fn decrement_to_zero_removes_line() {
    let mut storefront = storefront();
    assert_ok!(storefront.add_from_catalog("rice-5kg"));
    assert_ok!(storefront.add_from_catalog("toor-dal-1kg"));

    let change = assert_ok!(storefront.update_quantity(0, -1));
    assert_eq!(change, QuantityChange::Removed);
    assert_eq!(storefront.lines().len(), 1);
    assert_eq!(storefront.lines()[0].id, "toor-dal-1kg");
}

#[test]
fn quantity_above_catalog_stock_is_rejected() {
    let mut storefront = storefront();
    assert_ok!(storefront.add_from_catalog("rice-5kg"));
    assert_ok!(storefront.update_quantity(0, 2));

    let change = assert_ok!(storefront.update_quantity(0, 1));
    assert_eq!(
        change,
        QuantityChange::Rejected {
            name: "Sona Masoori Rice 5kg".to_string(),
            max: 3
        }
    );
    assert_eq!(storefront.lines()[0].quantity, 3);
}

#[test]
fn unknown_stock_uses_default_ceiling() {
    let mut storefront = storefront();
    assert_ok!(storefront.add_item(&NewItem::new("loose-item", "Loose Item", dec!(10))));

    assert_eq!(
        assert_ok!(storefront.update_quantity(0, 998)),
        QuantityChange::Updated(999)
    );
    assert!(matches!(
        assert_ok!(storefront.update_quantity(0, 1)),
        QuantityChange::Rejected { max: 999, .. }
    ));
}

#[test]
fn out_of_range_index_is_a_no_op() {
    let mut storefront = storefront();
    assert_ok!(storefront.add_from_catalog("rice-5kg"));

    assert_eq!(
        assert_ok!(storefront.update_quantity(5, 1)),
        QuantityChange::NoSuchLine
    );
    assert!(!assert_ok!(storefront.remove_line(5)));
    assert!(!assert_ok!(storefront.set_special_request(5, "x")));
    assert_eq!(storefront.badge_count(), 1);
}

#[test]
fn promo_on_500_delivery_totals_480() {
    let mut storefront = storefront();
    assert_ok!(storefront.add_from_catalog("rice-5kg"));
    assert_ok!(storefront.update_quantity(0, 1));

    assert!(storefront.apply_promo("EAZY10"));
    let totals = storefront.totals();
    assert_eq!(totals.subtotal, dec!(500));
    assert_eq!(totals.delivery_fee, dec!(30));
    assert_eq!(totals.discount, dec!(50));
    assert_eq!(totals.total, dec!(480));

    assert!(!storefront.apply_promo("EAZY20"));
    assert_eq!(storefront.totals().discount, dec!(0));
    assert_eq!(storefront.totals().total, dec!(530));
}

#[test]
fn totals_are_idempotent() {
    let mut storefront = storefront();
    assert_ok!(storefront.add_from_catalog("toor-dal-1kg"));
    storefront.set_order_type(OrderType::Pickup);
    let first = storefront.totals();
    assert_eq!(first, storefront.totals());
    assert_eq!(first.total, first.subtotal + first.delivery_fee - first.discount);
    assert_eq!(first.total, dec!(145.50));
}

#[test]
fn subscribers_see_badge_updates() {
    let mut storefront = storefront();
    let mut events = storefront.subscribe();

    assert_ok!(storefront.add_from_catalog("rice-5kg"));
    assert_ok!(storefront.add_from_catalog("rice-5kg"));

    let badges: Vec<u32> = std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|e| match e {
            StorefrontEvent::CartChanged { badge, .. } => Some(badge),
            _ => None,
        })
        .collect();
    assert_eq!(badges, vec![1, 2]);
}

#[test]
fn cart_survives_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
        let mut storefront = storefront_with(store);
        assert_ok!(storefront.add_from_catalog("rice-5kg"));
        assert_ok!(storefront.set_special_request(0, "Please pack in a cloth bag"));
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let storefront = storefront_with(store);
    assert_eq!(storefront.lines().len(), 1);
    assert_eq!(
        storefront.lines()[0].special_request,
        "Please pack in a cloth bag"
    );

    let raw = std::fs::read_to_string(dir.path().join("eazymartCart.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["id"], "rice-5kg");
    assert_eq!(value[0]["specialRequest"], "Please pack in a cloth bag");
}

#[test]
fn failed_write_leaves_cart_unchanged() {
    let store = Arc::new(FlakyStore::default());
    let mut storefront = storefront_with(store.clone());
    assert_ok!(storefront.add_from_catalog("rice-5kg"));

    store.set_read_only(true);
    assert!(storefront.add_from_catalog("rice-5kg").is_err());
    assert!(storefront.remove_line(0).is_err());
    assert_eq!(storefront.badge_count(), 1);

    store.set_read_only(false);
    let reopened = storefront_with(store);
    assert_eq!(reopened.lines(), storefront.lines());
}
