//! Runs against a real PostgreSQL when `TEST_DATABASE_URL` is set;
//! otherwise each test returns early.

use chrono::Utc;
use rust_decimal_macros::dec;
use shop_service::models::{PaymentProvider, Product, Transaction, TransactionStatus, User};
use shop_service::store::{PgStore, Settlement, ShopStore, StoreError};
use uuid::Uuid;

async fn store() -> Option<PgStore> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let store = PgStore::connect(&url, 2, 1)
        .await
        .expect("Failed to connect to TEST_DATABASE_URL");
    store.run_migrations().await.expect("Failed to migrate");
    Some(store)
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

fn product() -> Product {
    Product {
        product_id: Uuid::new_v4(),
        name: "Desk Lamp".to_string(),
        slug: unique("desk-lamp"),
        image: None,
        description: None,
        price: dec!(12.50),
        category: Some("Electronics".to_string()),
        created_utc: Utc::now(),
    }
}

fn user() -> User {
    User {
        user_id: Uuid::new_v4(),
        username: unique("user"),
        email: "pg@example.com".to_string(),
        password_hash: "hash".to_string(),
        first_name: None,
        last_name: None,
        phone: None,
        address: None,
        city: None,
        state: None,
        country: None,
        created_utc: Utc::now(),
    }
}

fn pending(cart_id: Uuid, user_id: Uuid) -> Transaction {
    let now = Utc::now();
    Transaction {
        transaction_id: Uuid::new_v4(),
        tx_ref: Uuid::new_v4().to_string(),
        provider: PaymentProvider::Flutterwave,
        provider_order_id: None,
        cart_id,
        user_id,
        amount: dec!(29.00),
        currency: "KES".to_string(),
        settlement_currency: "KES".to_string(),
        status: TransactionStatus::Pending,
        created_utc: now,
        modified_utc: now,
    }
}

#[tokio::test]
async fn cart_lines_upsert_and_quantity_check() {
    let Some(store) = store().await else {
        return;
    };
    let product = product();
    store.insert_product(&product).await.unwrap();

    let code = unique("cart");
    let cart = store.get_or_create_cart(&code).await.unwrap();
    assert_eq!(
        store.get_or_create_cart(&code).await.unwrap().cart_id,
        cart.cart_id
    );

    store
        .add_or_increment_item(cart.cart_id, product.product_id)
        .await
        .unwrap();
    let item = store
        .add_or_increment_item(cart.cart_id, product.product_id)
        .await
        .unwrap();
    assert_eq!(item.quantity, 2);

    let lines = store.list_cart_lines(cart.cart_id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product.price, dec!(12.50));

    // The CHECK constraint backs up the service rule.
    assert!(store.set_item_quantity(item.item_id, 0).await.is_err());
}

#[tokio::test]
async fn duplicate_slug_is_a_conflict() {
    let Some(store) = store().await else {
        return;
    };
    let first = product();
    store.insert_product(&first).await.unwrap();

    let mut second = product();
    second.slug = first.slug.clone();
    let err = store.insert_product(&second).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn settlement_is_atomic_and_single_winner() {
    let Some(store) = store().await else {
        return;
    };
    let product = product();
    store.insert_product(&product).await.unwrap();
    let buyer = user();
    store.insert_user(&buyer).await.unwrap();

    let cart = store.get_or_create_cart(&unique("cart")).await.unwrap();
    store
        .add_or_increment_item(cart.cart_id, product.product_id)
        .await
        .unwrap();

    let winner = pending(cart.cart_id, buyer.user_id);
    let loser = pending(cart.cart_id, buyer.user_id);
    store.insert_transaction(&winner).await.unwrap();
    store.insert_transaction(&loser).await.unwrap();

    let settled = store
        .settle_transaction(winner.transaction_id)
        .await
        .unwrap();
    assert!(matches!(settled, Settlement::Settled(_)));
    assert!(matches!(
        store
            .settle_transaction(winner.transaction_id)
            .await
            .unwrap(),
        Settlement::AlreadyCompleted(_)
    ));

    let err = store
        .settle_transaction(loser.transaction_id)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let cart = store
        .find_cart_by_code(&cart.cart_code)
        .await
        .unwrap()
        .unwrap();
    assert!(cart.paid);
    assert_eq!(cart.user_id, Some(buyer.user_id));

    let loser = store
        .find_transaction_by_ref(&loser.tx_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loser.status, TransactionStatus::Pending);

    let purchased = store
        .list_purchased_items(buyer.user_id, 10)
        .await
        .unwrap();
    assert_eq!(purchased.len(), 1);
    assert_eq!(purchased[0].order_id, cart.cart_code);
}
