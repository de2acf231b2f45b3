mod common;

use axum::http::{Method, StatusCode};
use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn products_are_listed_with_string_prices() {
    let app = spawn_app().await;

    let response = app.get("/products").await;

    assert_eq!(response.status, StatusCode::OK);
    let products = response.body.as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["slug"], "wireless-headphones");
    assert_eq!(products[0]["price"], "10.00");
}

#[tokio::test]
async fn product_detail_by_slug() {
    let app = spawn_app().await;

    let found = app.get("/product_detail/wireless-headphones").await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body["name"], "Wireless Headphones");
    assert_eq!(found.body["similar_products"], json!([]));

    let missing = app.get("/product_detail/nothing-here").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn adding_twice_increments_one_line() {
    let app = spawn_app().await;

    let first = app.add_item("cart-abc").await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["data"]["quantity"], 1);

    let second = app.add_item("cart-abc").await;
    assert_eq!(second.body["data"]["quantity"], 2);
    assert_eq!(second.body["data"]["id"], first.body["data"]["id"]);
    assert_eq!(second.body["data"]["total"], "20.00");

    let cart = app.get("/get_cart/?cart_code=cart-abc").await;
    assert_eq!(cart.status, StatusCode::OK);
    assert_eq!(cart.body["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart.body["sum_total"], "20.00");
    assert_eq!(cart.body["num_of_items"], 2);

    let stat = app.get("/get_cart_stat/?cart_code=cart-abc").await;
    assert_eq!(stat.status, StatusCode::OK);
    assert_eq!(stat.body["num_of_items"], 2);
}

#[tokio::test]
async fn adding_unknown_product_is_not_found() {
    let app = spawn_app().await;

    let response = app
        .post(
            "/add_item/",
            json!({ "cart_code": "cart-abc", "product_id": uuid::Uuid::new_v4() }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn quantity_below_one_is_rejected_and_nothing_changes() {
    let app = spawn_app().await;
    let added = app.add_item("cart-abc").await;
    let item_id = added.body["data"]["id"].clone();

    for quantity in [0, -3] {
        let response = app
            .request(
                Method::PATCH,
                "/update_quantity/",
                Some(json!({ "item_id": item_id, "quantity": quantity })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    let cart = app.get("/get_cart/?cart_code=cart-abc").await;
    assert_eq!(cart.body["items"][0]["quantity"], 1);

    let updated = app
        .request(
            Method::PATCH,
            "/update_quantity/",
            Some(json!({ "item_id": item_id, "quantity": 4 })),
            None,
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["data"]["total"], "40.00");
}

#[tokio::test]
async fn product_in_cart_and_delete() {
    let app = spawn_app().await;
    let product_id = app.product.product_id;
    let added = app.add_item("cart-abc").await;

    let check = app
        .get(&format!(
            "/product_in_cart/?cart_code=cart-abc&product_id={}",
            product_id
        ))
        .await;
    assert_eq!(check.body["product_in_cart"], true);

    let deleted = app
        .post(
            "/delete_cartitem/",
            json!({ "item_id": added.body["data"]["id"] }),
        )
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let check = app
        .get(&format!(
            "/product_in_cart/?cart_code=cart-abc&product_id={}",
            product_id
        ))
        .await;
    assert_eq!(check.body["product_in_cart"], false);

    let again = app
        .post(
            "/delete_cartitem/",
            json!({ "item_id": added.body["data"]["id"] }),
        )
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_cart_reads_as_empty() {
    let app = spawn_app().await;

    let cart = app.get("/get_cart/?cart_code=never-used").await;
    assert_eq!(cart.status, StatusCode::OK);
    assert_eq!(cart.body["sum_total"], "0.00");
    assert_eq!(cart.body["items"], json!([]));

    let stat = app.get("/get_cart_stat/?cart_code=never-used").await;
    assert_eq!(stat.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_cart_code_fails_validation() {
    let app = spawn_app().await;

    let response = app
        .post(
            "/add_item/",
            json!({ "cart_code": "", "product_id": app.product.product_id }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}
