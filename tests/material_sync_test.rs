mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use effibuild_api::auth::consts as perm;
use effibuild_api::entities::material::{Column as MaterialColumn, Entity as MaterialEntity};
use effibuild_api::entities::material_price_history::{
    Column as HistoryColumn, Entity as HistoryEntity,
};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

#[tokio::test]
async fn first_sync_inserts_material_and_initial_history() {
    let app = TestApp::new().await;
    app.supplier.set_price("SKU-1001", dec!(19.99));
    let token = app.token_with_permissions(&[perm::MATERIALS_SYNC]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/materials/sync",
            Some(&token),
            Some(json!({"sku": "SKU-1001"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"], "inserted");

    let material = MaterialEntity::find()
        .filter(MaterialColumn::SupplierSku.eq("SKU-1001"))
        .one(&*app.state.db)
        .await
        .unwrap()
        .expect("material should have been created");
    assert_eq!(material.unit_price, dec!(19.99));
    assert_eq!(material.supplier, "lowes");
    assert!(material.last_sync.is_some());

    let history = HistoryEntity::find()
        .filter(HistoryColumn::MaterialId.eq(material.id))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(history, 1);
}

#[tokio::test]
async fn unchanged_price_writes_no_history() {
    let app = TestApp::new().await;
    app.supplier.set_price("SKU-2002", dec!(45.50));
    let token = app.token_with_permissions(&[perm::MATERIALS_SYNC]);

    for _ in 0..2 {
        let response = app
            .request(
                Method::POST,
                "/api/v1/materials/sync",
                Some(&token),
                Some(json!({"sku": "SKU-2002"})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let material = MaterialEntity::find()
        .filter(MaterialColumn::SupplierSku.eq("SKU-2002"))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();

    // Two syncs at an unchanged price leave exactly the initial history row
    let history = HistoryEntity::find()
        .filter(HistoryColumn::MaterialId.eq(material.id))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(history, 1);
}

#[tokio::test]
async fn price_change_updates_material_and_appends_history() {
    let app = TestApp::new().await;
    app.supplier.set_price("SKU-3003", dec!(10.00));
    let token = app.token_with_permissions(&[perm::MATERIALS_SYNC, perm::ESTIMATES_READ]);

    app.request(
        Method::POST,
        "/api/v1/materials/sync",
        Some(&token),
        Some(json!({"sku": "SKU-3003"})),
    )
    .await;

    app.supplier.set_price("SKU-3003", dec!(12.25));
    let response = app
        .request(
            Method::POST,
            "/api/v1/materials/sync",
            Some(&token),
            Some(json!({"sku": "SKU-3003"})),
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"], "updated");

    let material = MaterialEntity::find()
        .filter(MaterialColumn::SupplierSku.eq("SKU-3003"))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(material.unit_price, dec!(12.25));

    let history = HistoryEntity::find()
        .filter(HistoryColumn::MaterialId.eq(material.id))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(history, 2);

    // The price-history endpoint reflects both observations
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/materials/{}/price-history", material.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_sku_surfaces_supplier_error() {
    let app = TestApp::new().await;
    let token = app.token_with_permissions(&[perm::MATERIALS_SYNC]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/materials/sync",
            Some(&token),
            Some(json!({"sku": "SKU-MISSING"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn batch_sync_isolates_per_sku_failures() {
    let app = TestApp::new().await;
    let token = app.token_with_permissions(&[perm::MATERIALS_SYNC]);

    // Seed two supplier-backed materials, then break one of them
    app.supplier.set_price("SKU-OK", dec!(5.00));
    app.supplier.set_price("SKU-GONE", dec!(7.00));
    for sku in ["SKU-OK", "SKU-GONE"] {
        app.request(
            Method::POST,
            "/api/v1/materials/sync",
            Some(&token),
            Some(json!({"sku": sku})),
        )
        .await;
    }
    app.supplier.prices.lock().unwrap().remove("SKU-GONE");
    app.supplier.set_price("SKU-OK", dec!(6.00));

    let response = app
        .request(Method::POST, "/api/v1/materials/sync-all", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["synced"], 1);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["unchanged"], 0);
}

#[tokio::test]
async fn search_matches_name_and_category() {
    let app = TestApp::new().await;
    let token = app.token_with_permissions(&[perm::MATERIALS_SYNC, perm::ESTIMATES_READ]);
    app.supplier.set_price("SKU-4004", dec!(3.25));
    app.request(
        Method::POST,
        "/api/v1/materials/sync",
        Some(&token),
        Some(json!({"sku": "SKU-4004"})),
    )
    .await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/materials/search?query=SKU-4004",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = app
        .request(
            Method::GET,
            "/api/v1/materials/search?query=SKU-4004&category=plumbing",
            Some(&token),
            None,
        )
        .await;
    let body = body_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}
