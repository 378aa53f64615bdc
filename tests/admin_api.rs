mod common;

use axum::http::{Method, StatusCode};
use common::{create, get, post, send, test_app};
use serde_json::json;

#[tokio::test]
async fn root_redirects_to_admin() {
    let (app, _) = test_app().await;
    let (status, location, _) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location.as_deref(), Some("/admin/"));
}

#[tokio::test]
async fn admin_index_lists_views_in_registration_order() {
    let (app, _) = test_app().await;
    let (status, body) = get(&app, "/admin/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Inventory | Admin");
    let paths: Vec<&str> = body["data"]["views"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, ["sale", "supplier", "product", "tag", "staff"]);
}

#[tokio::test]
async fn unknown_view_is_not_found() {
    let (app, _) = test_app().await;
    let (status, body) = get(&app, "/admin/warehouse/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn duplicate_unique_values_conflict() {
    let (app, _) = test_app().await;
    create(&app, "supplier", json!({ "name": "Acme" })).await;
    let (status, body) = post(&app, "/admin/supplier/new/", json!({ "name": "Acme" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
    assert_eq!(body["error"]["message"], "unique constraint violated");
    assert_eq!(body["error"]["details"]["constraint"], "unique");
    assert_eq!(body["error"]["details"]["detail"], "UNIQUE constraint failed: supplier.name");

    create(&app, "product", json!({ "code": "P1", "name": "Bolt" })).await;
    let (status, _) = post(&app, "/admin/product/new/", json!({ "code": "P1", "name": "Other" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = post(&app, "/admin/product/new/", json!({ "code": "P2", "name": "Bolt" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn delete_is_rejected_where_disallowed() {
    let (app, _) = test_app().await;
    let supplier = create(&app, "supplier", json!({ "name": "Acme" })).await;
    let product = create(&app, "product", json!({ "code": "P1", "name": "Bolt", "supplier": supplier })).await;
    let sale = create(&app, "sale", json!({ "product": product, "quantity": 1 })).await;

    for (view, id) in [("supplier", supplier), ("product", product), ("sale", sale)] {
        let (status, _, body) = send(&app, Method::POST, &format!("/admin/{}/delete/?id={}", view, id), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", view);
        assert_eq!(body["error"]["code"], "action_disallowed");
        let (status, _) = get(&app, &format!("/admin/{}/details/?id={}", view, id)).await;
        assert_eq!(status, StatusCode::OK, "{} still present", view);
    }

    let tag = create(&app, "tag", json!({ "name": "red" })).await;
    let (status, _, _) = send(&app, Method::POST, &format!("/admin/tag/delete/?id={}", tag), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = get(&app, &format!("/admin/tag/details/?id={}", tag)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn staff_and_tag_deletes_respect_foreign_keys() {
    let (app, _) = test_app().await;
    let alice = create(&app, "staff", json!({ "name": "Alice" })).await;
    let bob = create(&app, "staff", json!({ "name": "Bob" })).await;
    let red = create(&app, "tag", json!({ "name": "red" })).await;
    let product = create(&app, "product", json!({ "code": "P1", "name": "Bolt", "tags": [red] })).await;
    create(&app, "sale", json!({ "product": product, "quantity": 1, "staff": alice })).await;

    let (status, _, body) = send(&app, Method::POST, &format!("/admin/staff/delete/?id={}", alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
    assert_eq!(body["error"]["message"], "foreign key constraint violated");
    assert_eq!(body["error"]["details"]["constraint"], "foreign_key");
    let (status, body) = get(&app, &format!("/admin/staff/details/?id={}", alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Alice");

    let (status, _, _) = send(&app, Method::POST, &format!("/admin/staff/delete/?id={}", bob), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = get(&app, &format!("/admin/staff/details/?id={}", bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(&app, Method::POST, &format!("/admin/staff/delete/?id={}", bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // junction rows go with the tag
    let (status, _, _) = send(&app, Method::POST, &format!("/admin/tag/delete/?id={}", red), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = get(&app, &format!("/admin/product/details/?id={}", product)).await;
    assert_eq!(body["data"]["tags"], json!([]));
}

#[tokio::test]
async fn exact_filters_narrow_the_list() {
    let (app, _) = test_app().await;
    let acme = create(&app, "supplier", json!({ "name": "Acme" })).await;
    let globex = create(&app, "supplier", json!({ "name": "Globex" })).await;
    create(&app, "product", json!({ "code": "P1", "name": "Bolt", "supplier": acme, "discontinued": true })).await;
    create(&app, "product", json!({ "code": "P2", "name": "Nut", "supplier": globex })).await;
    create(&app, "product", json!({ "code": "P3", "name": "Washer", "supplier": acme, "discontinued": false })).await;

    let (status, body) = get(&app, &format!("/admin/product/?flt_supplier_id={}&sort=code", acme)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 2);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Bolt", "Washer"]);

    let (_, body) = get(&app, &format!("/admin/product/?flt_supplier_id={}&flt_discontinued=true", acme)).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["name"], "Bolt");

    let (_, body) = get(&app, "/admin/product/?flt_supplier_id=999").await;
    assert_eq!(body["meta"]["total"], 0);
    let (_, body) = get(&app, "/admin/product/?flt_weight=3").await;
    assert_eq!(body["meta"]["total"], 3);
}

#[tokio::test]
async fn search_follows_relations() {
    let (app, _) = test_app().await;
    let acme = create(&app, "supplier", json!({ "name": "Acme" })).await;
    let globex = create(&app, "supplier", json!({ "name": "Globex" })).await;
    let red = create(&app, "tag", json!({ "name": "red" })).await;
    let blue = create(&app, "tag", json!({ "name": "blue" })).await;
    create(&app, "product", json!({ "code": "P1", "name": "Bolt", "supplier": acme, "tags": [red] })).await;
    create(&app, "product", json!({ "code": "P2", "name": "Nut", "supplier": globex, "tags": [blue, red] })).await;

    let (status, body) = get(&app, "/admin/product/?search=acme").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Bolt");
    assert_eq!(rows[0]["supplier"], "Acme");
    assert_eq!(rows[0]["tags"], json!(["red"]));

    let (_, body) = get(&app, "/admin/product/?search=blue").await;
    assert_eq!(body["data"][0]["name"], "Nut");
    assert_eq!(body["data"][0]["tags"], json!(["blue", "red"]));
    assert_eq!(body["meta"]["total"], 1);

    let (_, body) = get(&app, "/admin/product/?search=GLOBEX%20nut").await;
    assert_eq!(body["meta"]["total"], 1);
    let (_, body) = get(&app, "/admin/product/?search=acme%20nut").await;
    assert_eq!(body["meta"]["total"], 0);
    let (_, body) = get(&app, "/admin/product/?search=P2%20-%20Nut").await;
    assert_eq!(body["meta"]["total"], 1);
}

#[tokio::test]
async fn list_pages_sorts_and_formats() {
    let (app, _) = test_app().await;
    create(&app, "product", json!({ "code": "B", "name": "Beta", "list_price": 1500 })).await;
    create(&app, "product", json!({ "code": "A", "name": "Alpha", "list_price": "2.5" })).await;

    let (status, body) = get(&app, "/admin/product/?sort=name").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Alpha");
    assert_eq!(body["data"][1]["display"]["list_price"], "$1,500.00");
    assert_eq!(body["meta"], json!({ "count": 2, "total": 2, "page": 0, "page_size": 100, "pages": 1 }));
    assert!(body["data"][0].get("description").is_none());

    let (_, body) = get(&app, "/admin/product/?sort=name&desc=1").await;
    assert_eq!(body["data"][0]["name"], "Beta");

    let (_, body) = get(&app, "/admin/product/?page=1").await;
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["meta"]["total"], 2);
}

#[tokio::test]
async fn sale_requires_existing_product() {
    let (app, _) = test_app().await;
    let (status, body) = post(&app, "/admin/sale/new/", json!({ "quantity": 2 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, body) = post(&app, "/admin/sale/new/", json!({ "product": 42, "quantity": 2 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["message"], "validation: product: not a valid choice");
}

#[tokio::test]
async fn form_values_are_type_checked() {
    let (app, _) = test_app().await;
    for form in [
        json!({ "code": "P1", "quantity_per_unit": "a dozen" }),
        json!({ "code": "P1", "discontinued": "perhaps" }),
        json!({ "code": "P1", "fullname": "P1 - x" }),
        json!({ "code": "P1", "weight": 3 }),
        json!({ "code": "x".repeat(256) }),
    ] {
        let (status, _) = post(&app, "/admin/product/new/", form.clone()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", form);
    }
    let (status, _) = post(&app, "/admin/product/new/", json!(["not", "an", "object"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(&app, "/admin/product/new/", json!({ "code": "P3", "name": "X", "id": 99 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["message"], "validation: id is the primary key and cannot be set");
    let (_, body) = get(&app, "/admin/product/").await;
    assert_eq!(body["meta"]["total"], 0);
}

#[tokio::test]
async fn details_and_edit_round_trip_relations() {
    let (app, _) = test_app().await;
    let acme = create(&app, "supplier", json!({ "name": "Acme" })).await;
    let red = create(&app, "tag", json!({ "name": "red" })).await;
    let blue = create(&app, "tag", json!({ "name": "blue" })).await;
    let product = create(&app, "product", json!({ "code": "P1", "name": "Bolt", "supplier": acme, "tags": [red] })).await;

    let (status, body) = get(&app, &format!("/admin/product/details/?id={}", product)).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["fullname"], "P1 - Bolt");
    assert_eq!(data["supplier_id"], acme);
    assert_eq!(data["supplier"], "Acme");
    assert_eq!(data["tags"], json!([{ "id": red, "label": "red" }]));

    let uri = format!("/admin/product/edit/?id={}", product);
    let (status, body) = post(&app, &uri, json!({ "name": "Big Bolt", "tags": [blue], "supplier": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fullname"], "P1 - Big Bolt");
    assert_eq!(body["data"]["code"], "P1");
    assert_eq!(body["data"]["supplier"], json!(null));
    assert_eq!(body["data"]["tags"], json!([{ "id": blue, "label": "blue" }]));

    let (status, _) = post(&app, "/admin/product/edit/?id=999", json!({ "name": "Ghost" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&app, "/admin/product/details/?id=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn inline_edit_only_touches_editable_columns() {
    let (app, _) = test_app().await;
    let red = create(&app, "tag", json!({ "name": "red" })).await;
    let product = create(&app, "product", json!({ "code": "P1", "name": "Bolt" })).await;

    let (status, body) = post(
        &app,
        "/admin/product/ajax/update/",
        json!({ "id": product, "column": "initial_volume", "value": "40" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["initial_volume"], 40);

    let (status, body) = post(&app, "/admin/product/ajax/update/", json!({ "id": product, "column": "tags", "value": [red] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tags"][0]["label"], "red");

    let (status, _) = post(&app, "/admin/product/ajax/update/", json!({ "id": product, "column": "name", "value": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lookup_returns_relation_choices() {
    let (app, _) = test_app().await;
    let acme = create(&app, "supplier", json!({ "name": "Acme" })).await;
    create(&app, "supplier", json!({ "name": "Globex" })).await;

    let (status, body) = get(&app, "/admin/product/ajax/lookup/?name=supplier&query=ac").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([{ "id": acme, "label": "Acme" }]));
    assert_eq!(body["meta"]["count"], 1);

    let (_, body) = get(&app, "/admin/product/ajax/lookup/?name=supplier").await;
    assert_eq!(body["meta"]["count"], 2);

    let (status, _) = get(&app, "/admin/product/ajax/lookup/?name=code").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schema_describes_view() {
    let (app, _) = test_app().await;
    let (status, body) = get(&app, "/admin/sale/schema/").await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["actions"], json!({ "create": true, "edit": true, "delete": false }));
    assert_eq!(data["searchable"], json!(["product.fullname", "product.code", "date"]));
    let product_field = data["form_fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"] == "product")
        .unwrap();
    assert_eq!(product_field["type"], "to_one");
    assert_eq!(product_field["required"], true);
    assert!(data["form_fields"].as_array().unwrap().iter().all(|f| f["name"] != "sold_price"));
}

#[tokio::test]
async fn health_and_readiness() {
    let (app, _) = test_app().await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    let (status, body) = get(&app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
}
