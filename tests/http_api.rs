use std::time::Duration;

use httpmock::MockServer;
use itembank::application::repos::{ApiError, ItemsApi};
use itembank::cache::ItemFilter;
use itembank::config::ApiSettings;
use itembank::domain::types::{ItemStatus, ItemType, Scope};
use itembank::infra::http_api::HttpItemsApi;
use itembank_api_types::{
    Difficulty, ItemPayload, ListItemsResponse, MutationResponse, PurgeResponse,
};
use serde_json::json;
use time::macros::datetime;
use url::Url;
use uuid::Uuid;

fn client(server: &MockServer) -> HttpItemsApi {
    let settings = ApiSettings {
        base_url: Url::parse(&server.url("/api/")).expect("mock url"),
        timeout: Duration::from_secs(5),
        organization_id: None,
    };
    HttpItemsApi::new(&settings).expect("client")
}

fn payload(id: Uuid, organization_id: Option<Uuid>, deleted: bool) -> ItemPayload {
    ItemPayload {
        id,
        item_type: ItemType::TrueFalse,
        status: ItemStatus::Published,
        difficulty: Difficulty::Easy,
        tags: vec!["cells".to_string()],
        statement: json!("Cells have a nucleus"),
        structure: json!({ "kind": "true_false" }),
        resolution: None,
        organization_id,
        created_at: datetime!(2025-03-03 09:00 UTC),
        updated_at: None,
        deleted_at: deleted.then_some(datetime!(2025-03-04 10:00 UTC)),
    }
}

#[tokio::test]
async fn list_sends_filters_and_window() {
    let server = MockServer::start();
    let organization = Uuid::new_v4();
    let id = Uuid::new_v4();
    let body = serde_json::to_string(&ListItemsResponse {
        items: vec![payload(id, Some(organization), false)],
        total: 31,
    })
    .expect("body");
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/api/items")
            .query_param("organizationId", organization.to_string())
            .query_param("type", "true_false")
            .query_param("search", "cells")
            .query_param("showDeleted", "false")
            .query_param("limit", "30")
            .query_param("offset", "30");
        then.status(200)
            .header("content-type", "application/json")
            .body(body);
    });

    let request = ItemFilter::new(
        Scope::Organization(organization),
        Some(ItemType::TrueFalse),
        None,
        Some("cells"),
        false,
    )
    .window(30, 30)
    .to_request();
    let page = client(&server).list_items(&request).await.expect("list");

    mock.assert();
    assert_eq!(page.total, 31);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, id);
    assert_eq!(page.items[0].scope, Scope::Organization(organization));
    assert!(!page.items[0].is_deleted());
}

#[tokio::test]
async fn delete_posts_ids_and_decodes_items() {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    let body = serde_json::to_string(&MutationResponse {
        count: 1,
        items: vec![payload(id, None, true)],
    })
    .expect("body");
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/api/items/delete")
            .json_body_includes(format!(r#"{{"ids":["{id}"]}}"#));
        then.status(200)
            .header("content-type", "application/json")
            .body(body);
    });

    let outcome = client(&server).delete_many(&[id]).await.expect("delete");

    mock.assert();
    assert_eq!(outcome.count, 1);
    assert!(outcome.items[0].is_deleted());
}

#[tokio::test]
async fn permanent_delete_returns_count() {
    let server = MockServer::start();
    let body = serde_json::to_string(&PurgeResponse { count: 2 }).expect("body");
    let mock = server.mock(|when, then| {
        when.method("POST").path("/api/items/permanent-delete");
        then.status(200)
            .header("content-type", "application/json")
            .body(body);
    });

    let count = client(&server)
        .permanent_delete(&[Uuid::new_v4(), Uuid::new_v4()])
        .await
        .expect("purge");

    mock.assert();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn error_statuses_map_to_error_kinds() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/api/items/delete");
        then.status(403)
            .header("content-type", "application/json")
            .body(r#"{"code":"forbidden","message":"editor role required"}"#);
    });
    server.mock(|when, then| {
        when.method("POST").path("/api/items/restore");
        then.status(404).body("no trashed items");
    });

    let api = client(&server);
    let err = api.delete_many(&[Uuid::new_v4()]).await.expect_err("forbidden");
    assert_eq!(err, ApiError::permission("editor role required"));

    let err = api.restore(&[Uuid::new_v4()]).await.expect_err("missing");
    assert_eq!(err, ApiError::not_found("no trashed items"));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/items");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"items":"nope"}"#);
    });

    let request = ItemFilter::active(Scope::Personal).window(30, 0).to_request();
    let err = client(&server)
        .list_items(&request)
        .await
        .expect_err("bad body");
    assert!(matches!(err, ApiError::Decode { .. }));
}
