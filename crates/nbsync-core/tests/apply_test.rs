#![allow(clippy::unwrap_used)]
// Integration tests for the apply engine and scoped cache using wiremock.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nbsync_api::{Endpoint, NetBoxClient, Object, Query};
use nbsync_core::{Action, Applier, CoreError, Resource, SiteCache};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Arc<NetBoxClient>) {
    let server = MockServer::start().await;
    let client = NetBoxClient::with_client(reqwest::Client::new(), &server.uri()).unwrap();
    (server, Arc::new(client))
}

fn page(results: Value) -> ResponseTemplate {
    let count = results.as_array().map_or(0, Vec::len);
    ResponseTemplate::new(200).set_body_json(json!({
        "count": count, "next": null, "results": results
    }))
}

fn object(value: Value) -> Object {
    value.as_object().cloned().unwrap()
}

fn site_lookup() -> Query {
    Query::new().eq("slug", "dc1")
}

// ── Apply ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_apply_creates_with_managed_tag() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .and(query_param("slug", "dc1"))
        .respond_with(page(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dcim/sites/"))
        .and(body_json(json!({"name": "DC1", "slug": "dc1", "tags": [7]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 3, "name": "DC1", "slug": "dc1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let applier = Applier::new(client, Some(7));
    let applied = applier
        .apply(
            Endpoint::Sites,
            &site_lookup(),
            object(json!({"name": "DC1", "slug": "dc1", "description": null})),
        )
        .await
        .unwrap();

    assert_eq!(applied.action, Action::Created);
    assert_eq!(applied.id(), Some(3));
    assert_eq!(applier.stats().created, 1);
}

#[tokio::test]
async fn test_apply_is_idempotent() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .respond_with(page(json!([{
            "id": 3,
            "name": "DC1",
            "slug": "dc1",
            "status": {"value": "active", "label": "Active"},
            "tags": [{"id": 7, "slug": "gitops", "name": "GitOps Managed"}],
            "created": "2024-01-01T00:00:00Z"
        }])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let applier = Applier::new(client, Some(7));
    let desired = object(json!({"name": "DC1", "slug": "dc1", "status": "active"}));
    for _ in 0..2 {
        let applied = applier
            .apply(Endpoint::Sites, &site_lookup(), desired.clone())
            .await
            .unwrap();
        assert_eq!(applied.action, Action::Unchanged);
    }
    assert_eq!(applier.stats().unchanged, 2);
}

#[tokio::test]
async fn test_apply_patches_only_changed_fields() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .respond_with(page(json!([{
            "id": 3, "name": "DC1", "slug": "dc1", "description": "old",
            "tags": [{"id": 7}]
        }])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/dcim/sites/3/"))
        .and(body_json(json!({"description": "new"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let applier = Applier::new(client, Some(7));
    let applied = applier
        .apply(
            Endpoint::Sites,
            &site_lookup(),
            object(json!({"name": "DC1", "slug": "dc1", "description": "new"})),
        )
        .await
        .unwrap();

    assert_eq!(applied.action, Action::Updated(vec!["description".into()]));
    assert_eq!(applied.object["description"], json!("new"));
    assert_eq!(applier.stats().updated, 1);
}

#[tokio::test]
async fn test_apply_error_names_endpoint_and_lookup() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .respond_with(page(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dcim/sites/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"slug": ["already exists"]})),
        )
        .mount(&server)
        .await;

    let applier = Applier::new(client, None);
    let err = applier
        .apply(
            Endpoint::Sites,
            &site_lookup(),
            object(json!({"name": "DC1", "slug": "dc1"})),
        )
        .await
        .unwrap_err();

    match &err {
        CoreError::Remote { endpoint, context, .. } => {
            assert_eq!(*endpoint, Endpoint::Sites);
            assert_eq!(context, "slug=dc1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(applier.stats().created, 0);
}

#[tokio::test]
async fn test_template_endpoints_never_carry_tags() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/interface-templates/"))
        .respond_with(page(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dcim/interface-templates/"))
        .and(body_json(json!({"device_type": 5, "name": "eth0", "type": "1000base-t"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 11})))
        .expect(1)
        .mount(&server)
        .await;

    let applier = Applier::new(client, Some(7));
    let applied = applier
        .apply(
            Endpoint::InterfaceTemplates,
            &Query::new().eq("device_type_id", 5).eq("name", "eth0"),
            object(json!({"device_type": 5, "name": "eth0", "type": "1000base-t", "tags": [3]})),
        )
        .await
        .unwrap();
    assert_eq!(applied.id(), Some(11));
}

#[tokio::test]
async fn test_dry_run_create_yields_placeholder() {
    let server = MockServer::start().await;
    let mut client = NetBoxClient::with_client(reqwest::Client::new(), &server.uri()).unwrap();
    client.set_dry_run(true);

    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .respond_with(page(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let applier = Applier::new(Arc::new(client), None);
    let applied = applier
        .apply(
            Endpoint::Sites,
            &site_lookup(),
            object(json!({"name": "DC1", "slug": "dc1"})),
        )
        .await
        .unwrap();

    assert_eq!(applied.action, Action::Created);
    assert_eq!(applied.id(), None);
    assert_eq!(applied.object["slug"], json!("dc1"));
}

// ── Cache ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_load_site_keeps_same_named_objects_apart() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .respond_with(page(json!([
            {"id": 1, "name": "DC1", "slug": "dc1"},
            {"id": 2, "name": "DC2", "slug": "dc2"}
        ])))
        .mount(&server)
        .await;
    for (site, vlan_id) in [(1, 75), (2, 74)] {
        Mock::given(method("GET"))
            .and(path("/api/ipam/vlans/"))
            .and(query_param("site_id", site.to_string()))
            .respond_with(page(json!([{"id": vlan_id, "vid": 40, "name": "idrac"}])))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .respond_with(page(json!([])))
        .mount(&server)
        .await;

    let cache = SiteCache::new();
    let dc1 = cache.load_site(&client, "dc1").await.unwrap();
    let dc2 = cache.load_site(&client, "dc2").await.unwrap();

    assert_eq!((dc1, dc2), (1, 2));
    assert_eq!(cache.get_site_id(Resource::Vlans, 1, "idrac"), Some(75));
    assert_eq!(cache.get_site_id(Resource::Vlans, 2, "idrac"), Some(74));
    assert_eq!(cache.get_global_id(Resource::Vlans, "idrac"), None);
}

#[tokio::test]
async fn test_load_site_unknown_slug_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .respond_with(page(json!([{"id": 1, "name": "DC1", "slug": "dc1"}])))
        .mount(&server)
        .await;

    let cache = SiteCache::new();
    let err = cache.load_site(&client, "nowhere").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { kind: "site", .. }));
}
