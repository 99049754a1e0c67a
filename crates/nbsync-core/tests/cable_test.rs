#![allow(clippy::unwrap_used)]
// Integration tests for cable reconciliation using wiremock.

use std::sync::Arc;

use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nbsync_api::NetBoxClient;
use nbsync_core::model::LinkIntent;
use nbsync_core::{Applier, CableEndpoint, CableOutcome, CableReconciler, CoreError, TerminationKind};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Applier) {
    let server = MockServer::start().await;
    let client = NetBoxClient::with_client(reqwest::Client::new(), &server.uri()).unwrap();
    (server, Applier::new(Arc::new(client), Some(7)))
}

fn page(results: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "count": results.as_array().map_or(0, Vec::len), "next": null, "results": results
    }))
}

fn server_port() -> CableEndpoint {
    CableEndpoint::new("srv01", "eth0", TerminationKind::Interface, 10)
}

fn panel_port() -> CableEndpoint {
    CableEndpoint::new("pp01", "1", TerminationKind::FrontPort, 20)
}

fn link() -> LinkIntent {
    LinkIntent {
        peer_device: "pp01".into(),
        peer_port: "1".into(),
        cable_type: "cat6a".into(),
        color: None,
        length: None,
        length_unit: None,
    }
}

async fn mount_free_ports(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/dcim/interfaces/10/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 10, "cable": null})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dcim/front-ports/20/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 20, "cable": null})))
        .mount(server)
        .await;
}

async fn mount_no_cables(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/dcim/cables/"))
        .respond_with(page(json!([])))
        .mount(server)
        .await;
}

// ── Creation and idempotence ────────────────────────────────────────

#[tokio::test]
async fn test_declared_from_both_ends_creates_one_cable() {
    let (server, applier) = setup().await;
    mount_no_cables(&server).await;
    mount_free_ports(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/dcim/cables/"))
        .and(body_json(json!({
            "a_terminations": [{"object_type": "dcim.interface", "object_id": 10}],
            "b_terminations": [{"object_type": "dcim.frontport", "object_id": 20}],
            "status": "connected",
            "type": "cat6a",
            "tags": [7]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 500})))
        .expect(1)
        .mount(&server)
        .await;

    let mut cables = CableReconciler::new(&applier);
    let (a, b) = (server_port(), panel_port());

    assert_eq!(cables.reconcile(&a, &b, &link()).await.unwrap(), CableOutcome::Created);
    assert_eq!(
        cables.reconcile(&b, &a, &link()).await.unwrap(),
        CableOutcome::AlreadyProcessed
    );
    assert_eq!(
        cables.reconcile(&a, &b, &link()).await.unwrap(),
        CableOutcome::AlreadyProcessed
    );
    assert_eq!(cables.processed(), 1);
    assert_eq!(applier.stats().created, 1);
}

#[tokio::test]
async fn test_existing_cable_in_reverse_orientation_is_reused() {
    let (server, applier) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/cables/"))
        .and(query_param("termination_a_id", "20"))
        .respond_with(page(json!([{
            "id": 500,
            "type": "cat6a",
            "status": {"value": "connected", "label": "Connected"},
            "a_terminations": [{"object_type": "dcim.frontport", "object_id": 20}],
            "b_terminations": [{"object_type": "dcim.interface", "object_id": 10}]
        }])))
        .mount(&server)
        .await;
    mount_no_cables(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut cables = CableReconciler::new(&applier);
    let outcome = cables
        .reconcile(&server_port(), &panel_port(), &link())
        .await
        .unwrap();
    assert_eq!(outcome, CableOutcome::Unchanged);
}

#[tokio::test]
async fn test_existing_cable_attributes_are_converged() {
    let (server, applier) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/cables/"))
        .and(query_param("termination_a_id", "10"))
        .respond_with(page(json!([{
            "id": 500,
            "type": "cat6",
            "termination_a_type": "dcim.interface",
            "termination_a_id": 10,
            "termination_b_type": "dcim.frontport",
            "termination_b_id": 20
        }])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/dcim/cables/500/"))
        .and(body_json(json!({"type": "cat6a", "color": "0000ff"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 500})))
        .expect(1)
        .mount(&server)
        .await;

    let mut intent = link();
    intent.color = Some("blue".into());
    let mut cables = CableReconciler::new(&applier);
    let outcome = cables
        .reconcile(&server_port(), &panel_port(), &intent)
        .await
        .unwrap();
    assert_eq!(outcome, CableOutcome::Updated);
}

// ── Self-healing ────────────────────────────────────────────────────

#[tokio::test]
async fn test_stray_cable_is_deleted_then_replaced() {
    let (server, applier) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/cables/900/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 900,
            "a_terminations": [{"object_type": "dcim.interface", "object_id": 10}],
            "b_terminations": [{"object_type": "dcim.interface", "object_id": 99}]
        })))
        .mount(&server)
        .await;
    mount_no_cables(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/dcim/interfaces/10/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 10, "cable": {"id": 900}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dcim/front-ports/20/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 20, "cable": null})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/dcim/cables/900/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dcim/cables/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 501})))
        .expect(1)
        .mount(&server)
        .await;

    let mut cables = CableReconciler::new(&applier);
    let outcome = cables
        .reconcile(&server_port(), &panel_port(), &link())
        .await
        .unwrap();

    assert_eq!(outcome, CableOutcome::Created);
    assert_eq!(applier.stats().deleted, 1);
}

#[tokio::test]
async fn test_port_already_cabled_to_peer_is_left_alone() {
    let (server, applier) = setup().await;
    mount_no_cables(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/interfaces/10/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 10, "cable": {"id": 700}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dcim/cables/700/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 700,
            "type": {"value": "cat6a"},
            "a_terminations": [{"object_type": "dcim.frontport", "object_id": 20}],
            "b_terminations": [{"object_type": "dcim.interface", "object_id": 10}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let mut cables = CableReconciler::new(&applier);
    let outcome = cables
        .reconcile(&server_port(), &panel_port(), &link())
        .await
        .unwrap();
    assert_eq!(outcome, CableOutcome::AlreadyConnected);
}

// ── Invariants ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_unresolved_endpoint_is_rejected_without_calls() {
    let (server, applier) = setup().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let mut cables = CableReconciler::new(&applier);
    let unresolved = CableEndpoint::new("pp01", "1", TerminationKind::FrontPort, 0);
    let err = cables
        .reconcile(&server_port(), &unresolved, &link())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::InvalidEndpoint { .. }));
    assert_eq!(cables.processed(), 0);
}
