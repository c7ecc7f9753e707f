#![cfg(feature = "web")]

use std::sync::Arc;

use aspenlog::app::{AppState, router};
use aspenlog::config::Config;
use aspenlog::credentials::{CredentialStore, MemoryCredentialStore};
use aspenlog::floors::FloorElevationInput;
use aspenlog::forms::BuildingGeometryForm;
use aspenlog::height_zone::HeightZoneTable;
use aspenlog::saving::{ProjectSave, Snapshot};
use axum::Router;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

fn shell(store: MemoryCredentialStore, static_dir: &std::path::Path) -> (Router, Arc<MemoryCredentialStore>) {
    let store = Arc::new(store);
    let config = Config {
        static_dir: static_dir.to_path_buf(),
        ..Config::default()
    };
    let state = Arc::new(AppState {
        store: store.clone(),
        config,
    });
    (router(state), store)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn token_and_address_channels() {
    let dir = tempfile::tempdir().unwrap();
    let (app, store) = shell(MemoryCredentialStore::new(), dir.path());

    let (status, _) = send_json(&app, get("/api/get-token")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send_json(&app, post_json("/api/store-token", json!({ "token": "abc" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(store.get_token().unwrap(), "abc");

    let (_, body) = send_json(&app, get("/api/get-token")).await;
    assert_eq!(body, json!({ "token": "abc" }));

    send_json(
        &app,
        post_json(
            "/api/store-connection-address",
            json!({ "address": "http://localhost:42614" }),
        ),
    )
    .await;
    let (_, body) = send_json(&app, get("/api/get-connection-address")).await;
    assert_eq!(body["address"], "http://localhost:42614");
}

#[tokio::test]
async fn core_checks() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = shell(MemoryCredentialStore::new(), dir.path());

    let (_, body) = send_json(
        &app,
        post_json("/api/floor_elevations/validate", json!({ "elevations": [3.0, null, 1.0] })),
    )
    .await;
    assert_eq!(body["valid"], true);
    let (_, body) = send_json(
        &app,
        post_json("/api/floor_elevations/validate", json!({ "elevations": [3.0, 1.0] })),
    )
    .await;
    assert_eq!(body["valid"], false);

    let rows: Vec<Value> = [1, 1, 2, 2, 3]
        .iter()
        .zip([10.0, 20.0, 30.0, 40.0, 50.0])
        .enumerate()
        .map(|(i, (zone, elevation))| {
            json!({ "floor_number": i + 1, "elevation": elevation, "zone_number": zone })
        })
        .collect();
    let (status, body) = send_json(&app, post_json("/api/height_zones", json!({ "assignments": rows }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["zones"], json!([[1, 20.0], [2, 40.0], [3, 50.0]]));

    let bad = json!({ "assignments": [
        { "floor_number": 1, "elevation": 10.0, "zone_number": 2 },
        { "floor_number": 2, "elevation": 20.0, "zone_number": 1 }
    ]});
    let (status, body) = send_json(&app, post_json("/api/height_zones", bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("invalid height zone data"));
}

#[tokio::test]
async fn page_submission_needs_credentials_and_a_valid_form() {
    let dir = tempfile::tempdir().unwrap();
    let floors = FloorElevationInput::from_elevations(0.0, &[Some(3.0), Some(6.0)]).unwrap();
    let mut form = BuildingGeometryForm {
        width: Some(10.0),
        floors,
        cladding_top: Some(6.0),
        cladding_bottom: Some(1.0),
        dominant_opening: false,
        mid_height: None,
        roof_width: Some(10.0),
        roof_length: Some(20.0),
        roof_angle: Some(3.0),
        roof_dead_load: Some(1.0),
        zones: HeightZoneTable::default(),
        material_weight: None,
    };
    form.render_zone_table().unwrap();
    let body = serde_json::to_value(&form).unwrap();

    let (app, _) = shell(MemoryCredentialStore::new(), dir.path());
    let (status, _) = send_json(&app, post_json("/api/building_geometry", body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // nothing listens on the discard port; the form fails before any request
    let (app, _) = shell(MemoryCredentialStore::with("t", "http://127.0.0.1:9"), dir.path());
    let (status, reply) = send_json(&app, post_json("/api/building_geometry", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["message"], "Please enter a valid Material Weight KPA");

    let (status, reply) = send_json(&app, post_json("/api/wind_pressure", json!({ "ct": 1.0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["message"], "Please select an exposure factor");
}

#[tokio::test]
async fn engineer_selection_picks_the_next_page() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = shell(MemoryCredentialStore::new(), dir.path());

    let (status, body) = send_json(
        &app,
        post_json("/api/engineer_selection", json!({ "engineer_type": "WALL_CLADDING" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["next_page"], "wall_cladding_load.html");

    let (status, body) = send_json(
        &app,
        post_json("/api/engineer_selection", json!({ "engineer_type": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please choose an engineering type");
}

#[tokio::test]
async fn loading_a_save_needs_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = shell(MemoryCredentialStore::new(), dir.path());
    let (status, body) = send_json(&app, get("/api/save")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn exports_are_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = shell(MemoryCredentialStore::new(), dir.path());
    let table = json!({ "headers": ["Height Zone", "p"], "rows": [[1.0, 0.25], [2.0, 0.5]] });

    let (status, headers, body) = send(&app, post_json("/api/export", table.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"results.csv\""
    );
    assert_eq!(String::from_utf8(body).unwrap(), "Height Zone,p\n1,0.25\n2,0.5");

    let (status, headers, body) = send(&app, post_json("/api/export?format=xlsx", table)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"results.xlsx\""
    );
    assert_eq!(&body[..2], b"PK");
}

#[tokio::test]
async fn snapshot_download_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = shell(MemoryCredentialStore::new(), dir.path());

    let project = ProjectSave {
        project_name: Some("Tower".into()),
        ..Default::default()
    };
    let request = post_json(
        "/api/snapshot",
        json!({ "save_file_id": 3, "project": project }),
    );
    let (status, _, bytes) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let reload = Request::builder()
        .method(Method::POST)
        .uri("/api/snapshot/load")
        .body(Body::from(bytes))
        .unwrap();
    let (status, body) = send_json(&app, reload).await;
    assert_eq!(status, StatusCode::OK);
    let snapshot: Snapshot = serde_json::from_value(body).unwrap();
    assert_eq!(snapshot.save_file_id, Some(3));
    assert_eq!(snapshot.project, project);

    // a length prefix far past any real snapshot
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&(1u64 << 40).to_le_bytes()).unwrap();
    let huge = Request::builder()
        .method(Method::POST)
        .uri("/api/snapshot/load")
        .body(Body::from(encoder.finish().unwrap()))
        .unwrap();
    let (status, _) = send_json(&app, huge).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let garbage = Request::builder()
        .method(Method::POST)
        .uri("/api/snapshot/load")
        .body(Body::from("nope"))
        .unwrap();
    let (status, _) = send_json(&app, garbage).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn static_pages_are_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>aspenlog</h1>").unwrap();
    let (app, _) = shell(MemoryCredentialStore::new(), dir.path());

    let (status, _, body) = send(&app, get("/index.html")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>aspenlog</h1>");

    let (status, _, _) = send(&app, get("/missing.html")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
