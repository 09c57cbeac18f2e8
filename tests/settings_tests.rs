use actix_web::{test, web, App};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

use wedding_site::api::{self, AppState};
use wedding_site::photos::PhotoStore;
use wedding_site::store::{GuestStore, SettingsStore};

fn create_app_state(dir: &TempDir) -> AppState {
    AppState {
        guests: Arc::new(GuestStore::in_memory()),
        settings: Arc::new(SettingsStore::in_memory()),
        photos: Arc::new(PhotoStore::new(dir.path().join("photos")).unwrap()),
        public_dir: dir.path().join("public"),
    }
}

#[actix_web::test]
async fn test_settings_default_to_photos_disabled() {
    let dir = TempDir::new().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(create_app_state(&dir)))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/settings").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["photosEnabled"], false);
}

#[actix_web::test]
async fn test_update_settings_round_trip() {
    let dir = TempDir::new().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(create_app_state(&dir)))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::patch()
        .uri("/api/settings")
        .set_json(json!({"photosEnabled": true}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["photosEnabled"], true);

    let req = test::TestRequest::get().uri("/api/settings").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["photosEnabled"], true);
}

#[actix_web::test]
async fn test_update_settings_without_recognized_fields_is_a_merge_noop() {
    let dir = TempDir::new().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(create_app_state(&dir)))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::patch()
        .uri("/api/settings")
        .set_json(json!({"photosEnabled": true}))
        .to_request();
    test::call_service(&app, req).await;

    // Unknown fields are ignored; the flag keeps its value.
    let req = test::TestRequest::patch()
        .uri("/api/settings")
        .set_json(json!({"somethingElse": 42}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["photosEnabled"], true);
}
