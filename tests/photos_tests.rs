use actix_web::{test, web, App};
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;

use wedding_site::api::{self, AppState};
use wedding_site::photos::PhotoStore;
use wedding_site::store::{GuestStore, SettingsStore};

const BOUNDARY: &str = "----wedding-test-boundary";

fn create_app_state(dir: &TempDir) -> AppState {
    AppState {
        guests: Arc::new(GuestStore::in_memory()),
        settings: Arc::new(SettingsStore::in_memory()),
        photos: Arc::new(PhotoStore::new(dir.path().join("photos")).unwrap()),
        public_dir: dir.path().join("public"),
    }
}

fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([120, 200, 40]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Build a multipart/form-data body with one part per (content-type, data).
fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (i, (content_type, data)) in parts.iter().enumerate() {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"photos\"; filename=\"upload{}.bin\"\r\n",
                i
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(parts: &[(&str, &[u8])]) -> actix_web::test::TestRequest {
    test::TestRequest::post()
        .uri("/api/photos")
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(parts))
}

#[actix_web::test]
async fn test_upload_single_photo() {
    let dir = TempDir::new().unwrap();
    let state = create_app_state(&dir);
    let photos = state.photos.clone();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let png = sample_png();
    let req = upload_request(&[("image/png", &png)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    let uploaded = body["photos"].as_array().unwrap();
    assert_eq!(uploaded.len(), 1);

    let name = uploaded[0]["name"].as_str().unwrap();
    assert!(name.starts_with("photo_"));
    assert!(name.ends_with(".webp"));
    assert_eq!(
        uploaded[0]["url"].as_str().unwrap(),
        format!("/photos/{}", name)
    );

    // Both artifacts on disk, and the listing sees the web copy.
    let web_path = photos.dir().join(name);
    assert!(web_path.is_file());
    assert!(web_path.with_extension("jpg").is_file());
    assert_eq!(photos.list().len(), 1);
}

#[actix_web::test]
async fn test_upload_many_yields_distinct_names() {
    let dir = TempDir::new().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(create_app_state(&dir)))
            .configure(api::configure_routes),
    )
    .await;

    let png = sample_png();
    let req = upload_request(&[
        ("image/png", &png),
        ("image/png", &png),
        ("image/png", &png),
    ])
    .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    let uploaded = body["photos"].as_array().unwrap();
    assert_eq!(uploaded.len(), 3);

    let mut names: Vec<&str> = uploaded
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 3);

    let req = test::TestRequest::get().uri("/api/photos").to_request();
    let listed: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.as_array().unwrap().len(), 3);
}

#[actix_web::test]
async fn test_upload_rejects_non_image_content_type() {
    let dir = TempDir::new().unwrap();
    let state = create_app_state(&dir);
    let photos = state.photos.clone();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let req = upload_request(&[("text/plain", b"hello".as_slice())]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(photos.list().is_empty());
}

#[actix_web::test]
async fn test_upload_conversion_failure_rolls_back_batch() {
    let dir = TempDir::new().unwrap();
    let state = create_app_state(&dir);
    let photos = state.photos.clone();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    // Second part claims to be an image but does not decode: the batch
    // fails and the first file's artifacts are removed again.
    let png = sample_png();
    let req = upload_request(&[
        ("image/png", png.as_slice()),
        ("image/png", b"broken bytes".as_slice()),
    ])
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Upload failed");
    assert!(photos.list().is_empty());
    assert!(photos.download_names().unwrap().is_empty());
}

#[actix_web::test]
async fn test_delete_photo_removes_pair() {
    let dir = TempDir::new().unwrap();
    let state = create_app_state(&dir);
    let photos = state.photos.clone();
    let name = photos.save(&sample_png()).unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/photos/{}", name))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert!(photos.list().is_empty());
    assert!(photos.download_names().unwrap().is_empty());
}

#[actix_web::test]
async fn test_delete_nonexistent_photo_still_succeeds() {
    let dir = TempDir::new().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(create_app_state(&dir)))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::delete()
        .uri("/api/photos/photo_000_aaaaaa.webp")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
}

#[actix_web::test]
async fn test_download_all_photos_as_zip() {
    let dir = TempDir::new().unwrap();
    let state = create_app_state(&dir);
    let photos = state.photos.clone();
    photos.save(&sample_png()).unwrap();
    photos.save(&sample_png()).unwrap();
    let mut expected = photos.download_names().unwrap();
    expected.sort();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/photos/download")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("wedding_photos.zip"));

    let bytes = test::read_body(resp).await;
    let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut archived: Vec<String> = archive.file_names().map(str::to_string).collect();
    archived.sort();
    assert_eq!(archived, expected);
}

#[actix_web::test]
async fn test_download_with_no_photos_yields_empty_zip() {
    let dir = TempDir::new().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(create_app_state(&dir)))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/photos/download")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let bytes = test::read_body(resp).await;
    let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    assert_eq!(archive.len(), 0);
}

#[actix_web::test]
async fn test_list_photos_empty_directory() {
    let dir = TempDir::new().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(create_app_state(&dir)))
            .configure(api::configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/photos").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}
