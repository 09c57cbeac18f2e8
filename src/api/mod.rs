use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures_util::TryStreamExt;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::*;
use crate::photos::PhotoStore;
use crate::store::{GuestStore, SettingsStore, StoreError};

const MAX_UPLOAD_FILES: usize = 100;
const MAX_UPLOAD_FILE_SIZE: usize = 50 * 1024 * 1024;
const RESERVED_SLUGS: &[&str] = &["favicon.ico", "robots.txt"];

pub struct AppState {
    pub guests: Arc<GuestStore>,
    pub settings: Arc<SettingsStore>,
    pub photos: Arc<PhotoStore>,
    pub public_dir: PathBuf,
}

// ==================== Guest Endpoints ====================

pub async fn get_guest(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.guests.find_by_slug(&path.into_inner()) {
        Some(guest) => HttpResponse::Ok().json(guest),
        None => HttpResponse::NotFound().json(json!({"error": "not found"})),
    }
}

pub async fn list_guests(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.guests.list())
}

pub async fn create_guest(
    state: web::Data<AppState>,
    body: web::Json<CreateGuestRequest>,
) -> impl Responder {
    let name = body.name.as_deref().unwrap_or("");
    match state.guests.create(name, body.phone.clone()) {
        Ok(guest) => HttpResponse::Created().json(guest),
        Err(StoreError::Validation(_)) => {
            HttpResponse::BadRequest().json(json!({"error": "name required"}))
        }
        Err(StoreError::Conflict(slug)) => {
            HttpResponse::Conflict().json(json!({"error": "slug already exists", "slug": slug}))
        }
        Err(e) => {
            log::error!("failed to create guest: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "failed to save guest"}))
        }
    }
}

pub async fn update_guest(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateGuestRequest>,
) -> impl Responder {
    match state
        .guests
        .update_phone(&path.into_inner(), body.phone.clone())
    {
        Ok(guest) => HttpResponse::Ok().json(guest),
        Err(StoreError::NotFound(_)) => {
            HttpResponse::NotFound().json(json!({"error": "guest not found"}))
        }
        Err(e) => {
            log::error!("failed to update guest: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "failed to save guest"}))
        }
    }
}

pub async fn delete_guest(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.guests.delete(&path.into_inner()) {
        Ok(()) => HttpResponse::Ok().json(json!({"success": true})),
        Err(StoreError::NotFound(_)) => {
            HttpResponse::NotFound().json(json!({"error": "guest not found"}))
        }
        Err(e) => {
            log::error!("failed to delete guest: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "failed to save guest"}))
        }
    }
}

pub async fn confirm_rsvp(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.guests.confirm_rsvp(&path.into_inner()) {
        Ok(guest) => HttpResponse::Ok().json(json!({"success": true, "guest": guest})),
        Err(StoreError::NotFound(_)) => {
            HttpResponse::NotFound().json(json!({"error": "guest not found"}))
        }
        Err(e) => {
            log::error!("failed to confirm rsvp: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "failed to save guest"}))
        }
    }
}

// ==================== Settings Endpoints ====================

pub async fn get_settings(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.settings.get())
}

pub async fn update_settings(
    state: web::Data<AppState>,
    body: web::Json<UpdateSettingsRequest>,
) -> impl Responder {
    match state.settings.update(body.photos_enabled) {
        Ok(settings) => HttpResponse::Ok().json(settings),
        Err(e) => {
            log::error!("failed to update settings: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "failed to save settings"}))
        }
    }
}

// ==================== Photo Endpoints ====================

pub async fn list_photos(state: web::Data<AppState>) -> impl Responder {
    let listings: Vec<PhotoListing> = state
        .photos
        .list()
        .into_iter()
        .map(|entry| PhotoListing {
            url: format!("/photos/{}", entry.name),
            name: entry.name,
            created_at: entry.created_at,
        })
        .collect();
    HttpResponse::Ok().json(listings)
}

/// Multipart upload of up to 100 images, 50MB each, field "photos".
/// Any rejected file fails the whole batch; conversion failures roll
/// back artifacts already written for this request.
pub async fn upload_photos(state: web::Data<AppState>, mut payload: Multipart) -> impl Responder {
    let mut files: Vec<Vec<u8>> = Vec::new();

    loop {
        let mut field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                log::warn!("multipart read error: {}", e);
                return HttpResponse::BadRequest().json(json!({"error": "invalid upload"}));
            }
        };

        if field.name() != "photos" {
            return HttpResponse::BadRequest().json(json!({"error": "unexpected field"}));
        }
        let is_image = field
            .content_type()
            .map(|m| m.type_() == mime::IMAGE)
            .unwrap_or(false);
        if !is_image {
            return HttpResponse::BadRequest().json(json!({"error": "Only images allowed"}));
        }
        if files.len() >= MAX_UPLOAD_FILES {
            return HttpResponse::BadRequest().json(json!({"error": "too many files"}));
        }

        let mut data = Vec::new();
        loop {
            match field.try_next().await {
                Ok(Some(chunk)) => {
                    data.extend_from_slice(&chunk);
                    if data.len() > MAX_UPLOAD_FILE_SIZE {
                        return HttpResponse::BadRequest().json(json!({"error": "file too large"}));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::warn!("multipart read error: {}", e);
                    return HttpResponse::BadRequest().json(json!({"error": "invalid upload"}));
                }
            }
        }
        files.push(data);
    }

    let mut uploaded: Vec<PhotoUpload> = Vec::new();
    for data in files {
        let photos = state.photos.clone();
        let saved = web::block(move || photos.save(&data)).await;

        let failure = match saved {
            Ok(Ok(name)) => {
                uploaded.push(PhotoUpload {
                    url: format!("/photos/{}", name),
                    name,
                });
                None
            }
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => Some(e.to_string()),
        };

        if let Some(cause) = failure {
            log::error!("photo conversion failed: {}", cause);
            // Batch is all-or-nothing: drop what this request already wrote.
            for photo in &uploaded {
                if let Err(e) = state.photos.delete(&photo.name) {
                    log::warn!("rollback of {} failed: {}", photo.name, e);
                }
            }
            return HttpResponse::InternalServerError().json(json!({"error": "Upload failed"}));
        }
    }

    HttpResponse::Ok().json(json!({"success": true, "photos": uploaded}))
}

pub async fn delete_photo(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let name = path.into_inner();
    match state.photos.delete(&name) {
        Ok(()) => HttpResponse::Ok().json(json!({"success": true})),
        Err(crate::photos::PhotoError::InvalidName(_)) => {
            HttpResponse::BadRequest().json(json!({"error": "invalid photo name"}))
        }
        Err(e) => {
            log::error!("failed to delete photo {}: {}", name, e);
            HttpResponse::InternalServerError().json(json!({"error": "Delete failed"}))
        }
    }
}

/// Stream a zip of every download-format photo. The directory is
/// enumerated before any response bytes are produced, so an
/// enumeration failure is a clean 500 instead of a truncated archive.
pub async fn download_photos(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let names = match state.photos.download_names() {
        Ok(names) => names,
        Err(e) => {
            log::error!("photo enumeration failed: {}", e);
            return HttpResponse::InternalServerError().json(json!({"error": "Download failed"}));
        }
    };

    let photos = state.photos.clone();
    let archive = match web::block(move || photos.zip_archive(&names)).await {
        Ok(Ok(file)) => file,
        Ok(Err(e)) => {
            log::error!("archive assembly failed: {}", e);
            return HttpResponse::InternalServerError().json(json!({"error": "Download failed"}));
        }
        Err(e) => {
            log::error!("archive task failed: {}", e);
            return HttpResponse::InternalServerError().json(json!({"error": "Download failed"}));
        }
    };

    match NamedFile::from_file(archive, "wedding_photos.zip") {
        Ok(file) => file
            .set_content_disposition(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename("wedding_photos.zip".to_string())],
            })
            .into_response(&req),
        Err(e) => {
            log::error!("archive response failed: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "Download failed"}))
        }
    }
}

// ==================== Pages ====================

pub async fn home_page(state: web::Data<AppState>, req: HttpRequest) -> actix_web::Result<HttpResponse> {
    let file = NamedFile::open(state.public_dir.join("index.html"))?;
    Ok(file.into_response(&req))
}

/// Catch-all for `/{slug}`: an existing flat file in the public dir is
/// served as-is (admin panel, stylesheets); everything else gets the
/// guest page template, which resolves the slug client-side.
pub async fn guest_page(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
) -> actix_web::Result<HttpResponse> {
    let slug = path.into_inner();
    if RESERVED_SLUGS.contains(&slug.as_str()) {
        return Ok(HttpResponse::NotFound().finish());
    }

    let direct = state.public_dir.join(&slug);
    let target = if !slug.contains("..") && direct.is_file() {
        direct
    } else {
        state.public_dir.join("guest.html")
    };

    let file = NamedFile::open(target)?;
    Ok(file.into_response(&req))
}

// ==================== Route Configuration ====================

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Guests
        .route("/api/guest/{slug}", web::get().to(get_guest))
        .route("/api/guest/{slug}", web::patch().to(update_guest))
        .route("/api/guest/{slug}", web::delete().to(delete_guest))
        .route("/api/guests", web::get().to(list_guests))
        .route("/api/guests", web::post().to(create_guest))
        .route("/api/rsvp/{slug}", web::post().to(confirm_rsvp))
        // Settings
        .route("/api/settings", web::get().to(get_settings))
        .route("/api/settings", web::patch().to(update_settings))
        // Photos
        .route("/api/photos", web::get().to(list_photos))
        .route("/api/photos", web::post().to(upload_photos))
        .route("/api/photos/download", web::get().to(download_photos))
        .route("/api/photos/{name}", web::delete().to(delete_photo))
        // Pages
        .route("/", web::get().to(home_page))
        .route("/{slug}", web::get().to(guest_page));
}
