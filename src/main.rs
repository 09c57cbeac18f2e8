use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use wedding_site::api::{self, AppState};
use wedding_site::photos::PhotoStore;
use wedding_site::store::{GuestStore, SettingsStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    // Load environment variables
    dotenvy::dotenv().ok();

    // Get configuration from environment
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "2308".to_string())
        .parse()
        .expect("PORT must be a number");

    let guests_path = env::var("GUESTS_PATH").unwrap_or_else(|_| "guests.json".to_string());
    let settings_path = env::var("SETTINGS_PATH").unwrap_or_else(|_| "settings.json".to_string());
    let public_dir = PathBuf::from(env::var("PUBLIC_DIR").unwrap_or_else(|_| "public".to_string()));
    let photos_dir = public_dir.join("photos");

    // Initialize stores; the photo store creates its directory
    let guests = Arc::new(GuestStore::new(&guests_path));
    let settings = Arc::new(SettingsStore::new(&settings_path));
    let photos = Arc::new(PhotoStore::new(&photos_dir)?);

    log::info!("Guest list: {}", guests_path);
    log::info!("Photos dir: {}", photos_dir.display());
    log::info!("Wedding site -> http://localhost:{}", port);
    log::info!("Admin panel  -> http://localhost:{}/admin.html", port);
    log::info!("API          -> http://localhost:{}/api/guests", port);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(AppState {
                guests: guests.clone(),
                settings: settings.clone(),
                photos: photos.clone(),
                public_dir: public_dir.clone(),
            }))
            // Payload size limit for photo uploads (50MB)
            .app_data(web::PayloadConfig::new(50 * 1024 * 1024))
            .service(Files::new("/photos", photos.dir()))
            .configure(api::configure_routes)
    });

    server.bind(("0.0.0.0", port))?.run().await
}
