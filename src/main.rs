// src/main.rs

mod access;
mod app_state;
mod auth;
mod blob;
mod config;
mod dashboard;
mod directory;
mod error;
mod file;
mod models;
mod project;
mod routes;
mod store;
mod task;
mod upload;
mod user_management;

#[cfg(test)]
mod test_helpers;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::info;

use crate::app_state::AppState;
use crate::blob::LocalBlobStore;
use crate::directory::HttpUserDirectory;
use crate::store::Stores;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    std::fs::create_dir_all(&config.uploads_dir)?;

    let users = HttpUserDirectory::new(&config.user_api_url, config.user_api_timeout)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let state = web::Data::new(AppState {
        config: config.clone(),
        users: Arc::new(users),
        stores: Arc::new(Stores::new()),
        blobs: Arc::new(LocalBlobStore::new(config.uploads_dir.clone())),
    });

    let bind_addr = (config.host.clone(), config.port);
    info!("Server running at http://{}:{}", config.host, config.port);
    info!("Allowed CORS Origin: {}", config.frontend_origin);
    info!("User directory: {}", config.user_api_url);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config.frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .service(Files::new("/uploads", &config.uploads_dir))
            .configure(routes::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
