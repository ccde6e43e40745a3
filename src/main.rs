mod config;
mod convert;
mod errors;
mod janitor;
mod routes;
mod storage;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use env_logger::Env;

use crate::config::Config;
use crate::janitor::Janitor;
use crate::routes::{download, pages, upload};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Init logger to show info by default, but can be overridden by RUST_LOG
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cfg = Config::from_env_config();

    let sweeper = Janitor::from_config(&cfg).spawn();
    log::info!("starting server at {}", cfg.listen);

    let listen_addr = cfg.listen.clone();
    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(cfg.clone()))
            .route("/", web::get().to(pages::index))
            .route("/upload", web::post().to(upload::upload))
            .route("/download/{filename}", web::get().to(download::download))
            .default_service(web::route().to(pages::not_found))
    })
    .bind(listen_addr)?
    .run()
    .await;

    sweeper.abort();
    result
}
