use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use fe1_prep_server::{app_state::AppState, config::Config, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    let host = config.web_server_host.clone();
    let port = config.web_server_port;
    let cors_origin = config.cors_origin.clone();

    let state = AppState::new(config).await.unwrap_or_else(|e| {
        log::error!("Failed to initialise application state: {}", e);
        std::process::exit(1);
    });

    log::info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(handlers::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
