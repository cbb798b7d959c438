use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;
use std::time::Duration;

use whatsapp_gateway::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{ReqwestTransport, WhatsAppClient},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::{
        DbUserAttributeStore, MemoryUserAttributeStore, MessagingGateway, UserAttributeStore,
    },
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    // memory:// keeps attributes in-process (local runs only)
    let store: Arc<dyn UserAttributeStore> = if config.database.url.starts_with("memory:") {
        log::warn!("Using in-memory user attribute store, data is lost on restart");
        Arc::new(MemoryUserAttributeStore::new())
    } else {
        let pool = create_pool(&config.database)
            .await
            .expect("Failed to create database connection pool");
        run_migrations(&pool)
            .await
            .expect("Failed to run database migrations");
        Arc::new(DbUserAttributeStore::new(pool))
    };

    let transport = ReqwestTransport::new(Duration::from_secs(
        config.whatsapp.request_timeout_secs,
    ))
    .expect("Failed to build HTTP client");
    let client = WhatsAppClient::new(&config.whatsapp, Arc::new(transport));
    let gateway = MessagingGateway::new(config.whatsapp.clone(), client, store);

    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);
    let cors_config = config.cors.clone();

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors(&cors_config))
            .wrap(Logger::default())
            .app_data(web::Data::new(gateway.clone()))
            .configure(swagger_config)
            .service(web::scope("/api/v1").configure(handlers::whatsapp_config))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
