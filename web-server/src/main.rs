// Web Server - main.rs
mod cookies;
mod gate;
mod middleware;
mod static_files;
mod validator;

use actix_web::{get, App, HttpResponse, HttpServer, Responder};
use common::{setup_tracing, Config};
use cookies::CookieSettings;
use gate::GatePolicy;
use middleware::AuthGate;
use validator::TwoTierValidator;

#[get("/healthz")]
async fn healthz() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // The log level comes from the config, so load errors are reported once tracing is up
    let (config, load_error) = Config::from_env();
    setup_tracing(&config.log_level);

    match load_error {
        None => tracing::info!("Configuration loaded from {}", Config::config_dir().display()),
        Some(e) => {
            tracing::warn!("Failed to load configuration from files: {}", e);
            tracing::info!("Falling back to environment variables only");
        }
    }

    let server_addr = config.web_server_addr.clone();

    let validator = TwoTierValidator::from_config(&config.auth)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    let policy = GatePolicy::from_config(&config.auth);
    let cookies = CookieSettings::from_config(&config.auth);

    if !cookies.secure {
        tracing::warn!("Token cookies are not marked Secure; do not run this configuration in production");
    }

    tracing::info!("Starting admin web server on {}", server_addr);

    let gate = AuthGate::new(policy, validator, cookies);
    let static_config = config.static_files.clone();

    HttpServer::new(move || {
        let static_config = static_config.clone();
        App::new()
            .wrap(gate.clone())
            .service(healthz)
            .configure(move |cfg| static_files::configure(cfg, &static_config))
    })
    .bind(&server_addr)?
    .run()
    .await
}
