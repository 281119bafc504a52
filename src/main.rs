#![warn(clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use authgate::{
    handlers::configure_routes, provider::HttpProvider, AuthFlow, AuthGate, AuthGateSettings,
    SessionStore,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables;
    // this also initializes the logger
    let settings = AuthGateSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    let provider = HttpProvider::new(&settings.provider, &settings.application)
        .map_err(|e| std::io::Error::other(format!("Failed to configure provider: {e}")))?;

    let store = SessionStore::new(
        settings.session.session_secret.as_bytes(),
        settings.cookies.secure,
    );
    let flow = web::Data::new(AuthFlow::new(Arc::new(provider), store.clone()));
    let gate = web::Data::new(AuthGate::new(store));

    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    HttpServer::new(move || {
        App::new()
            .app_data(flow.clone())
            .app_data(gate.clone())
            .wrap(Logger::default())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, settings: &AuthGateSettings) {
    println!("Starting authgate v{} on http://{bind_address}", authgate::VERSION);
    println!();
    println!("Endpoints:");
    println!("  GET  /slogin   - Begin provider login");
    println!("  GET  /slogout  - Revoke session");
    println!("  GET  /callback - Provider redirect target");
    println!("  GET  /private  - Example protected page");
    println!();
    println!("Callback URL for the identity provider registration:");
    println!("  {}/callback", settings.application.redirect_base_url);
}
