extern crate tracing_futures;

#[macro_use]
extern crate rocket;
#[macro_use]
extern crate serde;

use std::sync::Arc;

use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::data::store::{MemoryStore, MongoStore, Store, StoreKind};
use crate::error::{BackendError, ConfigurationError};
use crate::intent::Payments;
use crate::middleware::request_logger;
use crate::route::mount_api;
use crate::security::Security;

pub mod config;
pub mod data;
pub mod enrollment;
pub mod error;
pub mod intent;
pub mod middleware;
pub mod resp;
pub mod role;
pub mod route;
pub mod security;
pub mod util;

fn load_config() -> Result<Config, ConfigurationError> {
    match Config::load() {
        Ok(c) => {
            tracing::info!("Configuration loaded.");
            Ok(c)
        }
        Err(ConfigurationError::NotFound(_)) => {
            let c = Config::default();
            if c.save().is_err() {
                tracing::warn!("Unable to save generated configuration.");
            }
            Ok(c)
        }
        Err(other) => {
            tracing::error!("Configuration error: {}", other);
            Err(other)
        }
    }
}

/// Reads configuration and secrets from the environment, connects the
/// document store and builds the server.
pub async fn create(log_level: Option<Level>) -> Result<Rocket<Build>, BackendError> {
    if let Some(l) = log_level {
        let subscriber = FmtSubscriber::builder().with_max_level(l).finish();

        if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Unable to set global logger: {}", err);
        };
        if let Err(err) = tracing_log::LogTracer::init() {
            eprintln!("Unable to forward log records: {}", err);
        }
    }

    tracing::info!("Reading .env file...");
    if dotenv::dotenv().is_err() {
        tracing::warn!("Unable to load .env file.");
    }

    tracing::info!("Loading configuration...");
    let config = load_config()?;

    tracing::info!("Loading secrets...");
    let security = Security::load()?;

    let store: Store = match config.store {
        StoreKind::MongoDB => {
            tracing::info!("Connecting to MongoDB...");
            Arc::new(MongoStore::connect(&config).await?)
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; nothing is persisted.");
            Arc::new(MemoryStore::new())
        }
    };

    let payments = intent::provider_for(&config, &security);

    build(config, security, store, payments)
}

/// Assembles the server around already initialized state.
pub fn build(
    config: Config,
    security: Security,
    store: Store,
    payments: Payments,
) -> Result<Rocket<Build>, BackendError> {
    let port = config.port();
    tracing::info!("Starting HTTP server on port {}...", port);
    let figment = rocket::Config::figment().merge(("port", port));

    let mut r = rocket::custom(figment)
        .manage(config)
        .manage(security)
        .manage(store)
        .manage(payments);

    tracing::info!("Setting up CORS...");
    let cors = rocket_cors::CorsOptions {
        allowed_origins: AllowedOrigins::All,
        allowed_methods: vec![
            Method::Get,
            Method::Put,
            Method::Post,
            Method::Patch,
            Method::Delete,
        ]
        .into_iter()
        .map(From::from)
        .collect(),
        allowed_headers: AllowedHeaders::All,
        ..Default::default()
    }
    .to_cors()?;

    r = r.attach(cors).attach(request_logger());
    r = mount_api(r);

    Ok(r)
}
