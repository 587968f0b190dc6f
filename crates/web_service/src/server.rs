use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{error::JsonPayloadError, http::header, web, App, HttpRequest, HttpServer};
use log::{error, info};
use thiserror::Error;
use trip_llm::{GeminiProvider, LLMError};

use crate::auth::{FirebaseVerifier, IdentityVerifier, JwksProvider, UnconfiguredVerifier};
use crate::auth::jwks::DEFAULT_JWKS_TTL;
use crate::config::{AppConfig, ConfigError};
use crate::controllers::{
    generation_controller, pricing_controller, profile_controller, system_controller,
    trip_controller,
};
use crate::error::AppError;
use crate::middleware::{TracingMiddleware, TRACE_ID_HEADER};
use crate::services::{Pipeline, PipelineSettings};
use crate::storage::{build_store, StorageError};

/// Shared, read-only after startup.
pub struct AppState {
    pub pipeline: Pipeline,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build generation client: {0}")]
    Generation(#[from] LLMError),

    #[error("Failed to set up identity verification: {0}")]
    Identity(String),

    #[error("Failed to set up document store: {0}")]
    Store(#[from] StorageError),

    #[error("Web server error: {0}")]
    Io(#[from] std::io::Error),
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .content_type_required(false)
            .error_handler(json_error_handler),
    )
    .service(
        web::scope("/api")
            .configure(generation_controller::config)
            .configure(trip_controller::config)
            .configure(profile_controller::config)
            .configure(pricing_controller::config)
            .configure(system_controller::config),
    );
}

/// Any origin; preflight answered without a body.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-user-id"),
            header::HeaderName::from_static("x-trace-id"),
        ])
        .expose_headers(vec![TRACE_ID_HEADER])
        .max_age(3600)
}

fn build_verifier(config: &AppConfig) -> Result<Arc<dyn IdentityVerifier>, ServerError> {
    match &config.firebase.project_id {
        Some(project_id) => {
            let keys = JwksProvider::new(
                config.firebase.jwks_url.clone(),
                DEFAULT_JWKS_TTL,
                config.upstream_timeout(),
            )
            .map_err(|e| ServerError::Identity(e.to_string()))?;
            info!("Verifying ID tokens for project {}", project_id);
            Ok(Arc::new(FirebaseVerifier::new(project_id, Arc::new(keys))))
        }
        None => {
            info!(
                "No Firebase project configured; requests needing a verified caller will be rejected"
            );
            Ok(Arc::new(UnconfiguredVerifier))
        }
    }
}

/// Builds every long-lived client from `config`.
pub fn build_state(config: &AppConfig) -> Result<AppState, ServerError> {
    config.validate()?;
    let api_key = config
        .gemini
        .api_key
        .clone()
        .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

    let generator = GeminiProvider::new(api_key)
        .with_base_url(config.gemini.base_url.clone())
        .with_model(config.gemini.model.clone())
        .with_timeout(config.upstream_timeout())?;
    info!("Using Gemini model {}", generator.model());

    let pipeline = Pipeline::new(
        Arc::new(generator),
        build_verifier(config)?,
        build_store(config)?,
        PipelineSettings {
            upstream_timeout: config.upstream_timeout(),
            schema_retries: config.schema_retries,
        },
    );

    Ok(AppState { pipeline })
}

pub async fn run(config: AppConfig) -> Result<(), ServerError> {
    info!("Starting web service...");

    let app_state = web::Data::new(build_state(&config)?);
    let bind_address = config.bind_address();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(cors())
            .wrap(TracingMiddleware)
            .configure(app_config)
    })
    .workers(config.workers)
    .bind(&bind_address)?
    .run();

    info!("Starting web service on http://{bind_address}");

    if let Err(e) = server.await {
        error!("Web server error: {}", e);
        return Err(ServerError::Io(e));
    }

    Ok(())
}
