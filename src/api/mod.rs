mod handlers;
pub mod middleware;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::db::Database;
use crate::domains::DomainsService;

use self::middleware::{authorization_context_middleware, AuthorizationHeader};

pub type AppState = DomainsService<Database>;

pub fn create_router(db: Database, config: &ServiceConfig) -> anyhow::Result<Router> {
    let authz_header = AuthorizationHeader::parse(config.authz_header.as_deref())?;
    let service = DomainsService::from_config(db, config);

    let api = Router::new()
        .route(
            "/domains",
            get(handlers::list_domains).post(handlers::create_domain),
        )
        .route(
            "/domains/{id}",
            get(handlers::get_domain).delete(handlers::delete_domain),
        )
        .route(
            "/domains/{id}/properties",
            get(handlers::get_domain_properties).put(handlers::update_domain_properties),
        )
        .route("/health", get(handlers::health));

    Ok(Router::new()
        .nest("/api/v1", api)
        .layer(from_fn_with_state(
            authz_header,
            authorization_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .with_state(service))
}

fn cors_layer(config: &ServiceConfig) -> CorsLayer {
    match &config.cors_origins {
        Some(origins) => CorsLayer::new().allow_origin(AllowOrigin::list(allowed_origins(origins))),
        None => CorsLayer::permissive(),
    }
}

/// Converts configured origins to header values, skipping ones that are not
/// valid header values.
fn allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect()
}
