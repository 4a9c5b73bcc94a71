use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};

use crate::config::Config;

const ALLOWED_METHODS: [&str; 6] = ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

/// CORS policy: any origin when `CORS_ALLOW_ORIGIN` is `*`, otherwise the
/// comma-separated list of origins.
pub fn build_cors(config: &Config) -> Cors {
    let mut allowed_headers = vec![
        header::ORIGIN,
        HeaderName::from_static("x-requested-with"),
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::AUTHORIZATION,
    ];
    match HeaderName::try_from(config.actor_header.as_str()) {
        Ok(name) => allowed_headers.push(name),
        Err(e) => tracing::warn!("Ignoring invalid actor header {}: {}", config.actor_header, e),
    }

    let cors = if config.cors_allow_origin.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        config
            .cors_allow_origin
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(ALLOWED_METHODS)
        .allowed_headers(allowed_headers)
        .max_age(3600)
}
