pub mod configs;
pub mod health;
pub mod modules;

use actix_web::{guard, web, HttpResponse};

use crate::error::AppError;

/// Registers every route. Fixed paths come first so that `/configs/...` and
/// `/health/db` are never captured by the generic `/{module}/{section}` routes.
pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/{tail:.*}")
            .guard(guard::Options())
            .to(options_ok),
    )
    .route("/health", web::get().to(health::health_check))
    .route("/health/db", web::get().to(health::health_check_db))
    .service(web::scope("/configs").configure(configs::create_routes))
    .configure(modules::create_routes);
}

/// JSON body extractor settings; malformed bodies become `400 {"error": ...}`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(1024 * 1024)
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Path extractor settings; ids that fail to parse become `400 {"error": ...}`.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

// Bare OPTIONS requests that are not CORS preflights
async fn options_ok() -> HttpResponse {
    HttpResponse::Ok().finish()
}
