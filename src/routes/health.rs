use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{error::AppResult, AppState};

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": true }))
}

pub async fn health_check_db(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    state.db.ping().await?;

    Ok(HttpResponse::Ok().json(json!({ "status": true })))
}
