use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{error::AppResult, models::PlainConfigForm, services::PlainConfigService, AppState};

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(get_configs)).service(
        web::resource("/{id}")
            .route(web::get().to(get_config_by_id))
            .route(web::put().to(update_config_by_id))
            .route(web::delete().to(delete_config_by_id)),
    );
}

async fn get_configs(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let service = PlainConfigService::new(&state.db);
    let configs = service.get_all_configs().await?;

    Ok(HttpResponse::Ok().json(configs))
}

/// Responds with `null` when the id does not exist.
async fn get_config_by_id(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let service = PlainConfigService::new(&state.db);
    let config = service.get_config_by_id(id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(config))
}

async fn update_config_by_id(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    form: web::Json<PlainConfigForm>,
) -> AppResult<HttpResponse> {
    let service = PlainConfigService::new(&state.db);
    service.update_config_data(id.into_inner(), &form.data).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Config updated successfully" })))
}

async fn delete_config_by_id(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let service = PlainConfigService::new(&state.db);
    service.delete_config(id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Config deleted successfully" })))
}
