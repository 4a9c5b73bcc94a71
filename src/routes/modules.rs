use actix_web::{web, HttpResponse};
use serde_json::{json, Map, Value};

use crate::{
    error::AppResult,
    middleware::Actor,
    models::{SoftDeleteForm, UpdateEntryForm},
    services::ConfigRecordService,
    AppState,
};

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/{module}/{section}")
            .route(web::get().to(get_section))
            .route(web::post().to(append_entry)),
    )
    .service(
        web::resource("/{module}/{section}/{id}")
            .route(web::put().to(update_entry))
            .route(web::patch().to(soft_delete_entry))
            .route(web::delete().to(delete_record)),
    );
}

/// GET /{module}/{section} - Section value as stored
async fn get_section(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (module, section) = path.into_inner();

    let service = ConfigRecordService::new(&state.db);
    let data = service.get_section(&module, &section).await?;

    Ok(HttpResponse::Ok().json(data))
}

/// POST /{module}/{section} - Append an entry
async fn append_entry(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<(String, String)>,
    entry: web::Json<Map<String, Value>>,
) -> AppResult<HttpResponse> {
    let (module, section) = path.into_inner();

    let service = ConfigRecordService::new(&state.db);
    let record = service
        .append_entry(&module, &section, entry.into_inner(), &actor)
        .await?;

    Ok(HttpResponse::Ok().json(record))
}

/// PUT /{module}/{section}/{id} - Merge fields into matching entries
async fn update_entry(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<(String, String, String)>,
    form: web::Json<UpdateEntryForm>,
) -> AppResult<HttpResponse> {
    let (module, section, id) = path.into_inner();

    let service = ConfigRecordService::new(&state.db);
    let record = service
        .update_entry(&module, &section, &id, form.into_inner().jsoncontent, &actor)
        .await?;

    Ok(HttpResponse::Ok().json(record))
}

/// PATCH /{module}/{section}/{id} - Soft delete matching entries
async fn soft_delete_entry(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<(String, String, String)>,
    form: Option<web::Json<SoftDeleteForm>>,
) -> AppResult<HttpResponse> {
    let (module, section, id) = path.into_inner();
    let form = form.map(|f| f.into_inner()).unwrap_or_default();
    let deleted_by = form.deleted_by().unwrap_or(actor.as_str());

    let service = ConfigRecordService::new(&state.db);
    let record = service
        .soft_delete_entry(&module, &section, &id, deleted_by)
        .await?;

    Ok(HttpResponse::Ok().json(record))
}

/// DELETE /{module}/{section}/{id} - Remove the row; succeeds even if absent
async fn delete_record(
    state: web::Data<AppState>,
    path: web::Path<(String, String, String)>,
) -> AppResult<HttpResponse> {
    let (module, _section, id) = path.into_inner();

    let service = ConfigRecordService::new(&state.db);
    service.delete_record(&module, &id).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Record deleted successfully." })))
}
