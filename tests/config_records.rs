//! Database-backed behaviour of the section endpoints.
//!
//! These tests need a PostgreSQL instance and only run when
//! `TEST_DATABASE_URL` is set; otherwise each test returns immediately.

use std::sync::atomic::{AtomicU32, Ordering};

use actix_web::{http::StatusCode, test, web, App};
use cfgadmin_service::config::Config;
use cfgadmin_service::db::Database;
use cfgadmin_service::error::AppError;
use cfgadmin_service::services::{ConfigRecordService, PlainConfigService};
use cfgadmin_service::{routes, AppState};
use serde_json::{json, Map, Value};

static COUNTER: AtomicU32 = AtomicU32::new(0);

async fn setup() -> Option<Database> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(url.clone()),
        _ => None,
    })
    .expect("test config");

    let db = Database::new(&config).await.expect("connect to test database");
    db.run_migrations().await.expect("migrations");
    Some(db)
}

/// Inserts a module row with a unique name and returns (id, name).
async fn insert_module(db: &Database, content: Value) -> (i64, String) {
    let name = format!("test_module_{}", unique_suffix());
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO cfgadmindata (module, jsoncontent) VALUES ($1, $2) RETURNING id",
    )
    .bind(&name)
    .bind(&content)
    .fetch_one(db.pool())
    .await
    .expect("insert module");

    (id, name)
}

fn unique_suffix() -> String {
    format!(
        "{}_{}",
        chrono::Utc::now().timestamp_micros(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}

macro_rules! app {
    ($db:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new($db.clone(), Config::default())))
                .app_data(routes::json_config())
                .app_data(routes::path_config())
                .configure(routes::create_routes),
        )
        .await
    };
}

fn entry(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object")
}

#[tokio::test]
async fn test_get_section_is_case_insensitive_and_reports_missing() {
    let Some(db) = setup().await else { return };
    let (_, module) = insert_module(&db, json!({ "roles": [{ "id": 1 }] })).await;
    let service = ConfigRecordService::new(&db);

    let roles = service
        .get_section(&module.to_uppercase(), "roles")
        .await
        .unwrap();
    assert_eq!(roles, json!([{ "id": 1 }]));

    let missing = service.get_section(&module, "groups").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let no_module = service.get_section("no_such_module_xyz", "roles").await;
    assert!(matches!(no_module, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_append_creates_then_extends_section() {
    let Some(db) = setup().await else { return };
    let (_, module) = insert_module(&db, json!({ "other": { "keep": true } })).await;
    let service = ConfigRecordService::new(&db);

    let first = service
        .append_entry(
            &module,
            "roles",
            entry(json!({ "id": 1, "name": "admin", "createdBy": "mallory", "createdOn": "never" })),
            "alice",
        )
        .await
        .unwrap();
    let roles = first.jsoncontent["roles"].as_array().unwrap().clone();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0]["name"], "admin");
    assert_eq!(roles[0]["createdBy"], "alice");
    assert_ne!(roles[0]["createdOn"], "never");

    let second = service
        .append_entry(&module, "roles", entry(json!({ "id": 2 })), "bob")
        .await
        .unwrap();
    let roles = second.jsoncontent["roles"].as_array().unwrap();
    assert_eq!(roles.len(), 2);
    assert_eq!(roles[0], first.jsoncontent["roles"][0]);
    assert_eq!(roles[1]["id"], 2);
    assert_eq!(second.jsoncontent["other"], json!({ "keep": true }));
}

#[tokio::test]
async fn test_append_to_unknown_module_is_not_found() {
    let Some(db) = setup().await else { return };
    let service = ConfigRecordService::new(&db);

    let result = service
        .append_entry("no_such_module_xyz", "roles", Map::new(), "alice")
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_update_merges_and_reports_missing_id() {
    let Some(db) = setup().await else { return };
    let (_, module) = insert_module(
        &db,
        json!({ "roles": [{ "id": 1, "name": "admin", "level": 9 }] }),
    )
    .await;
    let service = ConfigRecordService::new(&db);

    let record = service
        .update_entry(&module, "roles", "1", entry(json!({ "name": "root" })), "carol")
        .await
        .unwrap();
    let role = &record.jsoncontent["roles"][0];
    assert_eq!(role["name"], "root");
    assert_eq!(role["level"], 9);
    assert_eq!(role["updatedBy"], "carol");
    assert!(role["updatedOn"].is_string());

    let missing = service
        .update_entry(&module, "roles", "42", Map::new(), "carol")
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let no_section = service
        .update_entry(&module, "groups", "1", Map::new(), "carol")
        .await;
    assert!(matches!(no_section, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_soft_delete_keeps_entry_visible() {
    let Some(db) = setup().await else { return };
    let (_, module) = insert_module(&db, json!({ "roles": [{ "id": "a" }, { "id": "b" }] })).await;
    let service = ConfigRecordService::new(&db);

    service
        .soft_delete_entry(&module, "roles", "a", "dave")
        .await
        .unwrap();

    let roles = service.get_section(&module, "roles").await.unwrap();
    let roles = roles.as_array().unwrap();
    assert_eq!(roles.len(), 2);
    assert_eq!(roles[0]["deletedBy"], "dave");
    assert!(roles[0]["deletedOn"].is_string());
    assert!(roles[1].get("deletedBy").is_none());
}

#[tokio::test]
async fn test_hard_delete_is_idempotent() {
    let Some(db) = setup().await else { return };
    let (id, module) = insert_module(&db, json!({})).await;
    let service = ConfigRecordService::new(&db);

    // Wrong module leaves the row alone
    assert_eq!(
        service.delete_record("other_module", &id.to_string()).await.unwrap(),
        0
    );
    assert_eq!(
        service
            .delete_record(&module.to_uppercase(), &id.to_string())
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        service.delete_record(&module, &id.to_string()).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_concurrent_appends_are_not_lost() {
    let Some(db) = setup().await else { return };
    let (_, module) = insert_module(&db, json!({})).await;
    let service = ConfigRecordService::new(&db);

    let appends = (0..8).map(|i| {
        service.append_entry(&module, "roles", entry(json!({ "id": i + 1 })), "alice")
    });
    for result in futures::future::join_all(appends).await {
        result.unwrap();
    }

    let roles = service.get_section(&module, "roles").await.unwrap();
    let mut ids: Vec<i64> = roles
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_plain_config_round_trip() {
    let Some(db) = setup().await else { return };
    let service = PlainConfigService::new(&db);

    let id: i64 = sqlx::query_scalar("INSERT INTO configs (data) VALUES ($1) RETURNING id")
        .bind(json!({ "theme": "dark" }))
        .fetch_one(db.pool())
        .await
        .unwrap();

    assert_eq!(
        service.update_config_data(id, &json!({ "theme": "light" })).await.unwrap(),
        1
    );
    let config = service.get_config_by_id(id).await.unwrap().unwrap();
    assert_eq!(config.data, json!({ "theme": "light" }));
    assert!(service
        .get_all_configs()
        .await
        .unwrap()
        .iter()
        .any(|c| c.id == id));

    assert_eq!(service.delete_config(id).await.unwrap(), 1);
    assert!(service.get_config_by_id(id).await.unwrap().is_none());
    assert_eq!(service.delete_config(id).await.unwrap(), 0);
}

#[actix_web::test]
async fn test_put_merges_jsoncontent_body() {
    let Some(db) = setup().await else { return };
    let (_, module) = insert_module(
        &db,
        json!({ "roles": [{ "id": 1, "name": "admin", "level": 9 }] }),
    )
    .await;
    let app = app!(db);

    let req = test::TestRequest::put()
        .uri(&format!("/{}/roles/1", module))
        .insert_header(("X-User-Id", "erin"))
        .set_json(json!({ "jsoncontent": { "name": "root" } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["module"], module.as_str());
    let role = &body["jsoncontent"]["roles"][0];
    assert_eq!(role["name"], "root");
    assert_eq!(role["level"], 9);
    assert_eq!(role["updatedBy"], "erin");
    assert!(role.get("jsoncontent").is_none());
}

#[actix_web::test]
async fn test_patch_deleted_by_body_then_header_then_default() {
    let Some(db) = setup().await else { return };
    let (_, module) = insert_module(
        &db,
        json!({ "roles": [{ "id": "a" }, { "id": "b" }, { "id": "c" }] }),
    )
    .await;
    let app = app!(db);

    // No body, no header
    let req = test::TestRequest::patch()
        .uri(&format!("/{}/roles/a", module))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Body wins over header
    let req = test::TestRequest::patch()
        .uri(&format!("/{}/roles/b", module))
        .insert_header(("X-User-Id", "erin"))
        .set_json(json!({ "deletedBy": "frank" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Header without body
    let req = test::TestRequest::patch()
        .uri(&format!("/{}/roles/c", module))
        .insert_header(("X-User-Id", "erin"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let roles = body["jsoncontent"]["roles"].as_array().unwrap();
    assert_eq!(roles[0]["deletedBy"], "current_user");
    assert_eq!(roles[1]["deletedBy"], "frank");
    assert_eq!(roles[2]["deletedBy"], "erin");
    assert!(roles.iter().all(|r| r["deletedOn"].is_string()));
}

#[actix_web::test]
async fn test_not_found_responses_name_the_missing_key() {
    let Some(db) = setup().await else { return };
    let (_, module) = insert_module(&db, json!({ "roles": [{ "id": 1 }] })).await;
    let app = app!(db);

    let cases = [
        (
            test::TestRequest::put()
                .uri(&format!("/{}/groups/1", module))
                .set_json(json!({ "jsoncontent": {} })),
            format!("Section 'groups' not found in module '{}'", module),
        ),
        (
            test::TestRequest::patch().uri(&format!("/{}/roles/42", module)),
            "ID '42' not found in section 'roles'".to_string(),
        ),
        (
            test::TestRequest::post()
                .uri("/no_such_module_xyz/roles")
                .set_json(json!({ "id": 1 })),
            "Module 'no_such_module_xyz' not found".to_string(),
        ),
        (
            test::TestRequest::get().uri(&format!("/{}/groups", module)),
            "No data found for this section".to_string(),
        ),
    ];

    for (req, message) in cases {
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "message": message }));
    }
}

#[actix_web::test]
async fn test_append_replaces_falsy_section() {
    let Some(db) = setup().await else { return };
    let (_, module) = insert_module(&db, json!({ "flag": false })).await;
    let app = app!(db);

    let req = test::TestRequest::post()
        .uri(&format!("/{}/flag", module))
        .set_json(json!({ "id": 9 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    let flag = body["jsoncontent"]["flag"].as_array().unwrap();
    assert_eq!(flag.len(), 1);
    assert_eq!(flag[0]["id"], 9);
    assert_eq!(flag[0]["createdBy"], "current_user");
}

#[tokio::test]
async fn test_migration_failures_propagate() {
    let Some(db) = setup().await else { return };
    let table = format!("migration_check_{}", unique_suffix());

    db.apply_migration(&format!(
        "CREATE TABLE {table} (id BIGINT, name TEXT); INSERT INTO {table} VALUES (1, 'a'), (2, 'A')"
    ))
    .await
    .unwrap();

    // Existing objects and an index blocked by duplicates are skipped
    db.apply_migration(&format!("CREATE TABLE {table} (id BIGINT)"))
        .await
        .unwrap();
    db.apply_migration(&format!(
        "CREATE UNIQUE INDEX {table}_upper_idx ON {table} (UPPER(name))"
    ))
    .await
    .unwrap();

    let result = db
        .apply_migration(&format!("INSERT INTO {table}_missing VALUES (1)"))
        .await;
    assert!(result.is_err());

    sqlx::query(&format!("DROP TABLE {table}"))
        .execute(db.pool())
        .await
        .unwrap();
}
