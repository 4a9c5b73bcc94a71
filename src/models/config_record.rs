use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

/// One row of `cfgadmindata`: a module and its sectioned JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConfigRecord {
    pub id: i64,
    pub module: String,
    pub jsoncontent: Value,
}

/// Body of `PUT /{module}/{section}/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateEntryForm {
    pub jsoncontent: Map<String, Value>,
}

/// Body of `PATCH /{module}/{section}/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct SoftDeleteForm {
    #[serde(rename = "deletedBy", default)]
    pub deleted_by: Option<String>,
}

impl SoftDeleteForm {
    pub fn deleted_by(&self) -> Option<&str> {
        self.deleted_by.as_deref().filter(|by| !by.is_empty())
    }
}
