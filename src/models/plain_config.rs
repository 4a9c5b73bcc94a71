use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// One row of `configs`: an opaque JSON blob keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlainConfig {
    pub id: i64,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct PlainConfigForm {
    #[serde(default)]
    pub data: Value,
}
