pub mod config_record;
pub mod plain_config;

pub use config_record::{ConfigRecord, SoftDeleteForm, UpdateEntryForm};
pub use plain_config::{PlainConfig, PlainConfigForm};
