pub mod config_record;
pub mod plain_config;

pub use config_record::ConfigRecordService;
pub use plain_config::PlainConfigService;
