pub mod app_config;
pub mod config;
pub mod products;
pub mod stores;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{DedupStrategy, FixtureFields, FixtureRecord, ProductRecord};
pub use stores::{
    load_stores, parse_stores, BrandFallback, DescriptionStyle, FailurePolicy, FieldSource,
    FieldStrategy, InclusionRule, PriceFormat, ScrollSettings, Selector, SelectorKind, SetupStep,
    StoreConfig, StoresFile,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read stores file {path}: {source}")]
    StoresFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse stores file: {0}")]
    StoresFileParse(#[from] serde_yaml::Error),

    #[error("stores validation failed: {0}")]
    Validation(String),
}
