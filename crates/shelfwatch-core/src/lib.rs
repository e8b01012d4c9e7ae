pub mod app_config;
pub mod config;
pub mod fetch_result;
pub mod snapshot;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use fetch_result::{FetchMetadata, FetchMode, FetchResult};
pub use snapshot::{
    CheckStatus, NotificationType, PriceShell, ProductSnapshot, SnapshotMetadata, StockShell,
    StockStatus, VariantShell, MAX_IMAGES, MAX_VARIANTS,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
