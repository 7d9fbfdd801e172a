use std::path::Path;

mod chainstate_config;
mod error;

pub use chainstate_config::{
	ChainstateConfig, ClusterConfig, CoordinatorKind, MonitorConfig, NotificationConfig,
	ProcessorKind, ProviderConfig,
};
pub use error::ConfigError;

/// Common interface for loading configuration files
pub trait ConfigLoader: Sized {
	fn load_from_path(path: &Path) -> Result<Self, ConfigError>;

	fn validate(&self) -> Result<(), ConfigError>;

	fn is_json_file(path: &Path) -> bool {
		path.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase() == "json")
			.unwrap_or(false)
	}
}
