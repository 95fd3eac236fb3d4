//! Storage configuration
//!
//! Two halves with different lifetimes:
//!
//! - [`StaticStorageConfig`]: fixed when the database is created
//! - [`DynamicStorageConfig`]: chosen again on every start
//!
//! [`ConfigBuilder`] turns defaults and option assignments into a validated
//! [`StartupConfig`], which is read-only from then on.

mod builder;
mod codec;
mod dynamic_config;
mod host;
mod parse;
mod static_config;
mod summary;

pub use builder::{build_config, ConfigBuilder, ConfigOption, ConfigWarning, StartupConfig};
pub use dynamic_config::{CachePolicy, DynamicStorageConfig, FileEntry, FlushTimer, SerializerPolicy};
pub use host::{HostInfo, StartupEnvironment, DEFAULT_FILE_ENV};
pub use parse::FLUSH_TIMER_DISABLE;
pub use static_config::StaticStorageConfig;
pub use summary::ConfigSummary;
