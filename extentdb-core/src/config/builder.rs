//! Configuration builder and validator
//!
//! Options are applied one at a time, in command-line order, on top of
//! host-derived defaults. The first violation aborts the build; no partial
//! configuration is ever handed out.

use super::host::{HostInfo, StartupEnvironment};
use super::parse::{parse_flush_timer, parse_gc_range, parse_in_range, parse_number, parse_yes_no};
use super::{DynamicStorageConfig, FileEntry, StaticStorageConfig};
use crate::limits::{DEFAULT_LISTEN_PORT, MAX_CPUS, MEGABYTE};
use crate::ConfigError;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One option assignment taken from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOption {
    Verbose,
    Create,
    Force,
    File(PathBuf),
    IntegrityFile(PathBuf),
    LogFile(PathBuf),
    Cores(String),
    Slices(String),
    MaxCacheSize(String),
    Port(String),
    WaitForFlush(String),
    FlushTimer(String),
    FlushThreshold(String),
    GcRange(String),
    ActiveDataExtents(String),
    BlockSize(String),
    ExtentSize(String),
    /// A positional argument; none are accepted
    Extra(String),
}

/// Advisory findings. They never abort the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// `wait_for_flush` was switched off to avoid waiting forever
    WaitForFlushDisabled,
    /// The extent size equals the file zone size
    ExtentSizeEqualsZoneSize,
    /// The store header disagrees with the command line; the header won
    StaticConfigOverridden,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::WaitForFlushDisabled => write!(
                f,
                "Server is configured to wait for data to be flushed to disk before returning, \
                 but also configured to wait indefinitely before flushing data to disk. \
                 Setting wait-for-flush to 'no'."
            ),
            ConfigWarning::ExtentSizeEqualsZoneSize => write!(
                f,
                "You made the extent size the same as the file zone size. \
                 This is not a big problem, but it is better to use a huge or \
                 unlimited zone size to get the effect you probably want."
            ),
            ConfigWarning::StaticConfigOverridden => write!(
                f,
                "Block size, extent size and slices are fixed at creation; \
                 using the values stored in the database instead of the command line."
            ),
        }
    }
}

/// A fully validated startup configuration
#[derive(Debug, Clone, PartialEq)]
pub struct StartupConfig {
    verbose: bool,
    port: u16,
    n_workers: u32,
    log_file: Option<PathBuf>,
    create_store: bool,
    force_create: bool,
    shutdown_after_creation: bool,
    static_config: StaticStorageConfig,
    dynamic_config: DynamicStorageConfig,
    host: HostInfo,
    warnings: Vec<ConfigWarning>,
}

impl StartupConfig {
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Worker threads handling requests
    pub fn n_workers(&self) -> u32 {
        self.n_workers
    }

    /// Log destination; `None` means stderr
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Initialize a new database instead of opening one
    pub fn create_store(&self) -> bool {
        self.create_store
    }

    /// Overwrite an existing database when creating
    pub fn force_create(&self) -> bool {
        self.force_create
    }

    /// Exit once the new database has been written
    pub fn shutdown_after_creation(&self) -> bool {
        self.shutdown_after_creation
    }

    pub fn static_config(&self) -> &StaticStorageConfig {
        &self.static_config
    }

    pub fn dynamic_config(&self) -> &DynamicStorageConfig {
        &self.dynamic_config
    }

    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Replace the static configuration with the one persisted in an existing
    /// database.
    ///
    /// Warnings that depend on the layout are re-evaluated against it.
    pub fn with_persisted_static(
        mut self,
        persisted: StaticStorageConfig,
    ) -> Result<Self, ConfigError> {
        persisted.validate()?;
        if persisted != self.static_config {
            self.static_config = persisted;
            self.warnings
                .retain(|w| *w != ConfigWarning::ExtentSizeEqualsZoneSize);
            self.warnings.push(ConfigWarning::StaticConfigOverridden);
            if extent_matches_zone(&self.static_config, &self.dynamic_config) {
                self.warnings.push(ConfigWarning::ExtentSizeEqualsZoneSize);
            }
        }
        Ok(self)
    }
}

fn extent_matches_zone(layout: &StaticStorageConfig, dynamic: &DynamicStorageConfig) -> bool {
    layout.extent_size == dynamic.serializer.file_zone_size
}

/// Accumulates option assignments into a [`StartupConfig`]
#[derive(Debug)]
pub struct ConfigBuilder {
    env: StartupEnvironment,
    verbose: bool,
    port: u16,
    n_workers: u32,
    log_file: Option<PathBuf>,
    create_store: bool,
    force_create: bool,
    shutdown_after_creation: bool,
    static_config: StaticStorageConfig,
    dynamic_config: DynamicStorageConfig,
    extra: Option<String>,
}

impl ConfigBuilder {
    /// Start from defaults derived from `env`
    pub fn new(env: StartupEnvironment) -> Self {
        let n_workers = env.host.default_workers();
        let cache_size = env.host.default_cache_size();
        Self {
            env,
            verbose: false,
            port: DEFAULT_LISTEN_PORT,
            n_workers,
            log_file: None,
            create_store: false,
            force_create: false,
            shutdown_after_creation: false,
            static_config: StaticStorageConfig::default(),
            dynamic_config: DynamicStorageConfig::new(cache_size),
            extra: None,
        }
    }

    /// Apply a single assignment
    pub fn apply(&mut self, option: ConfigOption) -> Result<(), ConfigError> {
        debug!(?option, "applying option");

        match option {
            ConfigOption::Verbose => self.verbose = true,
            ConfigOption::Create => {
                self.create_store = true;
                self.shutdown_after_creation = true;
            }
            ConfigOption::Force => self.force_create = true,
            ConfigOption::File(path) => self.dynamic_config.push_file(path)?,
            ConfigOption::IntegrityFile(path) => {
                self.dynamic_config.attach_integrity_file(path)?
            }
            ConfigOption::LogFile(path) => self.log_file = Some(path),
            ConfigOption::Cores(value) => {
                let n = parse_number("cores", &value)?;
                if n > (MAX_CPUS - 1) as i128 {
                    return Err(ConfigError::TooManyCpus { max: MAX_CPUS - 1 });
                }
                if n < 1 {
                    return Err(ConfigError::OutOfRange {
                        option: "cores",
                        value,
                        min: 1,
                        max: (MAX_CPUS - 1) as i128,
                    });
                }
                self.n_workers = n as u32;
            }
            ConfigOption::Slices(value) => {
                let n = parse_number("slices", &value)?;
                self.static_config.shard_count = StaticStorageConfig::check_shard_count(n)?;
            }
            ConfigOption::MaxCacheSize(value) => {
                let mb = parse_in_range(
                    "max-cache-size",
                    &value,
                    0,
                    (u64::MAX / MEGABYTE) as i128,
                )?;
                self.dynamic_config.cache.max_size = mb as u64 * MEGABYTE;
            }
            ConfigOption::Port(value) => {
                self.port = parse_in_range("port", &value, 0, u16::MAX as i128)? as u16;
            }
            ConfigOption::WaitForFlush(value) => {
                self.dynamic_config.cache.wait_for_flush = parse_yes_no(&value)?;
            }
            ConfigOption::FlushTimer(value) => {
                self.dynamic_config.cache.flush_timer = parse_flush_timer(&value)?;
            }
            ConfigOption::FlushThreshold(value) => {
                self.dynamic_config.cache.flush_threshold_percent =
                    parse_in_range("flush-threshold", &value, 0, 100)? as u32;
            }
            ConfigOption::GcRange(value) => {
                let (low, high) = parse_gc_range(&value)?;
                self.dynamic_config.serializer.gc_low_ratio = low;
                self.dynamic_config.serializer.gc_high_ratio = high;
            }
            ConfigOption::ActiveDataExtents(value) => {
                let n = parse_number("active-data-extents", &value)?;
                self.dynamic_config.serializer.num_active_data_extents =
                    super::SerializerPolicy::check_active_extents(n)?;
            }
            ConfigOption::BlockSize(value) => {
                let n = parse_number("block-size", &value)?;
                self.static_config.block_size = StaticStorageConfig::check_block_size(n)?;
            }
            ConfigOption::ExtentSize(value) => {
                let n = parse_number("extent-size", &value)?;
                self.static_config.extent_size = StaticStorageConfig::check_extent_size(n)?;
            }
            ConfigOption::Extra(value) => {
                // Reported by finish() so option errors surface first
                self.extra.get_or_insert(value);
            }
        }
        Ok(())
    }

    /// Run the cross-field checks and produce the final configuration
    pub fn finish(mut self) -> Result<StartupConfig, ConfigError> {
        if let Some(extra) = self.extra.take() {
            return Err(ConfigError::UnexpectedArgument(extra));
        }

        if self.dynamic_config.files.is_empty() && !self.create_store {
            self.fall_back_to_default_file()?;
        }

        if self.dynamic_config.files.is_empty() {
            return Err(ConfigError::NoDataFiles);
        }

        let mut warnings = Vec::new();

        if self.dynamic_config.cache.resolve_flush_contradiction() {
            warnings.push(ConfigWarning::WaitForFlushDisabled);
        }

        self.static_config.check_layout()?;

        if extent_matches_zone(&self.static_config, &self.dynamic_config) {
            warnings.push(ConfigWarning::ExtentSizeEqualsZoneSize);
        }

        Ok(StartupConfig {
            verbose: self.verbose,
            port: self.port,
            n_workers: self.n_workers,
            log_file: self.log_file,
            create_store: self.create_store,
            force_create: self.force_create,
            shutdown_after_creation: self.shutdown_after_creation,
            static_config: self.static_config,
            dynamic_config: self.dynamic_config,
            host: self.env.host,
            warnings,
        })
    }

    /// No files and no `--create`: open the default file if it is there,
    /// otherwise create it and keep running.
    fn fall_back_to_default_file(&mut self) -> Result<(), ConfigError> {
        let path = self.env.default_db_path.clone();

        match std::fs::metadata(&path) {
            Ok(_) => {
                debug!(path = %path.display(), "opening existing default database");
                self.create_store = false;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no default database, creating one");
                self.create_store = true;
                self.shutdown_after_creation = false;
            }
            Err(e) => {
                return Err(ConfigError::ProbeFailed {
                    path,
                    reason: e.to_string(),
                })
            }
        }

        self.dynamic_config.files.push(FileEntry::new(path));
        Ok(())
    }
}

/// Build a configuration from an ordered list of assignments
pub fn build_config(
    options: impl IntoIterator<Item = ConfigOption>,
    env: StartupEnvironment,
) -> Result<StartupConfig, ConfigError> {
    let mut builder = ConfigBuilder::new(env);
    for option in options {
        builder.apply(option)?;
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlushTimer;
    use crate::limits::{GIGABYTE, MAX_ACTIVE_DATA_EXTENTS, MAX_FILES, MAX_SHARDS};
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn test_host() -> HostInfo {
        HostInfo {
            cpu_count: 8,
            total_ram: 8 * GIGABYTE,
            available_ram: 4 * GIGABYTE,
        }
    }

    fn env_in(dir: &TempDir) -> StartupEnvironment {
        StartupEnvironment::new(test_host(), dir.path().join("extentdb_data"))
    }

    fn build(options: Vec<ConfigOption>) -> Result<StartupConfig, ConfigError> {
        let dir = TempDir::new().unwrap();
        build_config(options, env_in(&dir))
    }

    fn file(path: &str) -> ConfigOption {
        ConfigOption::File(PathBuf::from(path))
    }

    #[test]
    fn test_defaults() {
        let config = build(vec![file("db0")]).unwrap();
        assert_eq!(config.n_workers(), 7);
        assert_eq!(config.port(), DEFAULT_LISTEN_PORT);
        assert_eq!(config.dynamic_config().cache.max_size, 2 * GIGABYTE);
        assert_eq!(config.static_config(), &StaticStorageConfig::default());
        assert!(!config.create_store());
        assert!(!config.verbose());
        assert!(config.log_file().is_none());
        assert!(config.warnings().is_empty());
    }

    #[test]
    fn test_default_file_missing_creates() {
        let dir = TempDir::new().unwrap();
        let env = env_in(&dir);
        let default_path = env.default_db_path.clone();

        let config = build_config(vec![], env).unwrap();
        assert!(config.create_store());
        assert!(!config.shutdown_after_creation());
        assert_eq!(config.dynamic_config().files, vec![FileEntry::new(default_path)]);
    }

    #[test]
    fn test_default_file_present_opens() {
        let dir = TempDir::new().unwrap();
        let env = env_in(&dir);
        std::fs::write(&env.default_db_path, b"").unwrap();

        let config = build_config(vec![], env).unwrap();
        assert!(!config.create_store());
        assert_eq!(config.dynamic_config().files.len(), 1);
    }

    #[test]
    fn test_default_file_probe_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        // A path beneath a regular file fails with ENOTDIR, not ENOENT
        let env = StartupEnvironment::new(test_host(), blocker.join("extentdb_data"));

        let err = build_config(vec![], env).unwrap_err();
        assert!(matches!(err, ConfigError::ProbeFailed { .. }));
        assert!(err.to_string().starts_with("Could not access() path"));
    }

    #[test]
    fn test_create_without_files_fails() {
        let err = build(vec![ConfigOption::Create]).unwrap_err();
        assert_eq!(err, ConfigError::NoDataFiles);
        assert_eq!(
            err.to_string(),
            "You must explicitly specify one or more paths with -f."
        );
    }

    #[test]
    fn test_create_flags() {
        let config = build(vec![ConfigOption::Create, ConfigOption::Force, file("db0")]).unwrap();
        assert!(config.create_store());
        assert!(config.force_create());
        assert!(config.shutdown_after_creation());
    }

    #[test]
    fn test_integrity_file_order() {
        let err = build(vec![ConfigOption::IntegrityFile("x".into()), file("db0")]).unwrap_err();
        assert_eq!(err, ConfigError::IntegrityFileWithoutFile);

        let config = build(vec![
            file("db0"),
            ConfigOption::IntegrityFile("first".into()),
            ConfigOption::IntegrityFile("second".into()),
            file("db1"),
            ConfigOption::IntegrityFile("db1.check".into()),
        ])
        .unwrap();
        let files = &config.dynamic_config().files;
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].integrity_path, Some(PathBuf::from("second")));
        assert_eq!(files[1].integrity_path, Some(PathBuf::from("db1.check")));
    }

    #[test]
    fn test_too_many_files() {
        let options = (0..=MAX_FILES).map(|i| file(&format!("db{}", i))).collect();
        assert_eq!(
            build(options).unwrap_err(),
            ConfigError::TooManyFiles { max: MAX_FILES }
        );
    }

    #[test]
    fn test_cores() {
        let config = build(vec![file("db0"), ConfigOption::Cores("3".into())]).unwrap();
        assert_eq!(config.n_workers(), 3);

        let err = build(vec![ConfigOption::Cores(MAX_CPUS.to_string())]).unwrap_err();
        assert_eq!(err.to_string(), format!("Maximum number of CPUs is {}", MAX_CPUS - 1));

        assert!(matches!(
            build(vec![ConfigOption::Cores("0".into())]),
            Err(ConfigError::OutOfRange { option: "cores", .. })
        ));
        assert!(matches!(
            build(vec![ConfigOption::Cores("four".into())]),
            Err(ConfigError::NotANumber { option: "cores", .. })
        ));
    }

    #[test]
    fn test_slices() {
        let config = build(vec![file("db0"), ConfigOption::Slices("16".into())]).unwrap();
        assert_eq!(config.static_config().shard_count, 16);

        let err = build(vec![ConfigOption::Slices((MAX_SHARDS + 1).to_string())]).unwrap_err();
        assert_eq!(err.to_string(), format!("Maximum number of slices is {}", MAX_SHARDS));
    }

    #[test]
    fn test_active_extents() {
        let config = build(vec![file("db0"), ConfigOption::ActiveDataExtents("4".into())]).unwrap();
        assert_eq!(config.dynamic_config().serializer.num_active_data_extents, 4);

        let too_many = (MAX_ACTIVE_DATA_EXTENTS + 1).to_string();
        for bad in ["0", too_many.as_str()] {
            let err = build(vec![ConfigOption::ActiveDataExtents(bad.to_string())]).unwrap_err();
            assert_eq!(
                err,
                ConfigError::ActiveExtentsOutOfRange {
                    max: MAX_ACTIVE_DATA_EXTENTS
                }
            );
        }
    }

    #[test]
    fn test_cache_and_port() {
        let config = build(vec![
            file("db0"),
            ConfigOption::MaxCacheSize("512".into()),
            ConfigOption::Port("8080".into()),
            ConfigOption::LogFile("server.log".into()),
            ConfigOption::Verbose,
        ])
        .unwrap();
        assert_eq!(config.dynamic_config().cache.max_size, 512 * MEGABYTE);
        assert_eq!(config.port(), 8080);
        assert_eq!(config.log_file(), Some(Path::new("server.log")));
        assert!(config.verbose());

        assert!(build(vec![ConfigOption::Port("65536".into())]).is_err());
        assert!(build(vec![ConfigOption::MaxCacheSize("lots".into())]).is_err());
    }

    #[test]
    fn test_flush_options() {
        let config = build(vec![
            file("db0"),
            ConfigOption::WaitForFlush("y".into()),
            ConfigOption::FlushTimer("2000".into()),
            ConfigOption::FlushThreshold("10".into()),
        ])
        .unwrap();
        let cache = &config.dynamic_config().cache;
        assert!(cache.wait_for_flush);
        assert_eq!(cache.flush_timer, FlushTimer::Millis(2000));
        assert_eq!(cache.flush_threshold_percent, 10);

        assert!(matches!(
            build(vec![ConfigOption::FlushTimer("-5".into())]),
            Err(ConfigError::NegativeFlushTimer { value: -5 })
        ));
        assert!(build(vec![ConfigOption::WaitForFlush("maybe".into())]).is_err());
        assert!(build(vec![ConfigOption::FlushThreshold("101".into())]).is_err());
    }

    #[test]
    fn test_flush_contradiction_corrected() {
        let config = build(vec![
            file("db0"),
            ConfigOption::WaitForFlush("y".into()),
            ConfigOption::FlushTimer("disable".into()),
            ConfigOption::FlushThreshold("5".into()),
        ])
        .unwrap();
        let cache = &config.dynamic_config().cache;
        assert!(!cache.wait_for_flush);
        assert_eq!(cache.flush_timer, FlushTimer::Never);
        assert_eq!(cache.flush_threshold_percent, 5);
        assert_eq!(config.warnings(), &[ConfigWarning::WaitForFlushDisabled]);
    }

    #[test]
    fn test_gc_range() {
        let config = build(vec![file("db0"), ConfigOption::GcRange("0.2-0.4".into())]).unwrap();
        let serializer = &config.dynamic_config().serializer;
        assert_eq!(serializer.gc_low_ratio, 0.2);
        assert_eq!(serializer.gc_high_ratio, 0.4);

        assert!(matches!(
            build(vec![ConfigOption::GcRange("0.1-0.2extra".into())]),
            Err(ConfigError::MalformedGcRange { .. })
        ));
    }

    #[test]
    fn test_block_and_extent() {
        let config = build(vec![
            file("db0"),
            ConfigOption::BlockSize("8192".into()),
            ConfigOption::ExtentSize("16777216".into()),
        ])
        .unwrap();
        assert_eq!(config.static_config().block_size, 8192);
        assert_eq!(config.static_config().extent_size, 16 * MEGABYTE);

        let err = build(vec![
            file("db0"),
            ConfigOption::BlockSize("8192".into()),
            ConfigOption::ExtentSize("12288".into()),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ExtentNotMultipleOfBlock {
                extent_size: 12288,
                block_size: 8192
            }
        );

        assert!(matches!(
            build(vec![ConfigOption::BlockSize("1000".into())]),
            Err(ConfigError::BlockSizeNotAligned { .. })
        ));
    }

    #[test]
    fn test_extent_equals_zone_warns() {
        let config = build(vec![
            file("db0"),
            ConfigOption::ExtentSize(GIGABYTE.to_string()),
        ])
        .unwrap();
        assert_eq!(config.warnings(), &[ConfigWarning::ExtentSizeEqualsZoneSize]);
    }

    #[test]
    fn test_extra_argument_reported_after_options() {
        let err = build(vec![file("db0"), ConfigOption::Extra("stray".into())]).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected extra argument: \"stray\"");

        // A bad option later on the line still wins
        let err = build(vec![
            ConfigOption::Extra("stray".into()),
            ConfigOption::Cores("x".into()),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotANumber { .. }));
    }

    #[test]
    fn test_persisted_static_wins() {
        let config = build(vec![file("db0"), ConfigOption::BlockSize("8192".into())]).unwrap();
        let persisted = StaticStorageConfig::default();

        let config = config.with_persisted_static(persisted).unwrap();
        assert_eq!(config.static_config(), &persisted);
        assert_eq!(config.warnings(), &[ConfigWarning::StaticConfigOverridden]);

        let broken = StaticStorageConfig {
            block_size: 4096,
            extent_size: 6000,
            shard_count: 1,
        };
        assert!(config.with_persisted_static(broken).is_err());
    }

    proptest! {
        #[test]
        fn test_misaligned_extent_always_fails(blocks in 1u64..=1000, extent in 1u64..=1 << 30) {
            let block = blocks * 4096;
            prop_assume!(extent % block != 0);
            let result = build(vec![
                file("db0"),
                ConfigOption::BlockSize(block.to_string()),
                ConfigOption::ExtentSize(extent.to_string()),
            ]);
            let rejected = matches!(result, Err(ConfigError::ExtentNotMultipleOfBlock { .. }));
            prop_assert!(rejected);
        }
    }
}
