//! Per-run storage parameters
//!
//! These may change between runs without reformatting the database.

use super::parse::check_gc_range;
use crate::limits::{
    DEFAULT_ACTIVE_DATA_EXTENTS, DEFAULT_FILE_ZONE_SIZE, DEFAULT_FLUSH_THRESHOLD_PERCENT,
    DEFAULT_FLUSH_TIMER_MS, DEFAULT_GC_HIGH_RATIO, DEFAULT_GC_LOW_RATIO,
    DEFAULT_INTEGRITY_EXTENSION, MAX_ACTIVE_DATA_EXTENTS, MAX_FILES,
};
use crate::ConfigError;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Log-structured serializer policy
#[derive(Debug, Clone, PartialEq)]
pub struct SerializerPolicy {
    /// GC starts once garbage exceeds this fraction
    pub gc_low_ratio: f32,
    /// GC works to keep garbage at or below this fraction
    pub gc_high_ratio: f32,
    /// Extents open for writing at once
    pub num_active_data_extents: u32,
    /// File size cap in bytes; `None` is unlimited
    pub file_size_limit: Option<u64>,
    /// Size of one file zone in bytes
    pub file_zone_size: u64,
}

impl Default for SerializerPolicy {
    fn default() -> Self {
        Self {
            gc_low_ratio: DEFAULT_GC_LOW_RATIO,
            gc_high_ratio: DEFAULT_GC_HIGH_RATIO,
            num_active_data_extents: DEFAULT_ACTIVE_DATA_EXTENTS,
            file_size_limit: None,
            file_zone_size: DEFAULT_FILE_ZONE_SIZE,
        }
    }
}

impl SerializerPolicy {
    /// Check an active extent count on its own
    pub fn check_active_extents(value: i128) -> Result<u32, ConfigError> {
        if value < 1 || value > MAX_ACTIVE_DATA_EXTENTS as i128 {
            return Err(ConfigError::ActiveExtentsOutOfRange {
                max: MAX_ACTIVE_DATA_EXTENTS,
            });
        }
        Ok(value as u32)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_gc_range(self.gc_low_ratio, self.gc_high_ratio)?;
        Self::check_active_extents(self.num_active_data_extents as i128)?;
        Ok(())
    }
}

/// When dirty data is flushed on a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTimer {
    /// Dirty data may stay in memory indefinitely
    Never,
    /// Flush after this many milliseconds
    Millis(u32),
}

impl Default for FlushTimer {
    fn default() -> Self {
        FlushTimer::Millis(DEFAULT_FLUSH_TIMER_MS)
    }
}

impl fmt::Display for FlushTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushTimer::Never => write!(f, "Never"),
            FlushTimer::Millis(ms) => write!(f, "{}ms", ms),
        }
    }
}

/// Page cache policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    /// Cache budget in bytes
    pub max_size: u64,
    /// Hold responses until changes are durable
    pub wait_for_flush: bool,
    pub flush_timer: FlushTimer,
    /// Dirty share of the cache that forces a flush; 0 flushes immediately
    pub flush_threshold_percent: u32,
}

impl CachePolicy {
    pub fn new(max_size: u64) -> Self {
        Self {
            max_size,
            wait_for_flush: false,
            flush_timer: FlushTimer::default(),
            flush_threshold_percent: DEFAULT_FLUSH_THRESHOLD_PERCENT,
        }
    }

    /// Waiting for a flush that only a threshold may ever trigger can block
    /// forever. Turns `wait_for_flush` off in that case and returns true.
    pub fn resolve_flush_contradiction(&mut self) -> bool {
        if self.wait_for_flush
            && self.flush_timer == FlushTimer::Never
            && self.flush_threshold_percent != 0
        {
            self.wait_for_flush = false;
            return true;
        }
        false
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_threshold_percent > 100 {
            return Err(ConfigError::OutOfRange {
                option: "flush-threshold",
                value: self.flush_threshold_percent.to_string(),
                min: 0,
                max: 100,
            });
        }
        Ok(())
    }
}

/// One physical storage file and its optional integrity sidecar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub data_path: PathBuf,
    pub integrity_path: Option<PathBuf>,
}

impl FileEntry {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            integrity_path: None,
        }
    }

    /// The sidecar path, or the data path with the default extension appended
    pub fn integrity_path_or_default(&self) -> PathBuf {
        match &self.integrity_path {
            Some(path) => path.clone(),
            None => {
                let mut name = OsString::from(self.data_path.as_os_str());
                name.push(DEFAULT_INTEGRITY_EXTENSION);
                PathBuf::from(name)
            }
        }
    }
}

/// Everything that may differ from one run to the next
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicStorageConfig {
    pub serializer: SerializerPolicy,
    pub cache: CachePolicy,
    /// Data files in command-line order
    pub files: Vec<FileEntry>,
}

impl DynamicStorageConfig {
    pub fn new(cache_size: u64) -> Self {
        Self {
            serializer: SerializerPolicy::default(),
            cache: CachePolicy::new(cache_size),
            files: Vec::new(),
        }
    }

    /// Append a data file
    pub fn push_file(&mut self, path: impl Into<PathBuf>) -> Result<(), ConfigError> {
        if self.files.len() >= MAX_FILES {
            return Err(ConfigError::TooManyFiles { max: MAX_FILES });
        }
        self.files.push(FileEntry::new(path));
        Ok(())
    }

    /// Bind an integrity file to the most recently added data file.
    ///
    /// A second binding for the same file replaces the first.
    pub fn attach_integrity_file(&mut self, path: impl Into<PathBuf>) -> Result<(), ConfigError> {
        let entry = self
            .files
            .last_mut()
            .ok_or(ConfigError::IntegrityFileWithoutFile)?;
        entry.integrity_path = Some(path.into());
        Ok(())
    }

    pub fn data_paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.data_path.as_path())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.serializer.validate()?;
        self.cache.validate()?;
        if self.files.is_empty() {
            return Err(ConfigError::NoDataFiles);
        }
        if self.files.len() > MAX_FILES {
            return Err(ConfigError::TooManyFiles { max: MAX_FILES });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_contradiction() {
        let mut cache = CachePolicy::new(1024);
        cache.wait_for_flush = true;
        cache.flush_timer = FlushTimer::Never;
        cache.flush_threshold_percent = 5;

        assert!(cache.resolve_flush_contradiction());
        assert!(!cache.wait_for_flush);
        assert_eq!(cache.flush_timer, FlushTimer::Never);
        assert_eq!(cache.flush_threshold_percent, 5);

        // Already resolved
        assert!(!cache.resolve_flush_contradiction());
    }

    #[test]
    fn test_no_contradiction() {
        let mut cache = CachePolicy::new(1024);
        cache.wait_for_flush = true;
        cache.flush_timer = FlushTimer::Never;
        cache.flush_threshold_percent = 0;
        assert!(!cache.resolve_flush_contradiction());
        assert!(cache.wait_for_flush);

        cache.flush_timer = FlushTimer::Millis(100);
        cache.flush_threshold_percent = 5;
        assert!(!cache.resolve_flush_contradiction());
        assert!(cache.wait_for_flush);
    }

    #[test]
    fn test_integrity_binding() {
        let mut config = DynamicStorageConfig::new(0);
        assert_eq!(
            config.attach_integrity_file("a.int"),
            Err(ConfigError::IntegrityFileWithoutFile)
        );

        config.push_file("a").unwrap();
        config.attach_integrity_file("a.int").unwrap();
        config.attach_integrity_file("a.int2").unwrap();
        assert_eq!(config.files.len(), 1);
        assert_eq!(
            config.files[0].integrity_path,
            Some(PathBuf::from("a.int2"))
        );

        config.push_file("b").unwrap();
        assert_eq!(config.files[1].integrity_path, None);
        assert_eq!(
            config.files[1].integrity_path_or_default(),
            PathBuf::from("b.integrity")
        );
    }

    #[test]
    fn test_file_limit() {
        let mut config = DynamicStorageConfig::new(0);
        for i in 0..MAX_FILES {
            config.push_file(format!("data{}", i)).unwrap();
        }
        let err = config.push_file("one-too-many").unwrap_err();
        assert_eq!(err.to_string(), format!("Cannot use more than {} files.", MAX_FILES));
        assert_eq!(config.files.len(), MAX_FILES);
    }

    #[test]
    fn test_flush_timer_display() {
        assert_eq!(FlushTimer::Never.to_string(), "Never");
        assert_eq!(FlushTimer::Millis(250).to_string(), "250ms");
    }

    #[test]
    fn test_serializer_defaults_valid() {
        assert!(SerializerPolicy::default().validate().is_ok());
        assert!(SerializerPolicy::check_active_extents(0).is_err());
        assert!(SerializerPolicy::check_active_extents(MAX_ACTIVE_DATA_EXTENTS as i128 + 1).is_err());
    }
}
