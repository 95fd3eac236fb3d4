//! Host introspection for configuration defaults

use crate::limits::{DEFAULT_DB_FILE_NAME, DEFAULT_MAX_CACHE_RATIO, MAX_CPUS};
use std::path::PathBuf;
use sysinfo::System;

/// Environment variable overriding the default database file
pub const DEFAULT_FILE_ENV: &str = "EXTENTDB_DEFAULT_FILE";

/// Hardware facts the defaults are derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostInfo {
    pub cpu_count: u32,
    /// Total physical memory in bytes
    pub total_ram: u64,
    /// Memory available to new allocations in bytes
    pub available_ram: u64,
}

impl HostInfo {
    /// Probe the running host
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        Self {
            cpu_count: num_cpus::get() as u32,
            total_ram: sys.total_memory(),
            available_ram: sys.available_memory(),
        }
    }

    /// Worker threads: every CPU but one, which runs engine utility work
    pub fn default_workers(&self) -> u32 {
        self.cpu_count.saturating_sub(1).clamp(1, MAX_CPUS - 1)
    }

    /// Cache budget: a fixed share of available memory
    pub fn default_cache_size(&self) -> u64 {
        (self.available_ram as f64 * DEFAULT_MAX_CACHE_RATIO) as u64
    }

    pub fn free_ram_percent(&self) -> f64 {
        if self.total_ram == 0 {
            return 0.0;
        }
        self.available_ram as f64 / self.total_ram as f64 * 100.0
    }
}

/// Process-level inputs to the configuration builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupEnvironment {
    pub host: HostInfo,
    /// File opened (or created) when no `-f` is given
    pub default_db_path: PathBuf,
}

impl StartupEnvironment {
    pub fn new(host: HostInfo, default_db_path: impl Into<PathBuf>) -> Self {
        Self {
            host,
            default_db_path: default_db_path.into(),
        }
    }

    /// Probe the host and read `EXTENTDB_DEFAULT_FILE`
    pub fn detect() -> Self {
        let default_db_path = std::env::var_os(DEFAULT_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME));
        Self::new(HostInfo::detect(), default_db_path)
    }
}
