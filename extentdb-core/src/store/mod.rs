//! On-disk identity of a database
//!
//! Each data file starts with a [`StoreHeader`] naming the format version and
//! the static configuration the database was created with. Creating a store
//! writes the headers; opening one reads them back and lets them override
//! whatever layout the command line asked for.

mod header;

pub use header::{StoreHeader, HEADER_BLOCK_SIZE, HEADER_MAGIC};

use crate::config::StartupConfig;
use crate::{ExtentError, Result};
use tracing::info;

/// Write a fresh header to every configured data file
pub fn create_store(config: &StartupConfig) -> Result<StoreHeader> {
    let header = StoreHeader::new(*config.static_config());

    for path in config.dynamic_config().data_paths() {
        header.write_to(path, config.force_create())?;
        info!(
            "Created data file {} (format {})",
            path.display(),
            header.version
        );
    }

    Ok(header)
}

/// Read the headers of an existing database and adopt its static layout.
///
/// All files must carry the same header.
pub fn open_store(config: StartupConfig) -> Result<StartupConfig> {
    let mut paths = config.dynamic_config().data_paths();
    let first = paths
        .next()
        .ok_or(ExtentError::Config(crate::ConfigError::NoDataFiles))?;
    let header = StoreHeader::read_from(first)?;

    for path in paths {
        let other = StoreHeader::read_from(path)?;
        if other != header {
            return Err(ExtentError::Corruption(format!(
                "{} does not belong to the same database as {}",
                path.display(),
                first.display()
            )));
        }
    }

    info!(
        "Opened database: format {}, {} slices, {} byte blocks, {} byte extents ({} blocks each)",
        header.version,
        header.static_config.shard_count,
        header.static_config.block_size,
        header.static_config.extent_size,
        header.static_config.blocks_per_extent()
    );

    Ok(config.with_persisted_static(header.static_config)?)
}
