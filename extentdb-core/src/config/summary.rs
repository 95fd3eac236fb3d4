//! Human-readable startup summary printed with `--verbose`

use super::StartupConfig;
use crate::limits::{KILOBYTE, MEGABYTE};
use std::fmt;

/// Runtime flags, database flags and host hardware, one section each
pub struct ConfigSummary<'a> {
    config: &'a StartupConfig,
}

impl<'a> ConfigSummary<'a> {
    pub fn new(config: &'a StartupConfig) -> Self {
        Self { config }
    }

    fn fmt_runtime(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dynamic = self.config.dynamic_config();
        writeln!(f, "--- Runtime ----")?;
        writeln!(f, "Threads............{}", self.config.n_workers())?;
        writeln!(f, "Block cache........{}MB", dynamic.cache.max_size / MEGABYTE)?;
        writeln!(
            f,
            "Wait for flush.....{}",
            if dynamic.cache.wait_for_flush { "Y" } else { "N" }
        )?;
        writeln!(f, "Flush timer........{}", dynamic.cache.flush_timer)?;
        writeln!(f, "Flush threshold....{}%", dynamic.cache.flush_threshold_percent)?;
        writeln!(
            f,
            "Active writers.....{}",
            dynamic.serializer.num_active_data_extents
        )?;
        writeln!(
            f,
            "GC range...........{} - {}",
            dynamic.serializer.gc_low_ratio, dynamic.serializer.gc_high_ratio
        )?;
        writeln!(f, "Port...............{}", self.config.port())
    }

    fn fmt_database(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let static_config = self.config.static_config();
        writeln!(f, "--- Database ---")?;
        writeln!(f, "Slices.............{}", static_config.shard_count)?;
        writeln!(f, "Block size.........{}KB", static_config.block_size / KILOBYTE)?;
        writeln!(f, "Extent size........{}KB", static_config.extent_size / KILOBYTE)?;

        for (i, entry) in self.config.dynamic_config().files.iter().enumerate() {
            writeln!(f, "File {:02}............{}", i + 1, entry.data_path.display())?;
            writeln!(
                f,
                "Integrity file {:02}..{}",
                i + 1,
                entry.integrity_path_or_default().display()
            )?;
        }
        Ok(())
    }

    fn fmt_hardware(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = self.config.host();
        writeln!(f, "--- Hardware ---")?;
        writeln!(f, "CPUs...............{}", host.cpu_count)?;
        writeln!(f, "Total RAM..........{}MB", host.total_ram / MEGABYTE)?;
        writeln!(
            f,
            "Free RAM...........{}MB ({:.2}%)",
            host.available_ram / MEGABYTE,
            host.free_ram_percent()
        )
    }
}

impl fmt::Display for ConfigSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_runtime(f)?;
        writeln!(f)?;
        self.fmt_database(f)?;
        writeln!(f)?;
        self.fmt_hardware(f)
    }
}
