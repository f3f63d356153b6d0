//! CLI configuration, parsed from process arguments via `clap`'s derive
//! macros.

use std::path::PathBuf;

use clap::Parser;

use crate::consts::{BSP_FACTOR_RANGE, DEFAULT_BSP_FACTOR};
use crate::error::BspError;

/// Build a BSP tree from a JSON map description.
#[derive(Debug, Parser)]
#[command(name = "ddbsp", version, about)]
pub struct BuildConfig {
    /// Path to the JSON map description to build.
    pub input: PathBuf,

    /// The partition selector's cost-tuning factor (1..=32).
    #[arg(long, default_value_t = DEFAULT_BSP_FACTOR)]
    pub factor: i32,

    /// Write an archived cache to this path after a successful build.
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Raise the log level: `-v` for debug, `-vv` for trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl BuildConfig {
    pub fn validate_factor(&self) -> Result<(), BspError> {
        if !BSP_FACTOR_RANGE.contains(&self.factor) {
            return Err(BspError::FactorOutOfRange(self.factor));
        }
        Ok(())
    }

    pub fn tracing_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_factor_is_in_range() {
        let cfg = BuildConfig::parse_from(["ddbsp", "map.json"]);
        assert_eq!(cfg.factor, DEFAULT_BSP_FACTOR);
        cfg.validate_factor().unwrap();
    }

    #[test]
    fn rejects_out_of_range_factor() {
        let cfg = BuildConfig::parse_from(["ddbsp", "map.json", "--factor", "0"]);
        assert!(cfg.validate_factor().is_err());
    }

    #[test]
    fn verbosity_raises_the_filter() {
        let cfg = BuildConfig::parse_from(["ddbsp", "map.json", "-vv"]);
        assert_eq!(cfg.tracing_filter(), "trace");
    }
}
