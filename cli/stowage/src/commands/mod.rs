//! CLI command implementations.

pub mod cache;
pub mod digest;
pub mod load;
pub mod resources;
pub mod run;

use stowage_core::{CacheOutcome, LoadReport, LoadRoute};

/// One-line human summary of a load.
pub(crate) fn describe(report: &LoadReport) -> String {
    match &report.route {
        LoadRoute::Memory => format!("{} (memory)", report.identity),
        LoadRoute::Disk(entry) => format!(
            "{} (disk: {}, {})",
            report.identity,
            entry.path.display(),
            match entry.outcome {
                CacheOutcome::Hit => "cached",
                CacheOutcome::Written => "written",
            }
        ),
    }
}
