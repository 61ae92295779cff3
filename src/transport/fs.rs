use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::config::DiscoveryConfig;
use crate::constants::transport::TRIP_FILE_EXTENSION;

/// Discover every trip file under `root/<year>/<month>/*.csv`.
///
/// Years are visited in configured order; months and files inside a year are
/// visited in file-name order. Missing year directories and non-CSV files are
/// skipped.
pub fn discover_trip_files(config: &DiscoveryConfig) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for year in &config.years {
        let year_dir = config.root.join(year.to_string());
        if !year_dir.is_dir() {
            debug!(year, dir = %year_dir.display(), "year directory missing; skipping");
            continue;
        }
        let before = files.len();
        let walker = WalkDir::new(&year_dir)
            .min_depth(2)
            .max_depth(2)
            .follow_links(config.follow_links)
            .sort_by_file_name();
        for entry in walker
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
        {
            if is_trip_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        debug!(year, files = files.len() - before, "discovered trip files");
    }
    files
}

/// True if the path has a `.csv` extension (case-insensitive).
pub fn is_trip_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(TRIP_FILE_EXTENSION))
        .unwrap_or(false)
}
