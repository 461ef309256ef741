//! Canonical file paths for the data directory.

use std::path::{Path, PathBuf};

use arrest_leads_arrest_models::County;

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`, falling back to the
/// current directory when the crate is built outside the workspace layout.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the default `data/` directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the records file for `county` under `dir`.
#[must_use]
pub fn county_records_path(dir: &Path, county: County) -> PathBuf {
    dir.join(format!("{county}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn county_file_uses_snake_case_id() {
        assert_eq!(
            county_records_path(Path::new("/data"), County::Charlotte),
            PathBuf::from("/data/charlotte.json")
        );
    }
}
