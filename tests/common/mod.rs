#![allow(dead_code)]

use std::path::{Path, PathBuf};

use house_price_api::config::ModelsConfig;

pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/models")
}

pub fn fixture_config() -> ModelsConfig {
    ModelsConfig {
        artifact_dir: fixture_dir(),
        ..ModelsConfig::default()
    }
}

/// Copies the fixture artifacts into `dir` so a test can corrupt them.
pub fn copy_fixtures(dir: &Path) -> ModelsConfig {
    for entry in std::fs::read_dir(fixture_dir()).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), dir.join(entry.file_name())).unwrap();
    }
    ModelsConfig {
        artifact_dir: dir.to_path_buf(),
        ..ModelsConfig::default()
    }
}
