use anyhow::{Context, Result};
use drumtune_core::InstrumentCatalog;
use std::path::{Path, PathBuf};

/// `<config dir>/drumtune/instruments.json`, if the platform has a config dir.
fn default_catalog_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("drumtune").join("instruments.json"))
}

/// Resolves the instrument catalog.
///
/// An explicit `--catalog` file must load. Otherwise a catalog in the user
/// config directory is used when present and valid, and the built-in presets
/// are the fallback.
pub fn load_catalog(explicit: Option<&Path>) -> Result<InstrumentCatalog> {
    if let Some(path) = explicit {
        return InstrumentCatalog::load(path)
            .with_context(|| format!("Failed to load catalog '{}'", path.display()));
    }

    let Some(path) = default_catalog_path().filter(|p| p.exists()) else {
        return Ok(InstrumentCatalog::builtin());
    };

    match InstrumentCatalog::load(&path) {
        Ok(catalog) => Ok(catalog),
        Err(e) => {
            log::warn!("[CONFIG] Ignoring {}: {}", path.display(), e);
            Ok(InstrumentCatalog::builtin())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn explicit_catalog_must_be_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kit.json");
        fs::write(&path, "[]").unwrap();
        assert!(load_catalog(Some(&path)).is_err());
        assert!(load_catalog(Some(&dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn explicit_catalog_replaces_presets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kit.json");
        fs::write(
            &path,
            r#"[{"id": "timbale", "name": "Timbale", "lugs": 6,
                 "batter_range": {"min": 250.0, "max": 450.0},
                 "resonant_range": {"min": 250.0, "max": 450.0}}]"#,
        )
        .unwrap();
        let catalog = load_catalog(Some(&path)).unwrap();
        assert_eq!(catalog.instruments().len(), 1);
        assert!(catalog.find("timbale").is_some());
        assert!(catalog.find("snare").is_none());
    }
}
