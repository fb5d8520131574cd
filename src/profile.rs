//! Port profile persistence
//!
//! Save/load/list/delete named port configurations as JSON files in a
//! caller-chosen directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{PortConfig, SerialError, SerialResult};

/// A saved port configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortProfile {
    /// Profile name, e.g. "Bench PSU" or "GPS 4800"
    pub name: String,
    pub config: PortConfig,
}

impl PortProfile {
    pub fn new(name: impl Into<String>, config: PortConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// A directory of `<name>.json` profiles
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a profile file, creating the directory if needed
    fn profile_path(&self, name: &str) -> SerialResult<PathBuf> {
        let name = profile_file_stem(name)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| SerialError::Profile(format!("Failed to create profile dir: {e}")))?;
        Ok(self.dir.join(format!("{name}.json")))
    }

    pub fn save(&self, profile: &PortProfile) -> SerialResult<PathBuf> {
        let path = self.profile_path(&profile.name)?;
        let json = serde_json::to_string_pretty(profile)
            .map_err(|e| SerialError::Profile(format!("Serialization error: {e}")))?;
        fs::write(&path, json)
            .map_err(|e| SerialError::Profile(format!("Failed to write profile: {e}")))?;
        log::debug!("Saved profile '{}' to {}", profile.name, path.display());
        Ok(path)
    }

    pub fn load(&self, name: &str) -> SerialResult<PortProfile> {
        let path = self.profile_path(name)?;
        let json = fs::read_to_string(&path)
            .map_err(|e| SerialError::Profile(format!("Failed to read profile '{name}': {e}")))?;
        serde_json::from_str(&json)
            .map_err(|e| SerialError::Profile(format!("Failed to parse profile '{name}': {e}")))
    }

    /// Sorted profile names. A missing directory is an empty list.
    pub fn list(&self) -> SerialResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = fs::read_dir(&self.dir)
            .map_err(|e| SerialError::Profile(format!("Failed to read profile dir: {e}")))?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                if path.extension()?.to_str()? == "json" {
                    path.file_stem()?.to_str().map(String::from)
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn delete(&self, name: &str) -> SerialResult<()> {
        let path = self.profile_path(name)?;
        if !path.exists() {
            return Err(SerialError::Profile(format!("Profile '{name}' not found")));
        }
        fs::remove_file(&path)
            .map_err(|e| SerialError::Profile(format!("Failed to delete profile '{name}': {e}")))
    }
}

/// Turn a profile name into the stem of its JSON file.
///
/// The stem may only hold letters, digits, spaces, `-` and `_`, so no name
/// can reach outside the store's directory.
fn profile_file_stem(name: &str) -> SerialResult<&str> {
    let stem = name.trim();
    if stem.is_empty() {
        return Err(SerialError::Profile("Profile name is blank".to_string()));
    }
    match stem
        .chars()
        .find(|&c| !(c.is_alphanumeric() || matches!(c, ' ' | '-' | '_')))
    {
        Some(bad) => Err(SerialError::Profile(format!(
            "Profile name '{stem}' may not contain {bad:?}"
        ))),
        None => Ok(stem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Parity, StopBits};

    fn gps_profile() -> PortProfile {
        PortProfile::new(
            "GPS 4800",
            PortConfig::new("/dev/ttyUSB0", 4800, Parity::None, 8, StopBits::One),
        )
    }

    #[test]
    fn profile_names_cannot_leave_the_store() {
        for name in ["../etc/passwd", "/dev/ttyUSB0", "COM5\\fast", "gps.json", "", "   "] {
            assert!(profile_file_stem(name).is_err(), "{name:?} was accepted");
        }
    }

    #[test]
    fn profile_stem_is_the_trimmed_name() {
        assert_eq!(profile_file_stem(" GPS 4800 ").unwrap(), "GPS 4800");
        assert_eq!(profile_file_stem("bench_psu-115200").unwrap(), "bench_psu-115200");
        let err = profile_file_stem("modem;reset").unwrap_err();
        assert!(err.to_string().contains("';'"));
    }

    #[test]
    fn store_reports_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles"));
        assert_eq!(store.dir(), dir.path().join("profiles"));
    }

    #[test]
    fn saved_profile_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        let profile = gps_profile();
        let path = store.save(&profile).unwrap();
        assert!(path.ends_with("GPS 4800.json"));
        assert_eq!(store.load("GPS 4800").unwrap(), profile);
    }

    #[test]
    fn list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles"));
        assert!(store.list().unwrap().is_empty());

        store.save(&gps_profile()).unwrap();
        store
            .save(&PortProfile::new("Bench", PortConfig::default()))
            .unwrap();
        assert_eq!(store.list().unwrap(), vec!["Bench", "GPS 4800"]);

        store.delete("Bench").unwrap();
        assert_eq!(store.list().unwrap(), vec!["GPS 4800"]);
        assert!(store.delete("Bench").is_err());
    }

    #[test]
    fn load_missing_profile_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        assert!(matches!(store.load("nope"), Err(SerialError::Profile(_))));
    }
}
