//! JSON persistence for card profiles and run statistics.
//!
//! Both stores tolerate missing files and missing keys: a profile file that
//! lacks a built-in profile gets it merged back in on load, and a statistics
//! file written by an older version fills absent counters with zero.
//!
//! Writes go to a temporary sibling file that is renamed over the target, so
//! a crash mid-write never leaves a truncated JSON document behind.
//!
//! The generation run itself never touches these files.

use crate::config::{builtin_profiles, Profile, DEFAULT_PROFILE};
use crate::error::CardSheetError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

fn store_error(path: &Path, detail: impl std::fmt::Display) -> CardSheetError {
    CardSheetError::Store {
        path: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read `path` as JSON, or `None` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CardSheetError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(store_error(path, e)),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| store_error(path, format!("invalid JSON: {e}")))
}

/// Serialise `value` as pretty JSON and atomically replace `path`.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), CardSheetError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| store_error(path, e))?;

    let json = serde_json::to_vec_pretty(value).map_err(|e| store_error(path, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| store_error(path, e))?;
    tmp.write_all(&json).map_err(|e| store_error(path, e))?;
    tmp.persist(path).map_err(|e| store_error(path, e.error))?;

    debug!("Saved {}", path.display());
    Ok(())
}

// ── Profiles ─────────────────────────────────────────────────────────────

/// Named card profiles backed by a JSON file.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, Profile>,
}

impl ProfileStore {
    /// Load profiles from `path`, merging in every built-in profile whose
    /// name is absent. A missing file yields just the built-ins.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CardSheetError> {
        let path = path.into();
        let mut profiles: BTreeMap<String, Profile> = read_json(&path)?.unwrap_or_default();
        for (name, profile) in builtin_profiles() {
            profiles.entry(name.to_string()).or_insert(profile);
        }
        Ok(Self { path, profiles })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// The `default` profile (always present after load).
    pub fn default_profile(&self) -> Profile {
        self.profiles
            .get(DEFAULT_PROFILE)
            .cloned()
            .unwrap_or_else(|| Profile::from_layout(&Default::default()))
    }

    /// Profile names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Profile)> {
        self.profiles.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert or replace a profile. Call [`save`](Self::save) to persist.
    pub fn upsert(&mut self, name: impl Into<String>, profile: Profile) {
        self.profiles.insert(name.into(), profile);
    }

    /// Remove a profile. A removed built-in comes back on the next load.
    pub fn remove(&mut self, name: &str) -> Option<Profile> {
        self.profiles.remove(name)
    }

    pub fn save(&self) -> Result<(), CardSheetError> {
        write_json_atomic(&self.path, &self.profiles)
    }
}

// ── Statistics ───────────────────────────────────────────────────────────

/// Timestamp format of [`RunStats::last_session_date`].
pub const SESSION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Cumulative counters across successful runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunStats {
    pub total_cards: u64,
    pub total_sessions: u64,
    pub last_session_date: Option<String>,
    pub last_session_cards: u64,
}

impl RunStats {
    /// Load from `path`; a missing file yields zeroed counters.
    pub fn load(path: &Path) -> Result<Self, CardSheetError> {
        Ok(read_json(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<(), CardSheetError> {
        write_json_atomic(path, self)
    }

    /// Account for one successful run of `cards` cards, stamped with the
    /// current local time.
    pub fn record(&mut self, cards: usize) {
        self.record_at(cards, chrono::Local::now().naive_local());
    }

    pub fn record_at(&mut self, cards: usize, at: chrono::NaiveDateTime) {
        let cards = cards as u64;
        self.total_cards += cards;
        self.total_sessions += 1;
        self.last_session_cards = cards;
        self.last_session_date = Some(at.format(SESSION_DATE_FORMAT).to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarginSet;
    use chrono::NaiveDate;

    fn custom() -> Profile {
        Profile {
            card_height_cm: 6.0,
            card_width_cm: 9.0,
            front_margins: MarginSet::uniform(1.0),
            back_margins: MarginSet::uniform(1.0),
            render_dpi: 200,
            cards_per_page: 6,
        }
    }

    #[test]
    fn missing_profile_file_yields_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::load(dir.path().join("profiles.json")).unwrap();
        let names: Vec<_> = store.names().collect();
        assert_eq!(names, vec!["default", "staff", "visitor"]);
        assert_eq!(store.default_profile().card_height_cm, 5.81);
    }

    #[test]
    fn saved_profiles_round_trip_and_builtins_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profiles.json");

        let mut store = ProfileStore::load(&path).unwrap();
        store.upsert("conference", custom());
        store.remove("staff");
        store.save().unwrap();

        let reloaded = ProfileStore::load(&path).unwrap();
        assert_eq!(reloaded.get("conference"), Some(&custom()));
        // Removed built-ins come back.
        assert!(reloaded.get("staff").is_some());
    }

    #[test]
    fn overridden_builtin_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        let mut store = ProfileStore::load(&path).unwrap();
        store.upsert("default", custom());
        store.save().unwrap();

        let reloaded = ProfileStore::load(&path).unwrap();
        assert_eq!(reloaded.default_profile(), custom());
    }

    #[test]
    fn corrupt_profile_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = ProfileStore::load(&path).unwrap_err();
        assert!(matches!(err, CardSheetError::Store { .. }));
    }

    #[test]
    fn stats_fill_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        std::fs::write(&path, r#"{"total_cards": 12}"#).unwrap();
        let stats = RunStats::load(&path).unwrap();
        assert_eq!(stats.total_cards, 12);
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.last_session_date, None);
    }

    #[test]
    fn record_accumulates() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        let mut stats = RunStats::default();
        stats.record_at(8, at);
        stats.record_at(3, at);
        assert_eq!(stats.total_cards, 11);
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.last_session_cards, 3);
        assert_eq!(stats.last_session_date.as_deref(), Some("2024-03-09 14:05"));
    }

    #[test]
    fn stats_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        let mut stats = RunStats::load(&path).unwrap();
        stats.record(4);
        stats.save(&path).unwrap();
        assert_eq!(RunStats::load(&path).unwrap(), stats);
    }
}
