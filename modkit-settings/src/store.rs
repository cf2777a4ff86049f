// Segmented settings files: one JSON object per (scope, side), keyed by
// feature name.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use modkit_core::Side;
use serde_json::{Map, Value};

use crate::error::SettingsError;
use crate::scope::{FileCategory, Scope, ScopePathResolver};
use crate::util::lock;

/// One physical JSON file holding named feature sections.
///
/// The top-level shape is `{ "<featureName>": { ...fields... }, ... }`.
/// Sections the current code base does not know about are carried through
/// writes untouched, and saving a feature overlays its fields onto the
/// existing section object so unknown keys inside a section survive too.
#[derive(Debug)]
pub struct SettingsFile {
    scope: Scope,
    side: Side,
    path: PathBuf,
    sections: Mutex<Map<String, Value>>,
}

impl SettingsFile {
    /// File name for a scope/side pair: `settings-<scope>-<side>.json`.
    pub fn file_name(scope: Scope, side: Side) -> String {
        format!("settings-{}-{}.json", scope.token(), side.token())
    }

    /// Open (or start) the settings file for `(scope, side)` under the
    /// resolver's settings directory.
    pub fn open(
        resolver: &ScopePathResolver,
        scope: Scope,
        side: Side,
    ) -> Result<Self, SettingsError> {
        let dir = resolver.resolve(FileCategory::Settings, scope)?;
        let path = dir.join(Self::file_name(scope, side));
        let sections = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    log::warn!(
                        "settings file {} is not a JSON object, starting empty",
                        path.display()
                    );
                    Map::new()
                }
                Err(source) => return Err(SettingsError::MalformedFile { path, source }),
            }
        } else {
            Map::new()
        };
        Ok(Self {
            scope,
            side,
            path,
            sections: Mutex::new(sections),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Current value of a named section, if present.
    pub fn section(&self, name: &str) -> Option<Value> {
        lock(&self.sections).get(name).cloned()
    }

    pub fn section_names(&self) -> Vec<String> {
        lock(&self.sections).keys().cloned().collect()
    }

    /// Replace a section outright. Does not write; call [`write`](Self::write)
    /// to persist.
    pub fn set_section(&self, name: &str, value: Value) {
        lock(&self.sections).insert(name.to_string(), value);
    }

    /// Overlay `fields` onto the existing section object, preserving keys
    /// the overlay does not mention. Non-object overlays replace the section.
    pub fn merge_section(&self, name: &str, fields: Value) {
        let mut sections = lock(&self.sections);
        match fields {
            Value::Object(incoming) => {
                let entry = sections
                    .entry(name.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(existing) = entry {
                    for (key, value) in incoming {
                        existing.insert(key, value);
                    }
                } else {
                    *entry = Value::Object(incoming);
                }
            }
            other => {
                sections.insert(name.to_string(), other);
            }
        }
    }

    /// Drop a section. Returns whether it existed.
    pub fn remove_section(&self, name: &str) -> bool {
        lock(&self.sections).remove(name).is_some()
    }

    /// Persist the whole file.
    ///
    /// The image is serialized to a temporary sibling and renamed over the
    /// target, so a failed write leaves the previous contents intact.
    pub fn write(&self) -> Result<(), SettingsError> {
        let image = Value::Object(lock(&self.sections).clone());
        let text = serde_json::to_string_pretty(&image).map_err(|source| {
            SettingsError::Serialization {
                section: self.path.display().to_string(),
                source,
            }
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open(dir: &tempfile::TempDir) -> SettingsFile {
        let resolver = ScopePathResolver::new(dir.path(), "lanterns");
        SettingsFile::open(&resolver, Scope::Global, Side::Server).expect("open")
    }

    #[test]
    fn file_name_uses_lowercase_tokens() {
        assert_eq!(
            SettingsFile::file_name(Scope::World, Side::Server),
            "settings-world-server.json"
        );
        assert_eq!(
            SettingsFile::file_name(Scope::Global, Side::Client),
            "settings-global-client.json"
        );
    }

    #[test]
    fn sections_round_trip_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let file = open(&dir);
            file.set_section("Lighting", json!({"brightness": 50}));
            file.write().expect("write");
        }
        let file = open(&dir);
        assert_eq!(file.section("Lighting"), Some(json!({"brightness": 50})));
    }

    #[test]
    fn merge_preserves_unknown_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = open(&dir);
        file.set_section("Lighting", json!({"brightness": 50, "legacy_tint": "warm"}));
        file.merge_section("Lighting", json!({"brightness": 80}));
        assert_eq!(
            file.section("Lighting"),
            Some(json!({"brightness": 80, "legacy_tint": "warm"}))
        );
    }

    #[test]
    fn merge_into_missing_section_inserts_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = open(&dir);
        file.merge_section("Lighting", json!({"brightness": 50}));
        assert_eq!(file.section("Lighting"), Some(json!({"brightness": 50})));
    }

    #[test]
    fn unknown_sections_survive_rewrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let file = open(&dir);
            file.set_section("SomeoneElses", json!({"x": 1}));
            file.write().expect("write");
        }
        let file = open(&dir);
        file.set_section("Lighting", json!({"brightness": 50}));
        file.write().expect("write");

        let reread = open(&dir);
        assert_eq!(reread.section("SomeoneElses"), Some(json!({"x": 1})));
    }

    #[test]
    fn remove_section_reports_presence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = open(&dir);
        file.set_section("Lighting", json!({}));
        assert!(file.remove_section("Lighting"));
        assert!(!file.remove_section("Lighting"));
    }
}
