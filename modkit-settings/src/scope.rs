//! Directory resolution for scoped mod files.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::SettingsError;
use crate::util::lock;

/// File placement granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Per mod, per save-world. Invalidated whenever the active world
    /// changes.
    World,
    /// Per mod, persists across worlds.
    Global,
    /// Framework-level scope shared by every mod.
    Shared,
}

impl Scope {
    /// Lower-case token used in file names.
    pub fn token(self) -> &'static str {
        match self {
            Scope::World => "world",
            Scope::Global => "global",
            Scope::Shared => "shared",
        }
    }
}

/// Category of files placed under a scope directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Assets,
    Settings,
    Data,
}

impl FileCategory {
    pub fn token(self) -> &'static str {
        match self {
            FileCategory::Assets => "assets",
            FileCategory::Settings => "settings",
            FileCategory::Data => "data",
        }
    }
}

/// Maps `(category, scope)` pairs to directories, creating them on demand.
///
/// World-scoped paths include the active world identifier, which is read on
/// every resolution — nothing is cached across a world switch.
pub struct ScopePathResolver {
    root: PathBuf,
    mod_id: String,
    world_id: Mutex<Option<String>>,
}

impl ScopePathResolver {
    pub fn new(root: impl Into<PathBuf>, mod_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            mod_id: mod_id.into(),
            world_id: Mutex::new(None),
        }
    }

    /// Resolver rooted at the platform data directory.
    pub fn for_mod(mod_id: impl Into<String>) -> Self {
        let mut root = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        root.push("modkit");
        Self::new(root, mod_id)
    }

    pub fn mod_id(&self) -> &str {
        &self.mod_id
    }

    /// Record the active world. `None` makes world scope unavailable until
    /// the host enters another world.
    pub fn set_world(&self, world_id: Option<String>) {
        *lock(&self.world_id) = world_id;
    }

    pub fn current_world(&self) -> Option<String> {
        lock(&self.world_id).clone()
    }

    /// Directory for `(category, scope)`, created if absent.
    ///
    /// Fails with [`SettingsError::ScopeUnavailable`] when world scope is
    /// requested outside an active game session.
    pub fn resolve(&self, category: FileCategory, scope: Scope) -> Result<PathBuf, SettingsError> {
        let dir = match scope {
            Scope::Shared => self.root.join("shared").join(category.token()),
            Scope::Global => self
                .root
                .join("mods")
                .join(&self.mod_id)
                .join(category.token()),
            Scope::World => {
                let world = self.current_world().ok_or(SettingsError::ScopeUnavailable)?;
                self.root
                    .join("mods")
                    .join(&self.mod_id)
                    .join("worlds")
                    .join(world)
                    .join(category.token())
            }
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> (tempfile::TempDir, ScopePathResolver) {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = ScopePathResolver::new(dir.path(), "lanterns");
        (dir, resolver)
    }

    #[test]
    fn resolve_creates_the_directory() {
        let (_dir, resolver) = resolver();
        let path = resolver
            .resolve(FileCategory::Settings, Scope::Global)
            .expect("resolve");
        assert!(path.is_dir());
        assert!(path.ends_with("mods/lanterns/settings"));

        // resolving again is idempotent
        let again = resolver
            .resolve(FileCategory::Settings, Scope::Global)
            .expect("resolve");
        assert_eq!(path, again);
    }

    #[test]
    fn world_scope_requires_an_active_world() {
        let (_dir, resolver) = resolver();
        let err = resolver
            .resolve(FileCategory::Data, Scope::World)
            .expect_err("no world");
        assert!(matches!(err, SettingsError::ScopeUnavailable));
    }

    #[test]
    fn world_switch_changes_the_resolved_path() {
        let (_dir, resolver) = resolver();
        resolver.set_world(Some("alpha".to_string()));
        let alpha = resolver
            .resolve(FileCategory::Settings, Scope::World)
            .expect("resolve");

        resolver.set_world(Some("beta".to_string()));
        let beta = resolver
            .resolve(FileCategory::Settings, Scope::World)
            .expect("resolve");

        assert_ne!(alpha, beta);
        assert!(alpha.to_string_lossy().contains("alpha"));
        assert!(beta.to_string_lossy().contains("beta"));
    }

    #[test]
    fn shared_scope_is_outside_the_mod_directory() {
        let (_dir, resolver) = resolver();
        let path = resolver
            .resolve(FileCategory::Assets, Scope::Shared)
            .expect("resolve");
        assert!(path.ends_with("shared/assets"));
        assert!(!path.to_string_lossy().contains("lanterns"));
    }
}
