//! Applies declaratively registered patch groups and reverses them at
//! shutdown.

use std::sync::{Arc, Mutex};

use anyhow::Context as _;

use super::descriptor::PatchAssembly;
use super::registry::PatchHostRegistry;
use crate::host::{ModHost, Side};

struct AppliedGroup {
    name: String,
    side: Side,
    cleanup: Option<fn()>,
}

/// Drives patch application across assemblies.
///
/// A failure while processing one assembly is logged and does not prevent
/// the remaining assemblies from being processed: the load degrades to
/// whatever patched successfully.
pub struct PatchOrchestrator {
    registry: Arc<PatchHostRegistry>,
    context_keys: Mutex<Vec<String>>,
    applied: Mutex<Vec<AppliedGroup>>,
}

impl PatchOrchestrator {
    pub fn new(registry: Arc<PatchHostRegistry>) -> Self {
        Self {
            registry,
            context_keys: Mutex::new(Vec::new()),
            applied: Mutex::new(Vec::new()),
        }
    }

    /// Apply every eligible patch group in `assemblies`.
    ///
    /// Ineligible groups (side gate or mod gate not satisfied) are skipped
    /// silently; skipping is routine, not an error.
    pub fn apply_all(
        &self,
        assemblies: &[Arc<dyn PatchAssembly>],
        side: Side,
        is_mod_active: &dyn Fn(&str) -> bool,
    ) {
        for assembly in assemblies {
            if let Err(err) = self.apply_assembly(assembly.as_ref(), side, is_mod_active) {
                log::error!("failed to patch assembly {}: {err:#}", assembly.identity());
            }
        }
    }

    /// [`apply_all`](Self::apply_all) with side and mod lookups taken from
    /// the host.
    pub fn apply_all_from_host(&self, assemblies: &[Arc<dyn PatchAssembly>], host: &dyn ModHost) {
        self.apply_all(assemblies, host.current_side(), &|id| host.is_mod_active(id));
    }

    fn apply_assembly(
        &self,
        assembly: &dyn PatchAssembly,
        side: Side,
        is_mod_active: &dyn Fn(&str) -> bool,
    ) -> anyhow::Result<()> {
        let context = self.registry.context(assembly.identity());
        self.remember_context(context.key());

        let groups = assembly
            .patch_groups()
            .with_context(|| format!("scanning assembly {}", assembly.identity()))?;

        for group in groups {
            if !group.eligible(side, is_mod_active) {
                log::debug!(
                    "skipping patch group {} (side gate {:?}, mod gates {:?})",
                    group.name,
                    group.side,
                    group.required_mods
                );
                continue;
            }
            for target in &group.targets {
                context.install(target.signature.clone(), Arc::clone(&target.hook))?;
            }
            self.lock_applied().push(AppliedGroup {
                name: group.name,
                side: group.side,
                cleanup: group.cleanup,
            });
        }

        let installed = context.installed_methods();
        if !installed.is_empty() {
            let members: Vec<String> = installed.iter().map(|sig| sig.to_string()).collect();
            log::info!(
                "assembly {} patched {} member(s): {}",
                assembly.identity(),
                members.len(),
                members.join(", ")
            );
        }
        Ok(())
    }

    /// Reverse everything this orchestrator applied: remove all context
    /// hooks, then run cleanup entry points for groups whose side gate still
    /// admits `side`. Calling again is a no-op.
    pub fn reverse_all(&self, side: Side) {
        let keys: Vec<String> = self.lock_context_keys().drain(..).collect();
        for key in keys {
            self.registry.remove_all(&key);
        }
        let applied: Vec<AppliedGroup> = self.lock_applied().drain(..).collect();
        for group in applied {
            if !group.side.admits(side) {
                continue;
            }
            if let Some(cleanup) = group.cleanup {
                log::debug!("running cleanup for patch group {}", group.name);
                cleanup();
            }
        }
    }

    fn remember_context(&self, key: &str) {
        let mut keys = self.lock_context_keys();
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }

    fn lock_context_keys(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.context_keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_applied(&self) -> std::sync::MutexGuard<'_, Vec<AppliedGroup>> {
        self.applied
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
