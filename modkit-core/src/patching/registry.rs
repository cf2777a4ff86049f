//! Named, lazily created patch contexts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::PatchError;
use crate::hooks::{HookEngine, HookHandle, MemberHook, MemberSignature};

/// An isolated collection of hooks owned by one key.
///
/// Everything installed through a context is removed together by
/// [`PatchHostRegistry::remove_all`]; the context itself stays valid and can
/// install again afterwards.
pub struct PatchContext {
    key: String,
    engine: Arc<dyn HookEngine>,
}

impl PatchContext {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Install a hook on `signature` under this context.
    pub fn install(
        &self,
        signature: MemberSignature,
        hook: Arc<dyn MemberHook>,
    ) -> Result<HookHandle, PatchError> {
        self.engine.install(&self.key, signature, hook)
    }

    /// Member signatures currently hooked through this context.
    pub fn installed_methods(&self) -> Vec<MemberSignature> {
        self.engine.list_installed(&self.key)
    }
}

/// Registry of patch contexts keyed by a stable string.
pub struct PatchHostRegistry {
    engine: Arc<dyn HookEngine>,
    contexts: Mutex<HashMap<String, Arc<PatchContext>>>,
}

impl PatchHostRegistry {
    pub fn new(engine: Arc<dyn HookEngine>) -> Self {
        Self {
            engine,
            contexts: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &Arc<dyn HookEngine> {
        &self.engine
    }

    /// Get or create the context for `key`.
    ///
    /// Calling repeatedly with the same key returns the same context and
    /// never disturbs previously installed hooks.
    pub fn context(&self, key: &str) -> Arc<PatchContext> {
        let mut contexts = self
            .contexts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(contexts.entry(key.to_string()).or_insert_with(|| {
            Arc::new(PatchContext {
                key: key.to_string(),
                engine: Arc::clone(&self.engine),
            })
        }))
    }

    /// Remove every hook installed through `key`'s context. Calling again,
    /// or calling for a key that never had a context, is a no-op.
    pub fn remove_all(&self, key: &str) {
        self.engine.remove_context(key);
    }

    /// Member signatures hooked through `key`'s context, for diagnostics.
    /// Reflects only hooks installed via this registry's engine contexts.
    pub fn installed_methods(&self, key: &str) -> Vec<MemberSignature> {
        self.engine.list_installed(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::DispatchEngine;

    struct Noop;
    impl MemberHook for Noop {}

    fn registry() -> PatchHostRegistry {
        PatchHostRegistry::new(Arc::new(DispatchEngine::new()))
    }

    #[test]
    fn context_is_idempotent_and_keeps_hooks() {
        let registry = registry();
        let first = registry.context("assembly-a");
        let sig = MemberSignature::method("Chunk", "generate");
        first.install(sig.clone(), Arc::new(Noop)).expect("install");

        let second = registry.context("assembly-a");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.installed_methods(), vec![sig.clone()]);
        assert_eq!(registry.installed_methods("assembly-a"), vec![sig]);
    }

    #[test]
    fn remove_all_clears_hooks_and_is_repeatable() {
        let registry = registry();
        let context = registry.context("assembly-a");
        context
            .install(MemberSignature::method("Chunk", "generate"), Arc::new(Noop))
            .expect("install");

        registry.remove_all("assembly-a");
        assert!(registry.installed_methods("assembly-a").is_empty());
        registry.remove_all("assembly-a");
        registry.remove_all("never-seen");
    }
}
