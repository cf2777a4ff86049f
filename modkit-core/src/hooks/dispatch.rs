//! In-process hook dispatcher.
//!
//! Instrumented call sites call [`DispatchEngine::run_with_hooks`] instead
//! of invoking a member directly; the engine runs the member's before-hooks,
//! the member body, then its after-hooks. Call sites that only detect a
//! completed mutation use [`DispatchEngine::notify_after`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::engine::{HookEngine, HookHandle, HookInvocation, HookResult, MemberHook, MemberSignature};
use crate::error::PatchError;

struct InstalledHook {
    id: u64,
    hook: Arc<dyn MemberHook>,
}

#[derive(Default)]
struct DispatchState {
    /// Hooks per member signature, in installation order.
    hooks: HashMap<MemberSignature, Vec<InstalledHook>>,
    /// Per-context bookkeeping for removal and diagnostics.
    contexts: HashMap<String, Vec<(u64, MemberSignature)>>,
    next_id: u64,
}

/// In-memory [`HookEngine`].
///
/// Hook lists are cloned out of the internal lock before invocation, so a
/// running hook may re-enter the engine (e.g. a change hook that triggers a
/// save which dispatches further notifications).
#[derive(Default)]
pub struct DispatchEngine {
    state: Mutex<DispatchState>,
}

impl DispatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn hooks_for(&self, signature: &MemberSignature) -> Vec<Arc<dyn MemberHook>> {
        match self.state.lock() {
            Ok(state) => state
                .hooks
                .get(signature)
                .map(|list| list.iter().map(|h| Arc::clone(&h.hook)).collect())
                .unwrap_or_default(),
            Err(_) => {
                log::warn!("hook engine state poisoned, dispatching no hooks");
                Vec::new()
            }
        }
    }

    /// Run the before-hooks for `signature`.
    ///
    /// Returns [`HookResult::Skip`] as soon as any hook asks to suppress the
    /// member.
    pub fn dispatch_before(&self, signature: &MemberSignature) -> HookResult {
        let call = HookInvocation {
            signature: signature.clone(),
        };
        for hook in self.hooks_for(signature) {
            if hook.before(&call) == HookResult::Skip {
                return HookResult::Skip;
            }
        }
        HookResult::Continue
    }

    /// Run the after-hooks for `signature`.
    pub fn notify_after(&self, signature: &MemberSignature) {
        let call = HookInvocation {
            signature: signature.clone(),
        };
        for hook in self.hooks_for(signature) {
            hook.after(&call);
        }
    }

    /// Execute `body` with hook interception for `signature`.
    ///
    /// Before-hooks may skip the body, in which case `None` is returned;
    /// after-hooks run whenever the body did.
    pub fn run_with_hooks<R>(
        &self,
        signature: &MemberSignature,
        body: impl FnOnce() -> R,
    ) -> Option<R> {
        if self.dispatch_before(signature) == HookResult::Skip {
            return None;
        }
        let result = body();
        self.notify_after(signature);
        Some(result)
    }
}

impl HookEngine for DispatchEngine {
    fn install(
        &self,
        context: &str,
        signature: MemberSignature,
        hook: Arc<dyn MemberHook>,
    ) -> Result<HookHandle, PatchError> {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => {
                return Err(PatchError::HookInstallationFailed {
                    signature,
                    reason: "hook engine state poisoned".to_string(),
                })
            }
        };
        state.next_id += 1;
        let id = state.next_id;
        state
            .hooks
            .entry(signature.clone())
            .or_default()
            .push(InstalledHook { id, hook });
        state
            .contexts
            .entry(context.to_string())
            .or_default()
            .push((id, signature.clone()));
        Ok(HookHandle { id, signature })
    }

    fn remove_context(&self, context: &str) {
        let Ok(mut state) = self.state.lock() else {
            log::warn!("hook engine state poisoned, cannot remove context {context}");
            return;
        };
        let Some(installed) = state.contexts.remove(context) else {
            return;
        };
        for (id, signature) in installed {
            if let Some(list) = state.hooks.get_mut(&signature) {
                list.retain(|h| h.id != id);
                if list.is_empty() {
                    state.hooks.remove(&signature);
                }
            }
        }
    }

    fn list_installed(&self, context: &str) -> Vec<MemberSignature> {
        match self.state.lock() {
            Ok(state) => state
                .contexts
                .get(context)
                .map(|list| list.iter().map(|(_, sig)| sig.clone()).collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }
}
