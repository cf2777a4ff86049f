//! Declarative patch group descriptors.

use std::sync::Arc;

use crate::hooks::{MemberHook, MemberSignature};
use crate::host::Side;

/// One member-level patch instruction inside a group.
pub struct PatchTarget {
    pub signature: MemberSignature,
    pub hook: Arc<dyn MemberHook>,
}

/// A set of hooks applied and reversed as a unit, gated by game side and
/// mod dependencies.
///
/// Groups are discovered from a [`PatchAssembly`] at orchestration time,
/// applied once, and reversed at orchestrator teardown.
pub struct PatchGroupDescriptor {
    /// Name of the marked type the group belongs to.
    pub name: String,
    /// Side gate. `Universal` always matches.
    pub side: Side,
    /// Mods that must all be active for the group to apply.
    pub required_mods: Vec<String>,
    pub targets: Vec<PatchTarget>,
    /// Optional cleanup entry point invoked when the group is reversed.
    pub cleanup: Option<fn()>,
}

impl PatchGroupDescriptor {
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        Self {
            name: name.into(),
            side,
            required_mods: Vec::new(),
            targets: Vec::new(),
            cleanup: None,
        }
    }

    /// Gate the group on another mod being active.
    pub fn require_mod(mut self, mod_id: impl Into<String>) -> Self {
        self.required_mods.push(mod_id.into());
        self
    }

    /// Add a member-level patch instruction.
    pub fn target(mut self, signature: MemberSignature, hook: Arc<dyn MemberHook>) -> Self {
        self.targets.push(PatchTarget { signature, hook });
        self
    }

    /// Register a cleanup entry point run when the group is reversed.
    pub fn on_cleanup(mut self, cleanup: fn()) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    /// A group is eligible iff its side gate admits the current side and
    /// every required mod is active.
    pub fn eligible(&self, side: Side, is_mod_active: &dyn Fn(&str) -> bool) -> bool {
        self.side.admits(side) && self.required_mods.iter().all(|id| is_mod_active(id))
    }
}

/// A bundle of patch groups registered by one mod assembly.
///
/// The identity doubles as the patch-context key, so every hook the
/// assembly installs can be reversed together.
pub trait PatchAssembly: Send + Sync {
    /// Stable identity of this assembly.
    fn identity(&self) -> &str;

    /// Enumerate the assembly's patch groups. Enumeration itself may fail
    /// (bad declarations, missing members); the orchestrator then skips the
    /// whole assembly.
    fn patch_groups(&self) -> anyhow::Result<Vec<PatchGroupDescriptor>>;
}
