//! The interception contract the kit is built on.

use std::fmt;
use std::sync::Arc;

use crate::error::PatchError;

/// Identifies a single interceptable member: owning type, member name and
/// optional argument types for overload disambiguation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberSignature {
    pub owner: String,
    pub member: String,
    pub arg_types: Vec<String>,
}

impl MemberSignature {
    /// Signature for a plain method or constructor.
    pub fn method(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            member: member.into(),
            arg_types: Vec::new(),
        }
    }

    /// Disambiguate between overloads by argument types.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arg_types = args.into_iter().map(Into::into).collect();
        self
    }

    /// Signature of the setter accessor for a named field.
    pub fn setter(owner: impl Into<String>, field: &str) -> Self {
        Self::method(owner, format!("set_{field}"))
    }

    /// Signature of a collection operation (`push`, `insert`, `remove`,
    /// `clear`) on a list-typed field.
    pub fn collection_op(owner: impl Into<String>, field: &str, op: &str) -> Self {
        Self::method(owner, format!("{field}.{op}"))
    }
}

impl fmt::Display for MemberSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.member)?;
        if !self.arg_types.is_empty() {
            write!(f, "({})", self.arg_types.join(", "))?;
        }
        Ok(())
    }
}

/// Result of a before-hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookResult {
    /// Continue with normal execution.
    Continue,
    /// Skip the original member (the hook handled it).
    Skip,
}

/// Context handed to a hook when its member executes.
#[derive(Debug, Clone)]
pub struct HookInvocation {
    pub signature: MemberSignature,
}

/// A before/after interceptor attached to a member.
///
/// Both methods default to no-ops so hooks implement only the phase they
/// care about.
pub trait MemberHook: Send + Sync {
    /// Called before the member executes.
    fn before(&self, _call: &HookInvocation) -> HookResult {
        HookResult::Continue
    }

    /// Called after the member has executed.
    fn after(&self, _call: &HookInvocation) {}
}

/// Handle to one installed hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookHandle {
    pub id: u64,
    pub signature: MemberSignature,
}

/// The interception primitive consumed by the patching layer.
///
/// Installation is atomic per call: it either succeeds or raises
/// [`PatchError::HookInstallationFailed`], which callers propagate
/// unchanged. Hooks are owned by a named context and removed together.
pub trait HookEngine: Send + Sync {
    /// Install a hook on `signature` under the given context key.
    fn install(
        &self,
        context: &str,
        signature: MemberSignature,
        hook: Arc<dyn MemberHook>,
    ) -> Result<HookHandle, PatchError>;

    /// Remove every hook installed under `context`. Unknown contexts are a
    /// no-op.
    fn remove_context(&self, context: &str);

    /// Member signatures currently hooked under `context`, for diagnostics.
    fn list_installed(&self, context: &str) -> Vec<MemberSignature>;
}
